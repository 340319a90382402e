//! The `SecurityToken` value type.
//!
//! A security token pairs an Ed25519 key with the window during which it may
//! be used to *sign*. It never changes after construction. On the signer side
//! it carries the private half; projections handed to verifiers do not.

use crate::error::SecurityTokenError;
use crate::jwks::{Jwk, PublicKey, ALG_EDDSA, CURVE_ED25519, KEY_TYPE_OKP};
use crate::jwt::encode_ed25519_public_key_jwk;
use crate::secret::{clone_secret_bytes, secret_bytes, ExposeSecret, SecretBox};
use chrono::{DateTime, Utc};
use std::fmt;
use std::time::Duration;

/// A signing key with its validity window.
pub struct SecurityToken {
    id: String,
    valid_from: DateTime<Utc>,
    valid_to: DateTime<Utc>,
    public_key: Vec<u8>,
    /// PKCS#8 DER, present only on the signer side.
    private_key: Option<SecretBox<Vec<u8>>>,
}

impl SecurityToken {
    /// Create a security token.
    ///
    /// # Errors
    ///
    /// Returns `SecurityTokenError::InvalidValidityWindow` unless
    /// `valid_from < valid_to`.
    pub fn new(
        id: impl Into<String>,
        valid_from: DateTime<Utc>,
        valid_to: DateTime<Utc>,
        public_key: Vec<u8>,
        private_key: Option<SecretBox<Vec<u8>>>,
    ) -> Result<Self, SecurityTokenError> {
        if valid_from >= valid_to {
            return Err(SecurityTokenError::InvalidValidityWindow);
        }

        Ok(Self {
            id: id.into(),
            valid_from,
            valid_to,
            public_key,
            private_key,
        })
    }

    /// Key id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Start of the signing window.
    #[must_use]
    pub fn valid_from(&self) -> DateTime<Utc> {
        self.valid_from
    }

    /// End of the signing window.
    #[must_use]
    pub fn valid_to(&self) -> DateTime<Utc> {
        self.valid_to
    }

    /// Raw Ed25519 public key bytes.
    #[must_use]
    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    /// PKCS#8 private key, if this token can sign.
    #[must_use]
    pub fn private_key(&self) -> Option<&SecretBox<Vec<u8>>> {
        self.private_key.as_ref()
    }

    /// Whether the private half is present.
    #[must_use]
    pub fn has_private_key(&self) -> bool {
        self.private_key.is_some()
    }

    /// `now > valid_to`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.valid_to
    }

    /// `now > valid_to - buffer`.
    #[must_use]
    pub fn is_expiring_soon_at(&self, buffer: Duration, now: DateTime<Utc>) -> bool {
        let buffer = chrono::Duration::from_std(buffer).unwrap_or(chrono::Duration::MAX);
        match self.valid_to.checked_sub_signed(buffer) {
            Some(threshold) => now > threshold,
            None => true,
        }
    }

    /// Expiry check against the system clock.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Rotation check against the system clock.
    #[must_use]
    pub fn is_expiring_soon(&self, buffer: Duration) -> bool {
        self.is_expiring_soon_at(buffer, Utc::now())
    }

    /// Copy of this token without the private half.
    #[must_use]
    pub fn public_only(&self) -> Self {
        Self {
            id: self.id.clone(),
            valid_from: self.valid_from,
            valid_to: self.valid_to,
            public_key: self.public_key.clone(),
            private_key: None,
        }
    }

    /// Key-set entry advertising this token's public key.
    #[must_use]
    pub fn to_jwk(&self) -> Jwk {
        Jwk {
            kty: KEY_TYPE_OKP.to_string(),
            kid: self.id.clone(),
            crv: Some(CURVE_ED25519.to_string()),
            x: Some(encode_ed25519_public_key_jwk(&self.public_key)),
            alg: Some(ALG_EDDSA.to_string()),
            key_use: Some("sig".to_string()),
        }
    }

    /// Verification key for this token.
    ///
    /// # Errors
    ///
    /// Returns `SecurityTokenError::InvalidKeyMaterial` if the public key is
    /// not a valid Ed25519 key.
    pub fn verification_key(&self) -> Result<PublicKey, SecurityTokenError> {
        PublicKey::ed25519(self.id.clone(), self.public_key.clone())
    }

    /// Construct from raw private material, for fixtures and stores that
    /// persist keys outside this process.
    ///
    /// # Errors
    ///
    /// Same as [`SecurityToken::new`].
    pub fn with_private_key_bytes(
        id: impl Into<String>,
        valid_from: DateTime<Utc>,
        valid_to: DateTime<Utc>,
        public_key: Vec<u8>,
        private_key_pkcs8: Vec<u8>,
    ) -> Result<Self, SecurityTokenError> {
        Self::new(
            id,
            valid_from,
            valid_to,
            public_key,
            Some(secret_bytes(private_key_pkcs8)),
        )
    }
}

impl Clone for SecurityToken {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            valid_from: self.valid_from,
            valid_to: self.valid_to,
            public_key: self.public_key.clone(),
            private_key: self.private_key.as_ref().map(clone_secret_bytes),
        }
    }
}

impl fmt::Debug for SecurityToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecurityToken")
            .field("id", &self.id)
            .field("valid_from", &self.valid_from)
            .field("valid_to", &self.valid_to)
            .field(
                "private_key",
                &self.private_key.as_ref().map(|_| "[REDACTED]"),
            )
            .finish_non_exhaustive()
    }
}

impl PartialEq for SecurityToken {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.valid_from == other.valid_from
            && self.valid_to == other.valid_to
            && self.public_key == other.public_key
            && match (&self.private_key, &other.private_key) {
                (Some(a), Some(b)) => a.expose_secret() == b.expose_secret(),
                (None, None) => true,
                _ => false,
            }
    }
}
