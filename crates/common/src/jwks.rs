//! JSON Web Key Set types (RFC 7517) and the resolved public key.
//!
//! The signer publishes a [`JsonWebKeySet`]; the verifier fetches one and
//! turns the entry matching a token's `kid` into a [`PublicKey`].

use crate::error::SecurityTokenError;
use crate::jwt::{decode_ed25519_public_key_jwk, SIGNING_ALGORITHM};
use jsonwebtoken::{Algorithm, DecodingKey};
use serde::{Deserialize, Serialize};

/// JWK key type for Ed25519 keys.
pub const KEY_TYPE_OKP: &str = "OKP";

/// JWK curve name for Ed25519 keys.
pub const CURVE_ED25519: &str = "Ed25519";

/// JWK algorithm name for Ed25519 signatures.
pub const ALG_EDDSA: &str = "EdDSA";

/// Raw Ed25519 public key length in bytes.
pub const ED25519_PUBLIC_KEY_LEN: usize = 32;

/// JSON Web Key as published in a key-set document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    /// Key type (always "OKP" for Ed25519).
    pub kty: String,

    /// Key ID - used to select the correct key for verification.
    pub kid: String,

    /// Curve name (always "Ed25519" for EdDSA).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crv: Option<String>,

    /// Public key value (base64url encoded).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,

    /// Algorithm (should be "EdDSA").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,

    /// Key use (should be "sig" for signing).
    #[serde(default, rename = "use", skip_serializing_if = "Option::is_none")]
    pub key_use: Option<String>,
}

/// Key-set document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonWebKeySet {
    /// List of JSON Web Keys. Order carries no meaning.
    pub keys: Vec<Jwk>,
}

impl JsonWebKeySet {
    /// Look up a key by id.
    #[must_use]
    pub fn find(&self, kid: &str) -> Option<&Jwk> {
        self.keys.iter().find(|key| key.kid == kid)
    }
}

/// A public verification key resolved from a key set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    kid: String,
    algorithm: Algorithm,
    key_bytes: Vec<u8>,
}

impl PublicKey {
    /// Create an Ed25519 public key from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns `SecurityTokenError::InvalidKeyMaterial` if `key_bytes` is not
    /// a 32-byte Ed25519 key.
    pub fn ed25519(kid: impl Into<String>, key_bytes: Vec<u8>) -> Result<Self, SecurityTokenError> {
        if key_bytes.len() != ED25519_PUBLIC_KEY_LEN {
            return Err(SecurityTokenError::InvalidKeyMaterial(format!(
                "Ed25519 public key must be {ED25519_PUBLIC_KEY_LEN} bytes, got {}",
                key_bytes.len()
            )));
        }

        Ok(Self {
            kid: kid.into(),
            algorithm: SIGNING_ALGORITHM,
            key_bytes,
        })
    }

    /// Key id.
    #[must_use]
    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// Algorithm this key verifies.
    #[must_use]
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Raw public key bytes.
    #[must_use]
    pub fn key_bytes(&self) -> &[u8] {
        &self.key_bytes
    }

    /// Key in the form `jsonwebtoken` verifies with.
    #[must_use]
    pub fn decoding_key(&self) -> DecodingKey {
        DecodingKey::from_ed_der(&self.key_bytes)
    }
}

impl TryFrom<&Jwk> for PublicKey {
    type Error = SecurityTokenError;

    fn try_from(jwk: &Jwk) -> Result<Self, Self::Error> {
        if jwk.kty != KEY_TYPE_OKP {
            return Err(SecurityTokenError::InvalidKeyMaterial(format!(
                "unexpected key type {}",
                jwk.kty
            )));
        }
        if let Some(crv) = &jwk.crv {
            if crv != CURVE_ED25519 {
                return Err(SecurityTokenError::InvalidKeyMaterial(format!(
                    "unexpected curve {crv}"
                )));
            }
        }
        if let Some(alg) = &jwk.alg {
            if alg != ALG_EDDSA {
                return Err(SecurityTokenError::InvalidKeyMaterial(format!(
                    "unexpected algorithm {alg}"
                )));
            }
        }

        let x = jwk.x.as_ref().ok_or_else(|| {
            SecurityTokenError::InvalidKeyMaterial("JWK missing x field".to_string())
        })?;
        let key_bytes = decode_ed25519_public_key_jwk(x).map_err(|e| {
            SecurityTokenError::InvalidKeyMaterial(format!("invalid x encoding: {e}"))
        })?;

        Self::ed25519(jwk.kid.clone(), key_bytes)
    }
}
