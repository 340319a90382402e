use crate::errors::SignerError;
use common::jwt::SIGNING_ALGORITHM;
use common::secret::{secret_bytes, SecretBox};
use jsonwebtoken::{encode, EncodingKey, Header};
use ring::{
    rand::SystemRandom,
    signature::{Ed25519KeyPair, KeyPair},
};
use serde::Serialize;
use std::fmt;
use tracing::instrument;

/// Fresh key material produced by a [`KeyPairGenerator`].
///
/// Debug is manually implemented to redact the private key.
pub struct GeneratedKeyPair {
    /// Raw 32-byte Ed25519 public key.
    pub public_key: Vec<u8>,
    /// PKCS#8 DER private key.
    pub private_key_pkcs8: SecretBox<Vec<u8>>,
}

impl fmt::Debug for GeneratedKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratedKeyPair")
            .field("public_key_len", &self.public_key.len())
            .field("private_key_pkcs8", &"[REDACTED]")
            .finish()
    }
}

/// Source of new signing key pairs.
///
/// Injected into the rotating key manager so tests can substitute a
/// deterministic or failing generator.
pub trait KeyPairGenerator: Send + Sync + fmt::Debug {
    /// Generate a new key pair.
    ///
    /// # Errors
    ///
    /// `SignerError::KeyGeneration` if no key could be produced.
    fn generate(&self) -> Result<GeneratedKeyPair, SignerError>;
}

/// Ed25519 key pairs from the system CSPRNG.
#[derive(Debug, Clone)]
pub struct Ed25519KeyPairGenerator {
    rng: SystemRandom,
}

impl Ed25519KeyPairGenerator {
    pub fn new() -> Self {
        Self {
            rng: SystemRandom::new(),
        }
    }
}

impl Default for Ed25519KeyPairGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyPairGenerator for Ed25519KeyPairGenerator {
    #[instrument(skip_all)]
    fn generate(&self) -> Result<GeneratedKeyPair, SignerError> {
        let pkcs8_bytes = Ed25519KeyPair::generate_pkcs8(&self.rng)
            .map_err(|e| SignerError::KeyGeneration(format!("Keypair generation failed: {}", e)))?;

        let key_pair = Ed25519KeyPair::from_pkcs8(pkcs8_bytes.as_ref())
            .map_err(|e| SignerError::KeyGeneration(format!("Keypair parsing failed: {}", e)))?;

        Ok(GeneratedKeyPair {
            public_key: key_pair.public_key().as_ref().to_vec(),
            private_key_pkcs8: secret_bytes(pkcs8_bytes.as_ref().to_vec()),
        })
    }
}

/// Sign a claim set with an Ed25519 PKCS#8 private key.
///
/// The header carries `alg: EdDSA`, `typ: JWT` and `kid: key_id`.
#[instrument(skip_all)]
pub fn sign_jwt<T: Serialize>(
    claims: &T,
    private_key_pkcs8: &[u8],
    key_id: &str,
) -> Result<String, SignerError> {
    // Validate the private key format
    Ed25519KeyPair::from_pkcs8_maybe_unchecked(private_key_pkcs8)
        .map_err(|e| SignerError::Signing(format!("Invalid private key format: {}", e)))?;

    let encoding_key = EncodingKey::from_ed_der(private_key_pkcs8);

    let mut header = Header::new(SIGNING_ALGORITHM);
    header.typ = Some("JWT".to_string());
    header.kid = Some(key_id.to_string());

    encode(&header, claims, &encoding_key)
        .map_err(|e| SignerError::Signing(format!("JWT signing operation failed: {}", e)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use common::jwt::{parse_header, TokenClaims};
    use common::secret::ExposeSecret;
    use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

    #[test]
    fn test_generate_produces_distinct_keys() {
        let generator = Ed25519KeyPairGenerator::new();
        let a = generator.generate().unwrap();
        let b = generator.generate().unwrap();

        assert_eq!(a.public_key.len(), 32);
        assert_ne!(a.public_key, b.public_key);
        assert_ne!(a.private_key_pkcs8.expose_secret(), b.private_key_pkcs8.expose_secret());
    }

    #[test]
    fn test_generated_key_pair_debug_redacts_private_key() {
        let pair = Ed25519KeyPairGenerator::new().generate().unwrap();
        let debug_str = format!("{pair:?}");
        assert!(debug_str.contains("[REDACTED]"));
        assert!(debug_str.contains("public_key_len: 32"));
    }

    #[test]
    fn test_sign_jwt_verifies_with_public_key() {
        let pair = Ed25519KeyPairGenerator::new().generate().unwrap();
        let claims = TokenClaims::expiring_at(chrono::Utc::now().timestamp() + 60)
            .with_subject("svc-a");

        let token = sign_jwt(&claims, pair.private_key_pkcs8.expose_secret(), "kid-1").unwrap();

        let header = parse_header(&token).unwrap();
        assert_eq!(header.kid, "kid-1");
        assert_eq!(header.alg, Algorithm::EdDSA);

        let decoded = decode::<TokenClaims>(
            &token,
            &DecodingKey::from_ed_der(&pair.public_key),
            &Validation::new(Algorithm::EdDSA),
        )
        .unwrap();
        assert_eq!(decoded.claims.sub.as_deref(), Some("svc-a"));
    }

    #[test]
    fn test_sign_jwt_rejects_garbage_key() {
        let claims = TokenClaims::expiring_at(0);
        let result = sign_jwt(&claims, b"not a pkcs8 document", "kid-1");
        assert!(matches!(result, Err(SignerError::Signing(_))));
    }
}
