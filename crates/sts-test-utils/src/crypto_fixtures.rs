//! Deterministic cryptographic fixtures for testing
//!
//! Provides reproducible Ed25519 keypairs and ready-made [`SecurityToken`]s
//! positioned at interesting points of their lifetime. All key material is
//! deterministic based on seed values.

use chrono::{DateTime, Duration, Utc};
use common::error::SecurityTokenError;
use common::security_token::SecurityToken;
use ring::signature::{Ed25519KeyPair, KeyPair};
use sts_signer::config::{DEFAULT_ROTATION_BUFFER, DEFAULT_TOKEN_LIFETIME};
use thiserror::Error;

/// Test fixture error type
#[derive(Error, Debug)]
pub enum FixtureError {
    #[error("Cryptographic operation failed: {0}")]
    Crypto(String),

    #[error("Invalid security token: {0}")]
    Token(#[from] SecurityTokenError),
}

/// Generate a deterministic Ed25519 signing key for testing.
///
/// The same seed always produces the same keypair, ensuring test reproducibility.
///
/// # Arguments
/// * `seed` - Seed value for deterministic key generation (0-255)
///
/// # Returns
/// * `Ok((public_key, private_key_pkcs8))` - Raw 32-byte public key, private key in PKCS#8 DER
///
/// # Example
/// ```rust,ignore
/// let (public_key, private_pkcs8) = test_signing_key(1)?;
/// // Same seed always produces same key
/// let (public_key2, private_pkcs8_2) = test_signing_key(1)?;
/// assert_eq!(public_key, public_key2);
/// ```
pub fn test_signing_key(seed: u8) -> Result<(Vec<u8>, Vec<u8>), FixtureError> {
    let mut seed_bytes = [0u8; 32];
    seed_bytes[0] = seed;
    for (i, byte) in seed_bytes.iter_mut().enumerate().skip(1) {
        *byte = seed.wrapping_mul(i as u8).wrapping_add(i as u8);
    }

    let key_pair = Ed25519KeyPair::from_seed_unchecked(&seed_bytes)
        .map_err(|e| FixtureError::Crypto(format!("Failed to generate test keypair: {:?}", e)))?;

    let public_key = key_pair.public_key().as_ref().to_vec();
    let pkcs8_bytes = build_pkcs8_from_seed(&seed_bytes);

    // ring must accept what we built, otherwise signing tests fail obscurely
    Ed25519KeyPair::from_pkcs8_maybe_unchecked(&pkcs8_bytes)
        .map_err(|e| FixtureError::Crypto(format!("Test PKCS#8 rejected: {:?}", e)))?;

    Ok((public_key, pkcs8_bytes))
}

/// Build PKCS#8 v1 document from Ed25519 seed
///
/// This is a test-only utility. Production code must use ring::rand::SystemRandom.
fn build_pkcs8_from_seed(seed: &[u8; 32]) -> Vec<u8> {
    // PKCS#8 v1 format for Ed25519 (RFC 8410):
    // SEQUENCE {
    //   version         INTEGER (0),
    //   algorithm       AlgorithmIdentifier,
    //   privateKey      OCTET STRING { OCTET STRING (32-byte seed) }
    // }
    let mut pkcs8 = Vec::with_capacity(48);

    pkcs8.extend_from_slice(&[0x30, 0x2e]);
    pkcs8.extend_from_slice(&[0x02, 0x01, 0x00]);
    // OID 1.3.101.112
    pkcs8.extend_from_slice(&[0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70]);
    pkcs8.extend_from_slice(&[0x04, 0x22, 0x04, 0x20]);
    pkcs8.extend_from_slice(seed);

    pkcs8
}

/// Build a signing-capable security token from a fixed seed.
pub fn test_security_token(
    seed: u8,
    id: &str,
    valid_from: DateTime<Utc>,
    valid_to: DateTime<Utc>,
) -> Result<SecurityToken, FixtureError> {
    let (public_key, pkcs8) = test_signing_key(seed)?;
    Ok(SecurityToken::with_private_key_bytes(
        id, valid_from, valid_to, public_key, pkcs8,
    )?)
}

fn lifetime() -> Duration {
    Duration::from_std(DEFAULT_TOKEN_LIFETIME).unwrap_or(Duration::hours(1))
}

fn buffer() -> Duration {
    Duration::from_std(DEFAULT_ROTATION_BUFFER).unwrap_or(Duration::minutes(10))
}

/// A token whose signing window ends `remaining` after `now`, with a full
/// default lifetime behind it. `remaining` may be negative.
pub fn create_token_with_time_remaining(
    seed: u8,
    remaining: Duration,
    now: DateTime<Utc>,
) -> Result<SecurityToken, FixtureError> {
    let valid_to = now + remaining;
    let valid_from = valid_to - lifetime();
    test_security_token(seed, &uuid::Uuid::new_v4().to_string(), valid_from, valid_to)
}

/// Freshly issued token, well outside the rotation buffer.
pub fn create_active_token(seed: u8, now: DateTime<Utc>) -> Result<SecurityToken, FixtureError> {
    create_token_with_time_remaining(seed, lifetime() - Duration::seconds(1), now)
}

/// Token inside the rotation buffer but not yet expired.
pub fn create_expiring_token(seed: u8, now: DateTime<Utc>) -> Result<SecurityToken, FixtureError> {
    create_token_with_time_remaining(seed, buffer() - Duration::seconds(30), now)
}

/// Token whose signing window closed hours ago.
pub fn create_expired_token(seed: u8, now: DateTime<Utc>) -> Result<SecurityToken, FixtureError> {
    create_token_with_time_remaining(seed, Duration::hours(-10), now)
}

/// Active token projected to its public half.
pub fn create_token_without_private_key(
    seed: u8,
    now: DateTime<Utc>,
) -> Result<SecurityToken, FixtureError> {
    Ok(create_active_token(seed, now)?.public_only())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ring::signature::{UnparsedPublicKey, ED25519};

    #[test]
    fn test_signing_key_is_deterministic() {
        let (pub1, priv1) = test_signing_key(1).unwrap();
        let (pub2, priv2) = test_signing_key(1).unwrap();

        assert_eq!(pub1, pub2, "Public keys should be identical for same seed");
        assert_eq!(
            priv1, priv2,
            "Private keys should be identical for same seed"
        );
    }

    #[test]
    fn test_different_seeds_produce_different_keys() {
        let (pub1, _) = test_signing_key(1).unwrap();
        let (pub2, _) = test_signing_key(2).unwrap();

        assert_ne!(pub1, pub2, "Different seeds should produce different keys");
    }

    #[test]
    fn test_pkcs8_signs_for_public_key() {
        let (public_key, pkcs8) = test_signing_key(7).unwrap();
        let pair = Ed25519KeyPair::from_pkcs8_maybe_unchecked(&pkcs8).unwrap();
        let sig = pair.sign(b"message");

        UnparsedPublicKey::new(&ED25519, &public_key)
            .verify(b"message", sig.as_ref())
            .unwrap();
    }

    #[test]
    fn test_lifecycle_fixtures() {
        let now = Utc::now();

        let active = create_active_token(1, now).unwrap();
        assert!(!active.is_expiring_soon_at(DEFAULT_ROTATION_BUFFER, now));
        assert!(active.has_private_key());

        let expiring = create_expiring_token(1, now).unwrap();
        assert!(expiring.is_expiring_soon_at(DEFAULT_ROTATION_BUFFER, now));
        assert!(!expiring.is_expired_at(now));

        let expired = create_expired_token(1, now).unwrap();
        assert!(expired.is_expired_at(now));

        let public = create_token_without_private_key(1, now).unwrap();
        assert!(!public.has_private_key());
    }
}
