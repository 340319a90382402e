//! Signing and key-set publication tests.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use common::clock::ManualClock;
use common::jwks::{JsonWebKeySet, PublicKey};
use common::jwt::TokenClaims;
use jsonwebtoken::{decode, Algorithm, Validation};
use std::sync::Arc;
use std::time::Duration;
use sts_signer::crypto::Ed25519KeyPairGenerator;
use sts_signer::{publish_key_set, RotatingKeyManager, RotationConfig, TokenSigner};
use sts_test_utils::TokenAssertions;

fn verify(jwt: &str, set: &JsonWebKeySet) -> TokenClaims {
    let header = common::jwt::parse_header(jwt).unwrap();
    let jwk = set.find(&header.kid).expect("kid published");
    let key = PublicKey::try_from(jwk).unwrap();

    decode::<TokenClaims>(jwt, &key.decoding_key(), &Validation::new(Algorithm::EdDSA))
        .unwrap()
        .claims
}

#[tokio::test]
async fn test_signed_token_verifies_against_published_key_set() -> anyhow::Result<()> {
    let signer = TokenSigner::new(Arc::new(RotatingKeyManager::with_defaults()));

    let claims = TokenClaims::expiring_at(chrono::Utc::now().timestamp() + 600)
        .with_issuer("https://sts.example")
        .with_subject("inventory")
        .with_scope("orders:read");
    let jwt = signer.sign(&claims).await?;

    jwt.assert_valid_jwt()
        .assert_for_subject("inventory")
        .assert_has_scope("orders:read")
        .assert_expires_in(600);

    let set = publish_key_set(signer.key_manager()).await;
    let verified = verify(&jwt, &set);
    assert_eq!(verified.iss.as_deref(), Some("https://sts.example"));

    Ok(())
}

#[tokio::test]
async fn test_token_signed_before_rotation_still_verifies() -> anyhow::Result<()> {
    let clock = Arc::new(ManualClock::starting_now());
    let keys = Arc::new(RotatingKeyManager::new(
        RotationConfig::default(),
        Arc::new(Ed25519KeyPairGenerator::new()),
        clock.clone(),
    ));
    let signer = TokenSigner::new(Arc::clone(&keys));

    let exp = chrono::Utc::now().timestamp() + 3600;
    let before = signer.sign(&TokenClaims::expiring_at(exp)).await?;
    let old_kid = keys.current_signing_token().await?.id().to_string();

    clock.advance(Duration::from_secs(55 * 60));
    let after = signer.sign(&TokenClaims::expiring_at(exp)).await?;

    after.assert_valid_jwt();
    before.assert_signed_by(&old_kid);

    let set = publish_key_set(&keys).await;
    assert_eq!(set.keys.len(), 2);
    verify(&before, &set);
    verify(&after, &set);

    Ok(())
}

#[tokio::test]
async fn test_key_set_serializes_as_jwks() -> anyhow::Result<()> {
    let keys = RotatingKeyManager::with_defaults();
    let current = keys.current_signing_token().await?;

    let json = serde_json::to_value(publish_key_set(&keys).await)?;
    let entry = &json["keys"][0];

    assert_eq!(entry["kty"], "OKP");
    assert_eq!(entry["crv"], "Ed25519");
    assert_eq!(entry["alg"], "EdDSA");
    assert_eq!(entry["use"], "sig");
    assert_eq!(entry["kid"], current.id());
    assert!(entry["x"].is_string());

    Ok(())
}
