//! Signer to verifier round trips.
//!
//! Tokens are minted by `sts-signer`, its published key set is served either
//! through the mock resolver or over HTTP, and `AccessTokenValidator`
//! checks them.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use common::clock::{ManualClock, SystemClock};
use common::jwt::{TokenClaims, DEFAULT_GRACE_PERIOD};
use std::sync::Arc;
use std::time::Duration;
use sts_signer::crypto::Ed25519KeyPairGenerator;
use sts_signer::{publish_key_set, RotatingKeyManager, RotationConfig, TokenSigner};
use sts_verifier::resolver::mock::MockKeySetResolver;
use sts_verifier::{AccessTokenValidator, PublicKeyCache, ValidationError, VerifierConfig};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn claims(expires_in: i64) -> TokenClaims {
    TokenClaims::expiring_at(chrono::Utc::now().timestamp() + expires_in)
        .with_issuer("https://sts.example")
        .with_subject("svc-orders")
        .with_scope("inventory:read inventory:reserve")
}

fn signer_with_clock() -> (TokenSigner, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::starting_now());
    let keys = RotatingKeyManager::new(
        RotationConfig::default(),
        Arc::new(Ed25519KeyPairGenerator::new()),
        clock.clone(),
    );
    (TokenSigner::new(Arc::new(keys)), clock)
}

async fn validator_for(signer: &TokenSigner) -> AccessTokenValidator {
    let set = publish_key_set(signer.key_manager()).await;
    let resolver = Arc::new(MockKeySetResolver::with_key_set("tenant-a", set));
    let cache = Arc::new(PublicKeyCache::new(resolver, Arc::new(SystemClock), None));
    AccessTokenValidator::new(cache, DEFAULT_GRACE_PERIOD, Arc::new(SystemClock))
}

#[tokio::test]
async fn test_signed_token_validates() -> anyhow::Result<()> {
    let signer = TokenSigner::new(Arc::new(RotatingKeyManager::with_defaults()));
    let jwt = signer.sign(&claims(600)).await?;

    let validator = validator_for(&signer).await;
    let token = validator.validate(&jwt).await?;

    let current = signer.key_manager().current_signing_token().await?;
    assert_eq!(token.key_id(), current.id());
    assert_eq!(token.subject(), Some("svc-orders"));
    assert!(token.has_scope("inventory:reserve"));

    Ok(())
}

#[tokio::test]
async fn test_signed_token_past_grace_is_expired() -> anyhow::Result<()> {
    let signer = TokenSigner::new(Arc::new(RotatingKeyManager::with_defaults()));
    let jwt = signer.sign(&claims(-301)).await?;

    let validator = validator_for(&signer).await;

    assert_eq!(
        validator.validate(&jwt).await.unwrap_err(),
        ValidationError::ExpiredToken
    );

    Ok(())
}

#[tokio::test]
async fn test_token_from_retired_key_still_validates() -> anyhow::Result<()> {
    let (signer, clock) = signer_with_clock();

    let before = signer.sign(&claims(3600)).await?;
    clock.advance(Duration::from_secs(51 * 60));
    let after = signer.sign(&claims(3600)).await?;

    let validator = validator_for(&signer).await;
    let old = validator.validate(&before).await?;
    let new = validator.validate(&after).await?;

    assert_ne!(old.key_id(), new.key_id());

    Ok(())
}

#[tokio::test]
async fn test_token_from_unpublished_signer_is_rejected() -> anyhow::Result<()> {
    let trusted = TokenSigner::new(Arc::new(RotatingKeyManager::with_defaults()));
    let untrusted = TokenSigner::new(Arc::new(RotatingKeyManager::with_defaults()));
    trusted.sign(&claims(600)).await?;

    let validator = validator_for(&trusted).await;
    let jwt = untrusted.sign(&claims(600)).await?;

    assert!(matches!(
        validator.validate(&jwt).await,
        Err(ValidationError::InvalidToken(_))
    ));

    Ok(())
}

#[tokio::test]
async fn test_round_trip_over_http() -> anyhow::Result<()> {
    let (signer, clock) = signer_with_clock();

    let before = signer.sign(&claims(3600)).await?;
    clock.advance(Duration::from_secs(51 * 60));
    let after = signer.sign(&claims(3600)).await?;

    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tenant-a/.well-known/jwks.json"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(publish_key_set(signer.key_manager()).await),
        )
        .mount(&mock_server)
        .await;

    let config = VerifierConfig::new(mock_server.uri()).with_namespace("tenant-a");
    let validator = AccessTokenValidator::from_config(&config)?;

    for _ in 0..3 {
        validator.validate(&before).await?;
        validator.validate(&after).await?;
    }

    // One fetch per key id, then served from cache
    let requests = mock_server.received_requests().await.unwrap_or_default();
    assert_eq!(requests.len(), 2);
    assert_eq!(validator.key_cache().len().await, 2);

    Ok(())
}
