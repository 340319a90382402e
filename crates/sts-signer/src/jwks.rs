//! Key-set publication.
//!
//! Builds the RFC 7517 document verifiers fetch. Only public projections are
//! included; the private half never leaves the manager.

use crate::rotation::RotatingKeyManager;
use common::jwks::JsonWebKeySet;
use tracing::instrument;

/// Key set advertising every token from [`RotatingKeyManager::all_tokens`].
///
/// Publishing does not rotate. Call `current_signing_token` first if the
/// document must contain a key even before anything has been signed.
#[instrument(skip_all)]
pub async fn publish_key_set(keys: &RotatingKeyManager) -> JsonWebKeySet {
    let keys: Vec<_> = keys
        .all_tokens()
        .await
        .iter()
        .map(|token| token.public_only().to_jwk())
        .collect();

    tracing::debug!(target: "sts.signer.jwks", key_count = keys.len(), "Published key set");

    JsonWebKeySet { keys }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use common::jwks::PublicKey;

    #[tokio::test]
    async fn test_empty_manager_publishes_empty_set() {
        let keys = RotatingKeyManager::with_defaults();
        assert!(publish_key_set(&keys).await.keys.is_empty());
    }

    #[tokio::test]
    async fn test_published_key_matches_current_token() {
        let keys = RotatingKeyManager::with_defaults();
        let current = keys.current_signing_token().await.unwrap();

        let set = publish_key_set(&keys).await;
        assert_eq!(set.keys.len(), 1);

        let jwk = set.find(current.id()).unwrap();
        assert_eq!(jwk.key_use.as_deref(), Some("sig"));

        let key = PublicKey::try_from(jwk).unwrap();
        assert_eq!(key.key_bytes(), current.public_key());

        let json = serde_json::to_string(&set).unwrap();
        assert!(!json.contains("private"));
        assert!(!json.contains("\"d\""));
    }
}
