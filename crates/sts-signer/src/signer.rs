use crate::crypto::sign_jwt;
use crate::errors::SignerError;
use crate::observability::metrics::record_token_signed;
use crate::rotation::RotatingKeyManager;
use common::secret::ExposeSecret;
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;

/// Signs outgoing service tokens with the manager's current key.
#[derive(Debug, Clone)]
pub struct TokenSigner {
    keys: Arc<RotatingKeyManager>,
}

impl TokenSigner {
    pub fn new(keys: Arc<RotatingKeyManager>) -> Self {
        Self { keys }
    }

    pub fn key_manager(&self) -> &Arc<RotatingKeyManager> {
        &self.keys
    }

    /// Sign `claims` as a compact JWT whose `kid` names the current key.
    ///
    /// # Errors
    ///
    /// - `SignerError::KeyGeneration` - rotation was due and failed
    /// - `SignerError::Signing` - the claim set could not be signed
    #[instrument(skip_all)]
    pub async fn sign<T: Serialize>(&self, claims: &T) -> Result<String, SignerError> {
        let result = self.sign_inner(claims).await;

        match &result {
            Ok(_) => record_token_signed("success"),
            Err(e) => {
                record_token_signed("error");
                tracing::warn!(target: "sts.signer.rotation", error = %e, "Token signing failed");
            }
        }

        result
    }

    async fn sign_inner<T: Serialize>(&self, claims: &T) -> Result<String, SignerError> {
        let token = self.keys.current_signing_token().await?;
        let private_key = token
            .private_key()
            .ok_or_else(|| SignerError::Signing("Signing key has no private half".to_string()))?;

        sign_jwt(claims, private_key.expose_secret(), token.id())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use common::jwt::{parse_header, TokenClaims};

    #[tokio::test]
    async fn test_sign_uses_current_key_id() {
        let keys = Arc::new(RotatingKeyManager::with_defaults());
        let signer = TokenSigner::new(Arc::clone(&keys));

        let claims = TokenClaims::expiring_at(chrono::Utc::now().timestamp() + 300)
            .with_issuer("sts-test");
        let jwt = signer.sign(&claims).await.unwrap();

        let current = keys.current_signing_token().await.unwrap();
        assert_eq!(parse_header(&jwt).unwrap().kid, current.id());
    }

    #[tokio::test]
    async fn test_sign_arbitrary_claims() {
        #[derive(Serialize)]
        struct Custom {
            exp: i64,
            tenant: &'static str,
        }

        let signer = TokenSigner::new(Arc::new(RotatingKeyManager::with_defaults()));
        let jwt = signer
            .sign(&Custom {
                exp: 4_102_444_800,
                tenant: "acme",
            })
            .await
            .unwrap();

        assert_eq!(jwt.split('.').count(), 3);
    }
}
