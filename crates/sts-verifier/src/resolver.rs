//! Remote key-set resolution.
//!
//! A [`KeySetResolver`] is a pure, possibly slow accessor for one namespace's
//! published keys. It does no caching; see [`crate::cache::PublicKeyCache`].

use crate::config::{ConfigError, VerifierConfig};
use crate::errors::KeySetError;
use crate::observability::metrics::record_key_set_fetch;
use async_trait::async_trait;
use common::jwks::{JsonWebKeySet, PublicKey};
use std::time::{Duration, Instant};
use tracing::instrument;

/// Source of a namespace's public keys.
#[async_trait]
pub trait KeySetResolver: Send + Sync {
    /// Key group this resolver serves.
    fn namespace(&self) -> &str;

    /// Fetch the full key set.
    async fn fetch_key_set(&self) -> Result<JsonWebKeySet, KeySetError>;

    /// Fetch one key. The default filters a full fetch.
    async fn fetch_key(&self, kid: &str) -> Result<PublicKey, KeySetError> {
        let set = self.fetch_key_set().await?;
        key_from_set(&set, kid)
    }
}

/// Extract `kid` from a key set as a usable verification key.
///
/// # Errors
///
/// - `KeyNotFound` - no entry with this id
/// - `Unavailable` - the entry exists but its parameters are unusable
pub fn key_from_set(set: &JsonWebKeySet, kid: &str) -> Result<PublicKey, KeySetError> {
    let jwk = set
        .find(kid)
        .ok_or_else(|| KeySetError::KeyNotFound(kid.to_string()))?;

    PublicKey::try_from(jwk).map_err(|e| {
        tracing::warn!(target: "sts.verifier.resolver", kid = %kid, error = %e, "Unusable key in key set");
        KeySetError::Unavailable(format!("unusable key {kid}: {e}"))
    })
}

/// Fetches the key-set document over HTTP.
#[derive(Debug, Clone)]
pub struct HttpKeySetResolver {
    url: String,
    namespace: String,
    http_client: reqwest::Client,
}

impl HttpKeySetResolver {
    /// Resolver for `config.key_set_url()` with `config.http_timeout`.
    ///
    /// # Errors
    ///
    /// `ConfigError::HttpClient` if the HTTP client cannot be built.
    pub fn new(config: &VerifierConfig) -> Result<Self, ConfigError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(|e| {
                tracing::error!(target: "sts.verifier.resolver", error = %e, "Failed to build HTTP client");
                ConfigError::HttpClient(e.to_string())
            })?;

        Ok(Self::with_client(
            config.key_set_url(),
            config.namespace.clone(),
            http_client,
        ))
    }

    /// Resolver for an exact document URL with a caller-supplied client.
    pub fn with_client(
        url: impl Into<String>,
        namespace: impl Into<String>,
        http_client: reqwest::Client,
    ) -> Self {
        Self {
            url: url.into(),
            namespace: namespace.into(),
            http_client,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn fetch(&self) -> Result<JsonWebKeySet, KeySetError> {
        let response = self.http_client.get(&self.url).send().await.map_err(|e| {
            tracing::error!(target: "sts.verifier.resolver", url = %self.url, error = %e, "Failed to fetch key set");
            KeySetError::Unavailable(if e.is_timeout() {
                "key set request timed out".to_string()
            } else {
                "key set request failed".to_string()
            })
        })?;

        if !response.status().is_success() {
            tracing::error!(
                target: "sts.verifier.resolver",
                url = %self.url,
                status = %response.status(),
                "Key set endpoint returned error"
            );
            return Err(KeySetError::Unavailable(format!(
                "key set endpoint returned {}",
                response.status()
            )));
        }

        response.json::<JsonWebKeySet>().await.map_err(|e| {
            tracing::error!(target: "sts.verifier.resolver", url = %self.url, error = %e, "Failed to parse key set response");
            KeySetError::Unavailable("key set response unparsable".to_string())
        })
    }
}

#[async_trait]
impl KeySetResolver for HttpKeySetResolver {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    #[instrument(skip_all, fields(namespace = %self.namespace))]
    async fn fetch_key_set(&self) -> Result<JsonWebKeySet, KeySetError> {
        tracing::debug!(target: "sts.verifier.resolver", url = %self.url, "Fetching key set");

        let start = Instant::now();
        let result = self.fetch().await;
        let elapsed: Duration = start.elapsed();

        match &result {
            Ok(set) => {
                record_key_set_fetch("success", elapsed);
                tracing::info!(
                    target: "sts.verifier.resolver",
                    key_count = set.keys.len(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Key set fetched"
                );
            }
            Err(_) => record_key_set_fetch("error", elapsed),
        }

        result
    }
}

/// Mock key-set resolver for testing.
///
/// Serves an in-memory key set, counts fetches, and can hold fetches open
/// (gating) or fail them on demand.
pub mod mock {
    use super::*;
    use common::security_token::SecurityToken;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Mutex, PoisonError};
    use tokio::sync::watch;

    pub struct MockKeySetResolver {
        namespace: String,
        keys: Mutex<JsonWebKeySet>,
        failure: Mutex<Option<KeySetError>>,
        fetch_count: AtomicUsize,
        gate: watch::Sender<bool>,
    }

    impl MockKeySetResolver {
        /// Empty key set, gate open.
        pub fn new(namespace: &str) -> Self {
            Self::with_key_set(namespace, JsonWebKeySet::default())
        }

        pub fn with_key_set(namespace: &str, keys: JsonWebKeySet) -> Self {
            let (gate, _) = watch::channel(true);
            Self {
                namespace: namespace.to_string(),
                keys: Mutex::new(keys),
                failure: Mutex::new(None),
                fetch_count: AtomicUsize::new(0),
                gate,
            }
        }

        /// Serve the public projections of `tokens`.
        pub fn with_tokens(namespace: &str, tokens: &[SecurityToken]) -> Self {
            let keys = tokens.iter().map(|t| t.public_only().to_jwk()).collect();
            Self::with_key_set(namespace, JsonWebKeySet { keys })
        }

        /// Create a mock whose fetches block until [`Self::open_gate`].
        pub fn gated(namespace: &str, keys: JsonWebKeySet) -> Self {
            let mock = Self::with_key_set(namespace, keys);
            mock.close_gate();
            mock
        }

        pub fn set_key_set(&self, keys: JsonWebKeySet) {
            *self.keys.lock().unwrap_or_else(PoisonError::into_inner) = keys;
        }

        /// Fail every fetch with `error` until [`Self::clear_failure`].
        pub fn fail_with(&self, error: KeySetError) {
            *self.failure.lock().unwrap_or_else(PoisonError::into_inner) = Some(error);
        }

        pub fn clear_failure(&self) {
            *self.failure.lock().unwrap_or_else(PoisonError::into_inner) = None;
        }

        pub fn close_gate(&self) {
            self.gate.send_replace(false);
        }

        pub fn open_gate(&self) {
            self.gate.send_replace(true);
        }

        /// Number of fetches started (including ones still held at the gate).
        pub fn fetch_count(&self) -> usize {
            self.fetch_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl KeySetResolver for MockKeySetResolver {
        fn namespace(&self) -> &str {
            &self.namespace
        }

        async fn fetch_key_set(&self) -> Result<JsonWebKeySet, KeySetError> {
            self.fetch_count.fetch_add(1, Ordering::SeqCst);

            let mut gate = self.gate.subscribe();
            if gate.wait_for(|open| *open).await.is_err() {
                return Err(KeySetError::Unavailable("mock gate dropped".to_string()));
            }

            if let Some(error) = self
                .failure
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
            {
                return Err(error);
            }

            Ok(self
                .keys
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone())
        }
    }

}
