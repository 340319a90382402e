//! Signing-key lifecycle.
//!
//! [`RotatingKeyManager`] guarantees a non-expired signing token whenever one
//! is requested. When the current token enters its rotation buffer a new one
//! is minted and the old one is demoted to *retained*: it is still advertised
//! for verification but never signs again. Retained tokens are dropped once
//! fully expired, on the next access rather than by a background timer.
//!
//! ```text
//! EMPTY --generate--> HAS_CURRENT --expiring soon--> HAS_CURRENT (old -> RETAINED)
//!                                                    RETAINED --expired--> dropped
//! ```

use crate::config::RotationConfig;
use crate::crypto::{Ed25519KeyPairGenerator, KeyPairGenerator};
use crate::errors::SignerError;
use crate::observability::metrics::{record_key_rotation, set_signing_keys};
use chrono::{DateTime, Utc};
use common::clock::{Clock, SystemClock};
use common::security_token::SecurityToken;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::instrument;

#[derive(Debug, Default)]
struct KeyState {
    current: Option<Arc<SecurityToken>>,
    /// Demoted tokens, oldest first.
    retained: Vec<Arc<SecurityToken>>,
}

impl KeyState {
    fn current_if_fresh(&self, config: &RotationConfig, now: DateTime<Utc>) -> Option<Arc<SecurityToken>> {
        self.current
            .as_ref()
            .filter(|token| !token.is_expiring_soon_at(config.rotation_buffer(), now))
            .map(Arc::clone)
    }

    fn prune(&mut self, now: DateTime<Utc>) {
        let before = self.retained.len();
        self.retained.retain(|token| !token.is_expired_at(now));

        let dropped = before - self.retained.len();
        if dropped > 0 {
            tracing::debug!(
                target: "sts.signer.rotation",
                dropped = dropped,
                retained = self.retained.len(),
                "Dropped expired retained signing keys"
            );
        }
    }

    fn unexpired(&self, now: DateTime<Utc>) -> Vec<Arc<SecurityToken>> {
        self.current
            .iter()
            .chain(self.retained.iter().rev())
            .filter(|token| !token.is_expired_at(now))
            .map(Arc::clone)
            .collect()
    }
}

/// Owns the signer-side key lifecycle.
///
/// `current_signing_token` calls are linearizable with respect to rotation:
/// rotation happens under the write lock, so concurrent callers observe either
/// the pre- or post-rotation token.
#[derive(Debug)]
pub struct RotatingKeyManager {
    config: RotationConfig,
    generator: Arc<dyn KeyPairGenerator>,
    clock: Arc<dyn Clock>,
    state: RwLock<KeyState>,
}

impl RotatingKeyManager {
    pub fn new(
        config: RotationConfig,
        generator: Arc<dyn KeyPairGenerator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            generator,
            clock,
            state: RwLock::new(KeyState::default()),
        }
    }

    /// Default policy, Ed25519 keys, system clock.
    pub fn with_defaults() -> Self {
        Self::with_config(RotationConfig::default())
    }

    /// Given policy, Ed25519 keys, system clock.
    pub fn with_config(config: RotationConfig) -> Self {
        Self::new(
            config,
            Arc::new(Ed25519KeyPairGenerator::new()),
            Arc::new(SystemClock),
        )
    }

    /// Policy from `STS_TOKEN_LIFETIME_SECONDS` / `STS_ROTATION_BUFFER_SECONDS`.
    pub fn from_env() -> Result<Self, SignerError> {
        Ok(Self::with_config(RotationConfig::from_env()?))
    }

    pub fn config(&self) -> &RotationConfig {
        &self.config
    }

    /// Token to sign new outgoing tokens with.
    ///
    /// Rotates first if there is no current token or it is within the
    /// rotation buffer of expiry.
    ///
    /// # Errors
    ///
    /// `SignerError::KeyGeneration` if a needed rotation could not generate a
    /// key. No token is returned in that case, not even the previous one.
    #[instrument(skip_all)]
    pub async fn current_signing_token(&self) -> Result<Arc<SecurityToken>, SignerError> {
        {
            let state = self.state.read().await;
            if let Some(token) = state.current_if_fresh(&self.config, self.clock.now()) {
                return Ok(token);
            }
        }

        let mut state = self.state.write().await;
        let now = self.clock.now();

        // Another caller may have rotated while we waited for the write lock
        if let Some(token) = state.current_if_fresh(&self.config, now) {
            return Ok(token);
        }

        let token = match self.mint(now) {
            Ok(token) => Arc::new(token),
            Err(e) => {
                record_key_rotation("error");
                tracing::error!(
                    target: "sts.signer.rotation",
                    error = %e,
                    "Signing key rotation failed"
                );
                return Err(e);
            }
        };

        let previous = state.current.replace(Arc::clone(&token));
        let previous_kid = previous.as_ref().map(|t| t.id().to_string());
        if let Some(previous) = previous {
            if !previous.is_expired_at(now) {
                state.retained.push(previous);
            }
        }
        state.prune(now);

        record_key_rotation("success");
        set_signing_keys(1 + state.retained.len());

        tracing::info!(
            target: "sts.signer.rotation",
            kid = %token.id(),
            previous_kid = ?previous_kid,
            valid_to = %token.valid_to(),
            retained = state.retained.len(),
            "Signing key rotated"
        );

        Ok(token)
    }

    /// Every token not yet past full expiry: current first, then retained
    /// tokens newest first.
    ///
    /// Never rotates. Expired retained tokens are dropped as a side effect.
    #[instrument(skip_all)]
    pub async fn all_tokens(&self) -> Vec<Arc<SecurityToken>> {
        let mut state = self.state.write().await;
        let now = self.clock.now();
        state.prune(now);

        let tokens = state.unexpired(now);
        set_signing_keys(tokens.len());
        tokens
    }

    fn mint(&self, now: DateTime<Utc>) -> Result<SecurityToken, SignerError> {
        let lifetime = chrono::Duration::from_std(self.config.token_lifetime())
            .map_err(|e| SignerError::KeyGeneration(format!("Invalid token lifetime: {}", e)))?;
        let valid_to = now
            .checked_add_signed(lifetime)
            .ok_or_else(|| SignerError::KeyGeneration("Validity window out of range".to_string()))?;

        let pair = self.generator.generate()?;

        SecurityToken::new(
            uuid::Uuid::new_v4().to_string(),
            now,
            valid_to,
            pair.public_key,
            Some(pair.private_key_pkcs8),
        )
        .map_err(|e| SignerError::KeyGeneration(format!("Invalid security token: {}", e)))
    }
}
