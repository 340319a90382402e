//! Access token validation.
//!
//! Validates incoming service tokens using public keys resolved through a
//! [`PublicKeyCache`].
//!
//! # Pipeline
//!
//! Ordered; the first failing step rejects the token:
//!
//! 1. Parse - size limit, three segments, `alg`, non-empty `kid` and signature
//! 2. Resolve key - any resolver failure is `InvalidToken`
//! 3. Verify signature - declared `alg` must match the key
//! 4. Time - `nbf` strictly, `exp` with the grace period
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - Unsigned tokens never reach key resolution
//! - Only EdDSA (Ed25519) is accepted
//! - Errors shown to callers are generic; the reason is for logs and metrics

use crate::access_token::AccessToken;
use crate::cache::PublicKeyCache;
use crate::config::{ConfigError, VerifierConfig};
use crate::errors::{InvalidTokenReason, KeySetError, ValidationError};
use crate::observability::metrics::record_token_validation;
use crate::resolver::HttpKeySetResolver;
use common::clock::{Clock, SystemClock};
use common::jwks::PublicKey;
use common::jwt::{
    check_expiry_at, check_not_before_at, parse_header, TokenClaims, MAX_GRACE_PERIOD,
};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Validation};
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

/// Verification pipeline for presented service tokens.
pub struct AccessTokenValidator {
    keys: Arc<PublicKeyCache>,
    grace_period: Duration,
    clock: Arc<dyn Clock>,
}

impl AccessTokenValidator {
    /// Create a validator.
    ///
    /// `grace_period` above [`MAX_GRACE_PERIOD`] is clamped.
    pub fn new(keys: Arc<PublicKeyCache>, grace_period: Duration, clock: Arc<dyn Clock>) -> Self {
        let grace_period = if grace_period > MAX_GRACE_PERIOD {
            tracing::warn!(
                target: "sts.verifier.validator",
                requested_secs = grace_period.as_secs(),
                max_secs = MAX_GRACE_PERIOD.as_secs(),
                "Grace period clamped to maximum"
            );
            MAX_GRACE_PERIOD
        } else {
            grace_period
        };

        Self {
            keys,
            grace_period,
            clock,
        }
    }

    /// HTTP resolver, cache and grace period from `config`, system clock.
    ///
    /// # Errors
    ///
    /// `ConfigError` if `config` fails validation or the HTTP client cannot
    /// be built.
    pub fn from_config(config: &VerifierConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let resolver = Arc::new(HttpKeySetResolver::new(config)?);
        let keys = Arc::new(PublicKeyCache::new(
            resolver,
            Arc::clone(&clock),
            config.key_cache_ttl,
        ));

        Ok(Self::new(keys, config.grace_period, clock))
    }

    pub fn grace_period(&self) -> Duration {
        self.grace_period
    }

    pub fn key_cache(&self) -> &Arc<PublicKeyCache> {
        &self.keys
    }

    /// Validate a token and return its claims.
    ///
    /// # Errors
    ///
    /// - `ValidationError::InvalidToken` - the token must not be trusted
    /// - `ValidationError::ExpiredToken` - past `exp` by more than the grace
    ///   period
    #[instrument(skip_all)]
    pub async fn validate(&self, token: &str) -> Result<AccessToken, ValidationError> {
        let result = self.run_pipeline(token).await;

        match &result {
            Ok(access_token) => {
                record_token_validation("success", None);
                tracing::debug!(
                    target: "sts.verifier.validator",
                    kid = %access_token.key_id(),
                    "Token validated successfully"
                );
            }
            Err(e) => {
                record_token_validation("error", Some(e.error_category()));
                tracing::debug!(
                    target: "sts.verifier.validator",
                    error_category = e.error_category(),
                    "Token rejected"
                );
            }
        }

        result
    }

    async fn run_pipeline(&self, token: &str) -> Result<AccessToken, ValidationError> {
        // 1. Parse header (includes size check and unsigned rejection)
        let header = parse_header(token)?;

        // 2. Resolve the signing key
        let key = self.keys.get_public_key(&header.kid).await.map_err(|e| {
            match &e {
                KeySetError::Unavailable(_) => tracing::warn!(
                    target: "sts.verifier.validator",
                    kid = %header.kid,
                    error = %e,
                    "Signing key unresolvable: key set unavailable"
                ),
                KeySetError::KeyNotFound(_) => tracing::debug!(
                    target: "sts.verifier.validator",
                    kid = %header.kid,
                    "Signing key unresolvable: unknown kid"
                ),
            }
            ValidationError::InvalidToken(InvalidTokenReason::KeyUnresolved)
        })?;

        // 3. Verify signature
        if header.alg != key.algorithm() {
            tracing::debug!(
                target: "sts.verifier.validator",
                kid = %header.kid,
                alg = ?header.alg,
                "Token algorithm does not match key"
            );
            return Err(ValidationError::InvalidToken(
                InvalidTokenReason::AlgorithmMismatch,
            ));
        }
        let claims = verify_signature(token, &key)?;

        // 4. Time checks against our clock
        let now = self.clock.now().timestamp();
        check_not_before_at(claims.nbf, now)?;
        check_expiry_at(claims.exp, self.grace_period, now)?;

        Ok(AccessToken::new(header.kid, claims, token))
    }
}

/// Verify the signature and decode the claims. Time claims are left to the
/// caller so the grace period applies.
fn verify_signature(token: &str, key: &PublicKey) -> Result<TokenClaims, ValidationError> {
    let mut validation = Validation::new(key.algorithm());
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;

    let token_data = decode::<TokenClaims>(token, &key.decoding_key(), &validation).map_err(|e| {
        tracing::debug!(target: "sts.verifier.validator", error = %e, "Token verification failed");
        let reason = match e.kind() {
            ErrorKind::InvalidSignature => InvalidTokenReason::SignatureInvalid,
            ErrorKind::InvalidAlgorithm => InvalidTokenReason::AlgorithmMismatch,
            ErrorKind::MissingRequiredClaim(_) => InvalidTokenReason::MissingExpiry,
            _ => InvalidTokenReason::Malformed,
        };
        ValidationError::InvalidToken(reason)
    })?;

    Ok(token_data.claims)
}
