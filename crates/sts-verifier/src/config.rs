//! Verifier configuration.

use common::jwt::{DEFAULT_GRACE_PERIOD, MAX_GRACE_PERIOD};
use std::collections::HashMap;
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Default timeout for a single key-set request.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Default freshness window for cached public keys.
pub const DEFAULT_KEY_CACHE_TTL: Duration = Duration::from_secs(60 * 60);

/// Path of the key-set document under an endpoint (and namespace).
pub const KEY_SET_PATH: &str = ".well-known/jwks.json";

pub const JWKS_ENDPOINT_VAR: &str = "STS_JWKS_ENDPOINT";
pub const KEY_NAMESPACE_VAR: &str = "STS_KEY_NAMESPACE";
pub const GRACE_PERIOD_VAR: &str = "STS_GRACE_PERIOD_SECONDS";
pub const HTTP_TIMEOUT_VAR: &str = "STS_JWKS_HTTP_TIMEOUT_SECONDS";
pub const KEY_CACHE_TTL_VAR: &str = "STS_KEY_CACHE_TTL_SECONDS";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: String, value: String },

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifierConfig {
    /// Base URL of the key-set authority.
    pub jwks_endpoint: String,

    /// Key group the tokens belong to. Empty means the endpoint's root set.
    pub namespace: String,

    /// Tolerance past `exp`. At most [`MAX_GRACE_PERIOD`].
    pub grace_period: Duration,

    pub http_timeout: Duration,

    /// `None` keeps cached keys for the process lifetime.
    pub key_cache_ttl: Option<Duration>,
}

impl VerifierConfig {
    /// Defaults for everything but the endpoint.
    pub fn new(jwks_endpoint: impl Into<String>) -> Self {
        Self {
            jwks_endpoint: jwks_endpoint.into(),
            namespace: String::new(),
            grace_period: DEFAULT_GRACE_PERIOD,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            key_cache_ttl: Some(DEFAULT_KEY_CACHE_TTL),
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Full URL of this namespace's key-set document.
    ///
    /// `{endpoint}/{namespace}/.well-known/jwks.json`, or
    /// `{endpoint}/.well-known/jwks.json` for the empty namespace.
    pub fn key_set_url(&self) -> String {
        let base = self.jwks_endpoint.trim_end_matches('/');
        let namespace = self.namespace.trim_matches('/');

        if namespace.is_empty() {
            format!("{base}/{KEY_SET_PATH}")
        } else {
            format!("{base}/{namespace}/{KEY_SET_PATH}")
        }
    }

    /// Check invariants not enforced by the type.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwks_endpoint.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                name: JWKS_ENDPOINT_VAR.to_string(),
                value: self.jwks_endpoint.clone(),
            });
        }
        if self.grace_period > MAX_GRACE_PERIOD {
            return Err(ConfigError::InvalidValue {
                name: GRACE_PERIOD_VAR.to_string(),
                value: self.grace_period.as_secs().to_string(),
            });
        }
        if self.http_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                name: HTTP_TIMEOUT_VAR.to_string(),
                value: "0".to_string(),
            });
        }
        Ok(())
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing)
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let jwks_endpoint = vars
            .get(JWKS_ENDPOINT_VAR)
            .ok_or_else(|| ConfigError::MissingEnvVar(JWKS_ENDPOINT_VAR.to_string()))?
            .clone();

        let mut config = Self::new(jwks_endpoint);

        if let Some(namespace) = vars.get(KEY_NAMESPACE_VAR) {
            config.namespace = namespace.clone();
        }
        if let Some(grace) = parse_seconds(vars, GRACE_PERIOD_VAR)? {
            config.grace_period = grace;
        }
        if let Some(timeout) = parse_seconds(vars, HTTP_TIMEOUT_VAR)? {
            config.http_timeout = timeout;
        }
        if let Some(ttl) = parse_seconds(vars, KEY_CACHE_TTL_VAR)? {
            config.key_cache_ttl = (!ttl.is_zero()).then_some(ttl);
        }

        config.validate()?;
        Ok(config)
    }
}

fn parse_seconds(
    vars: &HashMap<String, String>,
    name: &str,
) -> Result<Option<Duration>, ConfigError> {
    vars.get(name)
        .map(|raw| {
            raw.trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| ConfigError::InvalidValue {
                    name: name.to_string(),
                    value: raw.clone(),
                })
        })
        .transpose()
}
