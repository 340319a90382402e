//! Rotation policy for the signing keys.

use std::collections::HashMap;
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Total validity of a freshly minted signing token.
pub const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(60 * 60);

/// How long before expiry a replacement token becomes current.
pub const DEFAULT_ROTATION_BUFFER: Duration = Duration::from_secs(10 * 60);

/// Longest accepted token lifetime (one year).
pub const MAX_TOKEN_LIFETIME: Duration = Duration::from_secs(365 * 24 * 60 * 60);

pub const TOKEN_LIFETIME_VAR: &str = "STS_TOKEN_LIFETIME_SECONDS";
pub const ROTATION_BUFFER_VAR: &str = "STS_ROTATION_BUFFER_SECONDS";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: String, value: String },

    #[error("Invalid rotation policy: {0}")]
    InvalidPolicy(String),
}

/// Token lifetime and rotation buffer, with `rotation_buffer < token_lifetime`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationConfig {
    token_lifetime: Duration,
    rotation_buffer: Duration,
}

impl RotationConfig {
    /// Validate and build a rotation policy.
    ///
    /// # Errors
    ///
    /// `ConfigError::InvalidPolicy` if the lifetime is zero or above
    /// [`MAX_TOKEN_LIFETIME`], or the buffer is not shorter than the lifetime.
    pub fn new(token_lifetime: Duration, rotation_buffer: Duration) -> Result<Self, ConfigError> {
        if token_lifetime.is_zero() {
            return Err(ConfigError::InvalidPolicy(
                "token lifetime must be positive".to_string(),
            ));
        }
        if token_lifetime > MAX_TOKEN_LIFETIME {
            return Err(ConfigError::InvalidPolicy(format!(
                "token lifetime {}s exceeds maximum {}s",
                token_lifetime.as_secs(),
                MAX_TOKEN_LIFETIME.as_secs()
            )));
        }
        if rotation_buffer >= token_lifetime {
            return Err(ConfigError::InvalidPolicy(format!(
                "rotation buffer {}s must be shorter than token lifetime {}s",
                rotation_buffer.as_secs(),
                token_lifetime.as_secs()
            )));
        }

        Ok(Self {
            token_lifetime,
            rotation_buffer,
        })
    }

    pub fn token_lifetime(&self) -> Duration {
        self.token_lifetime
    }

    pub fn rotation_buffer(&self) -> Duration {
        self.rotation_buffer
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing)
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let token_lifetime =
            parse_seconds(vars, TOKEN_LIFETIME_VAR)?.unwrap_or(DEFAULT_TOKEN_LIFETIME);
        let rotation_buffer =
            parse_seconds(vars, ROTATION_BUFFER_VAR)?.unwrap_or(DEFAULT_ROTATION_BUFFER);

        Self::new(token_lifetime, rotation_buffer)
    }
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            token_lifetime: DEFAULT_TOKEN_LIFETIME,
            rotation_buffer: DEFAULT_ROTATION_BUFFER,
        }
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

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RotationConfig::default();
        assert_eq!(config.token_lifetime(), Duration::from_secs(3600));
        assert_eq!(config.rotation_buffer(), Duration::from_secs(600));
        assert_eq!(RotationConfig::new(DEFAULT_TOKEN_LIFETIME, DEFAULT_ROTATION_BUFFER), Ok(config));
    }

    #[test]
    fn test_from_vars_empty_uses_defaults() {
        let config = RotationConfig::from_vars(&HashMap::new()).unwrap();
        assert_eq!(config, RotationConfig::default());
    }

    #[test]
    fn test_from_vars_overrides() {
        let vars = HashMap::from([
            (TOKEN_LIFETIME_VAR.to_string(), "120".to_string()),
            (ROTATION_BUFFER_VAR.to_string(), " 30 ".to_string()),
        ]);

        let config = RotationConfig::from_vars(&vars).expect("Config should load successfully");
        assert_eq!(config.token_lifetime(), Duration::from_secs(120));
        assert_eq!(config.rotation_buffer(), Duration::from_secs(30));
    }

    #[test]
    fn test_from_vars_rejects_non_numeric() {
        let vars = HashMap::from([(TOKEN_LIFETIME_VAR.to_string(), "1h".to_string())]);

        let result = RotationConfig::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidValue { name, .. }) if name == TOKEN_LIFETIME_VAR)
        );
    }

    #[test]
    fn test_buffer_must_be_shorter_than_lifetime() {
        let result = RotationConfig::new(Duration::from_secs(600), Duration::from_secs(600));
        assert!(matches!(result, Err(ConfigError::InvalidPolicy(_))));

        let vars = HashMap::from([(TOKEN_LIFETIME_VAR.to_string(), "300".to_string())]);
        assert!(RotationConfig::from_vars(&vars).is_err());
    }

    #[test]
    fn test_zero_lifetime_rejected() {
        assert!(RotationConfig::new(Duration::ZERO, Duration::ZERO).is_err());
    }

    #[test]
    fn test_zero_buffer_allowed() {
        let config = RotationConfig::new(Duration::from_secs(60), Duration::ZERO).unwrap();
        assert_eq!(config.rotation_buffer(), Duration::ZERO);
    }

    #[test]
    fn test_excessive_lifetime_rejected() {
        let result = RotationConfig::new(
            MAX_TOKEN_LIFETIME + Duration::from_secs(1),
            DEFAULT_ROTATION_BUFFER,
        );
        assert!(matches!(result, Err(ConfigError::InvalidPolicy(msg)) if msg.contains("exceeds maximum")));
    }
}
