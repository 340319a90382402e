use crate::config::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SignerError {
    /// Key-pair generation failed. Fatal to the rotation attempt; the manager
    /// never falls back to a stale token.
    #[error("Key generation failed: {0}")]
    KeyGeneration(String),

    #[error("Token signing failed: {0}")]
    Signing(String),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),
}
