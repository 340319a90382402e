//! Common error types for service token components.

use thiserror::Error;

/// Errors raised while constructing shared key types.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SecurityTokenError {
    /// `valid_from` is not strictly before `valid_to`.
    #[error("Invalid validity window: valid_from must precede valid_to")]
    InvalidValidityWindow,

    /// Key material is missing, malformed, or of an unsupported type.
    #[error("Invalid key material: {0}")]
    InvalidKeyMaterial(String),
}

/// Result type alias using `SecurityTokenError`
pub type Result<T> = std::result::Result<T, SecurityTokenError>;
