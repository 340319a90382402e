use common::jwt::JwtValidationError;
use thiserror::Error;

/// Failure resolving a key from the remote key set.
///
/// `Clone` so one coalesced fetch failure can be handed to every waiter.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KeySetError {
    /// Transport failure, non-2xx response, unparsable body, or unusable key
    /// parameters. Transient; callers may retry with backoff.
    #[error("Key set unavailable: {0}")]
    Unavailable(String),

    /// The key set does not contain the requested key id.
    #[error("Key not found: {0}")]
    KeyNotFound(String),
}

/// Why a token was rejected as invalid.
///
/// For logs and metric labels only; never shown to the token's presenter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvalidTokenReason {
    TooLarge,
    Malformed,
    MissingKid,
    MissingSignature,
    KeyUnresolved,
    AlgorithmMismatch,
    SignatureInvalid,
    MissingExpiry,
    NotYetValid,
}

impl InvalidTokenReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TooLarge => "too_large",
            Self::Malformed => "malformed",
            Self::MissingKid => "missing_kid",
            Self::MissingSignature => "missing_signature",
            Self::KeyUnresolved => "key_unresolved",
            Self::AlgorithmMismatch => "algorithm_mismatch",
            Self::SignatureInvalid => "signature_invalid",
            Self::MissingExpiry => "missing_expiry",
            Self::NotYetValid => "not_yet_valid",
        }
    }
}

/// Token validation failure.
///
/// Both variants display the same generic message so nothing about the
/// failure leaks to the caller's client.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// The token must not be trusted.
    #[error("The access token is invalid or expired")]
    InvalidToken(InvalidTokenReason),

    /// Well-formed and correctly signed, but past expiry beyond the grace
    /// period.
    #[error("The access token is invalid or expired")]
    ExpiredToken,
}

impl ValidationError {
    /// Rejection reason for `InvalidToken`.
    pub fn reason(&self) -> Option<InvalidTokenReason> {
        match self {
            Self::InvalidToken(reason) => Some(*reason),
            Self::ExpiredToken => None,
        }
    }

    /// Bounded label for the `error_category` metric.
    pub fn error_category(&self) -> &'static str {
        match self {
            Self::InvalidToken(reason) => reason.as_str(),
            Self::ExpiredToken => "expired",
        }
    }
}

impl From<JwtValidationError> for ValidationError {
    fn from(err: JwtValidationError) -> Self {
        match err {
            JwtValidationError::TokenTooLarge => Self::InvalidToken(InvalidTokenReason::TooLarge),
            JwtValidationError::MalformedToken => Self::InvalidToken(InvalidTokenReason::Malformed),
            JwtValidationError::MissingKid => Self::InvalidToken(InvalidTokenReason::MissingKid),
            JwtValidationError::MissingSignature => {
                Self::InvalidToken(InvalidTokenReason::MissingSignature)
            }
            JwtValidationError::NotYetValid => Self::InvalidToken(InvalidTokenReason::NotYetValid),
            JwtValidationError::Expired => Self::ExpiredToken,
        }
    }
}
