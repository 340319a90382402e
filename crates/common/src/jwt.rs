//! JWT utilities shared by the signer and verifier.
//!
//! This module provides:
//! - Size limit for DoS prevention
//! - Grace period constants for expiry checks
//! - Header parsing (`kid`, `alg`, signature presence) without verification
//! - Deterministic expiry / not-before checks against an explicit `now`
//! - The claim set carried by service tokens
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - `alg: none` never parses; an empty signature segment is rejected outright
//! - Error messages are generic to prevent information leakage
//! - The `sub` field in `TokenClaims` is redacted in Debug output

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::Algorithm;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed JWT size in bytes (8KB).
///
/// Typical service tokens are 300-500 bytes. Anything larger than this is
/// rejected before base64 decoding or signature verification.
pub const MAX_JWT_SIZE_BYTES: usize = 8192; // 8KB

/// Default tolerance past a token's `exp` during which it is still accepted.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(300);

/// Upper bound on a configurable grace period (10 minutes).
pub const MAX_GRACE_PERIOD: Duration = Duration::from_secs(600);

/// The only signing algorithm issued or accepted.
pub const SIGNING_ALGORITHM: Algorithm = Algorithm::EdDSA;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while parsing or time-checking a JWT.
///
/// Display strings are intentionally generic. The variant itself is what
/// callers branch on and log.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtValidationError {
    /// Token size exceeds maximum allowed.
    #[error("The access token is invalid or expired")]
    TokenTooLarge,

    /// Token format is invalid (not a valid JWT structure).
    #[error("The access token is invalid or expired")]
    MalformedToken,

    /// Token is missing required `kid` header.
    #[error("The access token is invalid or expired")]
    MissingKid,

    /// Token has an empty signature segment.
    #[error("The access token is invalid or expired")]
    MissingSignature,

    /// Token `exp` is further in the past than the grace period allows.
    #[error("The access token is invalid or expired")]
    Expired,

    /// Token `nbf` is in the future.
    #[error("The access token is invalid or expired")]
    NotYetValid,
}

// =============================================================================
// Header
// =============================================================================

/// The parts of a JWT header needed before a key can be resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenHeader {
    /// Key id naming the signing key.
    pub kid: String,
    /// Declared signing algorithm.
    pub alg: Algorithm,
}

// =============================================================================
// Claims Types
// =============================================================================

/// Claim set carried by service tokens.
///
/// Only `exp` is required. Registered claims the verifier understands are
/// typed; everything else is kept in `extra` untouched.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenClaims {
    /// Issuer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    /// Subject (service identifier) - redacted in Debug output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// Expiration timestamp (Unix epoch seconds).
    pub exp: i64,

    /// Issued-at timestamp (Unix epoch seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    /// Not-before timestamp (Unix epoch seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,

    /// Token id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,

    /// Space-separated scopes granted to this token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    /// Remaining claims, opaque to this crate.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl fmt::Debug for TokenClaims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenClaims")
            .field("iss", &self.iss)
            .field("sub", &self.sub.as_ref().map(|_| "[REDACTED]"))
            .field("exp", &self.exp)
            .field("iat", &self.iat)
            .field("nbf", &self.nbf)
            .field("jti", &self.jti)
            .field("scope", &self.scope)
            .field("extra_claims", &self.extra.len())
            .finish()
    }
}

impl TokenClaims {
    /// Create a claim set with only an expiry.
    #[must_use]
    pub fn expiring_at(exp: i64) -> Self {
        Self {
            iss: None,
            sub: None,
            exp,
            iat: None,
            nbf: None,
            jti: None,
            scope: None,
            extra: serde_json::Map::new(),
        }
    }

    /// Set the issuer.
    #[must_use]
    pub fn with_issuer(mut self, iss: impl Into<String>) -> Self {
        self.iss = Some(iss.into());
        self
    }

    /// Set the subject.
    #[must_use]
    pub fn with_subject(mut self, sub: impl Into<String>) -> Self {
        self.sub = Some(sub.into());
        self
    }

    /// Set the space-separated scope string.
    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Check if the token has a specific scope.
    ///
    /// Scopes are space-separated in the JWT claims.
    #[must_use]
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes().contains(&scope)
    }

    /// Get all scopes as a vector.
    #[must_use]
    pub fn scopes(&self) -> Vec<&str> {
        self.scope
            .as_deref()
            .map(|s| s.split_whitespace().collect())
            .unwrap_or_default()
    }
}

// =============================================================================
// Functions
// =============================================================================

/// Parse the header of a JWT without verifying the signature.
///
/// # Security
///
/// - Token size is checked BEFORE any parsing
/// - The returned `kid` must only be used for lookup in a trusted key set
/// - The token MUST still be verified after fetching the key
///
/// # Errors
///
/// - `TokenTooLarge` - Token exceeds `MAX_JWT_SIZE_BYTES`
/// - `MalformedToken` - Not three segments, bad base64, bad JSON, or an
///   unknown / `none` algorithm
/// - `MissingKid` - `kid` absent, empty, or not a string
/// - `MissingSignature` - Signature segment is empty
pub fn parse_header(token: &str) -> Result<TokenHeader, JwtValidationError> {
    // Check token size first (DoS prevention)
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(JwtValidationError::TokenTooLarge);
    }

    // JWT format: header.payload.signature
    let parts: Vec<&str> = token.split('.').collect();
    let [header_part, _payload_part, signature_part] = parts.as_slice() else {
        tracing::debug!(
            target: "common.jwt",
            parts = parts.len(),
            "Token rejected: invalid JWT format"
        );
        return Err(JwtValidationError::MalformedToken);
    };

    let header_bytes = URL_SAFE_NO_PAD.decode(header_part).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to decode JWT header base64");
        JwtValidationError::MalformedToken
    })?;

    let header: serde_json::Value = serde_json::from_slice(&header_bytes).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to parse JWT header JSON");
        JwtValidationError::MalformedToken
    })?;

    let alg = header
        .get("alg")
        .and_then(|v| v.as_str())
        .and_then(|s| Algorithm::from_str(s).ok())
        .ok_or_else(|| {
            tracing::debug!(target: "common.jwt", "Token rejected: missing or unsupported alg");
            JwtValidationError::MalformedToken
        })?;

    // Extract kid as string, rejecting empty values
    let kid = header
        .get("kid")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .ok_or(JwtValidationError::MissingKid)?;

    if signature_part.is_empty() {
        tracing::debug!(target: "common.jwt", kid = %kid, "Token rejected: empty signature");
        return Err(JwtValidationError::MissingSignature);
    }

    Ok(TokenHeader { kid, alg })
}

/// Check `exp` against `now`, tolerating up to `grace_period` of lateness.
///
/// A token is expired when `now > exp + grace_period`. The boundary itself
/// is accepted.
///
/// # Errors
///
/// Returns `JwtValidationError::Expired` past the grace window.
pub fn check_expiry_at(
    exp: i64,
    grace_period: Duration,
    now: i64,
) -> Result<(), JwtValidationError> {
    let grace_secs = i64::try_from(grace_period.as_secs()).unwrap_or(i64::MAX);
    let deadline = exp.saturating_add(grace_secs);

    if now > deadline {
        tracing::debug!(
            target: "common.jwt",
            exp = exp,
            now = now,
            grace_secs = grace_secs,
            "Token rejected: expired beyond grace period"
        );
        return Err(JwtValidationError::Expired);
    }

    Ok(())
}

/// Check `nbf` against `now`. No tolerance is applied in this direction.
///
/// # Errors
///
/// Returns `JwtValidationError::NotYetValid` if `nbf` is after `now`.
pub fn check_not_before_at(nbf: Option<i64>, now: i64) -> Result<(), JwtValidationError> {
    match nbf {
        Some(nbf) if nbf > now => {
            tracing::debug!(
                target: "common.jwt",
                nbf = nbf,
                now = now,
                "Token rejected: not yet valid"
            );
            Err(JwtValidationError::NotYetValid)
        }
        _ => Ok(()),
    }
}

/// Decode an Ed25519 public key from a JWK `x` field (base64url, no padding).
///
/// # Errors
///
/// Returns `base64::DecodeError` if the content cannot be decoded.
pub fn decode_ed25519_public_key_jwk(x_b64url: &str) -> Result<Vec<u8>, base64::DecodeError> {
    URL_SAFE_NO_PAD.decode(x_b64url)
}

/// Encode raw Ed25519 public key bytes for a JWK `x` field.
#[must_use]
pub fn encode_ed25519_public_key_jwk(public_key: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(public_key)
}

// =============================================================================
// Tests
// =============================================================================
