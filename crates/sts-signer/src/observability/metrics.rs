//! Metrics definitions for the signer
//!
//! All metrics follow Prometheus naming conventions:
//! - `sts_` prefix
//! - `_total` suffix for counters
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `status`: 2 values (success, error)

use metrics::{counter, gauge};

// ============================================================================
// Key Management Metrics
// ============================================================================

/// Record key rotation attempt
///
/// Metric: `sts_key_rotation_total`
/// Labels: `status`
pub fn record_key_rotation(status: &str) {
    counter!("sts_key_rotation_total", "status" => status.to_string()).increment(1);
}

/// Update the number of keys advertised for verification (current + retained)
///
/// Metric: `sts_signing_keys`
pub fn set_signing_keys(count: usize) {
    gauge!("sts_signing_keys").set(count as f64);
}

// ============================================================================
// Token Metrics
// ============================================================================

/// Record token signing outcome
///
/// Metric: `sts_tokens_signed_total`
/// Labels: `status`
pub fn record_token_signed(status: &str) {
    counter!("sts_tokens_signed_total", "status" => status.to_string()).increment(1);
}
