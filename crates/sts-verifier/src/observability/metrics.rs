//! Metrics definitions for the verifier
//!
//! All metrics follow Prometheus naming conventions:
//! - `sts_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `status`: 2 values (success, error)
//! - `error_category`: 11 values (the invalid-token reasons, expired, none)
//! - `result`: 3 values (hit, miss, coalesced)

use metrics::{counter, histogram};
use std::time::Duration;

// ============================================================================
// Validation Metrics
// ============================================================================

/// Record token validation result
///
/// Metric: `sts_token_validations_total`
/// Labels: `status`, `error_category`
pub fn record_token_validation(status: &str, error_category: Option<&str>) {
    let category = error_category.unwrap_or("none");
    counter!("sts_token_validations_total", "status" => status.to_string(), "error_category" => category.to_string())
        .increment(1);
}

// ============================================================================
// Key Resolution Metrics
// ============================================================================

/// Record public key cache lookup
///
/// Metric: `sts_key_cache_lookups_total`
/// Labels: `result`
pub fn record_key_cache_lookup(result: &str) {
    counter!("sts_key_cache_lookups_total", "result" => result.to_string()).increment(1);
}

/// Record remote key-set fetch duration and outcome
///
/// Metric: `sts_key_set_fetch_duration_seconds`, `sts_key_set_fetches_total`
/// Labels: `status`
pub fn record_key_set_fetch(status: &str, duration: Duration) {
    histogram!("sts_key_set_fetch_duration_seconds", "status" => status.to_string())
        .record(duration.as_secs_f64());

    counter!("sts_key_set_fetches_total", "status" => status.to_string()).increment(1);
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use metrics_util::debugging::{DebugValue, DebuggingRecorder};

    #[test]
    fn test_record_functions_without_recorder() {
        record_token_validation("success", None);
        record_token_validation("error", Some("expired"));
        record_key_cache_lookup("hit");
        record_key_set_fetch("error", Duration::from_millis(12));
    }

    #[test]
    fn test_validation_counter_labels() {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();

        metrics::with_local_recorder(&recorder, || {
            record_token_validation("success", None);
            record_token_validation("error", Some("signature_invalid"));
            record_token_validation("error", Some("signature_invalid"));
        });

        let snapshot = snapshotter.snapshot().into_vec();
        let invalid = snapshot
            .iter()
            .find(|(key, _, _, _)| {
                key.key().name() == "sts_token_validations_total"
                    && key
                        .key()
                        .labels()
                        .any(|l| l.key() == "error_category" && l.value() == "signature_invalid")
            })
            .expect("error counter recorded");
        assert!(matches!(invalid.3, DebugValue::Counter(2)));

        assert!(snapshot.iter().any(|(key, _, _, _)| {
            key.key().name() == "sts_token_validations_total"
                && key.key().labels().any(|l| l.value() == "none")
        }));
    }

    #[test]
    fn test_fetch_records_histogram_and_counter() {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();

        metrics::with_local_recorder(&recorder, || {
            record_key_set_fetch("success", Duration::from_millis(40));
            record_key_cache_lookup("coalesced");
        });

        let names: Vec<String> = snapshotter
            .snapshot()
            .into_vec()
            .iter()
            .map(|(key, _, _, _)| key.key().name().to_string())
            .collect();

        assert!(names.contains(&"sts_key_set_fetch_duration_seconds".to_string()));
        assert!(names.contains(&"sts_key_set_fetches_total".to_string()));
        assert!(names.contains(&"sts_key_cache_lookups_total".to_string()));
    }
}
