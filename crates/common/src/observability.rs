//! Tracing subscriber setup for services embedding the signer or verifier.
//!
//! Library code in this workspace only emits `tracing` events; installing a
//! subscriber is left to the embedding process, which calls [`init_tracing`]
//! once at startup.

use crate::config::ObservabilityConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `config.log_level` when set.
///
/// # Errors
///
/// Returns an error if a global subscriber has already been installed.
pub fn init_tracing(
    config: &ObservabilityConfig,
) -> Result<(), tracing_subscriber::util::TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));

    let registry = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_second_call_fails() {
        let config = ObservabilityConfig::default();

        // Another test in this binary may already have installed a subscriber,
        // so only the second call is asserted on.
        let _ = init_tracing(&config);
        assert!(init_tracing(&config).is_err());
    }
}
