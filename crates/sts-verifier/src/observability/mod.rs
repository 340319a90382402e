//! Observability for the verifier.
//!
//! Tracing targets: `sts.verifier.resolver`, `sts.verifier.cache`,
//! `sts.verifier.validator`. Key ids and rejection reasons are safe to log;
//! raw tokens and claim contents never are.

pub mod metrics;

pub use metrics::{record_key_cache_lookup, record_key_set_fetch, record_token_validation};
