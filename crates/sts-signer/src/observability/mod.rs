//! Observability for the signer.
//!
//! Tracing targets: `sts.signer.rotation`, `sts.signer.jwks`. Key ids are safe
//! to log; private key material and signed tokens never are.

pub mod metrics;

pub use metrics::{record_key_rotation, record_token_signed, set_signing_keys};
