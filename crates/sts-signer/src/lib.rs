//! Service Token Signer Library
//!
//! Signer half of service-to-service authentication: keeps a rotating set of
//! Ed25519 signing keys, signs outgoing tokens with the current one, and
//! publishes the public halves for verifiers.
//!
//! # Modules
//!
//! - `config` - Rotation policy (token lifetime, rotation buffer)
//! - `crypto` - Key-pair generation and JWT signing
//! - `errors` - Error types
//! - `jwks` - Key-set publication
//! - `rotation` - `RotatingKeyManager`
//! - `signer` - `TokenSigner`

pub mod config;
pub mod crypto;
pub mod errors;
pub mod jwks;
pub mod observability;
pub mod rotation;
pub mod signer;

pub use config::RotationConfig;
pub use errors::SignerError;
pub use jwks::publish_key_set;
pub use rotation::RotatingKeyManager;
pub use signer::TokenSigner;
