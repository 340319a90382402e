//! Service Token Verifier Library
//!
//! Verifier half of service-to-service authentication: resolves a token's
//! key id against a remote key-set document, caches the resulting public
//! keys, and validates signature and expiry with a grace period.
//!
//! # Modules
//!
//! - `access_token` - The validated token
//! - `cache` - `PublicKeyCache` with request coalescing
//! - `config` - Verifier configuration
//! - `errors` - Error types
//! - `resolver` - `KeySetResolver` trait, HTTP implementation and mock
//! - `validator` - `AccessTokenValidator`

pub mod access_token;
pub mod cache;
pub mod config;
pub mod errors;
pub mod observability;
pub mod resolver;
pub mod validator;

pub use access_token::AccessToken;
pub use cache::PublicKeyCache;
pub use config::VerifierConfig;
pub use errors::{InvalidTokenReason, KeySetError, ValidationError};
pub use resolver::{HttpKeySetResolver, KeySetResolver};
pub use validator::AccessTokenValidator;
