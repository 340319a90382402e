//! Common types shared by the signer and verifier halves of the service
//! token suite.

#![warn(clippy::pedantic)]

/// Module for common error types
pub mod error;

/// Module for common configuration
pub mod config;

/// Module for secret types that prevent accidental logging
pub mod secret;

/// Module for the injectable wall clock
pub mod clock;

/// Module for JWT utilities (header parsing, claims, constants)
pub mod jwt;

/// Module for JSON Web Key and key-set document types
pub mod jwks;

/// Module for the `SecurityToken` value type
pub mod security_token;

/// Module for tracing subscriber setup
pub mod observability;
