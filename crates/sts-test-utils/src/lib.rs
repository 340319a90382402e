//! # STS Test Utilities
//!
//! Shared test utilities for the service-token signer and verifier.
//!
//! This crate provides:
//! - Deterministic crypto fixtures (fixed Ed25519 keys for reproducible tests)
//! - Security token fixtures (active, expiring, expired, public-only)
//! - Test data builders (`TestTokenBuilder` for signed and unsigned JWTs)
//! - Custom assertions (`TokenAssertions` trait)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use sts_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let signing = create_active_token(1, chrono::Utc::now())?;
//!
//!     let jwt = TestTokenBuilder::new()
//!         .for_subject("billing")
//!         .with_scope("invoices:read")
//!         .build_signed(&signing)?;
//!
//!     jwt.assert_valid_jwt()
//!         .assert_signed_by(signing.id())
//!         .assert_has_scope("invoices:read");
//! }
//! ```

pub mod assertions;
pub mod crypto_fixtures;
pub mod token_builders;

// Re-export commonly used items
pub use assertions::*;
pub use crypto_fixtures::*;
pub use token_builders::*;
