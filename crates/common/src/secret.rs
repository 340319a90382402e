//! Secret types for protecting key material and raw tokens from accidental
//! logging.
//!
//! Re-exports the [`secrecy`] types used across the workspace. Private signing
//! keys are held as `SecretBox<Vec<u8>>` (PKCS#8 DER) and raw bearer tokens as
//! `SecretString`; both render as `[REDACTED]` under `{:?}` and are zeroized
//! on drop.
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct Presented {
//!     key_id: String,
//!     raw: SecretString,
//! }
//!
//! let presented = Presented {
//!     key_id: "k1".to_string(),
//!     raw: SecretString::from("eyJhbGciOi..."),
//! };
//!
//! assert!(!format!("{presented:?}").contains("eyJhbGciOi"));
//! assert_eq!(presented.raw.expose_secret(), "eyJhbGciOi...");
//! ```

pub use secrecy::{ExposeSecret, SecretBox, SecretString};

/// Wrap raw key bytes in a `SecretBox`.
#[must_use]
pub fn secret_bytes(bytes: Vec<u8>) -> SecretBox<Vec<u8>> {
    SecretBox::new(Box::new(bytes))
}

/// Clone a boxed byte secret.
///
/// `SecretBox<Vec<u8>>` is deliberately not `Clone`; this makes each copy of
/// private key material an explicit call site.
#[must_use]
pub fn clone_secret_bytes(secret: &SecretBox<Vec<u8>>) -> SecretBox<Vec<u8>> {
    secret_bytes(secret.expose_secret().clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_is_redacted() {
        let secret = SecretString::from("header.payload.signature");
        let debug_str = format!("{secret:?}");

        assert!(debug_str.contains("REDACTED"));
        assert!(!debug_str.contains("payload"));
    }

    #[test]
    fn test_secret_bytes_debug_is_redacted() {
        let secret = secret_bytes(vec![0xde, 0xad, 0xbe, 0xef]);
        let debug_str = format!("{secret:?}");

        assert!(debug_str.contains("REDACTED"));
        assert!(!debug_str.contains("222"));
    }

    #[test]
    fn test_clone_secret_bytes_preserves_value() {
        let secret = secret_bytes(vec![1, 2, 3]);
        let cloned = clone_secret_bytes(&secret);
        assert_eq!(cloned.expose_secret(), &vec![1, 2, 3]);
    }
}
