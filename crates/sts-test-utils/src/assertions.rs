//! Custom assertions for compact JWTs
//!
//! Assertions decode without verifying; signature checks belong to the
//! verifier under test.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use common::jwt::TokenClaims;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct JwtHeader {
    alg: String,
    #[serde(default)]
    typ: Option<String>,
    #[serde(default)]
    kid: Option<String>,
}

fn header_of(token: &str) -> JwtHeader {
    let part = token.split('.').next().expect("Invalid JWT");
    let bytes = URL_SAFE_NO_PAD.decode(part).expect("Invalid JWT header");
    serde_json::from_slice(&bytes).expect("Failed to parse JWT header")
}

fn claims_of(token: &str) -> TokenClaims {
    let part = token.split('.').nth(1).expect("Invalid JWT");
    let bytes = URL_SAFE_NO_PAD.decode(part).expect("Invalid JWT payload");
    serde_json::from_slice(&bytes).expect("Failed to parse JWT claims")
}

/// Custom assertions for JWT strings
pub trait TokenAssertions {
    /// Three segments, decodable EdDSA header and claim set, non-empty signature.
    fn assert_valid_jwt(&self) -> &Self;

    fn assert_has_scope(&self, scope: &str) -> &Self;

    fn assert_signed_by(&self, key_id: &str) -> &Self;

    /// `exp` is within 5 seconds of `seconds` from now.
    fn assert_expires_in(&self, seconds: i64) -> &Self;

    fn assert_for_subject(&self, subject: &str) -> &Self;
}

impl TokenAssertions for String {
    fn assert_valid_jwt(&self) -> &Self {
        let parts: Vec<_> = self.split('.').collect();
        assert_eq!(
            parts.len(),
            3,
            "JWT must have 3 parts (header.payload.signature), got {}",
            parts.len()
        );

        let header = header_of(self);
        assert_eq!(header.alg, "EdDSA", "Expected EdDSA algorithm");
        assert_eq!(header.typ.as_deref(), Some("JWT"), "Expected JWT type");

        claims_of(self);

        assert!(!parts[2].is_empty(), "JWT signature segment is empty");

        self
    }

    fn assert_has_scope(&self, scope: &str) -> &Self {
        let claims = claims_of(self);
        assert!(
            claims.has_scope(scope),
            "Token does not contain scope '{}'. Available scopes: {:?}",
            scope,
            claims.scope
        );

        self
    }

    fn assert_signed_by(&self, key_id: &str) -> &Self {
        let header = header_of(self);
        assert_eq!(
            header.kid.as_deref(),
            Some(key_id),
            "Expected key_id '{}', got {:?}",
            key_id,
            header.kid
        );

        self
    }

    fn assert_expires_in(&self, seconds: i64) -> &Self {
        let claims = claims_of(self);
        let expires_in = claims.exp - chrono::Utc::now().timestamp();

        assert!(
            (expires_in - seconds).abs() <= 5,
            "Expected token to expire in {} seconds, but expires in {} seconds",
            seconds,
            expires_in
        );

        self
    }

    fn assert_for_subject(&self, subject: &str) -> &Self {
        let claims = claims_of(self);
        assert_eq!(
            claims.sub.as_deref(),
            Some(subject),
            "Expected subject '{}', got {:?}",
            subject,
            claims.sub
        );

        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unsigned(header: &str, payload: &str, sig: &str) -> String {
        format!(
            "{}.{}.{}",
            URL_SAFE_NO_PAD.encode(header.as_bytes()),
            URL_SAFE_NO_PAD.encode(payload.as_bytes()),
            sig
        )
    }

    #[test]
    fn test_assert_valid_jwt_with_valid_token() {
        let token = unsigned(
            r#"{"alg":"EdDSA","typ":"JWT","kid":"test-key-1"}"#,
            r#"{"sub":"svc","exp":9999999999,"iat":1234567890}"#,
            "fake_signature_for_testing",
        );

        token.assert_valid_jwt().assert_signed_by("test-key-1");
    }

    #[test]
    #[should_panic(expected = "JWT must have 3 parts")]
    fn test_assert_valid_jwt_with_invalid_structure() {
        "invalid.token".to_string().assert_valid_jwt();
    }

    #[test]
    #[should_panic(expected = "signature segment is empty")]
    fn test_assert_valid_jwt_rejects_unsigned() {
        unsigned(r#"{"alg":"EdDSA","typ":"JWT"}"#, r#"{"exp":1}"#, "").assert_valid_jwt();
    }

    #[test]
    #[should_panic(expected = "does not contain scope")]
    fn test_assert_has_scope_missing() {
        unsigned(
            r#"{"alg":"EdDSA","typ":"JWT"}"#,
            r#"{"exp":9999999999,"scope":"a:read"}"#,
            "sig",
        )
        .assert_has_scope("admin");
    }
}
