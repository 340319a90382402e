//! The validated token.

use chrono::{DateTime, Utc};
use common::jwt::TokenClaims;
use common::secret::SecretString;

/// Claims of a token that passed validation.
///
/// Only constructed by the validator. The raw token is kept as a
/// `SecretString` so it can be forwarded without showing up in `Debug`.
#[derive(Debug)]
pub struct AccessToken {
    key_id: String,
    claims: TokenClaims,
    raw: SecretString,
}

impl AccessToken {
    pub(crate) fn new(key_id: String, claims: TokenClaims, raw: &str) -> Self {
        Self {
            key_id,
            claims,
            raw: SecretString::from(raw.to_string()),
        }
    }

    /// Id of the key that signed this token.
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    pub fn issuer(&self) -> Option<&str> {
        self.claims.iss.as_deref()
    }

    pub fn subject(&self) -> Option<&str> {
        self.claims.sub.as_deref()
    }

    /// `jti` claim.
    pub fn token_id(&self) -> Option<&str> {
        self.claims.jti.as_deref()
    }

    /// `exp` as an instant. Saturates for timestamps chrono cannot represent.
    pub fn expiry(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.claims.exp, 0).unwrap_or(if self.claims.exp < 0 {
            DateTime::<Utc>::MIN_UTC
        } else {
            DateTime::<Utc>::MAX_UTC
        })
    }

    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        self.claims.iat.and_then(|iat| DateTime::from_timestamp(iat, 0))
    }

    pub fn scopes(&self) -> Vec<&str> {
        self.claims.scopes()
    }

    pub fn has_scope(&self, scope: &str) -> bool {
        self.claims.has_scope(scope)
    }

    /// A claim with no typed accessor, by name.
    pub fn claim(&self, name: &str) -> Option<&serde_json::Value> {
        self.claims.extra.get(name)
    }

    pub fn claims(&self) -> &TokenClaims {
        &self.claims
    }

    /// The token as presented, for forwarding to downstream services.
    pub fn sensitive_raw_token(&self) -> &SecretString {
        &self.raw
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use common::secret::ExposeSecret;

    fn token() -> AccessToken {
        let mut claims = TokenClaims::expiring_at(1_700_000_000)
            .with_issuer("https://sts.example")
            .with_subject("svc-payments")
            .with_scope("ledger:read ledger:write");
        claims.jti = Some("jti-1".to_string());
        claims.iat = Some(1_699_999_000);
        claims
            .extra
            .insert("tenant".to_string(), serde_json::json!("acme"));

        AccessToken::new("kid-1".to_string(), claims, "aaa.bbb.ccc")
    }

    #[test]
    fn test_accessors() {
        let token = token();

        assert_eq!(token.key_id(), "kid-1");
        assert_eq!(token.issuer(), Some("https://sts.example"));
        assert_eq!(token.subject(), Some("svc-payments"));
        assert_eq!(token.token_id(), Some("jti-1"));
        assert_eq!(token.expiry().timestamp(), 1_700_000_000);
        assert_eq!(token.issued_at().unwrap().timestamp(), 1_699_999_000);
        assert_eq!(token.scopes(), vec!["ledger:read", "ledger:write"]);
        assert!(token.has_scope("ledger:write"));
        assert!(!token.has_scope("ledger"));
        assert_eq!(token.claim("tenant"), Some(&serde_json::json!("acme")));
        assert_eq!(token.claim("missing"), None);
        assert_eq!(token.sensitive_raw_token().expose_secret(), "aaa.bbb.ccc");
    }

    #[test]
    fn test_debug_redacts_raw_token_and_subject() {
        let debug_str = format!("{:?}", token());

        assert!(!debug_str.contains("aaa.bbb.ccc"));
        assert!(!debug_str.contains("svc-payments"));
        assert!(debug_str.contains("kid-1"));
    }

    #[test]
    fn test_expiry_saturates() {
        let token = AccessToken::new(
            "k".to_string(),
            TokenClaims::expiring_at(i64::MAX),
            "a.b.c",
        );
        assert_eq!(token.expiry(), DateTime::<Utc>::MAX_UTC);
    }
}
