//! Test data builders for compact JWTs
//!
//! `TestTokenBuilder` produces tokens signed by a [`SecurityToken`] as well as
//! deliberately broken ones (unsigned, `alg: none`, forged signature) for
//! negative tests.

use crate::crypto_fixtures::FixtureError;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use common::jwt::{TokenClaims, SIGNING_ALGORITHM};
use common::secret::ExposeSecret;
use common::security_token::SecurityToken;
use jsonwebtoken::{EncodingKey, Header};

/// Builder for test JWTs
pub struct TestTokenBuilder {
    claims: TokenClaims,
    kid: Option<String>,
}

impl TestTokenBuilder {
    /// New builder: issued now, expiring in one hour.
    pub fn new() -> Self {
        let now = Utc::now().timestamp();
        let mut claims = TokenClaims::expiring_at(now + 3600)
            .with_issuer("test-issuer")
            .with_subject("test-subject");
        claims.iat = Some(now);

        Self { claims, kid: None }
    }

    pub fn for_subject(mut self, subject: &str) -> Self {
        self.claims.sub = Some(subject.to_string());
        self
    }

    pub fn issued_by(mut self, issuer: &str) -> Self {
        self.claims.iss = Some(issuer.to_string());
        self
    }

    pub fn with_scope(mut self, scope: &str) -> Self {
        self.claims.scope = Some(scope.to_string());
        self
    }

    pub fn with_token_id(mut self, jti: &str) -> Self {
        self.claims.jti = Some(jti.to_string());
        self
    }

    pub fn with_claim(mut self, name: &str, value: serde_json::Value) -> Self {
        self.claims.extra.insert(name.to_string(), value);
        self
    }

    /// Override the `kid` header. Defaults to the signing token's id.
    pub fn with_kid(mut self, kid: &str) -> Self {
        self.kid = Some(kid.to_string());
        self
    }

    /// Expire `seconds` from now. Negative values produce an already
    /// expired token.
    pub fn expires_in(mut self, seconds: i64) -> Self {
        self.claims.exp = Utc::now().timestamp() + seconds;
        self
    }

    pub fn expires_at(mut self, exp: i64) -> Self {
        self.claims.exp = exp;
        self
    }

    pub fn issued_at(mut self, iat: i64) -> Self {
        self.claims.iat = Some(iat);
        self
    }

    pub fn not_before(mut self, nbf: i64) -> Self {
        self.claims.nbf = Some(nbf);
        self
    }

    /// Claim set as it will be encoded.
    pub fn claims(&self) -> &TokenClaims {
        &self.claims
    }

    /// Sign with the token's private key.
    pub fn build_signed(self, signing: &SecurityToken) -> Result<String, FixtureError> {
        let private_key = signing
            .private_key()
            .ok_or_else(|| FixtureError::Crypto("token has no private key".to_string()))?;

        let mut header = Header::new(SIGNING_ALGORITHM);
        header.typ = Some("JWT".to_string());
        header.kid = Some(self.kid.unwrap_or_else(|| signing.id().to_string()));

        let key = EncodingKey::from_ed_der(private_key.expose_secret());
        jsonwebtoken::encode(&header, &self.claims, &key)
            .map_err(|e| FixtureError::Crypto(format!("Failed to sign test token: {e}")))
    }

    /// Well-formed EdDSA header naming `kid`, but an empty signature segment.
    pub fn build_unsigned(self, kid: &str) -> String {
        let header = serde_json::json!({"alg": "EdDSA", "typ": "JWT", "kid": kid});
        format!("{}.{}.", encode_json(&header), encode_json(&self.claims))
    }

    /// `alg: none` token, the classic unsecured JWT.
    pub fn build_alg_none(self) -> String {
        let header = match &self.kid {
            Some(kid) => serde_json::json!({"alg": "none", "typ": "JWT", "kid": kid}),
            None => serde_json::json!({"alg": "none", "typ": "JWT"}),
        };
        format!("{}.{}.", encode_json(&header), encode_json(&self.claims))
    }

    /// Correct header and claims with a signature that verifies under no key.
    pub fn build_with_forged_signature(self, kid: &str) -> String {
        let header = serde_json::json!({"alg": "EdDSA", "typ": "JWT", "kid": kid});
        let forged = URL_SAFE_NO_PAD.encode([0x5au8; 64]);
        format!(
            "{}.{}.{}",
            encode_json(&header),
            encode_json(&self.claims),
            forged
        )
    }
}

impl Default for TestTokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn encode_json<T: serde::Serialize>(value: &T) -> String {
    URL_SAFE_NO_PAD.encode(serde_json::to_vec(value).unwrap())
}
