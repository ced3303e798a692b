//! Signed tokens (compact HS256 JWS).
//!
//! Format: `base64url(header).base64url(claims).base64url(hmac)`, the same
//! shape JWT libraries produce, so tokens issued by the previous site remain
//! readable while they are valid.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Reset links expire after 15 minutes.
pub const RESET_TOKEN_TTL_SECS: i64 = 15 * 60;

/// Admin-record cookies last 180 days.
pub const ADMIN_RECORD_TTL_SECS: i64 = 180 * 24 * 60 * 60;

const MAX_TOKEN_LEN: usize = 4096;

/// What a token may be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TokenKind {
    Session,
    Reset,
    AdminRecord,
}

/// Token payload.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub typ: TokenKind,
    /// Account email.
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Only carried by admin-record tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
}

impl std::fmt::Debug for Claims {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Claims")
            .field("typ", &self.typ)
            .field("sub", &self.sub)
            .field("iat", &self.iat)
            .field("exp", &self.exp)
            .finish_non_exhaustive()
    }
}

impl Claims {
    fn new(typ: TokenKind, email: &str, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            typ,
            sub: email.to_string(),
            iat: now.timestamp(),
            exp: now.checked_add_signed(ttl).map_or(i64::MAX, |t| t.timestamp()),
            email: None,
            password_hash: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    typ: Option<String>,
}

/// Errors from token verification.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,

    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("signature mismatch")]
    BadSignature,

    #[error("expected a {expected:?} token, got {actual:?}")]
    WrongKind { expected: TokenKind, actual: TokenKind },

    #[error("token expired")]
    Expired,

    #[error("invalid signing key")]
    Key,

    #[error("claims encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Signs and verifies tokens with the site secret.
#[derive(Clone)]
pub struct TokenSigner {
    secret: SecretString,
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner").finish_non_exhaustive()
    }
}

impl TokenSigner {
    #[must_use]
    pub const fn new(secret: SecretString) -> Self {
        Self { secret }
    }

    fn mac(&self) -> Result<HmacSha256, TokenError> {
        HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes()).map_err(|_| TokenError::Key)
    }

    /// # Errors
    ///
    /// Returns `TokenError::Encoding` if the claims cannot be serialized.
    pub fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        let header = Header {
            alg: "HS256".to_string(),
            typ: Some("JWT".to_string()),
        };
        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header)?),
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims)?)
        );
        let mut mac = self.mac()?;
        mac.update(signing_input.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
        Ok(format!("{signing_input}.{signature}"))
    }

    /// Verify a token of the given kind against the current time.
    ///
    /// # Errors
    ///
    /// Returns a `TokenError` describing why the token was refused.
    pub fn verify(&self, token: &str, kind: TokenKind) -> Result<Claims, TokenError> {
        self.verify_at(token, kind, Utc::now())
    }

    /// # Errors
    ///
    /// Same as [`Self::verify`].
    pub fn verify_at(&self, token: &str, kind: TokenKind, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        if token.len() > MAX_TOKEN_LEN {
            return Err(TokenError::Malformed);
        }
        let mut parts = token.split('.');
        let (Some(header_part), Some(claims_part), Some(signature_part), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(TokenError::Malformed);
        };

        let header: Header = decode_part(header_part)?;
        if header.alg != "HS256" {
            return Err(TokenError::UnsupportedAlgorithm(header.alg));
        }

        let signature = URL_SAFE_NO_PAD
            .decode(signature_part)
            .map_err(|_| TokenError::Malformed)?;
        let mut mac = self.mac()?;
        mac.update(header_part.as_bytes());
        mac.update(b".");
        mac.update(claims_part.as_bytes());
        mac.verify_slice(&signature).map_err(|_| TokenError::BadSignature)?;

        let claims: Claims = decode_part(claims_part)?;
        if claims.typ != kind {
            return Err(TokenError::WrongKind {
                expected: kind,
                actual: claims.typ,
            });
        }
        if claims.sub.is_empty() {
            return Err(TokenError::Malformed);
        }
        if claims.exp <= now.timestamp() {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }

    /// # Errors
    ///
    /// Returns `TokenError::Encoding` if the claims cannot be serialized.
    pub fn issue_session(&self, email: &str, ttl: std::time::Duration, now: DateTime<Utc>) -> Result<String, TokenError> {
        let ttl = Duration::from_std(ttl).unwrap_or_else(|_| Duration::days(36_500));
        self.sign(&Claims::new(TokenKind::Session, email, now, ttl))
    }

    /// # Errors
    ///
    /// Returns `TokenError::Encoding` if the claims cannot be serialized.
    pub fn issue_reset(&self, email: &str, now: DateTime<Utc>) -> Result<String, TokenError> {
        let mut claims = Claims::new(TokenKind::Reset, email, now, Duration::seconds(RESET_TOKEN_TTL_SECS));
        claims.email = Some(email.to_string());
        self.sign(&claims)
    }

    /// Token remembering the admin account on the client, for deployments
    /// whose store does not persist the user list.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Encoding` if the claims cannot be serialized.
    pub fn issue_admin_record(&self, email: &str, password_hash: &str, now: DateTime<Utc>) -> Result<String, TokenError> {
        let mut claims = Claims::new(TokenKind::AdminRecord, email, now, Duration::seconds(ADMIN_RECORD_TTL_SECS));
        claims.email = Some(email.to_string());
        claims.password_hash = Some(password_hash.to_string());
        self.sign(&claims)
    }
}

fn decode_part<T: serde::de::DeserializeOwned>(part: &str) -> Result<T, TokenError> {
    let bytes = URL_SAFE_NO_PAD.decode(part).map_err(|_| TokenError::Malformed)?;
    serde_json::from_slice(&bytes).map_err(|_| TokenError::Malformed)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn signer() -> TokenSigner {
        TokenSigner::new(SecretString::from("k7Qp2vX9mL4sR8tY1wZ3nB6cF0hJ5dG2"))
    }

    #[test]
    fn test_session_roundtrip() {
        let now = Utc::now();
        let token = signer()
            .issue_session("a@b.com", std::time::Duration::from_secs(60), now)
            .unwrap();
        assert_eq!(token.split('.').count(), 3);
        let claims = signer().verify_at(&token, TokenKind::Session, now).unwrap();
        assert_eq!(claims.sub, "a@b.com");
        assert_eq!(claims.exp - claims.iat, 60);
    }

    #[test]
    fn test_expiry() {
        let now = Utc::now();
        let token = signer().issue_reset("a@b.com", now).unwrap();
        assert!(signer().verify_at(&token, TokenKind::Reset, now + Duration::minutes(14)).is_ok());
        assert!(matches!(
            signer().verify_at(&token, TokenKind::Reset, now + Duration::minutes(16)),
            Err(TokenError::Expired)
        ));
    }

    #[test]
    fn test_kind_is_enforced() {
        let now = Utc::now();
        let reset = signer().issue_reset("a@b.com", now).unwrap();
        assert!(matches!(
            signer().verify_at(&reset, TokenKind::Session, now),
            Err(TokenError::WrongKind { .. })
        ));
    }

    #[test]
    fn test_tampering_is_detected() {
        let now = Utc::now();
        let token = signer()
            .issue_session("a@b.com", std::time::Duration::from_secs(60), now)
            .unwrap();
        let parts: Vec<&str> = token.split('.').collect();

        let forged_claims = URL_SAFE_NO_PAD.encode(
            serde_json::to_vec(&Claims::new(TokenKind::Session, "evil@b.com", now, Duration::hours(1))).unwrap(),
        );
        let forged = format!("{}.{}.{}", parts[0], forged_claims, parts[2]);
        assert!(matches!(
            signer().verify_at(&forged, TokenKind::Session, now),
            Err(TokenError::BadSignature)
        ));

        let other = TokenSigner::new(SecretString::from("another-secret-value-for-testing-0123"));
        assert!(matches!(
            other.verify_at(&token, TokenKind::Session, now),
            Err(TokenError::BadSignature)
        ));
    }

    #[test]
    fn test_alg_none_rejected() {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none"}"#);
        let token = format!("{header}.e30.");
        assert!(matches!(
            signer().verify(&token, TokenKind::Session),
            Err(TokenError::UnsupportedAlgorithm(_))
        ));
        assert!(matches!(signer().verify("abc", TokenKind::Session), Err(TokenError::Malformed)));
        assert!(matches!(signer().verify("a.b.c.d", TokenKind::Session), Err(TokenError::Malformed)));
    }

    #[test]
    fn test_admin_record_carries_hash() {
        let now = Utc::now();
        let token = signer().issue_admin_record("a@b.com", "$2b$10$hash", now).unwrap();
        let claims = signer().verify_at(&token, TokenKind::AdminRecord, now).unwrap();
        assert_eq!(claims.password_hash.as_deref(), Some("$2b$10$hash"));
        assert!(!format!("{claims:?}").contains("$2b$"));
    }

    #[test]
    fn test_kind_wire_names() {
        assert_eq!(serde_json::to_string(&TokenKind::AdminRecord).unwrap(), r#""admin-record""#);
        assert_eq!(serde_json::to_string(&TokenKind::Session).unwrap(), r#""session""#);
    }
}
