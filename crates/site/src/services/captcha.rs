//! Captcha verification over the siteverify protocol shared by Cloudflare
//! Turnstile and hCaptcha.
//!
//! Fails closed: a missing secret, an empty token, a network failure or an
//! unreadable reply all reject the request. Only `CAPTCHA_BYPASS` accepts.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;

use crate::config::CaptchaConfig;

const VERIFY_TIMEOUT: Duration = Duration::from_secs(10);

/// Reasons a verification call could not produce an answer.
#[derive(Debug, Error)]
pub enum CaptchaError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("verifier returned status {0}")]
    Status(u16),
}

#[derive(Debug, Deserialize)]
struct VerifyResponse {
    #[serde(default)]
    success: bool,
    #[serde(default, rename = "error-codes")]
    error_codes: Vec<String>,
}

/// Verifies captcha tokens against one provider's siteverify endpoint.
#[derive(Clone)]
pub struct CaptchaVerifier {
    client: reqwest::Client,
    bypass: bool,
    secret: Option<SecretString>,
    verify_url: String,
}

impl std::fmt::Debug for CaptchaVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptchaVerifier")
            .field("bypass", &self.bypass)
            .field("verify_url", &self.verify_url)
            .finish_non_exhaustive()
    }
}

impl CaptchaVerifier {
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &CaptchaConfig) -> Result<Self, CaptchaError> {
        let client = reqwest::Client::builder().timeout(VERIFY_TIMEOUT).build()?;
        if config.bypass {
            tracing::warn!("Captcha bypass enabled, every token is accepted");
        } else if config.secret.is_none() {
            tracing::warn!(verify_url = %config.verify_url, "Captcha secret not set, every token will be rejected");
        }

        Ok(Self {
            client,
            bypass: config.bypass,
            secret: config.secret.clone(),
            verify_url: config.verify_url.clone(),
        })
    }

    /// Whether the token is accepted.
    pub async fn verify(&self, token: &str) -> bool {
        if self.bypass {
            return true;
        }
        let Some(secret) = &self.secret else {
            return false;
        };
        if token.trim().is_empty() {
            return false;
        }

        match self.call(secret, token).await {
            Ok(reply) => {
                if !reply.success {
                    tracing::info!(codes = ?reply.error_codes, "Captcha rejected");
                }
                reply.success
            }
            Err(e) => {
                tracing::warn!(error = %e, "Captcha verification failed");
                false
            }
        }
    }

    async fn call(&self, secret: &SecretString, token: &str) -> Result<VerifyResponse, CaptchaError> {
        let response = self
            .client
            .post(&self.verify_url)
            .form(&[("secret", secret.expose_secret()), ("response", token)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CaptchaError::Status(status.as_u16()));
        }
        Ok(response.json().await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{Form, Json, Router, routing::post};
    use serde_json::json;
    use std::collections::HashMap;

    use super::*;

    fn verifier(bypass: bool, secret: Option<&str>, verify_url: &str) -> CaptchaVerifier {
        CaptchaVerifier::new(&CaptchaConfig {
            bypass,
            secret: secret.map(SecretString::from),
            verify_url: verify_url.to_string(),
        })
        .unwrap()
    }

    /// Siteverify stand-in accepting only the token "good".
    async fn spawn_verifier() -> String {
        async fn siteverify(Form(form): Form<HashMap<String, String>>) -> Json<serde_json::Value> {
            let ok = form.get("secret").map(String::as_str) == Some("s3cret")
                && form.get("response").map(String::as_str) == Some("good");
            if ok {
                Json(json!({ "success": true }))
            } else {
                Json(json!({ "success": false, "error-codes": ["invalid-input-response"] }))
            }
        }

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = Router::new().route("/siteverify", post(siteverify));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/siteverify")
    }

    #[tokio::test]
    async fn test_bypass_accepts_anything() {
        let captcha = verifier(true, None, "http://127.0.0.1:1/siteverify");
        assert!(captcha.verify("").await);
    }

    #[tokio::test]
    async fn test_fails_closed_without_secret_or_token() {
        assert!(!verifier(false, None, "http://127.0.0.1:1/").verify("token").await);
        assert!(!verifier(false, Some("s3cret"), "http://127.0.0.1:1/").verify("  ").await);
    }

    #[tokio::test]
    async fn test_fails_closed_when_unreachable() {
        let captcha = verifier(false, Some("s3cret"), "http://127.0.0.1:1/siteverify");
        assert!(!captcha.verify("good").await);
    }

    #[tokio::test]
    async fn test_verifier_answer_is_followed() {
        let url = spawn_verifier().await;
        let captcha = verifier(false, Some("s3cret"), &url);
        assert!(captcha.verify("good").await);
        assert!(!captcha.verify("bad").await);
    }
}
