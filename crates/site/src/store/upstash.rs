//! Upstash REST client.
//!
//! Each command is POSTed to the database URL as a JSON array
//! (`["HSET", "key", "field", "value"]`) with a bearer token. Replies are
//! `{"result": ...}` on success and `{"error": "..."}` on failure.

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::Value;

use super::StoreError;
use crate::config::StoreConfig;

/// Per-request timeout for store calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Raw reply envelope.
#[derive(Debug, Deserialize)]
struct Reply {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

/// HTTP client bound to one Upstash database.
#[derive(Clone)]
pub struct UpstashClient {
    client: reqwest::Client,
    url: String,
}

impl std::fmt::Debug for UpstashClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstashClient")
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

impl UpstashClient {
    /// Build a client for the configured database.
    ///
    /// # Errors
    ///
    /// Returns error if the token is not a valid header value or the HTTP
    /// client fails to build.
    pub fn new(config: &StoreConfig) -> Result<Self, StoreError> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.token.expose_secret()))
            .map_err(|e| StoreError::Config(format!("Invalid store token format: {e}")))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            url: config.rest_url.clone(),
        })
    }

    /// Run one command and return its `result` value.
    ///
    /// # Errors
    ///
    /// Returns error on transport failure, a non-2xx status, or an `error` reply.
    pub async fn command(&self, args: &[&str]) -> Result<Value, StoreError> {
        let response = self.client.post(&self.url).json(args).send().await?;
        let status = response.status();
        let body = response.text().await?;

        let reply: Option<Reply> = serde_json::from_str(&body).ok();
        if let Some(message) = reply.as_ref().and_then(|r| r.error.clone()) {
            return Err(StoreError::Api {
                status: status.as_u16(),
                message,
            });
        }
        if !status.is_success() {
            return Err(StoreError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        reply
            .map(|r| r.result.unwrap_or(Value::Null))
            .ok_or_else(|| StoreError::UnexpectedReply {
                command: command_name(args),
                reply: body,
            })
    }
}

/// Command name for error messages; arguments may hold user data.
pub(super) fn command_name(args: &[&str]) -> String {
    args.first().copied().unwrap_or_default().to_string()
}
