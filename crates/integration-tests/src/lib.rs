//! End-to-end tests for the Angeli Visions site.
//!
//! Each [`TestContext`] serves the full application (middleware included)
//! on an ephemeral local port, over the in-memory store, with captcha
//! checks bypassed and mail disabled.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p angeli-integration-tests
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use angeli_site::config::{AuthConfig, CaptchaConfig, HCAPTCHA_VERIFY_URL, SiteConfig, TURNSTILE_VERIFY_URL};
use angeli_site::state::AppState;
use reqwest::{Client, Response};
use secrecy::SecretString;
use serde_json::{Value, json};

pub const ADMIN_EMAIL: &str = "admin@angelivisions.com";
pub const ADMIN_PASSWORD: &str = "correct-horse-battery";

/// Configuration for a throwaway server.
#[must_use]
pub fn test_config() -> SiteConfig {
    SiteConfig {
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        base_url: "http://127.0.0.1".to_string(),
        auth: AuthConfig {
            secret: SecretString::from("Zr8Kq3Wm6Tp1Xv4Bn7Hc2Ld5Gf9Js0Ya"),
            session_ttl: Duration::from_secs(3600),
            admin_record_cookie: false,
        },
        store: None,
        captcha: CaptchaConfig {
            bypass: true,
            secret: None,
            verify_url: TURNSTILE_VERIFY_URL.to_string(),
        },
        login_captcha: CaptchaConfig {
            bypass: true,
            secret: None,
            verify_url: HCAPTCHA_VERIFY_URL.to_string(),
        },
        email: None,
        admin_email: "contact@angelivisions.com".to_string(),
        rate_limit: false,
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 1.0,
        sentry_traces_sample_rate: 0.0,
    }
}

/// A running server and a cookie-keeping client pointed at it.
pub struct TestContext {
    pub client: Client,
    pub base_url: String,
    pub state: AppState,
}

impl TestContext {
    /// Start a server with [`test_config`].
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot bind or the client cannot be built.
    pub async fn new() -> Self {
        Self::with_config(test_config()).await
    }

    /// Start a server with a custom configuration.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot bind or the client cannot be built.
    pub async fn with_config(config: SiteConfig) -> Self {
        let state = AppState::new(config).expect("Failed to create application state");
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Listener has no local address");

        let app = angeli_site::app(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
                .await
                .ok();
        });

        Self {
            client: Self::client(),
            base_url: format!("http://{addr}"),
            state,
        }
    }

    /// A fresh client with an empty cookie jar.
    ///
    /// # Panics
    ///
    /// Panics if the client cannot be built.
    #[must_use]
    pub fn client() -> Client {
        Client::builder()
            .cookie_store(true)
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client")
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// GET `path` with this context's client.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be sent.
    pub async fn get(&self, path: &str) -> Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("GET request failed")
    }

    /// POST a JSON body to `path` with this context's client.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be sent.
    pub async fn post(&self, path: &str, body: &Value) -> Response {
        self.client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("POST request failed")
    }

    /// Create the first admin through the API. The client keeps the session.
    ///
    /// # Panics
    ///
    /// Panics if the bootstrap request is refused.
    pub async fn bootstrap_admin(&self) {
        let res = self
            .post(
                "/api/auth/init",
                &json!({
                    "name": "Angeli",
                    "email": ADMIN_EMAIL,
                    "password": ADMIN_PASSWORD,
                    "captchaToken": "test",
                }),
            )
            .await;
        assert!(res.status().is_success(), "bootstrap failed: {}", res.status());
    }
}

/// Decode a JSON response body.
///
/// # Panics
///
/// Panics if the body is not JSON.
pub async fn json_body(res: Response) -> Value {
    res.json().await.expect("Response body is not JSON")
}
