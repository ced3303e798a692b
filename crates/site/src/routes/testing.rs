//! In-process request helpers for handler tests.

#![allow(clippy::unwrap_used)]

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use chrono::Utc;
use secrecy::SecretString;
use serde_json::Value;
use tower::ServiceExt;

use crate::config::{AuthConfig, CaptchaConfig, HCAPTCHA_VERIFY_URL, SiteConfig, TURNSTILE_VERIFY_URL};
use crate::middleware::auth::SESSION_COOKIE;
use crate::services::email::EmailService;
use crate::state::AppState;
use crate::store::KvStore;

pub const ADMIN_EMAIL: &str = "admin@angelivisions.com";
pub const ADMIN_PASSWORD: &str = "supersecret";

pub fn config() -> SiteConfig {
    SiteConfig {
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        base_url: "http://localhost:3000".to_string(),
        auth: AuthConfig {
            secret: SecretString::from("k7Qp2vX9mL4sR8tY1wZ3nB6cF0hJ5dG2"),
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

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// Parsed JSON body, `Value::Null` when the body is not JSON.
    pub body: Value,
}

pub struct TestApp {
    pub state: AppState,
    router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(config())
    }

    pub fn with_config(config: SiteConfig) -> Self {
        Self::with_store(config, KvStore::memory())
    }

    pub fn with_mailer(mailer: EmailService) -> Self {
        let state = AppState::with_mailer(config(), KvStore::memory(), mailer).unwrap();
        let router = super::routes(false).with_state(state.clone());
        Self { state, router }
    }

    pub fn with_store(config: SiteConfig, store: KvStore) -> Self {
        let rate_limit = config.rate_limit;
        let state = AppState::with_store(config, store).unwrap();
        let router = super::routes(rate_limit).with_state(state.clone());
        Self { state, router }
    }

    pub async fn request(&self, method: Method, uri: &str, body: Option<&str>, cookie: Option<&str>) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if body.is_some() {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
        }
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = builder
            .body(body.map_or_else(Body::empty, |b| Body::from(b.to_string())))
            .unwrap();
        self.send(request).await
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        TestResponse {
            status,
            headers,
            body: serde_json::from_slice(&bytes).unwrap_or(Value::Null),
        }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.request(Method::GET, uri, None, None).await
    }

    pub async fn post(&self, uri: &str, body: Option<&str>) -> TestResponse {
        self.request(Method::POST, uri, body, None).await
    }

    /// `Cookie` header value carrying a valid session for `email`.
    pub fn session_for(&self, email: &str) -> String {
        let token = self
            .state
            .signer()
            .issue_session(email, Duration::from_secs(3600), Utc::now())
            .unwrap();
        format!("{SESSION_COOKIE}={token}")
    }

    /// Create the first admin and return its session cookie.
    pub async fn bootstrap_admin(&self) -> String {
        let account = crate::services::auth::NewAccount {
            name: "Admin",
            email: ADMIN_EMAIL,
            password: ADMIN_PASSWORD,
            role: angeli_core::Role::Admin,
            active: true,
        };
        self.state.auth().bootstrap(&account, Utc::now()).await.unwrap();
        self.session_for(ADMIN_EMAIL)
    }
}

/// `name=value` of the named `Set-Cookie` header, ready to send back.
pub fn cookie_pair(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .find(|pair| pair.starts_with(&format!("{name}=")))
        .map(ToString::to_string)
}
