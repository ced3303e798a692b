//! Site configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SITE_BASE_URL` - Public URL of the site (falls back to `NEXT_PUBLIC_SITE_URL`)
//! - `AUTH_SECRET` - Token signing secret (min 32 chars, high entropy)
//!
//! ## Optional
//! - `SITE_HOST` - Bind address (default: 127.0.0.1)
//! - `SITE_PORT` - Listen port (default: 3000)
//! - `SESSION_TTL_SECONDS` - Session lifetime (default: 86400)
//! - `ADMIN_RECORD_COOKIE` - Issue the fallback admin-record cookie (default: false)
//! - `KV_REST_API_URL` / `KV_REST_API_TOKEN` - Upstash REST store
//!   (falls back to `UPSTASH_REDIS_REST_URL` / `UPSTASH_REDIS_REST_TOKEN`;
//!   without either pair an in-memory store is used)
//! - `CAPTCHA_BYPASS` - Accept every captcha token (default: false)
//! - `TURNSTILE_SECRET_KEY` - Turnstile secret for setup and the quote form
//! - `CAPTCHA_VERIFY_URL` - Turnstile endpoint (default: Cloudflare)
//! - `HCAPTCHA_SECRET` - hCaptcha secret for login and password reset
//! - `HCAPTCHA_VERIFY_URL` - hCaptcha endpoint (default: hcaptcha.com)
//! - `SMTP_HOST`, `SMTP_PORT`, `SMTP_USER`, `SMTP_PASS` - Outgoing mail
//!   (mail is disabled unless host, user and password are all set)
//! - `FROM_EMAIL`, `FROM_NAME`, `REPLY_TO` - Sender identity
//! - `ADMIN_EMAIL` - Recipient of notifications (default: contact@angelivisions.com)
//! - `RATE_LIMIT_ENABLED` - Per-IP limits on auth endpoints (default: true)
//! - `SENTRY_DSN`, `SENTRY_ENVIRONMENT`, `SENTRY_SAMPLE_RATE`,
//!   `SENTRY_TRACES_SAMPLE_RATE` - Error tracking

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_AUTH_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_SESSION_TTL_SECONDS: u64 = 60 * 60 * 24;
const DEFAULT_SMTP_PORT: u16 = 587;

/// Cloudflare Turnstile verification endpoint.
pub const TURNSTILE_VERIFY_URL: &str = "https://challenges.cloudflare.com/turnstile/v0/siteverify";

/// hCaptcha verification endpoint.
pub const HCAPTCHA_VERIFY_URL: &str = "https://hcaptcha.com/siteverify";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Site application configuration.
#[derive(Debug, Clone)]
pub struct SiteConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL, without trailing slash
    pub base_url: String,
    /// Token signing and cookie settings
    pub auth: AuthConfig,
    /// Upstash REST store; `None` selects the in-memory store
    pub store: Option<StoreConfig>,
    /// Turnstile settings for first-admin setup and the quote form
    pub captcha: CaptchaConfig,
    /// hCaptcha settings for login, forgot and reset
    pub login_captcha: CaptchaConfig,
    /// SMTP settings; `None` disables outgoing mail
    pub email: Option<EmailConfig>,
    /// Recipient of newsletter, quote and data-protection notifications
    pub admin_email: String,
    /// Apply per-IP rate limits to `/api/auth`
    pub rate_limit: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment tag
    pub sentry_environment: Option<String>,
    /// Fraction of errors sent to Sentry
    pub sentry_sample_rate: f32,
    /// Fraction of transactions traced
    pub sentry_traces_sample_rate: f32,
}

/// Session and token settings.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// HMAC key for every signed token
    pub secret: SecretString,
    /// Lifetime of a session token and its cookie
    pub session_ttl: Duration,
    /// Issue and honor the signed admin-record fallback cookie
    pub admin_record_cookie: bool,
}

/// Upstash REST endpoint.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// REST base URL (`https://<db>.upstash.io`)
    pub rest_url: String,
    /// Bearer token
    pub token: SecretString,
}

/// Captcha verification settings.
#[derive(Debug, Clone)]
pub struct CaptchaConfig {
    /// Accept every token without calling the verifier
    pub bypass: bool,
    /// Verifier secret; without it every token is rejected
    pub secret: Option<SecretString>,
    /// Siteverify endpoint
    pub verify_url: String,
}

/// SMTP configuration.
///
/// Implements `Debug` manually to redact credentials.
#[derive(Clone)]
pub struct EmailConfig {
    /// SMTP server host
    pub smtp_host: String,
    /// SMTP server port (465 = implicit TLS, anything else = STARTTLS)
    pub smtp_port: u16,
    /// SMTP username
    pub smtp_username: String,
    /// SMTP password
    pub smtp_password: SecretString,
    /// Sender address
    pub from_address: String,
    /// Sender display name
    pub from_name: Option<String>,
    /// Reply-To address for outgoing mail
    pub reply_to: Option<String>,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &"[REDACTED]")
            .field("smtp_password", &"[REDACTED]")
            .field("from_address", &self.from_address)
            .field("from_name", &self.from_name)
            .field("reply_to", &self.reply_to)
            .finish()
    }
}

impl SiteConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = parse_env("SITE_HOST", "127.0.0.1")?;
        let port = parse_env("SITE_PORT", "3000")?;
        let base_url = get_env_with_fallback("SITE_BASE_URL", "NEXT_PUBLIC_SITE_URL")?;
        let base_url = normalize_base_url(&base_url, "SITE_BASE_URL")?;

        let auth = AuthConfig::from_env()?;
        let store = StoreConfig::from_env();
        let captcha = CaptchaConfig::from_env()?;
        let login_captcha = CaptchaConfig::login_from_env()?;
        let email = EmailConfig::from_env()?;

        Ok(Self {
            host,
            port,
            base_url,
            auth,
            store,
            captcha,
            login_captcha,
            email,
            admin_email: get_env_or_default("ADMIN_EMAIL", "contact@angelivisions.com"),
            rate_limit: parse_env("RATE_LIMIT_ENABLED", "true")?,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: parse_env("SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: parse_env("SENTRY_TRACES_SAMPLE_RATE", "0.1")?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies should carry the `Secure` attribute.
    #[must_use]
    pub fn secure_cookies(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl AuthConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let secret = get_validated_secret("AUTH_SECRET")?;
        validate_auth_secret(&secret, "AUTH_SECRET")?;
        let ttl_seconds: u64 = parse_env(
            "SESSION_TTL_SECONDS",
            &DEFAULT_SESSION_TTL_SECONDS.to_string(),
        )?;
        if ttl_seconds == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "SESSION_TTL_SECONDS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            secret,
            session_ttl: Duration::from_secs(ttl_seconds),
            admin_record_cookie: parse_env("ADMIN_RECORD_COOKIE", "false")?,
        })
    }
}

impl StoreConfig {
    /// Upstash credentials from the environment, if both halves are set.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let pair = |url_key: &str, token_key: &str| {
            Some(Self {
                rest_url: get_optional_env(url_key)?.trim_end_matches('/').to_string(),
                token: SecretString::from(get_optional_env(token_key)?),
            })
        };
        pair("KV_REST_API_URL", "KV_REST_API_TOKEN")
            .or_else(|| pair("UPSTASH_REDIS_REST_URL", "UPSTASH_REDIS_REST_TOKEN"))
    }
}

impl CaptchaConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            bypass: parse_env("CAPTCHA_BYPASS", "false")?,
            secret: get_optional_env("TURNSTILE_SECRET_KEY").map(SecretString::from),
            verify_url: get_env_or_default("CAPTCHA_VERIFY_URL", TURNSTILE_VERIFY_URL),
        })
    }

    fn login_from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            bypass: parse_env("CAPTCHA_BYPASS", "false")?,
            secret: get_optional_env("HCAPTCHA_SECRET").map(SecretString::from),
            verify_url: get_env_or_default("HCAPTCHA_VERIFY_URL", HCAPTCHA_VERIFY_URL),
        })
    }
}

impl EmailConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let (Some(smtp_host), Some(smtp_username), Some(password)) = (
            get_optional_env("SMTP_HOST"),
            get_optional_env("SMTP_USER"),
            get_optional_env("SMTP_PASS"),
        ) else {
            return Ok(None);
        };

        let from_address = get_optional_env("FROM_EMAIL").unwrap_or_else(|| smtp_username.clone());

        Ok(Some(Self {
            smtp_host,
            smtp_port: parse_env("SMTP_PORT", &DEFAULT_SMTP_PORT.to_string())?,
            smtp_username,
            smtp_password: SecretString::from(password),
            from_address,
            from_name: get_optional_env("FROM_NAME"),
            reply_to: get_optional_env("REPLY_TO"),
        }))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a required variable, accepting the name used by the previous deployment.
fn get_env_with_fallback(primary_key: &str, legacy_key: &str) -> Result<String, ConfigError> {
    get_optional_env(primary_key)
        .or_else(|| get_optional_env(legacy_key))
        .ok_or_else(|| ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable, treating blank values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse an environment variable (or its default) into `T`.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Check the base URL is absolute http(s) and strip any trailing slash.
fn normalize_base_url(raw: &str, var_name: &str) -> Result<String, ConfigError> {
    let parsed = url::Url::parse(raw.trim())
        .map_err(|e| ConfigError::InvalidEnvVar(var_name.to_string(), e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            var_name.to_string(),
            format!("unsupported scheme '{}'", parsed.scheme()),
        ));
    }
    Ok(parsed.as_str().trim_end_matches('/').to_string())
}

/// Validate that the signing secret meets minimum length requirements.
fn validate_auth_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_AUTH_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_AUTH_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn test_config(base_url: &str) -> SiteConfig {
        SiteConfig {
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: base_url.to_string(),
            auth: AuthConfig {
                secret: SecretString::from("x".repeat(32)),
                session_ttl: Duration::from_secs(DEFAULT_SESSION_TTL_SECONDS),
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

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("changeme-auth-key-for-prod", "AUTH_SECRET");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength(&"ab".repeat(20), "AUTH_SECRET");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        let result = validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "AUTH_SECRET");
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_auth_secret_too_short() {
        let secret = SecretString::from("k9$Lm2#q");
        assert!(validate_auth_secret(&secret, "AUTH_SECRET").is_err());
    }

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(
            normalize_base_url("https://angelivisions.com/", "SITE_BASE_URL").unwrap(),
            "https://angelivisions.com"
        );
        assert!(normalize_base_url("angelivisions.com", "SITE_BASE_URL").is_err());
        assert!(normalize_base_url("ftp://angelivisions.com", "SITE_BASE_URL").is_err());
    }

    #[test]
    fn test_socket_addr() {
        let addr = test_config("http://localhost:3000").socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
    }

    #[test]
    fn test_secure_cookies_follow_scheme() {
        assert!(test_config("https://angelivisions.com").secure_cookies());
        assert!(!test_config("http://localhost:3000").secure_cookies());
    }

    #[test]
    fn test_email_config_debug_redacts_credentials() {
        let config = EmailConfig {
            smtp_host: "ssl0.ovh.net".to_string(),
            smtp_port: 587,
            smtp_username: "mailer@angelivisions.com".to_string(),
            smtp_password: SecretString::from("hunter2-smtp"),
            from_address: "contact@angelivisions.com".to_string(),
            from_name: Some("Angeli Visions".to_string()),
            reply_to: None,
        };

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("ssl0.ovh.net"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("mailer@angelivisions.com"));
        assert!(!debug_output.contains("hunter2-smtp"));
    }
}
