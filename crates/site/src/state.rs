//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::SiteConfig;
use crate::services::auth::{AuthService, TokenSigner};
use crate::services::captcha::{CaptchaError, CaptchaVerifier};
use crate::services::email::{EmailError, EmailService};
use crate::store::{KvStore, StoreError};

/// Error building application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("store: {0}")]
    Store(#[from] StoreError),
    #[error("captcha: {0}")]
    Captcha(#[from] CaptchaError),
    #[error("email: {0}")]
    Email(#[from] EmailError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// content store, token signer, captcha gate, mailer and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: SiteConfig,
    store: KvStore,
    signer: TokenSigner,
    captcha: CaptchaVerifier,
    login_captcha: CaptchaVerifier,
    mailer: Option<EmailService>,
}

impl AppState {
    /// Create application state, connecting to the configured store.
    ///
    /// # Errors
    ///
    /// Returns an error if the store client, captcha client or SMTP transport
    /// cannot be built.
    pub fn new(config: SiteConfig) -> Result<Self, StateError> {
        let store = KvStore::from_config(config.store.as_ref())?;
        Self::with_store(config, store)
    }

    /// Create application state over an existing store.
    ///
    /// # Errors
    ///
    /// Returns an error if the captcha client or SMTP transport cannot be built.
    pub fn with_store(config: SiteConfig, store: KvStore) -> Result<Self, StateError> {
        let mailer = match &config.email {
            Some(email) => Some(EmailService::new(email)?),
            None => {
                tracing::warn!("SMTP not configured, outgoing mail disabled");
                None
            }
        };
        Self::assemble(config, store, mailer)
    }

    /// State over an existing store with a prebuilt mailer.
    #[cfg(test)]
    pub(crate) fn with_mailer(config: SiteConfig, store: KvStore, mailer: EmailService) -> Result<Self, StateError> {
        Self::assemble(config, store, Some(mailer))
    }

    fn assemble(config: SiteConfig, store: KvStore, mailer: Option<EmailService>) -> Result<Self, StateError> {
        let signer = TokenSigner::new(config.auth.secret.clone());
        let captcha = CaptchaVerifier::new(&config.captcha)?;
        let login_captcha = CaptchaVerifier::new(&config.login_captcha)?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                signer,
                captcha,
                login_captcha,
                mailer,
            }),
        })
    }

    /// Get a reference to the site configuration.
    #[must_use]
    pub fn config(&self) -> &SiteConfig {
        &self.inner.config
    }

    /// Get a reference to the content store.
    #[must_use]
    pub fn store(&self) -> &KvStore {
        &self.inner.store
    }

    #[must_use]
    pub fn signer(&self) -> &TokenSigner {
        &self.inner.signer
    }

    /// Turnstile gate for first-admin setup and the quote form.
    #[must_use]
    pub fn captcha(&self) -> &CaptchaVerifier {
        &self.inner.captcha
    }

    /// hCaptcha gate for login, forgot and reset.
    #[must_use]
    pub fn login_captcha(&self) -> &CaptchaVerifier {
        &self.inner.login_captcha
    }

    /// The mailer, when SMTP is configured.
    #[must_use]
    pub fn mailer(&self) -> Option<&EmailService> {
        self.inner.mailer.as_ref()
    }

    /// Authentication service bound to this state's store and signer.
    #[must_use]
    pub fn auth(&self) -> AuthService<'_> {
        AuthService::new(&self.inner.store, &self.inner.signer)
    }
}
