//! Unified error handling with Sentry integration.
//!
//! Route handlers return `Result<T, AppError>`; the response body is
//! `{"ok": false, "error": "..."}`. Quote-form handlers wrap it in
//! [`FormError`] for the `{"success": false, "message": "..."}` shape the
//! public forms expect.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::auth::AuthError;
use crate::store::StoreError;

/// Application-level error type for the site.
#[derive(Debug, Error)]
pub enum AppError {
    /// Repository operation failed.
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller has no valid session.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Caller is authenticated but lacks the required role.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Captcha verification refused the request.
    #[error("Captcha rejected")]
    Captcha,

    /// Rate limited.
    #[error("Rate limited")]
    RateLimited,

    /// Outgoing mail could not be delivered.
    #[error("Mail delivery failed: {0}")]
    Mail(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        Self::Repository(err.into())
    }
}

impl AppError {
    /// The 401 returned by session-gated routes.
    #[must_use]
    pub fn unauthorized() -> Self {
        Self::Unauthorized("Non autorisé".to_string())
    }

    #[must_use]
    pub fn not_found() -> Self {
        Self::NotFound("Not found".to_string())
    }

    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Repository(err) => repository_status(err),
            Self::Auth(AuthError::Repository(err)) => repository_status(err),
            Self::Auth(err) => err.status(),
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) | Self::Captcha => StatusCode::BAD_REQUEST,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Mail(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to the client.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Repository(err) | Self::Auth(AuthError::Repository(err)) => repository_message(err),
            Self::Auth(err) => err.public_message().to_string(),
            Self::NotFound(msg) | Self::Unauthorized(msg) | Self::Forbidden(msg) | Self::BadRequest(msg) => {
                msg.clone()
            }
            Self::Captcha => "Captcha invalide".to_string(),
            Self::RateLimited => "Trop de requêtes, réessayez plus tard".to_string(),
            Self::Mail(_) => "Erreur lors de l'envoi du message".to_string(),
            Self::Internal(_) => "Erreur serveur".to_string(),
        }
    }

    /// Send server-side failures to Sentry and the log.
    fn report(&self) {
        if self.status().is_server_error() {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }
    }
}

const fn repository_status(err: &RepositoryError) -> StatusCode {
    match err {
        RepositoryError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
        RepositoryError::NotFound => StatusCode::NOT_FOUND,
        RepositoryError::Conflict(_) => StatusCode::CONFLICT,
        RepositoryError::Invalid(_) => StatusCode::BAD_REQUEST,
        RepositoryError::DataCorruption(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn repository_message(err: &RepositoryError) -> String {
    match err {
        RepositoryError::Store(_) => "Service indisponible".to_string(),
        RepositoryError::NotFound => "Not found".to_string(),
        RepositoryError::Conflict(msg) | RepositoryError::Invalid(msg) => msg.clone(),
        RepositoryError::DataCorruption(_) => "Erreur serveur".to_string(),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.report();
        (
            self.status(),
            Json(json!({ "ok": false, "error": self.public_message() })),
        )
            .into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// [`AppError`] rendered as `{"success": false, "message": "..."}`.
#[derive(Debug)]
pub struct FormError(pub AppError);

impl From<AppError> for FormError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl From<RepositoryError> for FormError {
    fn from(err: RepositoryError) -> Self {
        Self(err.into())
    }
}

impl From<StoreError> for FormError {
    fn from(err: StoreError) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for FormError {
    fn into_response(self) -> Response {
        self.0.report();
        (
            self.0.status(),
            Json(json!({ "success": false, "message": self.0.public_message() })),
        )
            .into_response()
    }
}

/// Set the Sentry user context after a successful login.
pub fn set_sentry_user(email: &str, role: &str) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            email: Some(email.to_string()),
            ..Default::default()
        }));
        scope.set_tag("role", role);
    });
}

/// Clear the Sentry user context on logout.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for back-office actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
