//! Authentication error types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use super::tokens::TokenError;
use crate::db::RepositoryError;
use crate::store::StoreError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// A required body field is missing or blank.
    #[error("missing required fields")]
    MissingFields,

    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] angeli_core::EmailError),

    /// Password too short.
    #[error("password too short")]
    WeakPassword,

    /// Captcha verification refused the request.
    #[error("captcha rejected")]
    Captcha,

    /// Invalid credentials (wrong password or unknown account).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Account exists but has been deactivated.
    #[error("account disabled")]
    AccountDisabled,

    /// Bootstrap attempted after the first account was created.
    #[error("already initialized")]
    AlreadyInitialized,

    /// Reset token is malformed, forged, expired or of the wrong kind.
    #[error("invalid token: {0}")]
    InvalidToken(#[source] TokenError),

    /// Reset token names an account that no longer exists.
    #[error("account not found")]
    AccountNotFound,

    /// Repository/store error.
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// Token could not be signed.
    #[error("token signing error: {0}")]
    Signing(#[source] TokenError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        Self::Repository(err.into())
    }
}

impl AuthError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::MissingFields
            | Self::InvalidEmail(_)
            | Self::WeakPassword
            | Self::Captcha
            | Self::AlreadyInitialized
            | Self::InvalidToken(_)
            | Self::AccountNotFound => StatusCode::BAD_REQUEST,
            Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::AccountDisabled => StatusCode::FORBIDDEN,
            Self::Repository(RepositoryError::Store(_)) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Repository(_) | Self::Signing(_) | Self::PasswordHash => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message shown to the visitor. Never reveals whether an account exists.
    #[must_use]
    pub const fn public_message(&self) -> &'static str {
        match self {
            Self::MissingFields => "Champs requis manquants",
            Self::InvalidEmail(_) => "Email invalide",
            Self::WeakPassword => "Mot de passe trop court (min. 8 caractères)",
            Self::Captcha => "Captcha invalide",
            Self::InvalidCredentials => "Identifiants invalides",
            Self::AccountDisabled => "Compte désactivé",
            Self::AlreadyInitialized => "Le système est déjà initialisé",
            Self::InvalidToken(_) => "Token invalide",
            Self::AccountNotFound => "Compte introuvable",
            Self::Repository(_) | Self::Signing(_) | Self::PasswordHash => "Erreur serveur",
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Auth request error"
            );
        }

        (
            status,
            Json(json!({ "success": false, "message": self.public_message() })),
        )
            .into_response()
    }
}
