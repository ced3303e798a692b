//! HTTP route handlers for the site API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                     - Liveness
//! GET  /health/ready               - Store reachable
//!
//! # Auth (credential routes rate limited)
//! GET  /api/auth/status            - Whether an account exists, session state
//! GET  /api/auth/session           - Current session user
//! POST /api/auth/init              - Create the first admin (limited)
//! POST /api/auth/login             - Password login (limited)
//! POST /api/auth/logout            - Clear the session
//! POST /api/auth/forgot            - Mail a reset link (limited)
//! POST /api/auth/reset             - Set a new password from a reset link (limited)
//!
//! # Users
//! GET|POST        /api/admin/users
//! PUT|DELETE      /api/admin/users/{id}
//! POST|DELETE     /api/admin/users/auth   - Legacy role cookie login
//!
//! # Content
//! GET|POST|PUT|DELETE /api/artists
//! GET|POST            /api/team
//! PUT|DELETE          /api/team/{id}
//! POST                /api/team/reorder
//! GET|POST            /api/services
//! GET|POST            /api/categories
//! GET|POST|PUT|DELETE /api/projects
//! GET|POST            /api/blog
//! GET                 /api/blog/{slug}
//! PUT|DELETE          /api/blog/{id}
//!
//! # Newsletter and forms
//! GET|POST|DELETE|PATCH /api/newsletter
//! GET|POST              /api/newsletter/preferences
//! GET|POST|DELETE       /api/devis
//! POST                  /api/contact/dpd
//!
//! # Mail
//! POST                  /api/email/test     - Admin SMTP check
//! ```

pub mod admin_users;
pub mod artists;
pub mod auth;
pub mod blog;
pub mod categories;
pub mod contact;
pub mod email;
pub mod newsletter;
pub mod projects;
pub mod quotes;
pub mod services;
pub mod team;

#[cfg(test)]
pub(crate) mod testing;

use std::convert::Infallible;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{FromRequest, Request, State},
    http::StatusCode,
    routing::{get, post, put},
};
use serde::de::DeserializeOwned;

use crate::error::AppError;
use crate::middleware::auth_rate_limiter;
use crate::state::AppState;

/// JSON body extractor that rejects with an [`AppError`] instead of plain text.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => {
                tracing::debug!(error = %rejection.body_text(), "Rejected JSON body");
                Err(AppError::BadRequest("Requête invalide".to_string()))
            }
        }
    }
}

/// JSON body extractor that never rejects: an empty or malformed body
/// yields `T::default()`, so handlers report the missing fields themselves.
pub struct LenientJson<T>(pub T);

impl<S, T> FromRequest<S> for LenientJson<T>
where
    T: DeserializeOwned + Default,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let value = match Bytes::from_request(req, state).await {
            Ok(body) => serde_json::from_slice(&body).unwrap_or_else(|e| {
                tracing::debug!(error = %e, "Unreadable JSON body, using defaults");
                T::default()
            }),
            Err(_) => T::default(),
        };
        Ok(Self(value))
    }
}

/// Create the auth routes router.
///
/// `rate_limit` puts the per-IP limiter in front of the credential routes
/// only; status and session polling stay unlimited.
pub fn auth_routes(rate_limit: bool) -> Router<AppState> {
    let credentials = Router::new()
        .route("/init", post(auth::init))
        .route("/login", post(auth::login))
        .route("/forgot", post(auth::forgot))
        .route("/reset", post(auth::reset));
    let credentials = if rate_limit {
        credentials.layer(auth_rate_limiter())
    } else {
        credentials
    };

    Router::new()
        .route("/status", get(auth::status))
        .route("/session", get(auth::session))
        .route("/logout", post(auth::logout))
        .merge(credentials)
}

/// Create the user management router.
pub fn admin_user_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(admin_users::list).post(admin_users::create))
        .route(
            "/auth",
            post(admin_users::role_login).delete(admin_users::role_logout),
        )
        .route(
            "/{id}",
            put(admin_users::update).delete(admin_users::remove),
        )
}

/// Create the content routes router.
pub fn content_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/artists",
            get(artists::list)
                .post(artists::create)
                .put(artists::update)
                .delete(artists::remove),
        )
        .route("/team", get(team::list).post(team::create))
        .route("/team/reorder", post(team::reorder))
        .route("/team/{id}", put(team::update).delete(team::remove))
        .route("/services", get(services::list).post(services::replace))
        .route("/categories", get(categories::list).post(categories::replace))
        .route(
            "/projects",
            get(projects::list)
                .post(projects::create)
                .put(projects::update)
                .delete(projects::remove),
        )
        .route("/blog", get(blog::list).post(blog::create))
        .route(
            "/blog/{key}",
            get(blog::show).put(blog::update).delete(blog::remove),
        )
}

/// Create the newsletter and form routes router.
pub fn form_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/newsletter",
            get(newsletter::list)
                .post(newsletter::subscribe)
                .delete(newsletter::remove)
                .patch(newsletter::change_email),
        )
        .route(
            "/newsletter/preferences",
            get(newsletter::preferences).post(newsletter::update_preferences),
        )
        .route(
            "/devis",
            get(quotes::list).post(quotes::submit).delete(quotes::remove),
        )
        .route("/contact/dpd", post(contact::data_request))
        .route("/email/test", post(email::send_test))
}

/// Create all routes for the site.
///
/// `rate_limit` enables the per-IP limiter on the auth credential routes.
pub fn routes(rate_limit: bool) -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/api/auth", auth_routes(rate_limit))
        .nest("/api/admin/users", admin_user_routes())
        .nest("/api", content_routes().merge(form_routes()))
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the content store is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.store().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, backend = state.store().backend_name(), "Store not ready");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
