//! Session cookies and authentication extractors.
//!
//! Sessions are stateless: the `av_session` cookie carries a signed token
//! and every gated request verifies it.

use angeli_core::{Email, Role};
use axum::{
    extract::FromRequestParts,
    http::{
        HeaderMap, HeaderValue,
        header::{COOKIE, SET_COOKIE},
        request::Parts,
    },
};
use tower_sessions::cookie::{Cookie, SameSite, time::Duration};

use crate::db::UserRepository;
use crate::error::AppError;
use crate::services::auth::tokens::ADMIN_RECORD_TTL_SECS;
use crate::state::AppState;

/// Session cookie name.
pub const SESSION_COOKIE: &str = "av_session";

/// Signed admin-record fallback cookie.
pub const ADMIN_RECORD_COOKIE: &str = "av_admin_record";

/// Plain role hint read by the legacy back-office UI. Never trusted.
pub const ROLE_COOKIE: &str = "av_role";

const ADMIN_REQUIRED: &str = "Accès administrateur requis";

/// Value of the named cookie in the request, if any.
#[must_use]
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == name)
        .map(|cookie| cookie.value().to_string())
}

/// Append a `Set-Cookie` header.
pub fn append_cookie(headers: &mut HeaderMap, cookie: &Cookie<'_>) {
    match HeaderValue::from_str(&cookie.to_string()) {
        Ok(value) => {
            headers.append(SET_COOKIE, value);
        }
        Err(e) => tracing::error!(cookie = cookie.name(), error = %e, "Cookie is not a valid header value"),
    }
}

fn http_only(name: &'static str, value: String, max_age: Duration, secure: bool) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(max_age)
        .build()
}

#[must_use]
pub fn session_cookie(token: String, ttl: std::time::Duration, secure: bool) -> Cookie<'static> {
    let max_age = Duration::try_from(ttl).unwrap_or(Duration::MAX);
    http_only(SESSION_COOKIE, token, max_age, secure)
}

#[must_use]
pub fn admin_record_cookie(token: String, secure: bool) -> Cookie<'static> {
    http_only(ADMIN_RECORD_COOKIE, token, Duration::seconds(ADMIN_RECORD_TTL_SECS), secure)
}

#[must_use]
pub fn role_cookie(role: Role) -> Cookie<'static> {
    Cookie::build((ROLE_COOKIE, role.as_str()))
        .path("/")
        .same_site(SameSite::Lax)
        .build()
}

/// An expired cookie that makes the browser drop `name`.
#[must_use]
pub fn removal_cookie(name: &'static str, secure: bool) -> Cookie<'static> {
    let mut cookie = http_only(name, String::new(), Duration::ZERO, secure);
    if name == ROLE_COOKIE {
        cookie.set_http_only(false);
    }
    cookie
}

/// The signed-in account, as carried by a valid session token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub email: Email,
    /// Unix time the token stops being valid.
    pub expires_at: i64,
}

fn session_from_parts(parts: &Parts, state: &AppState) -> Option<Session> {
    let token = read_cookie(&parts.headers, SESSION_COOKIE)?;
    let claims = state.auth().session(&token)?;
    let email = Email::parse(&claims.sub).ok()?;
    Some(Session {
        email,
        expires_at: claims.exp,
    })
}

/// Extractor that requires a valid session.
///
/// Rejects with 401 `{"ok": false, "error": "Non autorisé"}`.
///
/// # Example
///
/// ```rust,ignore
/// async fn create(RequireSession(session): RequireSession) -> impl IntoResponse {
///     format!("Hello, {}!", session.email)
/// }
/// ```
pub struct RequireSession(pub Session);

impl FromRequestParts<AppState> for RequireSession {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        session_from_parts(parts, state)
            .map(Self)
            .ok_or_else(AppError::unauthorized)
    }
}

/// Extractor that optionally gets the current session.
///
/// Unlike `RequireSession`, this does not reject the request.
pub struct OptionalSession(pub Option<Session>);

impl FromRequestParts<AppState> for OptionalSession {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(Self(session_from_parts(parts, state)))
    }
}

/// An administrator allowed to manage accounts, subscribers and quotes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminUser {
    pub email: Email,
    pub name: String,
}

/// Extractor that requires a session belonging to an active admin.
///
/// When the store holds no accounts and the admin-record cookie is enabled,
/// a valid admin-record cookie for the session's email stands in for the
/// missing account.
pub struct RequireAdmin(pub AdminUser);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(session) = session_from_parts(parts, state) else {
            return Err(AppError::Unauthorized(ADMIN_REQUIRED.to_string()));
        };

        let users = UserRepository::new(state.store());
        if let Some(user) = users.find_by_email(&session.email).await? {
            if user.is_active_admin() {
                return Ok(Self(AdminUser {
                    email: user.email,
                    name: user.name,
                }));
            }
            return Err(AppError::Forbidden(ADMIN_REQUIRED.to_string()));
        }

        if state.config().auth.admin_record_cookie
            && users.count().await? == 0
            && let Some(record) = read_cookie(&parts.headers, ADMIN_RECORD_COOKIE)
                .and_then(|token| state.auth().admin_record(&token))
            && record.email == session.email
        {
            return Ok(Self(AdminUser {
                email: record.email,
                name: String::new(),
            }));
        }

        Err(AppError::Forbidden(ADMIN_REQUIRED.to_string()))
    }
}
