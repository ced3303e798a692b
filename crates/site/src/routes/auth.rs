//! Back-office authentication handlers.
//!
//! Errors are shaped `{"success": false, "message": "..."}` by
//! [`AuthError`]'s own response impl.

use angeli_core::Email;
use axum::{
    Json,
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use crate::db::UserRepository;
use crate::error::{clear_sentry_user, set_sentry_user};
use crate::middleware::OptionalSession;
use crate::middleware::auth::{
    ADMIN_RECORD_COOKIE, ROLE_COOKIE, SESSION_COOKIE, admin_record_cookie, append_cookie, read_cookie,
    removal_cookie, session_cookie,
};
use crate::services::auth::{AuthError, NewAccount};
use crate::state::AppState;

use super::LenientJson;

const RESET_SENT: &str = "Si un compte existe, un email a été envoyé.";

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoginBody {
    pub email: String,
    pub password: String,
    pub captcha_token: String,
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InitBody {
    pub name: String,
    pub email: String,
    pub password: String,
    pub captcha_token: String,
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ForgotBody {
    pub email: String,
    pub captcha_token: String,
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResetBody {
    pub token: String,
    pub password: String,
    pub captcha_token: String,
}

/// Issue a session for `email` and attach its cookie to `headers`.
pub(crate) fn start_session(state: &AppState, headers: &mut HeaderMap, email: &Email) -> Result<(), AuthError> {
    let ttl = state.config().auth.session_ttl;
    let token = state
        .signer()
        .issue_session(email.as_str(), ttl, Utc::now())
        .map_err(AuthError::Signing)?;
    append_cookie(headers, &session_cookie(token, ttl, state.config().secure_cookies()));
    Ok(())
}

/// Whether an account exists and who is signed in.
///
/// GET /api/auth/status
#[instrument(skip_all)]
pub async fn status(
    State(state): State<AppState>,
    OptionalSession(session): OptionalSession,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, AuthError> {
    let mut exists = UserRepository::new(state.store()).count().await? > 0;
    if !exists && state.config().auth.admin_record_cookie {
        exists = read_cookie(&headers, ADMIN_RECORD_COOKIE)
            .and_then(|token| state.auth().admin_record(&token))
            .is_some();
    }

    Ok(Json(json!({
        "exists": exists,
        "authenticated": session.is_some(),
        "email": session.map(|s| s.email),
    })))
}

/// The signed-in user, in the shape the back-office auth provider expects.
///
/// GET /api/auth/session
#[instrument(skip_all)]
pub async fn session(
    State(state): State<AppState>,
    OptionalSession(session): OptionalSession,
) -> Json<serde_json::Value> {
    let Some(session) = session else {
        return Json(json!({ "authenticated": false, "user": null }));
    };

    let name = match UserRepository::new(state.store()).find_by_email(&session.email).await {
        Ok(Some(user)) if !user.name.is_empty() => user.name,
        Ok(_) => "Administrateur".to_string(),
        Err(e) => {
            tracing::warn!(error = %e, "Could not look up session user");
            "Administrateur".to_string()
        }
    };

    Json(json!({
        "authenticated": true,
        "user": {
            "id": session.email,
            "email": session.email,
            "name": name,
            "twoFactorEnabled": false,
        },
    }))
}

/// Create the first admin account and sign it in.
///
/// POST /api/auth/init
#[instrument(skip_all)]
pub async fn init(
    State(state): State<AppState>,
    LenientJson(body): LenientJson<InitBody>,
) -> Result<Response, AuthError> {
    if body.name.trim().is_empty() || body.email.trim().is_empty() || body.password.is_empty() {
        return Err(AuthError::MissingFields);
    }
    Email::parse(&body.email)?;
    crate::services::auth::validate_password(&body.password)?;

    if UserRepository::new(state.store()).count().await? > 0 {
        return Err(AuthError::AlreadyInitialized);
    }
    if !state.captcha().verify(&body.captcha_token).await {
        return Err(AuthError::Captcha);
    }

    let account = NewAccount {
        name: &body.name,
        email: &body.email,
        password: &body.password,
        role: angeli_core::Role::Admin,
        active: true,
    };
    let admin = state.auth().bootstrap(&account, Utc::now()).await?;
    tracing::info!(email = %admin.email, "First admin account created");

    let mut headers = HeaderMap::new();
    start_session(&state, &mut headers, &admin.email)?;
    set_sentry_user(admin.email.as_str(), admin.role.as_str());
    Ok((headers, Json(json!({ "success": true }))).into_response())
}

/// Password login.
///
/// POST /api/auth/login
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    request_headers: HeaderMap,
    LenientJson(body): LenientJson<LoginBody>,
) -> Result<Response, AuthError> {
    if body.email.trim().is_empty() || body.password.is_empty() {
        return Err(AuthError::MissingFields);
    }
    if !state.login_captcha().verify(&body.captcha_token).await {
        return Err(AuthError::Captcha);
    }

    let record = if state.config().auth.admin_record_cookie {
        read_cookie(&request_headers, ADMIN_RECORD_COOKIE)
    } else {
        None
    };
    let user = match state.auth().login(&body.email, &body.password, record.as_deref()).await {
        Ok(user) => user,
        Err(e) => {
            tracing::info!(error = %e, "Login refused");
            return Err(e);
        }
    };

    let mut headers = HeaderMap::new();
    start_session(&state, &mut headers, &user.email)?;
    if state.config().auth.admin_record_cookie && user.role.is_admin() {
        let token = state
            .signer()
            .issue_admin_record(user.email.as_str(), &user.password_hash, Utc::now())
            .map_err(AuthError::Signing)?;
        append_cookie(&mut headers, &admin_record_cookie(token, state.config().secure_cookies()));
    }

    set_sentry_user(user.email.as_str(), user.role.as_str());
    tracing::info!(email = %user.email, role = user.role.as_str(), "Login succeeded");
    Ok((headers, Json(json!({ "success": true, "role": user.role }))).into_response())
}

/// Clear the session.
///
/// POST /api/auth/logout
#[instrument(skip_all)]
pub async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    let secure = state.config().secure_cookies();
    let mut headers = HeaderMap::new();
    append_cookie(&mut headers, &removal_cookie(SESSION_COOKIE, secure));
    append_cookie(&mut headers, &removal_cookie(ROLE_COOKIE, secure));
    clear_sentry_user();
    (headers, Json(json!({ "success": true })))
}

/// Mail a reset link. Answers the same whether or not the account exists.
///
/// POST /api/auth/forgot
#[instrument(skip_all)]
pub async fn forgot(
    State(state): State<AppState>,
    LenientJson(body): LenientJson<ForgotBody>,
) -> Result<Json<serde_json::Value>, AuthError> {
    if body.email.trim().is_empty() {
        return Err(AuthError::MissingFields);
    }
    if !state.login_captcha().verify(&body.captcha_token).await {
        return Err(AuthError::Captcha);
    }

    if let Some((user, token)) = state.auth().request_password_reset(&body.email, Utc::now()).await? {
        let reset_url = format!(
            "{}/admin/reset?token={}",
            state.config().base_url,
            urlencoding::encode(&token)
        );
        match state.mailer() {
            Some(mailer) => {
                if let Err(e) = mailer
                    .send_password_reset(user.email.as_str(), &user.name, &reset_url)
                    .await
                {
                    tracing::error!(error = %e, "Failed to send password reset email");
                }
            }
            None => tracing::warn!("Password reset requested but SMTP is not configured"),
        }
    }

    Ok(Json(json!({ "success": true, "message": RESET_SENT })))
}

/// Set a new password from a reset link.
///
/// POST /api/auth/reset
#[instrument(skip_all)]
pub async fn reset(
    State(state): State<AppState>,
    LenientJson(body): LenientJson<ResetBody>,
) -> Result<Json<serde_json::Value>, AuthError> {
    if body.token.trim().is_empty() || body.password.is_empty() {
        return Err(AuthError::MissingFields);
    }
    crate::services::auth::validate_password(&body.password)?;
    if !state.login_captcha().verify(&body.captcha_token).await {
        return Err(AuthError::Captcha);
    }

    state.auth().reset_password(body.token.trim(), &body.password, Utc::now()).await?;
    tracing::info!("Password reset completed");
    Ok(Json(json!({ "success": true })))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::{Method, StatusCode, header::SET_COOKIE};

    use axum::body::Body;
    use axum::http::Request;

    use super::super::testing::{TestApp, config, cookie_pair};

    #[tokio::test]
    async fn test_init_then_login() {
        let app = TestApp::new();

        let res = app.get("/api/auth/status").await;
        assert_eq!(res.body["exists"], false);

        let res = app
            .post(
                "/api/auth/init",
                Some(r#"{"name":"Camille","email":"camille@angelivisions.com","password":"supersecret"}"#),
            )
            .await;
        assert_eq!(res.status, StatusCode::OK);
        assert!(res.headers.get(SET_COOKIE).is_some());

        let res = app
            .post(
                "/api/auth/init",
                Some(r#"{"name":"Other","email":"other@angelivisions.com","password":"supersecret"}"#),
            )
            .await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST);
        assert_eq!(res.body["message"], "Le système est déjà initialisé");

        let res = app
            .post(
                "/api/auth/login",
                Some(r#"{"email":"camille@angelivisions.com","password":"supersecret"}"#),
            )
            .await;
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.body["role"], "admin");
        let cookie = cookie_pair(&res.headers, "av_session").unwrap();

        let res = app.request(Method::GET, "/api/auth/session", None, Some(&cookie)).await;
        assert_eq!(res.body["authenticated"], true);
        assert_eq!(res.body["user"]["name"], "Camille");
        assert_eq!(res.body["user"]["twoFactorEnabled"], false);
    }

    #[tokio::test]
    async fn test_login_failures_are_generic() {
        let app = TestApp::new();
        app.bootstrap_admin().await;

        let wrong_password = app
            .post(
                "/api/auth/login",
                Some(r#"{"email":"admin@angelivisions.com","password":"wrongpass"}"#),
            )
            .await;
        let unknown = app
            .post(
                "/api/auth/login",
                Some(r#"{"email":"ghost@angelivisions.com","password":"supersecret"}"#),
            )
            .await;
        assert_eq!(wrong_password.status, StatusCode::UNAUTHORIZED);
        assert_eq!(unknown.status, StatusCode::UNAUTHORIZED);
        assert_eq!(wrong_password.body, unknown.body);

        let missing = app.post("/api/auth/login", Some("not json")).await;
        assert_eq!(missing.status, StatusCode::BAD_REQUEST);
        assert_eq!(missing.body["message"], "Champs requis manquants");
    }

    #[tokio::test]
    async fn test_forgot_does_not_disclose_accounts() {
        let app = TestApp::new();
        app.bootstrap_admin().await;

        let known = app
            .post("/api/auth/forgot", Some(r#"{"email":"admin@angelivisions.com"}"#))
            .await;
        let unknown = app
            .post("/api/auth/forgot", Some(r#"{"email":"ghost@angelivisions.com"}"#))
            .await;
        assert_eq!(known.status, StatusCode::OK);
        assert_eq!(known.body, unknown.body);
        assert_eq!(known.body["message"], "Si un compte existe, un email a été envoyé.");
    }

    #[tokio::test]
    async fn test_reset_rejects_garbage_token() {
        let app = TestApp::new();
        app.bootstrap_admin().await;
        let res = app
            .post("/api/auth/reset", Some(r#"{"token":"a.b.c","password":"brandnewpass"}"#))
            .await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST);
        assert_eq!(res.body["message"], "Token invalide");

        let short = app
            .post("/api/auth/reset", Some(r#"{"token":"a.b.c","password":"short"}"#))
            .await;
        assert_eq!(short.body["message"], "Mot de passe trop court (min. 8 caractères)");
    }

    #[tokio::test]
    async fn test_logout_clears_cookies() {
        let app = TestApp::new();
        let res = app.post("/api/auth/logout", None).await;
        assert_eq!(res.status, StatusCode::OK);
        let cleared: Vec<_> = res.headers.get_all(SET_COOKIE).iter().collect();
        assert_eq!(cleared.len(), 2);
    }

    #[tokio::test]
    async fn test_login_and_setup_use_separate_captchas() {
        let mut config = config();
        config.login_captcha.bypass = false;
        let app = TestApp::with_config(config);

        let res = app
            .post(
                "/api/auth/init",
                Some(r#"{"name":"Camille","email":"camille@angelivisions.com","password":"supersecret"}"#),
            )
            .await;
        assert_eq!(res.status, StatusCode::OK);

        let credentials = r#"{"email":"camille@angelivisions.com","password":"supersecret","captchaToken":"tok"}"#;
        for uri in ["/api/auth/login", "/api/auth/forgot"] {
            let res = app.post(uri, Some(credentials)).await;
            assert_eq!(res.status, StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(res.body["message"], "Captcha invalide");
        }
        let res = app
            .post(
                "/api/auth/reset",
                Some(r#"{"token":"a.b.c","password":"brandnewpass","captchaToken":"tok"}"#),
            )
            .await;
        assert_eq!(res.body["message"], "Captcha invalide");
    }

    #[tokio::test]
    async fn test_limiter_only_covers_credential_routes() {
        let mut config = config();
        config.rate_limit = true;
        let app = TestApp::with_config(config);
        let from_client = |method: Method, uri: &str| {
            Request::builder()
                .method(method)
                .uri(uri)
                .header("x-real-ip", "203.0.113.9")
                .body(Body::empty())
                .unwrap()
        };

        for _ in 0..10 {
            let res = app.send(from_client(Method::GET, "/api/auth/status")).await;
            assert_eq!(res.status, StatusCode::OK);
            let res = app.send(from_client(Method::GET, "/api/auth/session")).await;
            assert_eq!(res.status, StatusCode::OK);
        }

        for _ in 0..5 {
            let res = app.send(from_client(Method::POST, "/api/auth/login")).await;
            assert_eq!(res.status, StatusCode::BAD_REQUEST);
        }
        let res = app.send(from_client(Method::POST, "/api/auth/login")).await;
        assert_eq!(res.status, StatusCode::TOO_MANY_REQUESTS);
    }
}
