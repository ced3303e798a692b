//! Back-office account management.
//!
//! While no account exists the list and create routes are open so the first
//! admin can be set up; afterwards every route requires an admin session.

use angeli_core::{Role, UserId};
use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use crate::db::UserRepository;
use crate::error::{AppError, Result, add_breadcrumb, clear_sentry_user};
use crate::middleware::RequireAdmin;
use crate::middleware::auth::{ROLE_COOKIE, append_cookie, removal_cookie, role_cookie};
use crate::models::{PublicUser, UserPatch};
use crate::services::auth::{AuthError, NewAccount, hash_password, validate_password};
use crate::state::AppState;

use super::{ApiJson, LenientJson};

#[derive(Default, Deserialize)]
#[serde(default)]
pub struct CreateUserBody {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Option<Role>,
    pub active: Option<bool>,
}

/// Account edit: the patchable fields plus an optional new password.
#[derive(Deserialize)]
pub struct UpdateUserBody {
    #[serde(flatten)]
    pub patch: UserPatch,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Default, Deserialize)]
#[serde(default)]
pub struct CredentialsBody {
    pub email: String,
    pub password: String,
}

async fn bootstrap_open(state: &AppState) -> Result<bool> {
    Ok(UserRepository::new(state.store()).count().await? == 0)
}

fn parse_id(id: &str) -> Result<UserId> {
    UserId::parse(id).map_err(|_| AppError::not_found())
}

/// List accounts.
///
/// GET /api/admin/users
#[instrument(skip_all)]
pub async fn list(
    State(state): State<AppState>,
    admin: std::result::Result<RequireAdmin, AppError>,
) -> Result<Json<Vec<PublicUser>>> {
    let users = UserRepository::new(state.store()).list().await?;
    if !users.is_empty() {
        admin?;
    }
    Ok(Json(users.iter().map(PublicUser::from).collect()))
}

/// Create an account. The very first one is always an admin.
///
/// POST /api/admin/users
#[instrument(skip_all)]
pub async fn create(
    State(state): State<AppState>,
    admin: std::result::Result<RequireAdmin, AppError>,
    LenientJson(body): LenientJson<CreateUserBody>,
) -> Result<Response> {
    if body.name.trim().is_empty() || body.email.trim().is_empty() || body.password.is_empty() {
        return Err(AppError::BadRequest("Champs requis: name, email, password".to_string()));
    }

    let now = Utc::now();
    let user = if bootstrap_open(&state).await? {
        let account = NewAccount {
            name: &body.name,
            email: &body.email,
            password: &body.password,
            role: Role::Admin,
            active: true,
        };
        let user = state.auth().bootstrap(&account, now).await?;
        tracing::info!(email = %user.email, "First admin created through user management");
        user
    } else {
        let RequireAdmin(admin) = admin?;
        let account = NewAccount {
            name: &body.name,
            email: &body.email,
            password: &body.password,
            role: body.role.unwrap_or_default(),
            active: body.active.unwrap_or(true),
        };
        let user = state.auth().create_account(&account, now).await?;
        add_breadcrumb(
            "admin.users",
            "Account created",
            Some(&[("by", admin.email.as_str()), ("role", user.role.as_str())]),
        );
        tracing::info!(email = %user.email, role = user.role.as_str(), by = %admin.email, "Account created");
        user
    };

    Ok((StatusCode::CREATED, Json(PublicUser::from(&user))).into_response())
}

/// Edit name, email, role, active flag or password.
///
/// Refused when it would leave no active admin.
///
/// PUT /api/admin/users/{id}
#[instrument(skip(state, admin, body))]
pub async fn update(
    State(state): State<AppState>,
    admin: std::result::Result<RequireAdmin, AppError>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<UpdateUserBody>,
) -> Result<Json<PublicUser>> {
    if bootstrap_open(&state).await? {
        return Err(AppError::BadRequest("Indisponible pendant l'initialisation".to_string()));
    }
    let RequireAdmin(admin) = admin?;
    let id = parse_id(&id)?;

    let password_hash = match body.password.as_deref() {
        Some(password) if !password.is_empty() => {
            validate_password(password)?;
            Some(hash_password(password).await?)
        }
        _ => None,
    };
    let password_changed = password_hash.is_some();

    let user = UserRepository::new(state.store())
        .update(id, body.patch, password_hash, Utc::now())
        .await?;
    tracing::info!(user_id = %id, by = %admin.email, password_changed, "Account updated");
    Ok(Json(PublicUser::from(&user)))
}

/// Delete an account. The last active admin cannot be deleted.
///
/// DELETE /api/admin/users/{id}
#[instrument(skip(state, admin))]
pub async fn remove(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>> {
    let id = parse_id(&id)?;
    let removed = UserRepository::new(state.store()).remove(id).await?;
    add_breadcrumb(
        "admin.users",
        "Account deleted",
        Some(&[("by", admin.email.as_str()), ("email", removed.email.as_str())]),
    );
    tracing::info!(email = %removed.email, by = %admin.email, "Account deleted");
    Ok(Json(json!({ "ok": true })))
}

/// Legacy credential check for the old back-office screens.
///
/// Sets the `av_role` hint and a real session cookie; gates only trust the
/// session.
///
/// POST /api/admin/users/auth
#[instrument(skip_all)]
pub async fn role_login(
    State(state): State<AppState>,
    LenientJson(body): LenientJson<CredentialsBody>,
) -> Result<Response> {
    if body.email.trim().is_empty() || body.password.is_empty() {
        return Err(AppError::BadRequest("Email et mot de passe requis".to_string()));
    }

    let user = match state.auth().login(&body.email, &body.password, None).await {
        Ok(user) => user,
        Err(AuthError::InvalidCredentials | AuthError::AccountDisabled) => {
            return Err(AppError::Unauthorized("Identifiants invalides".to_string()));
        }
        Err(e) => return Err(e.into()),
    };

    let mut headers = HeaderMap::new();
    append_cookie(&mut headers, &role_cookie(user.role));
    super::auth::start_session(&state, &mut headers, &user.email)?;

    Ok((
        headers,
        Json(json!({
            "user": {
                "email": user.email,
                "role": user.role,
                "name": user.name,
            },
        })),
    )
        .into_response())
}

/// Clear the legacy role cookie.
///
/// DELETE /api/admin/users/auth
#[instrument(skip_all)]
pub async fn role_logout(State(state): State<AppState>) -> impl IntoResponse {
    let mut headers = HeaderMap::new();
    append_cookie(&mut headers, &removal_cookie(ROLE_COOKIE, state.config().secure_cookies()));
    clear_sentry_user();
    (headers, Json(json!({ "ok": true })))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::{Method, StatusCode, header::SET_COOKIE};

    use super::super::testing::{ADMIN_EMAIL, ADMIN_PASSWORD, TestApp, cookie_pair};

    #[tokio::test]
    async fn test_first_account_is_admin_then_gate_closes() {
        let app = TestApp::new();

        let res = app.get("/api/admin/users").await;
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.body, serde_json::json!([]));

        let res = app
            .post(
                "/api/admin/users",
                Some(r#"{"name":"First","email":"first@angelivisions.com","password":"supersecret","role":"guest"}"#),
            )
            .await;
        assert_eq!(res.status, StatusCode::CREATED);
        assert_eq!(res.body["role"], "admin");
        assert!(res.body.get("passwordHash").is_none());

        let res = app.get("/api/admin/users").await;
        assert_eq!(res.status, StatusCode::UNAUTHORIZED);

        let res = app
            .post(
                "/api/admin/users",
                Some(r#"{"name":"Second","email":"second@angelivisions.com","password":"supersecret"}"#),
            )
            .await;
        assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_admin_manages_accounts() {
        let app = TestApp::new();
        let admin = app.bootstrap_admin().await;

        let res = app
            .request(
                Method::POST,
                "/api/admin/users",
                Some(r#"{"name":"Ed","email":"ed@angelivisions.com","password":"editorpass"}"#),
                Some(&admin),
            )
            .await;
        assert_eq!(res.status, StatusCode::CREATED);
        assert_eq!(res.body["role"], "editor");
        assert_eq!(res.body["active"], true);
        let id = res.body["id"].as_str().unwrap().to_string();

        let res = app
            .request(
                Method::POST,
                "/api/admin/users",
                Some(r#"{"name":"Ed","email":"ED@angelivisions.com","password":"editorpass"}"#),
                Some(&admin),
            )
            .await;
        assert_eq!(res.status, StatusCode::CONFLICT);

        let res = app
            .request(
                Method::PUT,
                &format!("/api/admin/users/{id}"),
                Some(r#"{"active":false}"#),
                Some(&admin),
            )
            .await;
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.body["active"], false);

        let res = app
            .request(Method::GET, "/api/admin/users", None, Some(&admin))
            .await;
        assert_eq!(res.body.as_array().unwrap().len(), 2);

        let res = app
            .request(Method::DELETE, &format!("/api/admin/users/{id}"), None, Some(&admin))
            .await;
        assert_eq!(res.body["ok"], true);

        let res = app
            .request(Method::DELETE, &format!("/api/admin/users/{id}"), None, Some(&admin))
            .await;
        assert_eq!(res.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_admin_changes_email_and_password() {
        let app = TestApp::new();
        let admin = app.bootstrap_admin().await;
        let res = app
            .request(
                Method::POST,
                "/api/admin/users",
                Some(r#"{"name":"Ed","email":"ed@angelivisions.com","password":"editorpass"}"#),
                Some(&admin),
            )
            .await;
        let id = res.body["id"].as_str().unwrap().to_string();

        let res = app
            .request(
                Method::PUT,
                &format!("/api/admin/users/{id}"),
                Some(r#"{"email":"eddy@angelivisions.com","password":"brandnewpass"}"#),
                Some(&admin),
            )
            .await;
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.body["email"], "eddy@angelivisions.com");
        assert!(res.body.get("passwordHash").is_none());

        let res = app
            .post(
                "/api/auth/login",
                Some(r#"{"email":"eddy@angelivisions.com","password":"brandnewpass"}"#),
            )
            .await;
        assert_eq!(res.status, StatusCode::OK);

        let res = app
            .post(
                "/api/auth/login",
                Some(r#"{"email":"ed@angelivisions.com","password":"editorpass"}"#),
            )
            .await;
        assert_eq!(res.status, StatusCode::UNAUTHORIZED);

        let body = format!(r#"{{"email":"{ADMIN_EMAIL}"}}"#);
        let res = app
            .request(Method::PUT, &format!("/api/admin/users/{id}"), Some(&body), Some(&admin))
            .await;
        assert_eq!(res.status, StatusCode::CONFLICT);
        assert_eq!(res.body["error"], "Email déjà utilisé");

        let res = app
            .request(
                Method::PUT,
                &format!("/api/admin/users/{id}"),
                Some(r#"{"password":"short"}"#),
                Some(&admin),
            )
            .await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_last_admin_cannot_be_removed_or_demoted() {
        let app = TestApp::new();
        let admin = app.bootstrap_admin().await;
        let users = app
            .request(Method::GET, "/api/admin/users", None, Some(&admin))
            .await;
        let id = users.body[0]["id"].as_str().unwrap().to_string();

        for body in [r#"{"role":"editor"}"#, r#"{"active":false}"#] {
            let res = app
                .request(Method::PUT, &format!("/api/admin/users/{id}"), Some(body), Some(&admin))
                .await;
            assert_eq!(res.status, StatusCode::BAD_REQUEST);
            assert_eq!(res.body["error"], "Au moins un administrateur actif est requis");
        }

        let res = app
            .request(Method::DELETE, &format!("/api/admin/users/{id}"), None, Some(&admin))
            .await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST);

        // Still signed in as an admin, and the bootstrap gate stays closed
        let res = app
            .request(Method::GET, "/api/admin/users", None, Some(&admin))
            .await;
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.body[0]["role"], "admin");
        assert_eq!(res.body[0]["active"], true);
    }

    #[tokio::test]
    async fn test_editor_session_is_forbidden() {
        let app = TestApp::new();
        let admin = app.bootstrap_admin().await;
        app.request(
            Method::POST,
            "/api/admin/users",
            Some(r#"{"name":"Ed","email":"ed@angelivisions.com","password":"editorpass"}"#),
            Some(&admin),
        )
        .await;

        let editor = app.session_for("ed@angelivisions.com");
        let res = app
            .request(Method::GET, "/api/admin/users", None, Some(&editor))
            .await;
        assert_eq!(res.status, StatusCode::FORBIDDEN);
        assert_eq!(res.body["error"], "Accès administrateur requis");
    }

    #[tokio::test]
    async fn test_update_refused_during_bootstrap() {
        let app = TestApp::new();
        let res = app
            .request(
                Method::PUT,
                "/api/admin/users/00000000-0000-0000-0000-000000000000",
                Some(r#"{"name":"x"}"#),
                None,
            )
            .await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_legacy_role_login() {
        let app = TestApp::new();
        app.bootstrap_admin().await;

        let body = format!(r#"{{"email":"{ADMIN_EMAIL}","password":"{ADMIN_PASSWORD}"}}"#);
        let res = app.post("/api/admin/users/auth", Some(&body)).await;
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.body["user"]["role"], "admin");
        assert_eq!(cookie_pair(&res.headers, "av_role").as_deref(), Some("av_role=admin"));
        assert!(cookie_pair(&res.headers, "av_session").is_some());

        let res = app
            .post(
                "/api/admin/users/auth",
                Some(r#"{"email":"admin@angelivisions.com","password":"wrongpass"}"#),
            )
            .await;
        assert_eq!(res.status, StatusCode::UNAUTHORIZED);
        assert_eq!(res.body["error"], "Identifiants invalides");

        let res = app.post("/api/admin/users/auth", Some("{}")).await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST);

        let res = app
            .request(Method::DELETE, "/api/admin/users/auth", None, None)
            .await;
        assert_eq!(res.body["ok"], true);
        assert!(res.headers.get(SET_COOKIE).is_some());
    }
}
