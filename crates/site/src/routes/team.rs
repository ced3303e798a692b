//! Team member handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use crate::db::{CollectionRepository, RepositoryError};
use crate::error::{AppError, Result};
use crate::middleware::RequireSession;
use crate::models::team::{self, PLACEHOLDER_PHOTO};
use crate::models::{TeamMember, TeamMemberPatch};
use crate::state::AppState;

use super::{ApiJson, LenientJson};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ReorderBody {
    pub ids: Option<Vec<String>>,
}

fn repo(state: &AppState) -> CollectionRepository<'_, TeamMember> {
    CollectionRepository::new(state.store())
}

/// GET /api/team
#[instrument(skip_all)]
pub async fn list(State(state): State<AppState>) -> Json<serde_json::Value> {
    let mut members = repo(&state).list_or_defaults().await;
    team::sort_by_order(&mut members);
    Json(json!({ "ok": true, "team": members }))
}

/// Add a member at the end of the list.
///
/// POST /api/team
#[instrument(skip_all, fields(user = %session.email))]
pub async fn create(
    State(state): State<AppState>,
    RequireSession(session): RequireSession,
    LenientJson(mut member): LenientJson<TeamMember>,
) -> Result<(StatusCode, Json<serde_json::Value>)> {
    if member.name.trim().is_empty() || member.title.trim().is_empty() || member.email.trim().is_empty() {
        return Err(AppError::BadRequest("Missing fields".to_string()));
    }
    if member.photo.trim().is_empty() {
        member.photo = PLACEHOLDER_PHOTO.to_string();
    }
    member.id = uuid::Uuid::new_v4().to_string();

    let member = repo(&state)
        .modify(move |members| {
            member.order = i64::try_from(members.len()).unwrap_or(i64::MAX);
            members.push(member.clone());
            Ok(member)
        })
        .await?;

    tracing::info!(member_id = %member.id, "Team member created");
    Ok((StatusCode::CREATED, Json(json!({ "ok": true, "member": member }))))
}

/// PUT /api/team/{id}
#[instrument(skip(state, session, patch), fields(user = %session.email))]
pub async fn update(
    State(state): State<AppState>,
    RequireSession(session): RequireSession,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<TeamMemberPatch>,
) -> Result<Json<serde_json::Value>> {
    let member = repo(&state)
        .modify(move |members| {
            let member = members
                .iter_mut()
                .find(|m| m.id == id)
                .ok_or(RepositoryError::NotFound)?;
            patch.apply(member);
            Ok(member.clone())
        })
        .await?;

    Ok(Json(json!({ "ok": true, "member": member })))
}

/// Remove a member and close the gap in `order`.
///
/// DELETE /api/team/{id}
#[instrument(skip(state, session), fields(user = %session.email))]
pub async fn remove(
    State(state): State<AppState>,
    RequireSession(session): RequireSession,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>> {
    repo(&state)
        .modify(move |members| {
            team::sort_by_order(members);
            let pos = members
                .iter()
                .position(|m| m.id == id)
                .ok_or(RepositoryError::NotFound)?;
            members.remove(pos);
            team::reindex(members);
            Ok(())
        })
        .await?;

    Ok(Json(json!({ "ok": true })))
}

/// Put the listed ids first, in that order. Unlisted members follow.
///
/// POST /api/team/reorder
#[instrument(skip_all, fields(user = %session.email))]
pub async fn reorder(
    State(state): State<AppState>,
    RequireSession(session): RequireSession,
    LenientJson(body): LenientJson<ReorderBody>,
) -> Result<Json<serde_json::Value>> {
    let Some(ids) = body.ids else {
        return Err(AppError::BadRequest("ids required".to_string()));
    };

    let members = repo(&state)
        .modify(move |members| {
            team::sort_by_order(members);
            *members = team::reorder(std::mem::take(members), &ids);
            Ok(members.clone())
        })
        .await?;

    Ok(Json(json!({ "ok": true, "team": members })))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use super::super::testing::TestApp;

    fn ids(body: &serde_json::Value) -> Vec<String> {
        body["team"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["id"].as_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_delete_unknown_member_is_not_found() {
        let app = TestApp::new();
        let session = app.session_for("editor@angelivisions.com");
        let res = app
            .request(Method::DELETE, "/api/team/does-not-exist", None, Some(&session))
            .await;
        assert_eq!(res.status, StatusCode::NOT_FOUND);
        assert_eq!(res.body, json!({ "ok": false, "error": "Not found" }));
    }

    #[tokio::test]
    async fn test_create_validates_and_appends() {
        let app = TestApp::new();
        let session = app.session_for("editor@angelivisions.com");

        let res = app
            .request(Method::POST, "/api/team", Some(r#"{"name":"Noa"}"#), Some(&session))
            .await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST);
        assert_eq!(res.body["error"], "Missing fields");

        let res = app
            .request(
                Method::POST,
                "/api/team",
                Some(r#"{"name":"Noa","title":"Son","email":"noa@angelivisions.com"}"#),
                Some(&session),
            )
            .await;
        assert_eq!(res.status, StatusCode::CREATED);
        assert_eq!(res.body["member"]["order"], 3);
        assert_eq!(res.body["member"]["photo"], "/placeholder.svg?height=240&width=240");
    }

    #[tokio::test]
    async fn test_delete_reindexes_and_reorder() {
        let app = TestApp::new();
        let session = app.session_for("editor@angelivisions.com");

        let res = app
            .request(Method::DELETE, "/api/team/t-1", None, Some(&session))
            .await;
        assert_eq!(res.body["ok"], true);
        let res = app.get("/api/team").await;
        assert_eq!(ids(&res.body), vec!["t-2", "t-3"]);
        assert_eq!(res.body["team"][0]["order"], 0);
        assert_eq!(res.body["team"][1]["order"], 1);

        let res = app
            .request(Method::POST, "/api/team/reorder", Some(r#"{"ids":["t-3"]}"#), Some(&session))
            .await;
        assert_eq!(ids(&res.body), vec!["t-3", "t-2"]);

        let res = app
            .request(Method::POST, "/api/team/reorder", Some("{}"), Some(&session))
            .await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_update_member() {
        let app = TestApp::new();
        let session = app.session_for("editor@angelivisions.com");
        let res = app
            .request(Method::PUT, "/api/team/t-2", Some(r#"{"title":"Régie"}"#), Some(&session))
            .await;
        assert_eq!(res.body["member"]["title"], "Régie");
        assert_eq!(res.body["member"]["name"], "Alex Martin");

        let res = app
            .request(Method::PUT, "/api/team/ghost", Some(r#"{"title":"x"}"#), Some(&session))
            .await;
        assert_eq!(res.status, StatusCode::NOT_FOUND);
    }
}
