//! Portfolio project handlers.

use axum::{
    Json,
    extract::{Query, State},
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use crate::db::{CollectionRepository, RepositoryError};
use crate::error::{AppError, Result};
use crate::middleware::RequireSession;
use crate::models::project::next_id;
use crate::models::{Project, ProjectPatch};
use crate::state::AppState;

use super::ApiJson;

const NOT_FOUND: &str = "Project not found";

#[derive(Debug, Deserialize)]
pub struct IdQuery {
    pub id: Option<u64>,
}

fn repo(state: &AppState) -> CollectionRepository<'_, Project> {
    CollectionRepository::new(state.store())
}

fn not_found(err: RepositoryError) -> AppError {
    match err {
        RepositoryError::NotFound => AppError::NotFound(NOT_FOUND.to_string()),
        other => other.into(),
    }
}

/// GET /api/projects
#[instrument(skip_all)]
pub async fn list(State(state): State<AppState>) -> Json<serde_json::Value> {
    let projects = repo(&state).list_or_defaults().await;
    Json(json!({ "projects": projects }))
}

/// Add a project under the next free id.
///
/// POST /api/projects
#[instrument(skip_all, fields(user = %session.email))]
pub async fn create(
    State(state): State<AppState>,
    RequireSession(session): RequireSession,
    ApiJson(mut project): ApiJson<Project>,
) -> Result<Json<serde_json::Value>> {
    let now = Utc::now();
    project.created_at = Some(now);
    project.updated_at = Some(now);

    let project = repo(&state)
        .modify(move |projects| {
            project.id = next_id(projects);
            projects.push(project.clone());
            Ok(project)
        })
        .await?;

    tracing::info!(project_id = project.id, "Project created");
    Ok(Json(json!({ "project": project })))
}

/// Update the project named by the body's `id`.
///
/// PUT /api/projects
#[instrument(skip_all, fields(user = %session.email, project_id = patch.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireSession(session): RequireSession,
    ApiJson(patch): ApiJson<ProjectPatch>,
) -> Result<Json<serde_json::Value>> {
    let now = Utc::now();
    let project = repo(&state)
        .modify(move |projects| {
            let project = projects
                .iter_mut()
                .find(|p| p.id == patch.id)
                .ok_or(RepositoryError::NotFound)?;
            patch.apply(project, now);
            Ok(project.clone())
        })
        .await
        .map_err(not_found)?;

    Ok(Json(json!({ "project": project })))
}

/// DELETE /api/projects?id=
#[instrument(skip_all, fields(user = %session.email))]
pub async fn remove(
    State(state): State<AppState>,
    RequireSession(session): RequireSession,
    Query(query): Query<IdQuery>,
) -> Result<Json<serde_json::Value>> {
    let Some(id) = query.id else {
        return Err(AppError::BadRequest("ID manquant".to_string()));
    };

    repo(&state)
        .modify(move |projects| {
            let pos = projects
                .iter()
                .position(|p| p.id == id)
                .ok_or(RepositoryError::NotFound)?;
            projects.remove(pos);
            Ok(())
        })
        .await
        .map_err(not_found)?;

    tracing::info!(project_id = id, "Project deleted");
    Ok(Json(json!({ "success": true })))
}
