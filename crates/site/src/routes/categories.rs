//! Portfolio category handlers.

use axum::{Json, extract::State};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use crate::db::CollectionRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireSession;
use crate::models::category::count_projects;
use crate::models::{Category, Project};
use crate::state::AppState;

use super::LenientJson;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CategoriesBody {
    pub categories: Option<Vec<Category>>,
}

/// Categories with their live project counts.
///
/// GET /api/categories
#[instrument(skip_all)]
pub async fn list(State(state): State<AppState>) -> Json<serde_json::Value> {
    let mut categories = CollectionRepository::<Category>::new(state.store())
        .list_or_defaults()
        .await;
    let projects = CollectionRepository::<Project>::new(state.store())
        .list_or_defaults()
        .await;
    count_projects(&mut categories, &projects);
    Json(json!({ "categories": categories }))
}

/// Replace the category list.
///
/// POST /api/categories
#[instrument(skip_all, fields(user = %session.email))]
pub async fn replace(
    State(state): State<AppState>,
    RequireSession(session): RequireSession,
    LenientJson(body): LenientJson<CategoriesBody>,
) -> Result<Json<serde_json::Value>> {
    let Some(mut categories) = body.categories else {
        return Err(AppError::BadRequest("Categories must be an array".to_string()));
    };
    for category in &mut categories {
        category.project_count = 0;
    }

    CollectionRepository::<Category>::new(state.store())
        .save(&categories)
        .await?;
    tracing::info!(count = categories.len(), "Categories saved");
    Ok(Json(json!({ "success": true })))
}
