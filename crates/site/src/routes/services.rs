//! Service catalogue handlers. The catalogue is saved as a whole.

use axum::{Json, extract::State};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use crate::db::CollectionRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireSession;
use crate::models::ServiceItem;
use crate::state::AppState;

use super::LenientJson;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ServicesBody {
    pub services: Option<Vec<ServiceItem>>,
}

/// GET /api/services
#[instrument(skip_all)]
pub async fn list(State(state): State<AppState>) -> Json<serde_json::Value> {
    let services = CollectionRepository::<ServiceItem>::new(state.store())
        .list_or_defaults()
        .await;
    Json(json!({ "services": services }))
}

/// Replace the catalogue.
///
/// POST /api/services
#[instrument(skip_all, fields(user = %session.email))]
pub async fn replace(
    State(state): State<AppState>,
    RequireSession(session): RequireSession,
    LenientJson(body): LenientJson<ServicesBody>,
) -> Result<Json<serde_json::Value>> {
    let Some(services) = body.services else {
        return Err(AppError::BadRequest("Services must be an array".to_string()));
    };

    CollectionRepository::<ServiceItem>::new(state.store())
        .save(&services)
        .await?;
    tracing::info!(count = services.len(), "Services saved");
    Ok(Json(json!({ "success": true })))
}
