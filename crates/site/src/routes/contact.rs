//! GDPR data-subject requests from the privacy policy page.

use axum::{Json, extract::State};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::state::AppState;

use super::LenientJson;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DataRequestBody {
    pub name: String,
    pub email: String,
    pub request_type: String,
    pub message: String,
}

/// Mail subject label for a request type. Unknown types are used as-is.
fn request_label(kind: &str) -> &str {
    match kind {
        "access" => "Droit d'accès",
        "rectification" => "Rectification",
        "deletion" => "Suppression",
        "portability" => "Portabilité",
        "other" => "Autre demande",
        other => other,
    }
}

/// Forward a data request to the team mailbox.
///
/// POST /api/contact/dpd
#[instrument(skip_all, fields(request_type = %body.request_type))]
pub async fn data_request(
    State(state): State<AppState>,
    LenientJson(body): LenientJson<DataRequestBody>,
) -> Result<Json<serde_json::Value>> {
    let fields = [&body.name, &body.email, &body.request_type, &body.message];
    if fields.iter().any(|f| f.trim().is_empty()) {
        return Err(AppError::BadRequest("Tous les champs sont requis".to_string()));
    }

    let mailer = state
        .mailer()
        .ok_or_else(|| AppError::Mail("SMTP not configured".to_string()))?;
    mailer
        .send_data_request(
            &state.config().admin_email,
            &body.name,
            &body.email,
            request_label(&body.request_type),
            &body.message,
        )
        .await
        .map_err(|e| AppError::Mail(e.to_string()))?;

    tracing::info!("Data request forwarded");
    Ok(Json(json!({ "success": true })))
}
