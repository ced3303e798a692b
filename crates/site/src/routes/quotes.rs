//! Quote ("devis") requests from the public event form.
//!
//! Responses use the `{"success": ..., "message": ...}` shape the form expects.

use axum::{Json, extract::State};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use crate::db::QuoteRepository;
use crate::error::{AppError, FormError};
use crate::middleware::RequireAdmin;
use crate::models::{QuoteForm, QuoteRequest};
use crate::state::AppState;

use super::LenientJson;

type FormResult<T> = std::result::Result<T, FormError>;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RemoveBody {
    pub id: String,
}

/// Store a quote request and mail the team and the client.
///
/// POST /api/devis
#[instrument(skip_all)]
pub async fn submit(
    State(state): State<AppState>,
    LenientJson(form): LenientJson<QuoteForm>,
) -> FormResult<Json<serde_json::Value>> {
    if form.name.trim().is_empty() || form.email.trim().is_empty() {
        return Err(AppError::BadRequest("Nom et email requis.".to_string()).into());
    }
    if !form.consent {
        return Err(AppError::BadRequest("Le consentement RGPD est requis.".to_string()).into());
    }
    if !state.captcha().verify(&form.captcha_token).await {
        return Err(AppError::BadRequest("Captcha invalide.".to_string()).into());
    }

    let request = QuoteRequest::from_form(form, Utc::now());
    QuoteRepository::new(state.store()).create(&request).await?;
    tracing::info!(quote_id = %request.id, event_type = %request.event_type, "Quote request stored");

    notify_quote(&state, &request).await;
    Ok(Json(json!({ "success": true })))
}

async fn notify_quote(state: &AppState, request: &QuoteRequest) {
    let Some(mailer) = state.mailer() else {
        tracing::warn!(quote_id = %request.id, "SMTP not configured, quote stored without notification");
        return;
    };
    let team = &state.config().admin_email;

    if let Err(e) = mailer.send_quote_admin(team, request).await {
        tracing::error!(quote_id = %request.id, error = %e, "Failed to send quote to the team");
    }
    if let Err(e) = mailer.send_quote_client(&request.email, &request.name, team).await {
        tracing::warn!(quote_id = %request.id, error = %e, "Failed to send quote confirmation");
    }
}

/// GET /api/devis
#[instrument(skip_all)]
pub async fn list(
    State(state): State<AppState>,
    admin: std::result::Result<RequireAdmin, AppError>,
) -> FormResult<Json<serde_json::Value>> {
    admin?;
    let requests = QuoteRepository::new(state.store()).list().await?;
    Ok(Json(json!({ "success": true, "devis": requests })))
}

/// DELETE /api/devis
#[instrument(skip_all)]
pub async fn remove(
    State(state): State<AppState>,
    admin: std::result::Result<RequireAdmin, AppError>,
    LenientJson(body): LenientJson<RemoveBody>,
) -> FormResult<Json<serde_json::Value>> {
    let RequireAdmin(admin) = admin?;
    if body.id.trim().is_empty() {
        return Err(AppError::BadRequest("ID requis.".to_string()).into());
    }
    QuoteRepository::new(state.store()).remove(body.id.trim()).await?;
    tracing::info!(quote_id = %body.id, by = %admin.email, "Quote request deleted");
    Ok(Json(json!({ "success": true })))
}
