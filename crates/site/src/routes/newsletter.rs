//! Newsletter subscription, administration and self-service preferences.

use angeli_core::{Email, Locale};
use axum::{
    Json,
    extract::{Query, State},
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use crate::db::NewsletterRepository;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::RequireAdmin;
use crate::models::Subscriber;
use crate::state::AppState;

use super::LenientJson;

const INVALID_TOKEN: &str = "Token invalide ou expiré";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SubscribeBody {
    pub name: String,
    pub email: String,
    pub consent: bool,
    pub lang: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RemoveBody {
    pub email: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChangeEmailBody {
    pub old_email: String,
    pub new_email: String,
}

#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    pub token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PreferencesBody {
    pub token: String,
    pub action: String,
    pub name: String,
}

/// Subscribe an address. Re-subscribing replaces the earlier record.
///
/// POST /api/newsletter
#[instrument(skip_all)]
pub async fn subscribe(
    State(state): State<AppState>,
    LenientJson(body): LenientJson<SubscribeBody>,
) -> Result<Json<serde_json::Value>> {
    let email = Email::parse(&body.email).map_err(|_| AppError::BadRequest("Email invalide".to_string()))?;
    let locale = Locale::from_tag_or_default(&body.lang);
    let now = Utc::now();
    let subscriber = Subscriber::new(
        body.name.trim().to_string(),
        email.as_str().to_string(),
        body.consent,
        locale,
        now,
    );

    NewsletterRepository::new(state.store()).subscribe(&subscriber).await?;
    tracing::info!(email = %email, lang = locale.as_str(), "Newsletter subscription");

    notify_subscription(&state, &subscriber, locale, &now.format("%d/%m/%Y %H:%M").to_string()).await;
    Ok(Json(json!({ "success": true })))
}

/// Welcome mail to the subscriber and a notice to the team. Failures are logged.
async fn notify_subscription(state: &AppState, subscriber: &Subscriber, locale: Locale, date: &str) {
    let Some(mailer) = state.mailer() else {
        tracing::debug!("SMTP not configured, skipping newsletter mails");
        return;
    };

    let preferences_url = format!(
        "{}/{}/newsletter/preferences?token={}",
        state.config().base_url,
        locale.as_str(),
        urlencoding::encode(subscriber.token.as_deref().unwrap_or_default())
    );
    if let Err(e) = mailer
        .send_newsletter_welcome(&subscriber.email, &subscriber.name, &preferences_url, locale)
        .await
    {
        tracing::warn!(error = %e, "Failed to send newsletter welcome email");
    }

    let admin = &state.config().admin_email;
    if let Err(e) = mailer
        .send_newsletter_admin(admin, &subscriber.name, &subscriber.email, date)
        .await
    {
        tracing::warn!(error = %e, "Failed to send newsletter admin notification");
    }
}

/// GET /api/newsletter
#[instrument(skip_all)]
pub async fn list(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<serde_json::Value>> {
    let subscribers = NewsletterRepository::new(state.store()).list().await?;
    Ok(Json(json!({ "subscribers": subscribers })))
}

/// DELETE /api/newsletter
#[instrument(skip_all)]
pub async fn remove(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    LenientJson(body): LenientJson<RemoveBody>,
) -> Result<Json<serde_json::Value>> {
    if body.email.trim().is_empty() {
        return Err(AppError::BadRequest("Email requis".to_string()));
    }
    NewsletterRepository::new(state.store()).unsubscribe(&body.email).await?;
    add_breadcrumb(
        "admin.newsletter",
        "Subscriber removed",
        Some(&[("by", admin.email.as_str())]),
    );
    Ok(Json(json!({ "success": true })))
}

/// PATCH /api/newsletter
#[instrument(skip_all)]
pub async fn change_email(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    LenientJson(body): LenientJson<ChangeEmailBody>,
) -> Result<Json<serde_json::Value>> {
    if body.old_email.trim().is_empty() || body.new_email.trim().is_empty() {
        return Err(AppError::BadRequest("Emails requis".to_string()));
    }
    let new_email =
        Email::parse(&body.new_email).map_err(|_| AppError::BadRequest("Email invalide".to_string()))?;
    NewsletterRepository::new(state.store())
        .change_email(&body.old_email, new_email.as_str())
        .await?;
    Ok(Json(json!({ "success": true })))
}

/// What the preferences page shows for a token.
///
/// GET /api/newsletter/preferences?token=
#[instrument(skip_all)]
pub async fn preferences(
    State(state): State<AppState>,
    Query(query): Query<TokenQuery>,
) -> Result<Json<serde_json::Value>> {
    let Some(token) = query.token.filter(|t| !t.is_empty()) else {
        return Err(AppError::BadRequest("Token requis".to_string()));
    };
    let subscriber = NewsletterRepository::new(state.store())
        .find_by_token(&token)
        .await?
        .ok_or_else(|| AppError::NotFound(INVALID_TOKEN.to_string()))?;

    Ok(Json(json!({
        "name": subscriber.name,
        "email": subscriber.email,
        "consentGiven": subscriber.consent_given,
    })))
}

/// Unsubscribe or rename through the preferences page.
///
/// POST /api/newsletter/preferences
#[instrument(skip_all, fields(action = %body.action))]
pub async fn update_preferences(
    State(state): State<AppState>,
    LenientJson(body): LenientJson<PreferencesBody>,
) -> Result<Json<serde_json::Value>> {
    if body.token.is_empty() {
        return Err(AppError::BadRequest("Token requis".to_string()));
    }
    let repo = NewsletterRepository::new(state.store());
    let subscriber = repo
        .find_by_token(&body.token)
        .await?
        .ok_or_else(|| AppError::NotFound(INVALID_TOKEN.to_string()))?;

    match body.action.as_str() {
        "unsubscribe" => {
            repo.unsubscribe(&subscriber.email).await?;
            tracing::info!(email = %subscriber.email, "Unsubscribed from preferences page");
            Ok(Json(json!({ "success": true, "message": "Désinscription confirmée" })))
        }
        "update" => {
            let name = body.name.trim();
            if !name.is_empty() {
                repo.rename(&subscriber.email, name).await?;
            }
            Ok(Json(json!({ "success": true, "message": "Préférences mises à jour" })))
        }
        _ => Err(AppError::BadRequest("Action invalide".to_string())),
    }
}
