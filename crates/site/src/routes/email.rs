//! SMTP check for the back-office settings page.

use axum::{Json, extract::State};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::RequireAdmin;
use crate::state::AppState;

use super::LenientJson;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TestEmailBody {
    /// Recipient; the sender address when absent.
    pub to: Option<String>,
}

/// Send a test message through the configured relay.
///
/// POST /api/email/test
#[instrument(skip_all, fields(by = %admin.email))]
pub async fn send_test(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    LenientJson(body): LenientJson<TestEmailBody>,
) -> Result<Json<serde_json::Value>> {
    let mailer = state
        .mailer()
        .ok_or_else(|| AppError::Mail("SMTP not configured".to_string()))?;
    let to = body
        .to
        .map(|to| to.trim().to_string())
        .filter(|to| !to.is_empty())
        .unwrap_or_else(|| mailer.sender());

    let sent_at = Utc::now().format("%d/%m/%Y %H:%M:%S UTC").to_string();
    mailer
        .send_test(&to, &state.config().base_url, &sent_at)
        .await
        .map_err(|e| AppError::Mail(e.to_string()))?;

    add_breadcrumb("email", "Test email sent", Some(&[("to", to.as_str())]));
    tracing::info!(to = %to, "Test email sent");
    Ok(Json(json!({ "ok": true })))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::{Method, StatusCode};
    use lettre::transport::stub::AsyncStubTransport;
    use secrecy::SecretString;

    use super::super::testing::TestApp;
    use crate::config::EmailConfig;
    use crate::services::email::EmailService;

    fn mailer(stub: &AsyncStubTransport) -> EmailService {
        let config = EmailConfig {
            smtp_host: "smtp.example.com".to_string(),
            smtp_port: 587,
            smtp_username: "mailer@angelivisions.com".to_string(),
            smtp_password: SecretString::from("password"),
            from_address: "mailer@angelivisions.com".to_string(),
            from_name: Some("Angeli Visions".to_string()),
            reply_to: None,
        };
        EmailService::with_stub(&config, stub.clone()).unwrap()
    }

    #[tokio::test]
    async fn test_requires_admin() {
        let stub = AsyncStubTransport::new_ok();
        let app = TestApp::with_mailer(mailer(&stub));
        let res = app.post("/api/email/test", Some("{}")).await;
        assert_eq!(res.status, StatusCode::UNAUTHORIZED);

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
            .request(Method::POST, "/api/email/test", Some("{}"), Some(&editor))
            .await;
        assert_eq!(res.status, StatusCode::FORBIDDEN);
        assert!(stub.messages().await.is_empty());
    }

    #[tokio::test]
    async fn test_sends_to_requested_or_sender_address() {
        let stub = AsyncStubTransport::new_ok();
        let app = TestApp::with_mailer(mailer(&stub));
        let admin = app.bootstrap_admin().await;

        let res = app
            .request(
                Method::POST,
                "/api/email/test",
                Some(r#"{"to":"ops@angelivisions.com"}"#),
                Some(&admin),
            )
            .await;
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.body["ok"], true);

        let res = app.request(Method::POST, "/api/email/test", None, Some(&admin)).await;
        assert_eq!(res.status, StatusCode::OK);

        let recipients: Vec<String> = stub
            .messages()
            .await
            .iter()
            .map(|(envelope, _)| envelope.to().first().unwrap().to_string())
            .collect();
        assert_eq!(recipients, vec!["ops@angelivisions.com", "mailer@angelivisions.com"]);
    }

    #[tokio::test]
    async fn test_missing_or_failing_mailer() {
        let app = TestApp::new();
        let admin = app.bootstrap_admin().await;
        let res = app.request(Method::POST, "/api/email/test", None, Some(&admin)).await;
        assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(res.body["error"], "Erreur lors de l'envoi du message");

        let app = TestApp::with_mailer(mailer(&AsyncStubTransport::new_error()));
        let admin = app.bootstrap_admin().await;
        let res = app.request(Method::POST, "/api/email/test", None, Some(&admin)).await;
        assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(res.body["ok"], false);
    }
}
