//! Email service for password resets, newsletter and form notifications.
//!
//! Uses SMTP via lettre for delivery with Askama HTML templates. Handler
//! tests swap the relay for lettre's stub transport.

use angeli_core::Locale;
use askama::Template;
use lettre::{
    Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use crate::config::EmailConfig;
use crate::models::QuoteRequest;

/// Port on which the server expects TLS from the first byte.
const IMPLICIT_TLS_PORT: u16 = 465;

#[derive(Template)]
#[template(path = "email/password_reset.html")]
struct PasswordResetHtml<'a> {
    name: &'a str,
    reset_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/password_reset.txt")]
struct PasswordResetText<'a> {
    name: &'a str,
    reset_url: &'a str,
}

/// Per-locale wording of the newsletter welcome email.
#[derive(Debug)]
pub struct NewsletterCopy {
    pub subject: &'static str,
    pub title: &'static str,
    pub greeting: &'static str,
    pub body: &'static str,
    pub manage: &'static str,
    pub button: &'static str,
    pub footer: &'static str,
}

const NEWSLETTER_FR: NewsletterCopy = NewsletterCopy {
    subject: "Bienvenue à la Newsletter Angeli Visions",
    title: "Bienvenue !",
    greeting: "Bonjour",
    body: "Merci de vous être inscrit à la newsletter d'Angeli Visions. Vous recevrez bientôt nos dernières actualités et événements.",
    manage: "Vous pouvez gérer vos préférences ou vous désinscrire à tout moment en cliquant sur le lien ci-dessous :",
    button: "Gérer mes préférences",
    footer: "Si vous n'êtes pas à l'origine de cette inscription, vous pouvez ignorer cet email.",
};

const NEWSLETTER_EN: NewsletterCopy = NewsletterCopy {
    subject: "Welcome to Angeli Visions Newsletter",
    title: "Welcome!",
    greeting: "Hello",
    body: "Thank you for subscribing to the Angeli Visions newsletter. You will soon receive our latest news and events.",
    manage: "You can manage your preferences or unsubscribe at any time by clicking the link below:",
    button: "Manage my preferences",
    footer: "If you did not sign up for this newsletter, you can ignore this email.",
};

const NEWSLETTER_ES: NewsletterCopy = NewsletterCopy {
    subject: "Bienvenido al boletín de Angeli Visions",
    title: "¡Bienvenido!",
    greeting: "Hola",
    body: "Gracias por suscribirte al boletín de Angeli Visions. Pronto recibirás nuestras últimas noticias y eventos.",
    manage: "Puedes gestionar tus preferencias o darte de baja en cualquier momento haciendo clic en el siguiente enlace:",
    button: "Gestionar mis preferencias",
    footer: "Si no te has inscrito a este boletín, puedes ignorar este correo.",
};

#[must_use]
pub const fn newsletter_copy(locale: Locale) -> &'static NewsletterCopy {
    match locale {
        Locale::Fr => &NEWSLETTER_FR,
        Locale::En => &NEWSLETTER_EN,
        Locale::Es => &NEWSLETTER_ES,
    }
}

#[derive(Template)]
#[template(path = "email/newsletter_welcome.html")]
struct NewsletterWelcomeHtml<'a> {
    lang: &'a str,
    copy: &'a NewsletterCopy,
    name: &'a str,
    preferences_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/newsletter_welcome.txt")]
struct NewsletterWelcomeText<'a> {
    copy: &'a NewsletterCopy,
    name: &'a str,
    preferences_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/newsletter_admin.html")]
struct NewsletterAdminHtml<'a> {
    name: &'a str,
    email: &'a str,
    date: &'a str,
}

#[derive(Template)]
#[template(path = "email/newsletter_admin.txt")]
struct NewsletterAdminText<'a> {
    name: &'a str,
    email: &'a str,
    date: &'a str,
}

#[derive(Template)]
#[template(path = "email/quote_admin.html")]
struct QuoteAdminHtml<'a> {
    request: &'a QuoteRequest,
}

#[derive(Template)]
#[template(path = "email/quote_admin.txt")]
struct QuoteAdminText<'a> {
    request: &'a QuoteRequest,
}

#[derive(Template)]
#[template(path = "email/quote_client.html")]
struct QuoteClientHtml<'a> {
    name: &'a str,
}

#[derive(Template)]
#[template(path = "email/quote_client.txt")]
struct QuoteClientText<'a> {
    name: &'a str,
}

#[derive(Template)]
#[template(path = "email/smtp_test.html")]
struct SmtpTestHtml<'a> {
    origin: &'a str,
    sent_at: &'a str,
}

#[derive(Template)]
#[template(path = "email/smtp_test.txt")]
struct SmtpTestText<'a> {
    origin: &'a str,
    sent_at: &'a str,
}

#[derive(Template)]
#[template(path = "email/data_request.html")]
struct DataRequestHtml<'a> {
    name: &'a str,
    email: &'a str,
    request_label: &'a str,
    message: &'a str,
}

#[derive(Template)]
#[template(path = "email/data_request.txt")]
struct DataRequestText<'a> {
    name: &'a str,
    email: &'a str,
    request_label: &'a str,
    message: &'a str,
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    /// Stub transport configured to fail.
    #[cfg(test)]
    #[error("Stub transport error: {0}")]
    Stub(#[from] lettre::transport::stub::Error),
}

fn mailbox(address: &str, name: Option<&str>) -> Result<Mailbox, EmailError> {
    let address: Address = address
        .trim()
        .parse()
        .map_err(|_| EmailError::InvalidAddress(address.to_string()))?;
    Ok(Mailbox::new(name.map(ToString::to_string), address))
}

/// A rendered message ready to send.
struct Outgoing<'a> {
    to: &'a str,
    subject: &'a str,
    text: String,
    html: String,
    reply_to: Option<&'a str>,
}

#[derive(Clone)]
enum Transport {
    Smtp(AsyncSmtpTransport<Tokio1Executor>),
    #[cfg(test)]
    Stub(lettre::transport::stub::AsyncStubTransport),
}

/// Email service for sending transactional emails.
#[derive(Clone)]
pub struct EmailService {
    transport: Transport,
    from: Mailbox,
    reply_to: Option<Mailbox>,
}

impl std::fmt::Debug for EmailService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailService")
            .field("from", &self.from.to_string())
            .finish_non_exhaustive()
    }
}

impl EmailService {
    /// Create a new email service from configuration.
    ///
    /// Port 465 uses implicit TLS, any other port STARTTLS.
    ///
    /// # Errors
    ///
    /// Returns error if the relay cannot be configured or an address is invalid.
    pub fn new(config: &EmailConfig) -> Result<Self, EmailError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let relay = if config.smtp_port == IMPLICIT_TLS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
        };
        let mailer = relay.port(config.smtp_port).credentials(credentials).build();

        Self::with_transport(config, Transport::Smtp(mailer))
    }

    /// Service that records messages in `stub` instead of relaying them.
    ///
    /// # Errors
    ///
    /// Returns error if an address in `config` is invalid.
    #[cfg(test)]
    pub(crate) fn with_stub(
        config: &EmailConfig,
        stub: lettre::transport::stub::AsyncStubTransport,
    ) -> Result<Self, EmailError> {
        Self::with_transport(config, Transport::Stub(stub))
    }

    fn with_transport(config: &EmailConfig, transport: Transport) -> Result<Self, EmailError> {
        let reply_to = config
            .reply_to
            .as_deref()
            .map(|address| mailbox(address, None))
            .transpose()?;

        Ok(Self {
            transport,
            from: mailbox(&config.from_address, config.from_name.as_deref())?,
            reply_to,
        })
    }

    /// Address messages are sent from.
    #[must_use]
    pub fn sender(&self) -> String {
        self.from.email.to_string()
    }

    /// Send a message confirming the SMTP settings work.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_test(&self, to: &str, origin: &str, sent_at: &str) -> Result<(), EmailError> {
        self.send(Outgoing {
            to,
            subject: "Test SMTP - Angeli Visions",
            text: SmtpTestText { origin, sent_at }.render()?,
            html: SmtpTestHtml { origin, sent_at }.render()?,
            reply_to: None,
        })
        .await
    }

    /// Send the password reset link.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_password_reset(&self, to: &str, name: &str, reset_url: &str) -> Result<(), EmailError> {
        self.send(Outgoing {
            to,
            subject: "Réinitialisation du mot de passe - Angeli Visions",
            text: PasswordResetText { name, reset_url }.render()?,
            html: PasswordResetHtml { name, reset_url }.render()?,
            reply_to: None,
        })
        .await
    }

    /// Welcome a new subscriber, with a link to their preferences page.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_newsletter_welcome(
        &self,
        to: &str,
        name: &str,
        preferences_url: &str,
        locale: Locale,
    ) -> Result<(), EmailError> {
        let copy = newsletter_copy(locale);
        self.send(Outgoing {
            to,
            subject: copy.subject,
            text: NewsletterWelcomeText {
                copy,
                name,
                preferences_url,
            }
            .render()?,
            html: NewsletterWelcomeHtml {
                lang: locale.as_str(),
                copy,
                name,
                preferences_url,
            }
            .render()?,
            reply_to: None,
        })
        .await
    }

    /// Tell the team about a new subscriber.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_newsletter_admin(&self, to: &str, name: &str, email: &str, date: &str) -> Result<(), EmailError> {
        self.send(Outgoing {
            to,
            subject: "[Angeli Visions] Nouvelle inscription newsletter",
            text: NewsletterAdminText { name, email, date }.render()?,
            html: NewsletterAdminHtml { name, email, date }.render()?,
            reply_to: None,
        })
        .await
    }

    /// Forward a quote request to the team. Replies go to the client.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_quote_admin(&self, to: &str, request: &QuoteRequest) -> Result<(), EmailError> {
        let event = if request.event_type.is_empty() {
            "Événement"
        } else {
            request.event_type.as_str()
        };
        let subject = format!("Nouveau devis : {} ({event})", request.name);
        self.send(Outgoing {
            to,
            subject: &subject,
            text: QuoteAdminText { request }.render()?,
            html: QuoteAdminHtml { request }.render()?,
            reply_to: Some(&request.email),
        })
        .await
    }

    /// Confirm receipt of a quote request. Replies go to the team.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_quote_client(&self, to: &str, name: &str, team_address: &str) -> Result<(), EmailError> {
        self.send(Outgoing {
            to,
            subject: "Votre demande de devis - Angeli Visions",
            text: QuoteClientText { name }.render()?,
            html: QuoteClientHtml { name }.render()?,
            reply_to: Some(team_address),
        })
        .await
    }

    /// Forward a personal-data request. Replies go to the requester.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_data_request(
        &self,
        to: &str,
        name: &str,
        email: &str,
        request_label: &str,
        message: &str,
    ) -> Result<(), EmailError> {
        let subject = format!("[RGPD] Demande : {request_label} - {name}");
        self.send(Outgoing {
            to,
            subject: &subject,
            text: DataRequestText {
                name,
                email,
                request_label,
                message,
            }
            .render()?,
            html: DataRequestHtml {
                name,
                email,
                request_label,
                message,
            }
            .render()?,
            reply_to: Some(email),
        })
        .await
    }

    /// Send a multipart email with both plain text and HTML versions.
    async fn send(&self, outgoing: Outgoing<'_>) -> Result<(), EmailError> {
        let reply_to = match outgoing.reply_to {
            Some(address) => Some(mailbox(address, None)?),
            None => self.reply_to.clone(),
        };

        let mut builder = Message::builder()
            .from(self.from.clone())
            .to(mailbox(outgoing.to, None)?)
            .subject(outgoing.subject);
        if let Some(reply_to) = reply_to {
            builder = builder.reply_to(reply_to);
        }

        let email = builder.multipart(
            MultiPart::alternative()
                .singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_PLAIN)
                        .body(outgoing.text),
                )
                .singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_HTML)
                        .body(outgoing.html),
                ),
        )?;

        match &self.transport {
            Transport::Smtp(mailer) => {
                mailer.send(email).await?;
            }
            #[cfg(test)]
            Transport::Stub(stub) => {
                stub.send(email).await?;
            }
        }

        tracing::info!(to = %outgoing.to, subject = %outgoing.subject, "Email sent successfully");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use secrecy::SecretString;

    use super::*;
    use crate::models::QuoteForm;

    fn config(port: u16) -> EmailConfig {
        EmailConfig {
            smtp_host: "smtp.example.com".to_string(),
            smtp_port: port,
            smtp_username: "mailer@angelivisions.com".to_string(),
            smtp_password: SecretString::from("password"),
            from_address: "mailer@angelivisions.com".to_string(),
            from_name: Some("Angeli Visions".to_string()),
            reply_to: Some("contact@angelivisions.com".to_string()),
        }
    }

    #[tokio::test]
    async fn test_service_builds_for_both_tls_modes() {
        assert!(EmailService::new(&config(465)).is_ok());
        assert!(EmailService::new(&config(587)).is_ok());
    }

    #[tokio::test]
    async fn test_invalid_from_address() {
        let mut bad = config(587);
        bad.from_address = "not an address".to_string();
        assert!(matches!(EmailService::new(&bad), Err(EmailError::InvalidAddress(_))));
    }

    #[tokio::test]
    async fn test_send_test_through_stub() {
        let stub = lettre::transport::stub::AsyncStubTransport::new_ok();
        let service = EmailService::with_stub(&config(587), stub.clone()).unwrap();
        assert_eq!(service.sender(), "mailer@angelivisions.com");

        service
            .send_test("ops@angelivisions.com", "https://angelivisions.com", "16/10/2026 10:00:00")
            .await
            .unwrap();
        let messages = stub.messages().await;
        assert_eq!(messages.len(), 1);
        let (envelope, raw) = messages.first().unwrap();
        assert_eq!(envelope.to().first().unwrap().to_string(), "ops@angelivisions.com");
        assert!(raw.contains("Subject: Test SMTP - Angeli Visions"));
        assert!(raw.contains("Reply-To: contact@angelivisions.com"));
    }

    #[test]
    fn test_newsletter_copy_per_locale() {
        assert_eq!(newsletter_copy(Locale::En).button, "Manage my preferences");
        assert_eq!(newsletter_copy(Locale::Es).greeting, "Hola");
        let text = NewsletterWelcomeText {
            copy: newsletter_copy(Locale::Fr),
            name: "Ada",
            preferences_url: "https://angelivisions.com/fr/newsletter/preferences?token=abc",
        }
        .render()
        .unwrap();
        assert!(text.contains("Bonjour Ada,"));
        assert!(text.contains("?token=abc"));
    }

    #[test]
    fn test_html_escapes_user_input() {
        let html = DataRequestHtml {
            name: "<script>x</script>",
            email: "a@b.com",
            request_label: "Droit d'accès",
            message: "hello",
        }
        .render()
        .unwrap();
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_quote_templates_list_services() {
        let form = QuoteForm {
            name: "Ada".to_string(),
            email: "ada@b.com".to_string(),
            services: vec!["DJ".to_string(), "Lumières".to_string()],
            phone: "0600000000".to_string(),
            ..QuoteForm::default()
        };
        let request = QuoteRequest::from_form(form, Utc::now());
        let text = QuoteAdminText { request: &request }.render().unwrap();
        assert!(text.contains("- DJ"));
        assert!(text.contains("- Lumières"));
        assert!(text.contains("Téléphone : 0600000000"));
        assert!(text.contains("Type : Non spécifié"));
        assert!(!text.contains("Entreprise"));

        let empty = QuoteRequest::from_form(QuoteForm::default(), Utc::now());
        let html = QuoteAdminHtml { request: &empty }.render().unwrap();
        assert!(html.contains("<li>Non spécifié</li>"));
    }
}
