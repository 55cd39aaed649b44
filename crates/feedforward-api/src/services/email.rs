//! Outbound email over SMTP.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::sync::Arc;

use feedforward_core::{AppError, Config};

#[derive(Debug, Clone)]
pub struct EmailAttachment {
    pub filename: String,
    pub content_type: String,
    pub content: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: Option<String>,
    pub attachments: Vec<EmailAttachment>,
}

/// Sends one email. Failures surface as `DeliveryFailure`.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutgoingEmail) -> Result<(), AppError>;
}

#[derive(Clone)]
pub struct SmtpMailer {
    transport: Arc<AsyncSmtpTransport<Tokio1Executor>>,
    from: Mailbox,
}

impl SmtpMailer {
    /// Create the mailer from config. Returns `None` if SMTP is disabled or incomplete.
    pub fn from_config(config: &Config) -> Option<Self> {
        if !config.smtp_enabled() {
            tracing::debug!("SMTP disabled (SMTP_ENABLED=false)");
            return None;
        }
        let host = config.smtp_host()?;
        let from: Mailbox = match config.smtp_from()?.parse() {
            Ok(from) => from,
            Err(e) => {
                tracing::error!(error = %e, "Invalid SMTP_FROM, email disabled");
                return None;
            }
        };
        let port = config.smtp_port();
        let credentials = match (config.smtp_user(), config.smtp_password()) {
            (Some(u), Some(p)) => Some(Credentials::new(u.to_string(), p.to_string())),
            _ => None,
        };

        let transport = if config.smtp_tls() {
            let builder = match AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host) {
                Ok(builder) => builder.port(port),
                Err(e) => {
                    tracing::error!(error = %e, host = %host, "Failed to build SMTP relay, email disabled");
                    return None;
                }
            };
            let builder = match credentials {
                Some(c) => builder.credentials(c),
                None => builder,
            };
            tracing::info!(host = %host, port = port, "Email service initialized (SMTP with STARTTLS)");
            builder.build()
        } else {
            let builder = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host).port(port);
            let builder = match credentials {
                Some(c) => builder.credentials(c),
                None => builder,
            };
            tracing::info!(host = %host, port = port, "Email service initialized (SMTP)");
            builder.build()
        };

        Some(Self {
            transport: Arc::new(transport),
            from,
        })
    }

    fn build_message(&self, email: OutgoingEmail) -> Result<Message, AppError> {
        let to: Mailbox = email
            .to
            .parse()
            .map_err(|e| AppError::DeliveryFailure(format!("Invalid recipient address: {}", e)))?;

        let mut body = match email.html {
            Some(html) => MultiPart::mixed().multipart(MultiPart::alternative_plain_html(email.text, html)),
            None => MultiPart::mixed().singlepart(SinglePart::plain(email.text)),
        };
        for attachment in email.attachments {
            let content_type = ContentType::parse(&attachment.content_type).map_err(|e| {
                AppError::DeliveryFailure(format!("Invalid attachment content type: {}", e))
            })?;
            body = body.singlepart(
                Attachment::new(attachment.filename).body(attachment.content, content_type),
            );
        }

        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(email.subject)
            .multipart(body)
            .map_err(|e| AppError::DeliveryFailure(e.to_string()))
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), AppError> {
        let subject = email.subject.clone();
        let message = self.build_message(email)?;
        self.transport
            .send(message)
            .await
            .map_err(|e| AppError::DeliveryFailure(e.to_string()))?;
        tracing::info!(subject = %subject, "Email sent");
        Ok(())
    }
}

/// Used when SMTP is not configured: logs and reports success.
pub struct NoopMailer;

#[async_trait]
impl Mailer for NoopMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), AppError> {
        tracing::info!(
            subject = %email.subject,
            attachments = email.attachments.len(),
            "SMTP not configured, email not sent"
        );
        Ok(())
    }
}

pub fn create_mailer(config: &Config) -> Arc<dyn Mailer> {
    match SmtpMailer::from_config(config) {
        Some(mailer) => Arc::new(mailer),
        None => Arc::new(NoopMailer),
    }
}

pub const CONFIRMATION_SUBJECT: &str = "Your evaluation request has been received";

/// Acknowledgement sent right after a submission is accepted.
pub fn confirmation_email(to: &str, request_id: uuid::Uuid, estimated_minutes: i64) -> OutgoingEmail {
    let text = format!(
        "Thank you for your submission!\n\n\
         We have received your evaluation request and it is now being processed.\n\n\
         Submission ID: {}\n\
         Estimated wait time: up to {} minutes\n\n\
         You will receive another email with your evaluation report once processing is complete.\n\n\
         Best regards,\nFeedforward AI Team",
        request_id, estimated_minutes
    );
    let html = format!(
        "<p>Thank you for your submission!</p>\
         <p>We have received your evaluation request and it is now being processed.</p>\
         <p><strong>Submission ID:</strong> {}<br><strong>Estimated wait time:</strong> up to {} minutes</p>\
         <p>You will receive another email with your evaluation report once processing is complete.</p>\
         <p>Best regards,<br>Feedforward AI Team</p>",
        request_id, estimated_minutes
    );
    OutgoingEmail {
        to: to.to_string(),
        subject: CONFIRMATION_SUBJECT.to_string(),
        text,
        html: Some(html),
        attachments: Vec::new(),
    }
}
