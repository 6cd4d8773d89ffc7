//! Email delivery via per-tenant SMTP settings.
//!
//! [`SmtpAdapter`] builds a `lettre` async transport from the project's
//! `smtp_*` columns on every send. Port 465 uses implicit TLS, every other
//! port STARTTLS.

use std::time::Duration;

use async_trait::async_trait;
use comanda_core::channels::Channel;
use comanda_db::models::restaurant::Project;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use super::{ChannelAdapter, OutboundMessage, SendResult};

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for email delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    /// SMTP transport-level failure (authentication, connection, etc.).
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    /// The recipient or sender address could not be parsed.
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The MIME message could not be assembled.
    #[error("Email build error: {0}")]
    Build(String),
}

// ---------------------------------------------------------------------------
// SmtpSettings
// ---------------------------------------------------------------------------

/// Used when the project sets a host but no port.
const DEFAULT_SMTP_PORT: u16 = 587;

/// Port served with implicit TLS instead of STARTTLS.
const IMPLICIT_TLS_PORT: u16 = 465;

#[derive(Debug, Clone, PartialEq, Eq)]
struct SmtpSettings<'a> {
    host: &'a str,
    port: u16,
    from: &'a str,
    username: Option<&'a str>,
    password: Option<&'a str>,
}

impl<'a> SmtpSettings<'a> {
    /// `None` when the project lacks a host or sender address.
    fn from_project(project: &'a Project) -> Option<Self> {
        let non_empty = |v: &'a Option<String>| v.as_deref().filter(|s| !s.trim().is_empty());
        Some(Self {
            host: non_empty(&project.smtp_host)?,
            port: project
                .smtp_port
                .and_then(|p| u16::try_from(p).ok())
                .unwrap_or(DEFAULT_SMTP_PORT),
            from: non_empty(&project.smtp_from)?,
            username: non_empty(&project.smtp_username),
            password: non_empty(&project.smtp_password),
        })
    }
}

/// Wrap a plain body in a minimal HTML document. Bodies that already carry
/// an `<html` tag are returned unchanged.
pub fn wrap_html(body: &str) -> String {
    if body.to_ascii_lowercase().contains("<html") {
        return body.to_string();
    }
    format!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"></head>\n<body>\n{body}\n</body>\n</html>"
    )
}

// ---------------------------------------------------------------------------
// SmtpAdapter
// ---------------------------------------------------------------------------

pub struct SmtpAdapter {
    timeout: Option<Duration>,
}

impl SmtpAdapter {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }

    async fn deliver(
        &self,
        settings: &SmtpSettings<'_>,
        message: &OutboundMessage,
    ) -> Result<(), EmailError> {
        let email = Message::builder()
            .from(settings.from.parse()?)
            .to(message.recipient.parse()?)
            .subject(message.subject.clone())
            .header(ContentType::TEXT_HTML)
            .body(wrap_html(&message.body))
            .map_err(|e| EmailError::Build(e.to_string()))?;

        let mut transport_builder = if settings.port == IMPLICIT_TLS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(settings.host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(settings.host)?
        }
        .port(settings.port)
        .timeout(self.timeout);

        if let (Some(user), Some(pass)) = (settings.username, settings.password) {
            transport_builder =
                transport_builder.credentials(Credentials::new(user.to_string(), pass.to_string()));
        }

        let mailer = transport_builder.build();
        mailer.send(email).await?;
        Ok(())
    }
}

impl Default for SmtpAdapter {
    fn default() -> Self {
        Self::new(None)
    }
}

#[async_trait]
impl ChannelAdapter for SmtpAdapter {
    fn channel(&self) -> Channel {
        Channel::Email
    }

    async fn send(&self, project: &Project, message: &OutboundMessage) -> SendResult {
        let Some(settings) = SmtpSettings::from_project(project) else {
            return SendResult::failed("email provider not configured");
        };

        match self.deliver(&settings, message).await {
            Ok(()) => {
                tracing::info!(to = %message.recipient, host = settings.host, "Notification email sent");
                // SMTP has no provider message id to correlate callbacks with.
                SendResult::sent(None)
            }
            Err(e) => {
                tracing::warn!(to = %message.recipient, host = settings.host, error = %e, "Email delivery failed");
                SendResult::failed(e.to_string())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
