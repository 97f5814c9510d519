//! Operator notification over SMTP.
//!
//! Renders the static HTML template from the instance path and mails it to
//! the configured address (sender and recipient are the same account). The
//! transport security mode is selected by the configured port: implicit TLS
//! on 465, STARTTLS on 587, plain relay otherwise.

use crate::config::Settings;
use crate::errors::AppResult;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::fs;
use tracing::info;

const SUBJECT: &str = "Web directory has changed";

/// Transport security, keyed off the configured SMTP port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsMode {
    Implicit,
    StartTls,
    Plain,
}

pub fn tls_mode(port: u16) -> TlsMode {
    match port {
        465 => TlsMode::Implicit,
        587 => TlsMode::StartTls,
        _ => TlsMode::Plain,
    }
}

/// Builds the notification message: HTML body, identical from/to address.
pub fn build_message(address: &str, html: String) -> AppResult<Message> {
    let mailbox: Mailbox = address.parse()?;
    let message = Message::builder()
        .from(mailbox.clone())
        .to(mailbox)
        .subject(SUBJECT)
        .header(ContentType::TEXT_HTML)
        .body(html)?;
    Ok(message)
}

/// Sends the change notification for this instance.
///
/// # Errors
///
/// Returns `IoError` if the template is missing, `MailError` on address,
/// composition or SMTP failures.
pub async fn send_notification(settings: &Settings) -> AppResult<()> {
    let template = settings.notification_template();
    let content = fs::read_to_string(&template)?;

    let message = build_message(&settings.email_user, content)?;

    let credentials = Credentials::new(
        settings.email_user.clone(),
        settings.email_password.clone(),
    );
    let builder = match tls_mode(settings.email_port) {
        TlsMode::Implicit => AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.email_host)?,
        TlsMode::StartTls => {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.email_host)?
        }
        TlsMode::Plain => {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&settings.email_host)
        }
    };
    let mailer = builder
        .port(settings.email_port)
        .credentials(credentials)
        .build();

    mailer.send(message).await?;
    info!(to = %settings.email_user, "Notification sent");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tls_mode_by_port() {
        assert_eq!(tls_mode(465), TlsMode::Implicit);
        assert_eq!(tls_mode(587), TlsMode::StartTls);
        assert_eq!(tls_mode(25), TlsMode::Plain);
        assert_eq!(tls_mode(2525), TlsMode::Plain);
    }

    #[test]
    fn build_message_sets_subject_and_addresses() {
        let message = build_message("ops@example.com", "<p>changed</p>".to_string()).unwrap();
        let rendered = String::from_utf8(message.formatted()).unwrap();
        assert!(rendered.contains("Subject: Web directory has changed"));
        assert!(rendered.contains("ops@example.com"));
        assert!(rendered.contains("text/html"));
    }

    #[test]
    fn build_message_rejects_bad_address() {
        assert!(build_message("not an address", String::new()).is_err());
    }
}
