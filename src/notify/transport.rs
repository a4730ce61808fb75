//! Mail transport boundary.
//!
//! The dispatcher only sees [`MailTransport`]; [`SmtpMailer`] is the real
//! implementation, built on lettre's async SMTP client.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};

use crate::config::SmtpConfig;

/// A plain-text message ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("Invalid address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Could not build message: {0}")]
    Message(String),

    #[error("SMTP setup failed: {0}")]
    Setup(String),

    #[error("Delivery failed: {0}")]
    Delivery(String),
}

/// Capability to send one message. Any failure is reported, never retried.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, message: &MailMessage) -> Result<(), TransportError>;
}

/// SMTP delivery through a STARTTLS relay.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    /// Build the relay client. No connection is made until the first send.
    pub fn new(config: &SmtpConfig) -> Result<Self, TransportError> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| TransportError::Setup(e.to_string()))?
            .port(config.port);

        if !config.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ));
        }

        tracing::debug!("SMTP relay configured: {}:{}", config.host, config.port);

        Ok(Self {
            transport: builder.build(),
        })
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, TransportError> {
    address
        .parse::<Mailbox>()
        .map_err(|e| TransportError::InvalidAddress {
            address: address.to_string(),
            reason: e.to_string(),
        })
}

/// Convert into a lettre message with a `text/plain` body.
pub(crate) fn build_email(message: &MailMessage) -> Result<lettre::Message, TransportError> {
    lettre::Message::builder()
        .from(parse_mailbox(&message.from)?)
        .to(parse_mailbox(&message.to)?)
        .subject(message.subject.clone())
        .header(ContentType::TEXT_PLAIN)
        .body(message.body.clone())
        .map_err(|e| TransportError::Message(e.to_string()))
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn send(&self, message: &MailMessage) -> Result<(), TransportError> {
        let email = build_email(message)?;
        self.transport
            .send(email)
            .await
            .map(|_| ())
            .map_err(|e| TransportError::Delivery(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(to: &str) -> MailMessage {
        MailMessage {
            from: "smtp-configured@example.com".to_string(),
            to: to.to_string(),
            subject: "TaskManager Pro - Verify Your Email".to_string(),
            body: "Welcome, alice! Code: 123456".to_string(),
        }
    }

    #[test]
    fn builds_plain_text_email() {
        let email = build_email(&message("alice@example.com")).unwrap();
        let raw = String::from_utf8(email.formatted()).unwrap();
        assert!(raw.contains("To: alice@example.com"));
        assert!(raw.contains("From: smtp-configured@example.com"));
        assert!(raw.contains("Content-Type: text/plain"));
        assert!(raw.contains("Code: 123456"));
    }

    #[test]
    fn rejects_malformed_recipient() {
        let err = build_email(&message("not an address")).unwrap_err();
        assert!(matches!(
            err,
            TransportError::InvalidAddress { ref address, .. } if address == "not an address"
        ));
    }

    #[tokio::test]
    async fn smtp_mailer_builds_without_connecting() {
        let config = SmtpConfig {
            host: "smtp.example.com".to_string(),
            port: 2525,
            username: "mailer@example.com".to_string(),
            password: "secret".to_string(),
        };
        assert!(SmtpMailer::new(&config).is_ok());
    }
}
