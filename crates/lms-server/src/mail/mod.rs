//! Outgoing email
//!
//! Handlers describe a message with [`OutgoingMail`] and hand it to a
//! [`Mailer`]. Delivery goes through [`deliver`], which honours the
//! message's `fail_silently` flag: best-effort notices log and continue,
//! everything else surfaces the error to the caller.

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox, Message},
    transport::smtp::authentication::Credentials,
    SmtpTransport, Transport,
};
use std::sync::{Arc, Mutex};
use thiserror::Error;

use crate::config::{MailBackend, MailConfig};

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Invalid address '{0}'")]
    Address(String),

    #[error("Message has no recipients")]
    NoRecipients,

    #[error("Failed to build email: {0}")]
    Build(String),

    #[error("Failed to send email: {0}")]
    Transport(String),
}

/// A plain-text message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub from: String,
    pub to: Vec<String>,
    pub bcc: Vec<String>,
    pub subject: String,
    pub body: String,
    pub fail_silently: bool,
}

impl OutgoingMail {
    pub fn new(from: impl Into<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: Vec::new(),
            bcc: Vec::new(),
            subject: subject.into(),
            body: body.into(),
            fail_silently: false,
        }
    }

    pub fn to(mut self, address: impl Into<String>) -> Self {
        self.to.push(address.into());
        self
    }

    pub fn bcc(mut self, addresses: impl IntoIterator<Item = String>) -> Self {
        self.bcc.extend(addresses);
        self
    }

    pub fn fail_silently(mut self) -> Self {
        self.fail_silently = true;
        self
    }

    pub fn recipient_count(&self) -> usize {
        self.to.len() + self.bcc.len()
    }

    fn to_message(&self) -> Result<Message, MailError> {
        if self.recipient_count() == 0 {
            return Err(MailError::NoRecipients);
        }

        let parse = |address: &str| {
            address
                .parse::<Mailbox>()
                .map_err(|_| MailError::Address(address.to_string()))
        };

        let mut builder = Message::builder().from(parse(&self.from)?);
        for address in &self.to {
            builder = builder.to(parse(address)?);
        }
        for address in &self.bcc {
            builder = builder.bcc(parse(address)?);
        }

        builder
            .subject(self.subject.as_str())
            .header(ContentType::TEXT_PLAIN)
            .body(self.body.clone())
            .map_err(|e| MailError::Build(e.to_string()))
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError>;
}

/// Send `mail`, swallowing (and logging) the failure when it is marked
/// `fail_silently`
pub async fn deliver(mailer: &dyn Mailer, mail: OutgoingMail) -> Result<(), MailError> {
    match mailer.send(&mail).await {
        Ok(()) => {
            tracing::info!(
                subject = %mail.subject,
                recipients = mail.recipient_count(),
                "Email sent"
            );
            Ok(())
        },
        Err(e) if mail.fail_silently => {
            tracing::warn!(subject = %mail.subject, error = %e, "Email delivery failed");
            Ok(())
        },
        Err(e) => Err(e),
    }
}

/// Build the mailer selected by configuration
pub fn build_mailer(config: &MailConfig) -> anyhow::Result<Arc<dyn Mailer>> {
    match config.backend {
        MailBackend::Log => Ok(Arc::new(LogMailer)),
        MailBackend::Smtp => Ok(Arc::new(SmtpMailer::new(config)?)),
    }
}

// ============================================================================
// SMTP
// ============================================================================

#[derive(Clone)]
pub struct SmtpMailer {
    transport: SmtpTransport,
}

impl SmtpMailer {
    pub fn new(config: &MailConfig) -> anyhow::Result<Self> {
        let host = config
            .smtp_host
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("SMTP_HOST is not set"))?;

        let builder = if config.smtp_insecure {
            SmtpTransport::builder_dangerous(host)
        } else {
            SmtpTransport::starttls_relay(host)?
        };
        let builder = builder.port(config.smtp_port);

        let transport = match (&config.smtp_username, &config.smtp_password) {
            (Some(user), Some(pass)) => builder
                .credentials(Credentials::new(user.clone(), pass.clone()))
                .build(),
            _ => builder.build(),
        };

        tracing::info!(host = %host, port = config.smtp_port, "SMTP transport configured");
        Ok(Self { transport })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        let message = mail.to_message()?;
        let transport = self.transport.clone();

        tokio::task::spawn_blocking(move || transport.send(&message))
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?
            .map(|_| ())
            .map_err(|e| MailError::Transport(e.to_string()))
    }
}

// ============================================================================
// Log-only and in-memory mailers
// ============================================================================

/// Writes messages to the log; for development
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        mail.to_message()?;
        tracing::info!(
            from = %mail.from,
            to = ?mail.to,
            bcc = mail.bcc.len(),
            subject = %mail.subject,
            body = %mail.body,
            "Email (log backend)"
        );
        Ok(())
    }
}

/// Keeps every message in memory; can be told to fail every send
#[derive(Debug, Default)]
pub struct MemoryMailer {
    sent: Mutex<Vec<OutgoingMail>>,
    fail: bool,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mailer whose transport always errors
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        mail.to_message()?;
        if self.fail {
            return Err(MailError::Transport("connection refused".to_string()));
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(mail.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FROM: &str = "ApiLearn <no-reply@apilearn.com>";

    #[test]
    fn test_bcc_only_message_builds() {
        let mail = OutgoingMail::new(FROM, "Rust 101: Week 2", "Read chapter 4")
            .bcc(vec!["a@example.com".to_string(), "b@example.com".to_string()]);
        assert!(mail.to.is_empty());
        assert_eq!(mail.recipient_count(), 2);
        assert!(mail.to_message().is_ok());
    }

    #[test]
    fn test_message_without_recipients_rejected() {
        let mail = OutgoingMail::new(FROM, "Subject", "Body");
        assert!(matches!(mail.to_message(), Err(MailError::NoRecipients)));
    }

    #[test]
    fn test_invalid_address_rejected() {
        let mail = OutgoingMail::new(FROM, "Subject", "Body").to("not an address");
        assert!(matches!(mail.to_message(), Err(MailError::Address(_))));
    }

    #[tokio::test]
    async fn test_deliver_swallows_silent_failures() {
        let mailer = MemoryMailer::failing();

        let silent = OutgoingMail::new(FROM, "Notice", "Body")
            .to("ada@example.com")
            .fail_silently();
        assert!(deliver(&mailer, silent).await.is_ok());

        let loud = OutgoingMail::new(FROM, "Receipt", "Body").to("ada@example.com");
        assert!(matches!(deliver(&mailer, loud).await, Err(MailError::Transport(_))));
    }

    #[tokio::test]
    async fn test_memory_mailer_records() {
        let mailer = MemoryMailer::new();
        let mail = OutgoingMail::new(FROM, "Hello", "World").to("ada@example.com");
        deliver(&mailer, mail.clone()).await.unwrap();
        assert_eq!(mailer.sent(), vec![mail]);
    }
}
