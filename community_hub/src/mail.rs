//! Outbound mail.
//!
//! Registration sends a welcome message. Production relays through SMTP with
//! `lettre`; without SMTP settings the [`LogMailer`] logs what would have
//! been sent and remembers only the most recent messages.

use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use std::{collections::VecDeque, sync::Mutex};
use thiserror::Error;

use crate::ErrorKind;

/// Mail errors
#[derive(Debug, Error)]
pub enum MailError {
    /// Sender or recipient address did not parse
    #[error("Invalid address: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// Message could not be assembled
    #[error("Failed to build message: {0}")]
    Build(#[from] lettre::error::Error),

    /// Relay rejected or could not be reached
    #[error("SMTP error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
}

impl MailError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MailError::Address(_) => ErrorKind::Validation,
            MailError::Build(_) | MailError::Transport(_) => ErrorKind::Upstream,
        }
    }
}

pub type MailResult<T> = Result<T, MailError>;

/// A plain-text message to one recipient
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl OutgoingMail {
    /// Welcome message sent after registration
    pub fn welcome(email: &str) -> Self {
        Self {
            to: email.to_string(),
            subject: "Welcome to Community-Hub".to_string(),
            body: format!(
                "Welcome to Community-Hub. Your Account has been Created with email id {email}"
            ),
        }
    }
}

/// Delivery of outgoing mail
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: OutgoingMail) -> MailResult<()>;
}

/// SMTP relay settings
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_email: String,
}

/// Mailer that relays through an SMTP server
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    /// Parses the sender before building the transport; `build()` needs a
    /// Tokio runtime, a bad address does not.
    pub fn new(config: &SmtpConfig) -> MailResult<Self> {
        let from: Mailbox = config.from_email.parse()?;
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();

        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, mail: OutgoingMail) -> MailResult<()> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(mail.to.parse()?)
            .subject(mail.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(mail.body)?;

        self.transport.send(message).await?;
        Ok(())
    }
}

/// Number of messages a [`LogMailer`] keeps
pub const LOG_MAILER_HISTORY: usize = 32;

/// Mailer that only logs, keeping the last [`LOG_MAILER_HISTORY`] messages
#[derive(Default)]
pub struct LogMailer {
    sent: Mutex<VecDeque<OutgoingMail>>,
}

impl LogMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recent messages "sent", oldest first
    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.sent
            .lock()
            .map(|sent| sent.iter().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, mail: OutgoingMail) -> MailResult<()> {
        log::info!("Mail to {} with subject {:?} (not delivered, no SMTP relay)", mail.to, mail.subject);
        if let Ok(mut sent) = self.sent.lock() {
            if sent.len() == LOG_MAILER_HISTORY {
                sent.pop_front();
            }
            sent.push_back(mail);
        }
        Ok(())
    }
}
