use async_trait::async_trait;
use lettre::{
    message::{Mailbox, Message, MultiPart},
    transport::smtp::authentication::Credentials,
    SmtpTransport, Transport,
};
use log::info;

use crate::config::EmailConfig;

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("Invalid address {0}")]
    Address(String),
    #[error("Failed to build email: {0}")]
    Build(String),
    #[error("SMTP error: {0}")]
    Transport(String),
}

/// A multipart/alternative email. Every recipient goes in `To`.
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingEmail {
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
    pub text: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError>;
}

pub struct SmtpMailer {
    config: EmailConfig,
}

impl SmtpMailer {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    fn transport(&self) -> Result<SmtpTransport, MailError> {
        let config = &self.config;
        if config.username.is_empty() {
            return Ok(SmtpTransport::builder_dangerous(&config.smtp_host)
                .port(config.smtp_port)
                .build());
        }
        let creds = Credentials::new(config.username.clone(), config.password.clone());
        Ok(SmtpTransport::relay(&config.smtp_host)
            .map_err(|e| MailError::Transport(e.to_string()))?
            .port(config.smtp_port)
            .credentials(creds)
            .build())
    }

    fn build_message(&self, email: &OutgoingEmail) -> Result<Message, MailError> {
        let from: Mailbox = self
            .config
            .from
            .parse()
            .map_err(|_| MailError::Address(self.config.from.clone()))?;

        let mut builder = Message::builder()
            .from(from)
            .subject(email.subject.as_str());
        for address in &email.to {
            let to: Mailbox = address
                .parse()
                .map_err(|_| MailError::Address(address.clone()))?;
            builder = builder.to(to);
        }

        builder
            .multipart(MultiPart::alternative_plain_html(
                email.text.clone(),
                email.html.clone(),
            ))
            .map_err(|e| MailError::Build(e.to_string()))
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
        let message = self.build_message(&email)?;
        let transport = self.transport()?;

        tokio::task::spawn_blocking(move || transport.send(&message))
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?
            .map_err(|e| MailError::Transport(e.to_string()))?;

        info!("Email \"{}\" sent to {} recipient(s)", email.subject, email.to.len());
        Ok(())
    }
}
