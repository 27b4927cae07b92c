use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use tracing::info;

use crate::{config::SmtpConfig, error::SendError};

/// Outbound email capability used by the dispatcher.
#[async_trait]
pub trait EmailTransport: Send + Sync {
    async fn send(&self, subject: &str, body: &str) -> Result<(), SendError>;
}

/// Sends plain-text email from a fixed sender to a fixed recipient.
pub struct SmtpEmailSender<T = AsyncSmtpTransport<Tokio1Executor>> {
    transport: T,
    from: Mailbox,
    to: Mailbox,
}

impl SmtpEmailSender {
    pub fn new(config: &SmtpConfig) -> Result<Self, SendError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| SendError::Transport(Box::new(e)))?
            .port(config.port)
            .credentials(Credentials::new(
                config.user.clone(),
                config.password.clone(),
            ))
            .build();

        info!(host = %config.host, port = config.port, "SMTP transport initialized");

        Self::with_transport(transport, &config.from, &config.to)
    }
}

impl<T> SmtpEmailSender<T> {
    pub fn with_transport(transport: T, from: &str, to: &str) -> Result<Self, SendError> {
        Ok(Self {
            transport,
            from: parse_mailbox(from)?,
            to: parse_mailbox(to)?,
        })
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, SendError> {
    address.parse().map_err(|source| SendError::Address {
        address: address.to_string(),
        source,
    })
}

#[async_trait]
impl<T> EmailTransport for SmtpEmailSender<T>
where
    T: AsyncTransport + Send + Sync,
    T::Error: std::error::Error + Send + Sync + 'static,
{
    async fn send(&self, subject: &str, body: &str) -> Result<(), SendError> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())?;

        self.transport
            .send(message)
            .await
            .map_err(|e| SendError::Transport(Box::new(e)))?;

        info!(to = %self.to, "Email sent");

        Ok(())
    }
}
