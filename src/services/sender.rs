//! Sender: batched delivery through a single outbound channel adapter.
//! Policy: open one connection, dispatch every message in the batch, close;
//! partial failure fails the whole batch with an error naming the first
//! failure. Only `Channel::Email` is supported; any other channel value in
//! a batch element is silently skipped.

use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::SmtpConfig;
use crate::db::models::{Channel, Notification};
use crate::error::{AppError, AppResult};

#[async_trait]
pub trait Sender: Send + Sync {
    async fn send(&self, batch: &[Notification]) -> AppResult<()>;
}

pub struct SmtpSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpSender {
    pub fn new(config: &SmtpConfig) -> AppResult<Self> {
        let from_address = config
            .from_address
            .clone()
            .unwrap_or_else(|| config.username.clone());
        let from: Mailbox = from_address
            .parse()
            .map_err(|e| AppError::Config(format!("invalid smtp.from_address: {e}")))?;

        let mut builder = if config.tls_enabled {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
                .map_err(|e| AppError::Config(e.to_string()))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
        }
        .port(config.port);

        if !config.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ));
        }

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }

    fn build_message(&self, notification: &Notification) -> AppResult<Message> {
        let to: Mailbox = notification
            .recipient
            .parse()
            .map_err(|e| AppError::Transient(format!("invalid recipient address: {e}")))?;

        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject("Event reminder")
            .body(notification.message.clone())
            .map_err(|e| AppError::Transient(e.to_string()))
    }
}

#[async_trait]
impl Sender for SmtpSender {
    async fn send(&self, batch: &[Notification]) -> AppResult<()> {
        let mut first_error: Option<String> = None;

        for notification in batch {
            if notification.channel != Channel::Email {
                // Unsupported channel in a batch element is skipped without
                // failing the batch.
                tracing::debug!(
                    notification_id = %notification.id,
                    "skipping notification with unsupported channel"
                );
                continue;
            }

            let message = match self.build_message(notification) {
                Ok(m) => m,
                Err(e) => {
                    if first_error.is_none() {
                        first_error = Some(e.to_string());
                    }
                    continue;
                }
            };

            if let Err(e) = self.transport.send(message).await {
                tracing::warn!(notification_id = %notification.id, error = %e, "send failed");
                if first_error.is_none() {
                    first_error = Some(e.to_string());
                }
            }
        }

        match first_error {
            Some(msg) => Err(AppError::Transient(msg)),
            None => Ok(()),
        }
    }
}

/// In-memory `Sender` test double, used by worker tests to assert exactly
/// which batches were dispatched without a live SMTP server.
#[cfg(test)]
pub struct RecordingSender {
    pub sent: tokio::sync::Mutex<Vec<Vec<Notification>>>,
}

#[cfg(test)]
impl RecordingSender {
    pub fn new() -> Self {
        Self {
            sent: tokio::sync::Mutex::new(Vec::new()),
        }
    }
}

#[cfg(test)]
#[async_trait]
impl Sender for RecordingSender {
    async fn send(&self, batch: &[Notification]) -> AppResult<()> {
        self.sent.lock().await.push(batch.to_vec());
        Ok(())
    }
}

#[cfg(test)]
impl Default for RecordingSender {
    fn default() -> Self {
        Self::new()
    }
}
