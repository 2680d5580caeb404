//! Message delivery backends.

use async_trait::async_trait;
use tracing::info;

use super::message::Notification;
use crate::error::DeliveryError;

/// Hands a notification over to a delivery channel.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver `notification` to its recipient.
    async fn deliver(&self, notification: &Notification) -> Result<(), DeliveryError>;
}

/// Notifier that writes messages to the log instead of sending them.
///
/// Every message is attributed to the same sender address.
#[derive(Debug, Clone)]
pub struct LogNotifier {
    sender: String,
}

impl LogNotifier {
    /// Create a notifier sending from `sender`.
    pub fn new(sender: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
        }
    }

    /// Sender address of every message.
    pub fn sender(&self) -> &str {
        &self.sender
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn deliver(&self, notification: &Notification) -> Result<(), DeliveryError> {
        if notification.to.is_empty() {
            return Err(DeliveryError::Send("recipient is empty".to_string()));
        }

        info!(
            from = %self.sender,
            to = %notification.to,
            subject = %notification.subject,
            body_len = notification.body.len(),
            "Notification delivered"
        );
        Ok(())
    }
}
