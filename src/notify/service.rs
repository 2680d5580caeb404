//! User notification service.

use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use super::delivery::Notifier;
use super::message::Notification;
use crate::error::NotifyError;
use crate::ratelimit::Limiter;

/// Sends notifications to users, subject to the rate limits.
///
/// The limiter is always consulted before anything is delivered. A
/// throttled request never reaches the notifier.
pub struct UserNotifier<L: Limiter, N: Notifier> {
    limiter: Arc<L>,
    notifier: Arc<N>,
}

impl<L: Limiter, N: Notifier> UserNotifier<L, N> {
    /// Create a new service.
    pub fn new(limiter: Arc<L>, notifier: Arc<N>) -> Self {
        Self { limiter, notifier }
    }

    /// Notify `user_email` with a message of type `message_type`.
    ///
    /// # Errors
    /// - [`NotifyError::Limiter`] if the limiter cannot decide, including
    ///   unknown message types
    /// - [`NotifyError::LimitExceeded`] if the user is throttled
    /// - [`NotifyError::Delivery`] if the notifier fails
    #[instrument(skip_all, fields(user = %user_email, message_type = %message_type))]
    pub async fn notify(&self, user_email: &str, message_type: &str) -> Result<(), NotifyError> {
        let reached = self
            .limiter
            .reached(user_email, message_type)
            .await
            .map_err(|source| NotifyError::Limiter {
                user: user_email.to_string(),
                source,
            })?;

        if reached {
            debug!("Notification throttled");
            return Err(NotifyError::LimitExceeded {
                user: user_email.to_string(),
                message_type: message_type.to_string(),
            });
        }

        let notification = Notification::for_message_type(user_email, message_type);
        self.notifier
            .deliver(&notification)
            .await
            .map_err(|source| {
                warn!(error = %source, "Notification delivery failed");
                NotifyError::Delivery {
                    user: user_email.to_string(),
                    source,
                }
            })?;

        info!("Notification sent");
        Ok(())
    }
}
