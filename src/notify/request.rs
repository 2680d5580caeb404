//! Incoming notification requests.

use serde::{Deserialize, Serialize};

use crate::error::RequestError;

/// Payload asking to notify a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifyRequest {
    /// Recipient address
    pub user_email: String,
    /// Message type, selecting the rate policy
    pub message_type: String,
}

impl NotifyRequest {
    pub fn new(user_email: impl Into<String>, message_type: impl Into<String>) -> Self {
        Self {
            user_email: user_email.into(),
            message_type: message_type.into(),
        }
    }

    /// Check that both fields are present and the email looks like an address.
    ///
    /// Whether the message type is configured is left to the limiter.
    pub fn validate(&self) -> Result<(), RequestError> {
        let email = self.user_email.trim();
        if email.is_empty() {
            return Err(RequestError::MissingField("user_email"));
        }
        if self.message_type.trim().is_empty() {
            return Err(RequestError::MissingField("message_type"));
        }
        if !looks_like_email(email) {
            return Err(RequestError::InvalidEmail(self.user_email.clone()));
        }
        Ok(())
    }
}

fn looks_like_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && !domain.contains('@')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}
