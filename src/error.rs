//! Error types for the Herald service.

use std::time::Duration;

use thiserror::Error;

/// Main error type for Herald startup and wiring.
#[derive(Error, Debug)]
pub enum HeraldError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Counter store errors
    #[error("Counter store error: {0}")]
    Store(#[from] StoreError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<::config::ConfigError> for HeraldError {
    fn from(err: ::config::ConfigError) -> Self {
        HeraldError::Config(err.to_string())
    }
}

/// Result type alias for Herald operations.
pub type Result<T> = std::result::Result<T, HeraldError>;

/// Errors returned by a counter store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The Redis client reported an error
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// The store did not answer in time
    #[error("{op} timed out after {timeout:?}")]
    Timeout {
        /// Store operation that timed out
        op: &'static str,
        /// Configured command timeout
        timeout: Duration,
    },
}

/// Errors returned by the rate limiters.
#[derive(Error, Debug)]
pub enum LimiterError {
    /// No limiter is configured for the requested message type.
    #[error("message type not valid: {0}")]
    InvalidMessageType(String),

    /// Incrementing the counter failed, so no decision could be made.
    #[error("error increasing user counter for {key}: {source}")]
    Increment {
        /// Composite key that was being incremented
        key: String,
        #[source]
        source: StoreError,
    },
}

impl LimiterError {
    /// Whether the error was caused by the caller asking for an unknown message type.
    pub fn is_invalid_message_type(&self) -> bool {
        matches!(self, LimiterError::InvalidMessageType(_))
    }
}

/// Errors returned by a message delivery backend.
#[derive(Error, Debug)]
pub enum DeliveryError {
    /// The message could not be handed over to the delivery backend
    #[error("unexpected error sending message: {0}")]
    Send(String),
}

/// Errors returned by the notification service.
#[derive(Error, Debug)]
pub enum NotifyError {
    /// The rate limiter could not reach a decision.
    #[error("limiter error for user {user}: {source}")]
    Limiter {
        user: String,
        #[source]
        source: LimiterError,
    },

    /// The user already received the maximum number of messages of this type.
    #[error("limit exceeded: rate limit reached for user {user} and message type {message_type}")]
    LimitExceeded { user: String, message_type: String },

    /// The message was allowed but could not be delivered.
    #[error("notifier error for user {user}: {source}")]
    Delivery {
        user: String,
        #[source]
        source: DeliveryError,
    },
}

impl NotifyError {
    /// Whether this error is a throttling rejection that can be retried later.
    pub fn is_throttled(&self) -> bool {
        matches!(self, NotifyError::LimitExceeded { .. })
    }
}

/// Validation errors for incoming notification requests.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RequestError {
    /// A required field is empty
    #[error("request validation fails due to: {0} is required")]
    MissingField(&'static str),

    /// The user email is not an address
    #[error("request validation fails due to: {0:?} is not a valid email")]
    InvalidEmail(String),
}
