//! Rate limiter trait consumed by the notification service.

use async_trait::async_trait;

use crate::error::LimiterError;

/// Decides whether a user has exhausted the quota for a message type.
///
/// Implemented by [`LimiterPool`](super::LimiterPool); the notification
/// service depends on this trait so it can run against test doubles.
#[async_trait]
pub trait Limiter: Send + Sync {
    /// Record one attempt and return `true` if it must be throttled.
    async fn reached(&self, user: &str, message_type: &str) -> Result<bool, LimiterError>;
}
