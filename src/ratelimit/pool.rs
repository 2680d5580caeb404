//! Limiters for every configured message type.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use super::backend::Limiter;
use super::limiter::TypeScopedLimiter;
use super::policy::Policy;
use crate::error::LimiterError;
use crate::store::CounterStore;

/// Routes each request to the limiter of its message type.
///
/// The set of message types is fixed at construction. All limiters share
/// the same store and use their message type as key suffix.
#[derive(Debug)]
pub struct LimiterPool {
    limiters: HashMap<String, TypeScopedLimiter>,
}

impl LimiterPool {
    /// Build one limiter per entry of `policies`.
    pub fn new(store: Arc<dyn CounterStore>, policies: HashMap<String, Policy>) -> Self {
        let limiters: HashMap<String, TypeScopedLimiter> = policies
            .into_iter()
            .map(|(message_type, policy)| {
                debug!(
                    message_type = %message_type,
                    max_hits = policy.max_hits(),
                    window_secs = policy.window().as_secs(),
                    "Creating limiter"
                );
                let limiter = TypeScopedLimiter::new(store.clone(), policy, message_type.clone());
                (message_type, limiter)
            })
            .collect();

        info!(limiters = limiters.len(), "Limiter pool initialized");
        Self { limiters }
    }

    /// Record a hit for `user` under `message_type`.
    ///
    /// # Errors
    /// Returns [`LimiterError::InvalidMessageType`] without touching the
    /// store if no limiter is configured for `message_type`, and propagates
    /// the limiter's own errors otherwise.
    pub async fn reached(&self, user: &str, message_type: &str) -> Result<bool, LimiterError> {
        let limiter = self
            .limiters
            .get(message_type)
            .ok_or_else(|| LimiterError::InvalidMessageType(message_type.to_string()))?;

        limiter.reached(user).await
    }

    /// Configured message types, sorted.
    pub fn message_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.limiters.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    /// Policy enforced for `message_type`, if configured.
    pub fn policy(&self, message_type: &str) -> Option<Policy> {
        self.limiters.get(message_type).map(TypeScopedLimiter::policy)
    }

    /// Get the number of limiters.
    pub fn len(&self) -> usize {
        self.limiters.len()
    }

    /// Whether no message type is configured.
    pub fn is_empty(&self) -> bool {
        self.limiters.is_empty()
    }
}

#[async_trait]
impl Limiter for LimiterPool {
    async fn reached(&self, user: &str, message_type: &str) -> Result<bool, LimiterError> {
        LimiterPool::reached(self, user, message_type).await
    }
}
