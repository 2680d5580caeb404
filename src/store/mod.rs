//! Shared counter storage used by the rate limiters.
//!
//! The limiters only depend on the [`CounterStore`] trait. Atomicity of the
//! increment is the store's job: implementations must apply concurrent
//! increments to the same key exactly once each, without the caller holding
//! any lock.

mod memory;
#[cfg(test)]
pub(crate) mod mock;
mod redis_store;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::StoreError;

pub use self::memory::MemoryCounterStore;
pub use self::redis_store::{RedisCounterStore, RedisStoreConfig};

/// Remaining time-to-live of a counter key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ttl {
    /// The key does not exist
    Missing,
    /// The key exists but has no expiry
    Persistent,
    /// The key expires after the given duration
    Expires(Duration),
}

impl Ttl {
    /// Decode the integer reply of a Redis `TTL` command.
    ///
    /// `-2` means the key is absent and `-1` means it never expires.
    pub fn from_redis_reply(secs: i64) -> Self {
        match secs {
            -2 => Ttl::Missing,
            s if s < 0 => Ttl::Persistent,
            s => Ttl::Expires(Duration::from_secs(s as u64)),
        }
    }

    /// Whether no expiry is currently attached to the key.
    pub fn is_unset(&self) -> bool {
        !matches!(self, Ttl::Expires(_))
    }
}

/// Atomic counters with expiry in shared storage.
///
/// Dropping a returned future abandons the call; an increment that already
/// reached the store stays applied.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Atomically add one to the counter, creating it at 1 if absent.
    async fn increment(&self, key: &str) -> Result<i64, StoreError>;

    /// Atomically subtract one from the counter, creating it at -1 if absent.
    async fn decrement(&self, key: &str) -> Result<i64, StoreError>;

    /// Attach an expiry to the key unless it already has one.
    ///
    /// Returns `true` if the expiry was attached, `false` if the key does
    /// not exist or keeps its current expiry.
    async fn set_expiry(&self, key: &str, ttl: Duration) -> Result<bool, StoreError>;

    /// Remaining time-to-live of the key.
    async fn query_ttl(&self, key: &str) -> Result<Ttl, StoreError>;
}
