//! In-process counter store.
//!
//! Mirrors the Redis semantics the limiters rely on: counters appear on
//! first increment, carry an optional expiry, and disappear once the expiry
//! passes. An expired entry is removed from the map by the next access to
//! its key, or by [`MemoryCounterStore::purge_expired`].

use std::time::Duration;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::time::Instant;
use tracing::trace;

use super::{CounterStore, Ttl};
use crate::error::StoreError;

#[derive(Debug, Clone, Copy)]
struct Counter {
    value: i64,
    expires_at: Option<Instant>,
}

impl Counter {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Counter store kept in the memory of the current process.
///
/// Only suitable when a single process enforces the limits, such as tests
/// and local runs.
#[derive(Debug, Default)]
pub struct MemoryCounterStore {
    counters: DashMap<String, Counter>,
}

impl MemoryCounterStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of a counter, if it exists and has not expired.
    pub fn value(&self, key: &str) -> Option<i64> {
        self.evict_if_expired(key);
        self.counters.get(key).map(|c| c.value)
    }

    /// Number of live counters.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.counters.iter().filter(|c| !c.is_expired(now)).count()
    }

    /// Whether no live counter exists.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every expired counter. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.counters.len();
        self.counters.retain(|_, c| !c.is_expired(now));
        let removed = before.saturating_sub(self.counters.len());
        if removed > 0 {
            trace!(removed, "Purged expired counters");
        }
        removed
    }

    /// Entries held by the map, expired or not.
    #[cfg(test)]
    pub(crate) fn raw_len(&self) -> usize {
        self.counters.len()
    }

    /// Remove `key` if its expiry has passed.
    fn evict_if_expired(&self, key: &str) {
        let now = Instant::now();
        self.counters.remove_if(key, |_, c| c.is_expired(now));
    }

    /// Apply `delta` under the shard lock of `key`; an expired entry is
    /// replaced by a fresh counter without expiry.
    fn add(&self, key: &str, delta: i64) -> i64 {
        let now = Instant::now();
        match self.counters.entry(key.to_string()) {
            Entry::Occupied(mut occupied) if !occupied.get().is_expired(now) => {
                let counter = occupied.get_mut();
                counter.value += delta;
                counter.value
            }
            Entry::Occupied(mut occupied) => {
                occupied.insert(Counter {
                    value: delta,
                    expires_at: None,
                });
                delta
            }
            Entry::Vacant(vacant) => {
                vacant.insert(Counter {
                    value: delta,
                    expires_at: None,
                });
                delta
            }
        }
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn increment(&self, key: &str) -> Result<i64, StoreError> {
        Ok(self.add(key, 1))
    }

    async fn decrement(&self, key: &str) -> Result<i64, StoreError> {
        Ok(self.add(key, -1))
    }

    async fn set_expiry(&self, key: &str, ttl: Duration) -> Result<bool, StoreError> {
        self.evict_if_expired(key);
        let now = Instant::now();
        match self.counters.get_mut(key) {
            Some(mut counter) if counter.expires_at.is_none() => {
                counter.expires_at = Some(now + ttl);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn query_ttl(&self, key: &str) -> Result<Ttl, StoreError> {
        self.evict_if_expired(key);
        let now = Instant::now();
        let ttl = match self.counters.get(key) {
            Some(counter) => match counter.expires_at {
                Some(at) => Ttl::Expires(at.saturating_duration_since(now)),
                None => Ttl::Persistent,
            },
            None => Ttl::Missing,
        };
        Ok(ttl)
    }
}
