//! Redis-backed counter store.
//!
//! Counters are plain Redis integers manipulated with `INCR`/`DECR`, and
//! windows are Redis key expiries (`EXPIRE ... NX`/`TTL`). Redis applies
//! each command atomically, so concurrent processes sharing the same
//! instance never lose an increment.
//!
//! The `NX` flag of `EXPIRE` needs Redis 7.0 or newer.
//!
//! The connection is a [`ConnectionManager`], which multiplexes commands and
//! reconnects on failure. It is cloned per call rather than guarded by a
//! lock, so callers never serialize on the client.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, RedisError};
use tracing::{debug, info};

use super::{CounterStore, Ttl};
use crate::error::StoreError;

/// Configuration for the Redis counter store.
#[derive(Debug, Clone)]
pub struct RedisStoreConfig {
    /// Upper bound for a single Redis command (default: 500ms)
    pub command_timeout: Duration,
}

impl Default for RedisStoreConfig {
    fn default() -> Self {
        Self {
            command_timeout: Duration::from_millis(500),
        }
    }
}

/// Counter store shared by every limiter of the process.
#[derive(Clone)]
pub struct RedisCounterStore {
    connection: ConnectionManager,
    config: RedisStoreConfig,
}

impl fmt::Debug for RedisCounterStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisCounterStore")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RedisCounterStore {
    /// Connect to Redis with the default configuration.
    ///
    /// # Errors
    /// Returns error if the URL is invalid or the connection fails.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        Self::connect_with_config(url, RedisStoreConfig::default()).await
    }

    /// Connect to Redis with a custom configuration.
    ///
    /// # Errors
    /// Returns error if the URL is invalid or the connection fails.
    pub async fn connect_with_config(
        url: &str,
        config: RedisStoreConfig,
    ) -> Result<Self, StoreError> {
        let client = Client::open(url)?;
        let connection = ConnectionManager::new(client).await?;

        info!(
            command_timeout_ms = config.command_timeout.as_millis() as u64,
            "Connected to Redis counter store"
        );

        Ok(Self { connection, config })
    }

    /// Run one command against a clone of the shared connection, bounded by
    /// the configured timeout.
    async fn run<T, F, Fut>(&self, op: &'static str, command: F) -> Result<T, StoreError>
    where
        F: FnOnce(ConnectionManager) -> Fut,
        Fut: Future<Output = Result<T, RedisError>>,
    {
        let timeout = self.config.command_timeout;
        match tokio::time::timeout(timeout, command(self.connection.clone())).await {
            Ok(result) => result.map_err(StoreError::from),
            Err(_) => {
                debug!(op, timeout_ms = timeout.as_millis() as u64, "Redis command timed out");
                Err(StoreError::Timeout { op, timeout })
            }
        }
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn increment(&self, key: &str) -> Result<i64, StoreError> {
        self.run("INCR", |mut conn| async move { conn.incr::<_, _, i64>(key, 1).await })
            .await
    }

    async fn decrement(&self, key: &str) -> Result<i64, StoreError> {
        self.run("DECR", |mut conn| async move { conn.decr::<_, _, i64>(key, 1).await })
            .await
    }

    async fn set_expiry(&self, key: &str, ttl: Duration) -> Result<bool, StoreError> {
        // EXPIRE has whole-second resolution; never round a window down to zero.
        let secs = ttl.as_secs().max(1);
        self.run("EXPIRE", |mut conn| async move {
            let attached: Result<bool, RedisError> = redis::cmd("EXPIRE")
                .arg(key)
                .arg(secs)
                .arg("NX")
                .query_async(&mut conn)
                .await;
            attached
        })
        .await
    }

    async fn query_ttl(&self, key: &str) -> Result<Ttl, StoreError> {
        let secs = self
            .run("TTL", |mut conn| async move { conn.ttl::<_, i64>(key).await })
            .await?;
        Ok(Ttl::from_redis_reply(secs))
    }
}
