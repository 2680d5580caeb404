//! Scriptable counter store for unit tests.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::{CounterStore, Ttl};
use crate::error::StoreError;

/// A store operation observed by [`MockCounterStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Increment(String),
    Decrement(String),
    SetExpiry(String, Duration),
    QueryTtl(String),
}

/// Counter store that records every call and answers from a script.
///
/// Increments return successive values starting after `counter`, TTL queries
/// return `ttl`, and each operation can be made to fail.
#[derive(Debug)]
pub struct MockCounterStore {
    calls: Mutex<Vec<Call>>,
    counter: Mutex<i64>,
    ttl: Ttl,
    fail_increment: bool,
    fail_ttl: bool,
    fail_expiry: bool,
}

impl Default for MockCounterStore {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            counter: Mutex::new(0),
            ttl: Ttl::Expires(Duration::from_secs(10)),
            fail_increment: false,
            fail_ttl: false,
            fail_expiry: false,
        }
    }
}

impl MockCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next increment returns `value + 1`.
    pub fn with_counter(self, value: i64) -> Self {
        *self.counter.lock().unwrap() = value;
        self
    }

    pub fn with_ttl(mut self, ttl: Ttl) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn failing_increment(mut self) -> Self {
        self.fail_increment = true;
        self
    }

    pub fn failing_ttl(mut self) -> Self {
        self.fail_ttl = true;
        self
    }

    pub fn failing_expiry(mut self) -> Self {
        self.fail_expiry = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn expiry_calls(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::SetExpiry(..)))
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn failure(op: &'static str) -> StoreError {
        StoreError::Timeout {
            op,
            timeout: Duration::from_millis(1),
        }
    }
}

#[async_trait]
impl CounterStore for MockCounterStore {
    async fn increment(&self, key: &str) -> Result<i64, StoreError> {
        self.record(Call::Increment(key.to_string()));
        if self.fail_increment {
            return Err(Self::failure("INCR"));
        }
        let mut counter = self.counter.lock().unwrap();
        *counter += 1;
        Ok(*counter)
    }

    async fn decrement(&self, key: &str) -> Result<i64, StoreError> {
        self.record(Call::Decrement(key.to_string()));
        let mut counter = self.counter.lock().unwrap();
        *counter -= 1;
        Ok(*counter)
    }

    async fn set_expiry(&self, key: &str, ttl: Duration) -> Result<bool, StoreError> {
        self.record(Call::SetExpiry(key.to_string(), ttl));
        if self.fail_expiry {
            return Err(Self::failure("EXPIRE"));
        }
        Ok(true)
    }

    async fn query_ttl(&self, key: &str) -> Result<Ttl, StoreError> {
        self.record(Call::QueryTtl(key.to_string()));
        if self.fail_ttl {
            return Err(Self::failure("TTL"));
        }
        Ok(self.ttl)
    }
}
