//! Rate limiter for a single message type.

use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace, warn};

use super::policy::Policy;
use crate::error::LimiterError;
use crate::store::CounterStore;

/// Limits how many hits a key may record within a window.
///
/// Several limiters can share one store as long as their suffixes differ;
/// the suffix is appended to every key so their counters never collide.
///
/// The limiter holds no lock. Each call is one atomic `increment`, followed
/// by best-effort expiry bookkeeping.
pub struct TypeScopedLimiter {
    /// Shared counter store
    store: Arc<dyn CounterStore>,
    /// Quota and window
    policy: Policy,
    /// Suffix appended to every key
    suffix: String,
}

impl fmt::Debug for TypeScopedLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeScopedLimiter")
            .field("policy", &self.policy)
            .field("suffix", &self.suffix)
            .finish_non_exhaustive()
    }
}

impl TypeScopedLimiter {
    /// Create a limiter applying `policy` to keys suffixed with `suffix`.
    pub fn new(store: Arc<dyn CounterStore>, policy: Policy, suffix: impl Into<String>) -> Self {
        Self {
            store,
            policy,
            suffix: suffix.into(),
        }
    }

    /// The policy this limiter enforces.
    pub fn policy(&self) -> Policy {
        self.policy
    }

    /// Store key used for `key`.
    pub fn composite_key(&self, key: &str) -> String {
        format!("{}-{}", key, self.suffix)
    }

    /// Record a hit for `key` and report whether it exceeds the quota.
    ///
    /// The first `max_hits` calls in a window return `false`; every further
    /// call returns `true` until the counter expires.
    ///
    /// # Errors
    /// Fails only if the increment fails. Expiry bookkeeping errors are
    /// logged and otherwise ignored.
    pub async fn reached(&self, key: &str) -> Result<bool, LimiterError> {
        let key = self.composite_key(key);

        let counter = self
            .store
            .increment(&key)
            .await
            .map_err(|source| LimiterError::Increment {
                key: key.clone(),
                source,
            })?;

        let max_hits = self.policy.max_hits();
        trace!(key = %key, counter, max_hits, "Recorded hit");

        self.ensure_expiry(&key).await;

        let reached = counter > i64::try_from(max_hits).unwrap_or(i64::MAX);
        if reached {
            debug!(key = %key, counter, max_hits, "Rate limit reached");
        }
        Ok(reached)
    }

    /// Attach the window to `key` if it has no expiry yet.
    ///
    /// Errors are swallowed on purpose: the hit is already counted, and the
    /// next request for the same key tries again. This keeps the hot path
    /// free of locks and retry loops, at the cost that a key whose expiry
    /// keeps failing is never reset.
    async fn ensure_expiry(&self, key: &str) {
        let ttl = match self.store.query_ttl(key).await {
            Ok(ttl) => ttl,
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to query counter TTL");
                return;
            }
        };

        if !ttl.is_unset() {
            return;
        }

        if let Err(e) = self.store.set_expiry(key, self.policy.window()).await {
            warn!(key = %key, error = %e, "Failed to set counter expiry");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::error::StoreError;
    use crate::store::mock::{Call, MockCounterStore};
    use crate::store::{MemoryCounterStore, Ttl};

    fn create_test_limiter(store: Arc<dyn CounterStore>) -> TypeScopedLimiter {
        let policy = Policy::new(10, Duration::from_secs(30)).unwrap();
        TypeScopedLimiter::new(store, policy, "suffix")
    }

    #[test]
    fn test_composite_key() {
        let limiter = create_test_limiter(Arc::new(MockCounterStore::new()));
        assert_eq!(limiter.composite_key("testKey"), "testKey-suffix");
        assert_eq!(limiter.policy().max_hits(), 10);
    }

    #[tokio::test]
    async fn test_counter_below_max() {
        let store = Arc::new(MockCounterStore::new().with_counter(4));
        let limiter = create_test_limiter(store.clone());

        assert!(!limiter.reached("testKey").await.unwrap());
        assert_eq!(
            store.calls(),
            vec![
                Call::Increment("testKey-suffix".to_string()),
                Call::QueryTtl("testKey-suffix".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_counter_above_max() {
        let store = Arc::new(MockCounterStore::new().with_counter(14));
        let limiter = create_test_limiter(store.clone());

        assert!(limiter.reached("testKey").await.unwrap());
        assert!(store.expiry_calls().is_empty());
    }

    #[tokio::test]
    async fn test_counter_at_max_is_allowed() {
        let store = Arc::new(MockCounterStore::new().with_counter(9));
        let limiter = create_test_limiter(store.clone());

        assert!(!limiter.reached("testKey").await.unwrap());
        assert!(limiter.reached("testKey").await.unwrap());
    }

    #[tokio::test]
    async fn test_increment_error() {
        let store = Arc::new(MockCounterStore::new().failing_increment());
        let limiter = create_test_limiter(store.clone());

        let err = limiter.reached("testKey").await.unwrap_err();

        match &err {
            LimiterError::Increment { key, source } => {
                assert_eq!(key, "testKey-suffix");
                assert!(matches!(source, StoreError::Timeout { op: "INCR", .. }));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().starts_with("error increasing user counter"));
        assert_eq!(
            store.calls(),
            vec![Call::Increment("testKey-suffix".to_string())]
        );
    }

    #[tokio::test]
    async fn test_unset_ttl_is_set_to_window() {
        for ttl in [Ttl::Missing, Ttl::Persistent] {
            let store = Arc::new(MockCounterStore::new().with_counter(4).with_ttl(ttl));
            let limiter = create_test_limiter(store.clone());

            assert!(!limiter.reached("testKey").await.unwrap());
            assert_eq!(
                store.expiry_calls(),
                vec![Call::SetExpiry(
                    "testKey-suffix".to_string(),
                    Duration::from_secs(30)
                )]
            );
        }
    }

    #[tokio::test]
    async fn test_expiry_failure_does_not_change_decision() {
        let store = Arc::new(
            MockCounterStore::new()
                .with_counter(10)
                .with_ttl(Ttl::Missing)
                .failing_expiry(),
        );
        let limiter = create_test_limiter(store.clone());

        assert!(limiter.reached("testKey").await.unwrap());
        assert_eq!(store.expiry_calls().len(), 1);

        // The next call retries the bookkeeping.
        assert!(limiter.reached("testKey").await.unwrap());
        assert_eq!(store.expiry_calls().len(), 2);
    }

    #[tokio::test]
    async fn test_ttl_query_failure_is_ignored() {
        let store = Arc::new(MockCounterStore::new().with_counter(1).failing_ttl());
        let limiter = create_test_limiter(store.clone());

        assert!(!limiter.reached("testKey").await.unwrap());
        assert!(store.expiry_calls().is_empty());
    }

    #[tokio::test]
    async fn test_limiters_sharing_a_store_do_not_interfere() {
        let store = Arc::new(MemoryCounterStore::new());
        let one = Policy::new(1, Duration::from_secs(60)).unwrap();
        let news = TypeScopedLimiter::new(store.clone(), one, "News");
        let status = TypeScopedLimiter::new(store.clone(), one, "Status");

        assert!(!news.reached("alice").await.unwrap());
        assert!(news.reached("alice").await.unwrap());

        assert_eq!(store.value("alice-News"), Some(2));
        assert_eq!(store.value("alice-Status"), None);
        assert!(!status.reached("alice").await.unwrap());
        assert_eq!(store.value("alice-Status"), Some(1));
    }

    #[tokio::test]
    async fn test_redundant_expiry_does_not_change_outcome() {
        let store = Arc::new(MemoryCounterStore::new());
        let policy = Policy::new(2, Duration::from_secs(60)).unwrap();
        let limiter = TypeScopedLimiter::new(store.clone(), policy, "Status");

        assert!(!limiter.reached("bob").await.unwrap());
        store.set_expiry("bob-Status", Duration::from_secs(60)).await.unwrap();
        store.set_expiry("bob-Status", Duration::from_secs(60)).await.unwrap();

        assert!(!limiter.reached("bob").await.unwrap());
        assert!(limiter.reached("bob").await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_redundant_expiry_does_not_extend_window() {
        let store = Arc::new(MemoryCounterStore::new());
        let policy = Policy::new(1, Duration::from_secs(60)).unwrap();
        let limiter = TypeScopedLimiter::new(store.clone(), policy, "News");

        assert!(!limiter.reached("erin").await.unwrap());

        tokio::time::advance(Duration::from_secs(30)).await;
        assert!(!store.set_expiry("erin-News", Duration::from_secs(60)).await.unwrap());

        tokio::time::advance(Duration::from_secs(31)).await;
        assert!(!limiter.reached("erin").await.unwrap());
        assert_eq!(store.value("erin-News"), Some(1));
    }

    #[tokio::test]
    async fn test_largest_quota_is_never_reached() {
        let store = Arc::new(MockCounterStore::new().with_counter(i64::MAX - 1));
        let policy = Policy::new(i64::MAX as u64, Duration::from_secs(60)).unwrap();
        let limiter = TypeScopedLimiter::new(store, policy, "Status");

        assert!(!limiter.reached("frank").await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_expiry_resets_counter() {
        let store = Arc::new(MemoryCounterStore::new());
        let policy = Policy::new(2, Duration::from_secs(60)).unwrap();
        let limiter = TypeScopedLimiter::new(store.clone(), policy, "Status");

        assert!(!limiter.reached("carol").await.unwrap());
        assert!(!limiter.reached("carol").await.unwrap());
        assert!(limiter.reached("carol").await.unwrap());

        tokio::time::advance(Duration::from_secs(61)).await;

        assert!(!limiter.reached("carol").await.unwrap());
        assert_eq!(store.value("carol-Status"), Some(1));
    }

    #[tokio::test]
    async fn test_concurrent_callers_admit_exactly_max() {
        let store = Arc::new(MemoryCounterStore::new());
        let policy = Policy::new(5, Duration::from_secs(60)).unwrap();
        let limiter = Arc::new(TypeScopedLimiter::new(store.clone(), policy, "Marketing"));

        let calls = (0..20).map(|_| {
            let limiter = limiter.clone();
            async move { limiter.reached("dave").await.unwrap() }
        });
        let results = futures::future::join_all(calls).await;

        assert_eq!(results.iter().filter(|reached| !**reached).count(), 5);
        assert_eq!(store.value("dave-Marketing"), Some(20));
    }
}
