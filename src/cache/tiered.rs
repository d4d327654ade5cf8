//! Fresh/stale cache over the shared key-value store.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use std::time::Duration;
use thiserror::Error;

use crate::cache::entry::CacheEntry;
use crate::clock::SharedClock;
use crate::observability::metrics;
use crate::resilience::timeouts::within;
use crate::store::{SharedStore, StoreError};

/// Errors from writing to the cache.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("cache encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Which entries a read accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadPolicy {
    /// Ignore entries past their fresh window.
    FreshOnly,
    /// Accept stale entries too. Reserved for the fallback chain.
    Any,
}

/// Cache for one data category.
pub struct TieredCache<T> {
    category: String,
    store: SharedStore,
    clock: SharedClock,
    fresh_ttl: Duration,
    hard_ttl: Duration,
    op_timeout: Duration,
    _marker: PhantomData<fn() -> T>,
}

impl<T> TieredCache<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(
        category: impl Into<String>,
        store: SharedStore,
        clock: SharedClock,
        fresh_ttl: Duration,
        hard_ttl: Duration,
        op_timeout: Duration,
    ) -> Self {
        Self {
            category: category.into(),
            store,
            clock,
            fresh_ttl,
            hard_ttl,
            op_timeout,
            _marker: PhantomData,
        }
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn fresh_ttl(&self) -> Duration {
        self.fresh_ttl
    }

    /// Current time on the cache's clock.
    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    fn store_key(&self, key: &str) -> String {
        format!("cache:{}:{}", self.category, key)
    }

    /// Return the stored entry regardless of freshness.
    pub async fn get(&self, key: &str) -> Option<CacheEntry<T>> {
        let raw = match within(self.op_timeout, self.store.get(&self.store_key(key))).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                metrics::record_cache_op(&self.category, "get", "miss");
                return None;
            }
            Err(e) => {
                tracing::warn!(category = %self.category, key, error = %e, "Cache read failed, treating as miss");
                metrics::record_cache_op(&self.category, "get", "error");
                return None;
            }
        };

        match serde_json::from_slice::<CacheEntry<T>>(&raw) {
            Ok(entry) => {
                metrics::record_cache_op(&self.category, "get", "hit");
                Some(entry)
            }
            Err(e) => {
                tracing::warn!(category = %self.category, key, error = %e, "Undecodable cache entry, treating as miss");
                metrics::record_cache_op(&self.category, "get", "error");
                None
            }
        }
    }

    /// Read under `policy`.
    pub async fn read(&self, key: &str, policy: ReadPolicy) -> Option<CacheEntry<T>> {
        let entry = self.get(key).await?;
        match policy {
            ReadPolicy::Any => Some(entry),
            ReadPolicy::FreshOnly if entry.is_fresh(self.clock.now_ms()) => Some(entry),
            ReadPolicy::FreshOnly => {
                tracing::debug!(category = %self.category, key, "Ignoring stale entry");
                None
            }
        }
    }

    /// Overwrite `key` with a freshly fetched value.
    pub async fn put(&self, key: &str, value: &T) -> Result<(), CacheError> {
        let entry = CacheEntry {
            value,
            stored_at: self.clock.now_ms(),
            fresh_ttl_ms: crate::clock::millis(self.fresh_ttl),
        };
        let bytes = serde_json::to_vec(&entry)?;

        let result = within(
            self.op_timeout,
            self.store.put(&self.store_key(key), bytes, Some(self.hard_ttl)),
        )
        .await;

        match result {
            Ok(()) => {
                metrics::record_cache_op(&self.category, "put", "ok");
                Ok(())
            }
            Err(e) => {
                metrics::record_cache_op(&self.category, "put", "error");
                Err(e.into())
            }
        }
    }

    /// Drop the entry for `key`.
    pub async fn invalidate(&self, key: &str) -> Result<(), CacheError> {
        within(self.op_timeout, self.store.delete(&self.store_key(key))).await?;
        Ok(())
    }
}

impl<T> std::fmt::Debug for TieredCache<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TieredCache")
            .field("category", &self.category)
            .field("fresh_ttl", &self.fresh_ttl)
            .field("hard_ttl", &self.hard_ttl)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::store::{KvStore, MemoryStore, StoreResult};
    use async_trait::async_trait;
    use std::sync::Arc;

    fn cache(clock: &ManualClock) -> (TieredCache<Vec<String>>, Arc<MemoryStore>) {
        let clock: SharedClock = Arc::new(clock.clone());
        let store = Arc::new(MemoryStore::with_clock(clock.clone(), None));
        let cache = TieredCache::new(
            "catalog",
            store.clone(),
            clock,
            Duration::from_secs(60),
            Duration::from_secs(600),
            Duration::from_millis(50),
        );
        (cache, store)
    }

    #[tokio::test]
    async fn test_fresh_then_stale_then_gone() {
        let clock = ManualClock::new(0);
        let (cache, _) = cache(&clock);
        let value = vec!["cut".to_string()];

        cache.put("all", &value).await.unwrap();
        assert_eq!(cache.read("all", ReadPolicy::FreshOnly).await.unwrap().value, value);

        clock.advance(Duration::from_secs(61));
        assert!(cache.read("all", ReadPolicy::FreshOnly).await.is_none());
        let stale = cache.read("all", ReadPolicy::Any).await.unwrap();
        assert!(!stale.is_fresh(cache.now_ms()));

        // Past the hard expiry the store drops it
        clock.advance(Duration::from_secs(600));
        assert!(cache.get("all").await.is_none());
    }

    #[tokio::test]
    async fn test_undecodable_entry_is_a_miss() {
        let clock = ManualClock::new(0);
        let (cache, store) = cache(&clock);
        store
            .put("cache:catalog:all", b"{not json".to_vec(), None)
            .await
            .unwrap();
        assert!(cache.get("all").await.is_none());
    }

    struct HangingStore;

    #[async_trait]
    impl KvStore for HangingStore {
        async fn get(&self, _key: &str) -> StoreResult<Option<Vec<u8>>> {
            std::future::pending().await
        }
        async fn put(&self, _key: &str, _value: Vec<u8>, _ttl: Option<Duration>) -> StoreResult<()> {
            std::future::pending().await
        }
        async fn delete(&self, _key: &str) -> StoreResult<()> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_timeout_is_a_miss() {
        let cache: TieredCache<Vec<String>> = TieredCache::new(
            "catalog",
            Arc::new(HangingStore),
            Arc::new(ManualClock::new(0)),
            Duration::from_secs(60),
            Duration::from_secs(600),
            Duration::from_millis(50),
        );

        assert!(cache.get("all").await.is_none());
        let err = cache.put("all", &vec![]).await.unwrap_err();
        assert!(matches!(err, CacheError::Store(StoreError::Timeout(_))));
    }
}
