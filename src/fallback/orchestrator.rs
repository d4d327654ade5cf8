//! Fallback chain: breaker check → fetch → cache → static fallback.

use futures_util::FutureExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Display;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::cache::{ReadPolicy, TieredCache};
use crate::fallback::catalog::StaticFallbackCatalog;
use crate::fallback::outcome::{FetchOutcome, Provenance};
use crate::observability::metrics;
use crate::resilience::circuit_breaker::CircuitBreaker;
use crate::upstream::{fetch_with_deadline, UpstreamFetcher};

const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(60);

/// Caller-supplied check that a fetched value is plausible.
pub type Viability<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// Accept lists with at least `min` items.
pub fn min_items<I>(min: usize) -> impl Fn(&Vec<I>) -> bool + Send + Sync + 'static {
    move |items| items.len() >= min
}

/// Resilience controller for one data category.
pub struct FallbackChain<T> {
    breaker: CircuitBreaker,
    cache: TieredCache<T>,
    fallback: StaticFallbackCatalog<T>,
    viable: Viability<T>,
    fetch_timeout: Duration,
}

impl<T> FallbackChain<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    pub fn new(
        breaker: CircuitBreaker,
        cache: TieredCache<T>,
        fallback: StaticFallbackCatalog<T>,
    ) -> Self {
        Self {
            breaker,
            cache,
            fallback,
            viable: Arc::new(|_| true),
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    /// Treat fetched values failing `check` as upstream failures.
    pub fn with_viability(mut self, check: impl Fn(&T) -> bool + Send + Sync + 'static) -> Self {
        self.viable = Arc::new(check);
        self
    }

    /// Deadline applied by [`FallbackChain::resolve_with`].
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn category(&self) -> &str {
        self.cache.category()
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    pub fn cache(&self) -> &TieredCache<T> {
        &self.cache
    }

    /// Resolve `key`, calling `fetch` only while the breaker is closed.
    ///
    /// Never fails: the worst case is the static fallback.
    pub async fn resolve<F, Fut, E>(&self, key: &str, fetch: F) -> FetchOutcome<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        if self.breaker.is_open().await {
            tracing::info!(
                category = %self.category(),
                key,
                breaker = %self.breaker.name(),
                "Circuit open, skipping upstream fetch"
            );
            return self.degrade(key, true).await;
        }

        let start = Instant::now();
        let attempt = AssertUnwindSafe(async move { fetch().await })
            .catch_unwind()
            .await;

        let reason = match attempt {
            Ok(Ok(data)) if (self.viable)(&data) => {
                metrics::record_fetch(self.category(), true, start);
                return self.accept(key, data).await;
            }
            Ok(Ok(_)) => "degenerate result below minimum viable size".to_string(),
            Ok(Err(e)) => e.to_string(),
            Err(_) => "fetch panicked".to_string(),
        };
        metrics::record_fetch(self.category(), false, start);

        let state = self.breaker.record_failure().await;
        tracing::warn!(
            category = %self.category(),
            key,
            reason = %reason,
            failures = state.consecutive_failures,
            "Upstream fetch failed, degrading"
        );

        // The breaker was closed when this request started; report whether
        // this failure opened it without reading it again.
        self.degrade(key, self.breaker.trips(&state)).await
    }

    /// Resolve `key` through `fetcher`, bounded by the configured fetch timeout.
    pub async fn resolve_with<F>(&self, key: &str, fetcher: &F) -> FetchOutcome<T>
    where
        F: UpstreamFetcher<T> + ?Sized,
    {
        let timeout = self.fetch_timeout;
        self.resolve(key, || fetch_with_deadline(fetcher, key, timeout))
            .await
    }

    async fn accept(&self, key: &str, data: T) -> FetchOutcome<T> {
        if let Err(e) = self.cache.put(key, &data).await {
            tracing::warn!(category = %self.category(), key, error = %e, "Fetched data could not be cached");
        }
        self.breaker.reset().await;

        self.finish(
            key,
            FetchOutcome {
                data,
                provenance: Provenance::FreshFetch,
                circuit_breaker_active: false,
            },
        )
    }

    async fn degrade(&self, key: &str, circuit_breaker_active: bool) -> FetchOutcome<T> {
        let outcome = match self.cache.read(key, ReadPolicy::Any).await {
            Some(entry) => {
                let provenance = if entry.is_fresh(self.cache.now_ms()) {
                    Provenance::FreshCache
                } else {
                    Provenance::StaleCache
                };
                FetchOutcome {
                    data: entry.value,
                    provenance,
                    circuit_breaker_active,
                }
            }
            None => {
                tracing::info!(category = %self.category(), key, "No cached data, serving static fallback");
                FetchOutcome {
                    data: self.fallback.get(key),
                    provenance: Provenance::StaticFallback,
                    circuit_breaker_active,
                }
            }
        };
        self.finish(key, outcome)
    }

    fn finish(&self, key: &str, outcome: FetchOutcome<T>) -> FetchOutcome<T> {
        metrics::record_outcome(self.category(), outcome.provenance.as_str());
        tracing::debug!(
            category = %self.category(),
            key,
            provenance = %outcome.provenance,
            circuit_breaker_active = outcome.circuit_breaker_active,
            "Resolved"
        );
        outcome
    }
}

impl<T> std::fmt::Debug for FallbackChain<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackChain")
            .field("breaker", &self.breaker)
            .field("cache", &self.cache)
            .field("fetch_timeout", &self.fetch_timeout)
            .finish()
    }
}
