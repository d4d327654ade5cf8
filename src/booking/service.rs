//! Booking service: wires categories, breakers and fetchers together.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::booking::fallback;
use crate::booking::types::{ServiceItem, Slot};
use crate::booking::upstream::{AvailabilityUpstream, CatalogUpstream};
use crate::cache::{CacheEntry, TieredCache};
use crate::clock::SharedClock;
use crate::config::{CategoryConfig, ServiceConfig};
use crate::fallback::{min_items, FallbackChain, FetchOutcome, StaticFallbackCatalog};
use crate::resilience::{CircuitBreaker, RetryPolicy};
use crate::store::SharedStore;
use crate::upstream::{HttpFetcher, UpstreamError, UpstreamFetcher};

/// Cache key of the (single) service catalog.
pub const CATALOG_KEY: &str = "all";

pub const CATALOG: &str = "catalog";
pub const AVAILABILITY: &str = "availability";

/// Admin view of one cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheSummary {
    pub category: String,
    pub key: String,
    pub present: bool,
    pub fresh: bool,
    pub stored_at: Option<u64>,
    pub age_secs: Option<u64>,
    pub items: Option<usize>,
}

/// Resilient access to the booking site's catalog and availability.
pub struct BookingService {
    catalog: FallbackChain<Vec<ServiceItem>>,
    availability: FallbackChain<Vec<Slot>>,
    catalog_upstream: Arc<dyn UpstreamFetcher<Vec<ServiceItem>>>,
    availability_upstream: Arc<dyn UpstreamFetcher<Vec<Slot>>>,
    breakers: BTreeMap<String, CircuitBreaker>,
}

impl BookingService {
    /// Build the service with explicit fetchers.
    pub fn new(
        config: &ServiceConfig,
        store: SharedStore,
        clock: SharedClock,
        catalog_upstream: Arc<dyn UpstreamFetcher<Vec<ServiceItem>>>,
        availability_upstream: Arc<dyn UpstreamFetcher<Vec<Slot>>>,
    ) -> Self {
        let mut breakers = BTreeMap::new();
        let categories = &config.categories;

        let catalog = build_chain(
            CATALOG,
            &categories.catalog,
            config,
            &store,
            &clock,
            &mut breakers,
            fallback::service_catalog(),
        );
        let availability = build_chain(
            AVAILABILITY,
            &categories.availability,
            config,
            &store,
            &clock,
            &mut breakers,
            fallback::availability(),
        );

        tracing::info!(
            breakers = ?breakers.keys().collect::<Vec<_>>(),
            catalog_fresh_secs = categories.catalog.fresh_ttl_secs,
            availability_fresh_secs = categories.availability.fresh_ttl_secs,
            "Booking service initialized"
        );

        Self {
            catalog,
            availability,
            catalog_upstream,
            availability_upstream,
            breakers,
        }
    }

    /// Build the service against the configured scraper service.
    pub fn with_http(
        config: &ServiceConfig,
        store: SharedStore,
        clock: SharedClock,
    ) -> Result<Self, UpstreamError> {
        let http = Arc::new(HttpFetcher::new(
            &config.upstream.base_url,
            RetryPolicy::from_config(&config.retries),
        )?);
        Ok(Self::new(
            config,
            store,
            clock,
            Arc::new(CatalogUpstream::new(http.clone())),
            Arc::new(AvailabilityUpstream::new(http)),
        ))
    }

    /// The service catalog.
    pub async fn services(&self) -> FetchOutcome<Vec<ServiceItem>> {
        self.catalog
            .resolve_with(CATALOG_KEY, self.catalog_upstream.as_ref())
            .await
    }

    /// Open slots for `service_id`.
    pub async fn availability(&self, service_id: &str) -> FetchOutcome<Vec<Slot>> {
        self.availability
            .resolve_with(service_id, self.availability_upstream.as_ref())
            .await
    }

    pub fn catalog_chain(&self) -> &FallbackChain<Vec<ServiceItem>> {
        &self.catalog
    }

    pub fn availability_chain(&self) -> &FallbackChain<Vec<Slot>> {
        &self.availability
    }

    pub fn breakers(&self) -> impl Iterator<Item = &CircuitBreaker> {
        self.breakers.values()
    }

    pub fn breaker(&self, name: &str) -> Option<&CircuitBreaker> {
        self.breakers.get(name)
    }

    /// Describe the cached entry for `key` in `category`, if the category exists.
    pub async fn cache_summary(&self, category: &str, key: &str) -> Option<CacheSummary> {
        match category {
            CATALOG => Some(summarize(self.catalog.cache(), key).await),
            AVAILABILITY => Some(summarize(self.availability.cache(), key).await),
            _ => None,
        }
    }
}

fn build_chain<I>(
    category: &str,
    settings: &CategoryConfig,
    config: &ServiceConfig,
    store: &SharedStore,
    clock: &SharedClock,
    breakers: &mut BTreeMap<String, CircuitBreaker>,
    fallback: StaticFallbackCatalog<Vec<I>>,
) -> FallbackChain<Vec<I>>
where
    I: serde::Serialize + serde::de::DeserializeOwned + Clone + Send + Sync + 'static,
{
    let op_timeout = config.store.op_timeout();
    let breaker = breakers
        .entry(settings.breaker.clone())
        .or_insert_with(|| {
            CircuitBreaker::new(
                settings.breaker.clone(),
                store.clone(),
                clock.clone(),
                config.breaker.clone(),
                op_timeout,
            )
        })
        .clone();

    let cache = TieredCache::new(
        category,
        store.clone(),
        clock.clone(),
        settings.fresh_ttl(),
        config.store.hard_ttl(),
        op_timeout,
    );

    FallbackChain::new(breaker, cache, fallback)
        .with_viability(min_items(settings.min_viable_items))
        .with_fetch_timeout(config.upstream.fetch_timeout())
}

async fn summarize<I>(cache: &TieredCache<Vec<I>>, key: &str) -> CacheSummary
where
    I: serde::Serialize + serde::de::DeserializeOwned,
{
    let now = cache.now_ms();
    let entry: Option<CacheEntry<Vec<I>>> = cache.get(key).await;
    CacheSummary {
        category: cache.category().to_string(),
        key: key.to_string(),
        present: entry.is_some(),
        fresh: entry.as_ref().is_some_and(|e| e.is_fresh(now)),
        stored_at: entry.as_ref().map(|e| e.stored_at),
        age_secs: entry.as_ref().map(|e| e.age_ms(now) / 1000),
        items: entry.as_ref().map(|e| e.value.len()),
    }
}
