//! Booking-site fetchers backed by the scraper service.

use async_trait::async_trait;
use std::sync::Arc;

use crate::booking::types::{ServiceItem, Slot};
use crate::upstream::{CancelToken, HttpFetcher, UpstreamError, UpstreamFetcher};

/// Fetches the full service catalog. The key is ignored.
#[derive(Debug, Clone)]
pub struct CatalogUpstream {
    http: Arc<HttpFetcher>,
}

impl CatalogUpstream {
    pub fn new(http: Arc<HttpFetcher>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl UpstreamFetcher<Vec<ServiceItem>> for CatalogUpstream {
    async fn fetch(&self, _key: &str, cancel: CancelToken) -> Result<Vec<ServiceItem>, UpstreamError> {
        self.http.get_json(&["services"], &cancel).await
    }
}

/// Fetches open slots for the service id given as key.
#[derive(Debug, Clone)]
pub struct AvailabilityUpstream {
    http: Arc<HttpFetcher>,
}

impl AvailabilityUpstream {
    pub fn new(http: Arc<HttpFetcher>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl UpstreamFetcher<Vec<Slot>> for AvailabilityUpstream {
    async fn fetch(&self, key: &str, cancel: CancelToken) -> Result<Vec<Slot>, UpstreamError> {
        self.http.get_json(&["availability", key], &cancel).await
    }
}
