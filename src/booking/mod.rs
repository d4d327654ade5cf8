//! Booking integration: the two resilient data categories.
//!
//! # Data Flow
//! ```text
//! GET /v1/services            → service.rs → FallbackChain<Vec<ServiceItem>> → CatalogUpstream
//! GET /v1/availability/{id}   → service.rs → FallbackChain<Vec<Slot>>        → AvailabilityUpstream
//!                                                     │
//!                                  shared breaker "booking-site" (both scrape the same site)
//! ```

pub mod fallback;
pub mod service;
pub mod types;
pub mod upstream;

pub use service::{BookingService, CacheSummary, CATALOG_KEY};
pub use types::{ServiceItem, Slot};
