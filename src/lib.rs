//! Resilience controller for the booking assistant's scraped data.

pub mod admin;
pub mod booking;
pub mod cache;
pub mod clock;
pub mod config;
pub mod fallback;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod store;
pub mod upstream;

pub use booking::BookingService;
pub use config::schema::ServiceConfig;
pub use fallback::{FallbackChain, FetchOutcome, Provenance};
pub use lifecycle::Shutdown;
