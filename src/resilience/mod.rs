//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request for upstream data:
//!     → circuit_breaker.rs (open? skip the fetch entirely)
//!     → timeouts.rs (every store call and fetch has a deadline)
//!     → retries.rs (HTTP calls to the scraper service: bounded attempts,
//!       growing timeouts)
//!     → circuit_breaker.rs (record failure / reset on success)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - Retries only across the internal HTTP boundary, never around a scrape
//! - Circuit breaker state is shared through the key-value store

pub mod circuit_breaker;
pub mod retries;
pub mod timeouts;

pub use circuit_breaker::{BreakerPosition, BreakerSnapshot, CircuitBreaker, CircuitState};
pub use retries::{with_retry, Attempt, RetryError, RetryPolicy};
pub use timeouts::{within, TimedOut};
