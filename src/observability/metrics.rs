//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define resilience metrics (outcomes, breaker state, fetch latency)
//! - Expose Prometheus-compatible metrics endpoint
//! - Track per-category and per-breaker series
//!
//! # Metrics
//! - `resilience_outcomes_total` (counter): resolved requests by category, provenance
//! - `resilience_fetch_duration_seconds` (histogram): upstream fetch latency by category, result
//! - `resilience_breaker_open` (gauge): 1=open, 0=closed, per breaker
//! - `resilience_breaker_trips_total` (counter): closed → open transitions
//! - `resilience_cache_ops_total` (counter): cache reads/writes by category, op, result
//! - `resilience_retry_attempts_total` (counter): retry executor attempts by operation
//! - `resilience_store_entries` (gauge): entries held by the in-memory store
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op, so tests need no setup
//! - Labels are low-cardinality (category, breaker name, provenance)

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Record which tier of the fallback chain answered a request.
pub fn record_outcome(category: &str, provenance: &'static str) {
    ::metrics::counter!(
        "resilience_outcomes_total",
        "category" => category.to_string(),
        "provenance" => provenance
    )
    .increment(1);
}

pub fn record_fetch(category: &str, success: bool, start: Instant) {
    let result = if success { "ok" } else { "error" };
    ::metrics::histogram!(
        "resilience_fetch_duration_seconds",
        "category" => category.to_string(),
        "result" => result
    )
    .record(start.elapsed().as_secs_f64());
}

pub fn record_breaker_state(name: &str, open: bool) {
    ::metrics::gauge!("resilience_breaker_open", "breaker" => name.to_string())
        .set(if open { 1.0 } else { 0.0 });
}

pub fn record_breaker_trip(name: &str) {
    ::metrics::counter!("resilience_breaker_trips_total", "breaker" => name.to_string())
        .increment(1);
}

pub fn record_cache_op(category: &str, op: &'static str, result: &'static str) {
    ::metrics::counter!(
        "resilience_cache_ops_total",
        "category" => category.to_string(),
        "op" => op,
        "result" => result
    )
    .increment(1);
}

pub fn record_retry_attempt(operation: &str, attempt: u32) {
    ::metrics::counter!(
        "resilience_retry_attempts_total",
        "operation" => operation.to_string(),
        "attempt" => attempt.to_string()
    )
    .increment(1);
}

pub fn record_store_size(entries: usize) {
    ::metrics::gauge!("resilience_store_entries").set(entries as f64);
}
