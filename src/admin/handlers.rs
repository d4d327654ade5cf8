use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Response,
    Json,
};
use serde::Serialize;

use crate::booking::CacheSummary;
use crate::http::response::error_response;
use crate::http::server::AppState;
use crate::resilience::{BreakerSnapshot, CircuitBreaker};

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    /// `degraded` while any breaker is open.
    pub status: &'static str,
    pub uptime_secs: u64,
    pub breakers_open: usize,
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    let mut breakers_open = 0;
    for breaker in state.service.breakers() {
        if breaker.is_open().await {
            breakers_open += 1;
        }
    }

    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: if breakers_open == 0 {
            "operational"
        } else {
            "degraded"
        },
        uptime_secs: state.started_at.elapsed().as_secs(),
        breakers_open,
    })
}

pub async fn get_breakers(State(state): State<AppState>) -> Json<Vec<BreakerSnapshot>> {
    let mut snapshots = Vec::new();
    for breaker in state.service.breakers() {
        snapshots.push(breaker.snapshot().await);
    }
    Json(snapshots)
}

fn find<'a>(state: &'a AppState, name: &str) -> Result<&'a CircuitBreaker, Response> {
    state
        .service
        .breaker(name)
        .ok_or_else(|| error_response(StatusCode::NOT_FOUND, "unknown breaker"))
}

pub async fn reset_breaker(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<BreakerSnapshot>, Response> {
    let breaker = find(&state, &name)?;
    breaker.reset().await;
    tracing::info!(breaker = %name, "Breaker reset by operator");
    Ok(Json(breaker.snapshot().await))
}

pub async fn trip_breaker(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<BreakerSnapshot>, Response> {
    let breaker = find(&state, &name)?;
    breaker.trip().await;
    Ok(Json(breaker.snapshot().await))
}

pub async fn get_cache(
    State(state): State<AppState>,
    Path((category, key)): Path<(String, String)>,
) -> Result<Json<CacheSummary>, Response> {
    state
        .service
        .cache_summary(&category, &key)
        .await
        .map(Json)
        .ok_or_else(|| error_response(StatusCode::NOT_FOUND, "unknown category"))
}
