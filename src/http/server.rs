//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the public handlers
//! - Wire up middleware (tracing, request timeout, request ID)
//! - Serve on a listener until the shutdown signal fires
//! - Hand each request to the booking service, which never fails

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::Response,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::booking::BookingService;
use crate::config::ServiceConfig;
use crate::http::request::{propagate_request_id, request_id, set_request_id};
use crate::http::response::outcome_response;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<BookingService>,
    pub config: Arc<ServiceConfig>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: Arc<ServiceConfig>, service: Arc<BookingService>) -> Self {
        Self {
            service,
            config,
            started_at: Instant::now(),
        }
    }
}

/// Public HTTP server.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    pub fn new(state: AppState) -> Self {
        let router = Self::build_router(state.clone());
        Self { router, state }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(state: AppState) -> Router {
        let timeout = Duration::from_secs(state.config.listener.request_timeout_secs);
        Router::new()
            .route("/v1/services", get(services_handler))
            .route("/v1/availability/{service_id}", get(availability_handler))
            .route("/healthz", get(health_handler))
            .with_state(state)
            .layer(TimeoutLayer::new(timeout))
            .layer(propagate_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id())
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// The router, for serving elsewhere or driving in tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        serve("public", listener, self.router, shutdown).await
    }
}

/// Serve `app` on `listener` with graceful shutdown.
pub async fn serve(
    name: &'static str,
    listener: TcpListener,
    app: Router,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!(server = name, address = %addr, "HTTP server starting");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
        })
        .await?;

    tracing::info!(server = name, "HTTP server stopped");
    Ok(())
}

async fn services_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let outcome = state.service.services().await;
    tracing::debug!(
        request_id = %request_id(&headers),
        provenance = %outcome.provenance,
        items = outcome.data.len(),
        "Served service catalog"
    );
    outcome_response(outcome)
}

async fn availability_handler(
    State(state): State<AppState>,
    Path(service_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let outcome = state.service.availability(&service_id).await;
    tracing::debug!(
        request_id = %request_id(&headers),
        service_id = %service_id,
        provenance = %outcome.provenance,
        slots = outcome.data.len(),
        "Served availability"
    );
    outcome_response(outcome)
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<Health> {
    Json(Health {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
