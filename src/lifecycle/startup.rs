//! Startup orchestration.
//!
//! # Responsibilities
//! - Load and validate configuration
//! - Open the store, restoring its snapshot when configured
//! - Build the booking service over the store
//! - Bind listeners and serve until shutdown, then persist the store
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listeners start last (traffic only when ready)

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::admin::setup_admin_router;
use crate::booking::BookingService;
use crate::clock::SharedClock;
use crate::config::loader::{load_config, ConfigError};
use crate::config::validation::validate_config;
use crate::config::ServiceConfig;
use crate::http::server::{serve, AppState, HttpServer};
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::store::{MemoryStore, StoreError};
use crate::upstream::UpstreamError;

const PURGE_INTERVAL: Duration = Duration::from_secs(60);
const DRAIN_DEADLINE: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("upstream setup error: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("invalid address '{0}'")]
    Address(String),

    #[error("listener error: {0}")]
    Io(#[from] std::io::Error),
}

/// Load `path`, or validated defaults when no file is given.
pub fn load(path: Option<&Path>) -> Result<ServiceConfig, StartupError> {
    let config = match path {
        Some(path) => load_config(path)?,
        None => {
            let config = ServiceConfig::default();
            validate_config(&config).map_err(ConfigError::Validation)?;
            config
        }
    };
    Ok(config)
}

/// Everything the process serves from.
pub struct Runtime {
    pub config: Arc<ServiceConfig>,
    pub store: Arc<MemoryStore>,
    pub service: Arc<BookingService>,
}

impl Runtime {
    /// Open the store and build the booking service against the scraper service.
    pub fn build(config: ServiceConfig, clock: SharedClock) -> Result<Self, StartupError> {
        let store = match &config.store.persistence_path {
            Some(path) => MemoryStore::load_from_file(path, clock.clone())?,
            None => MemoryStore::with_clock(clock.clone(), None),
        };
        let store = Arc::new(store);

        let service = BookingService::with_http(&config, store.clone(), clock)?;

        Ok(Self {
            config: Arc::new(config),
            store,
            service: Arc::new(service),
        })
    }

    pub fn state(&self) -> AppState {
        AppState::new(self.config.clone(), self.service.clone())
    }

    /// Serve until `shutdown` fires, then save the store snapshot.
    pub async fn run(self, shutdown: &Shutdown) -> Result<(), StartupError> {
        let state = self.state();
        let mut tasks = Vec::new();

        if self.config.observability.metrics_enabled {
            let addr = parse_addr(&self.config.observability.metrics_address)?;
            metrics::init_metrics(addr);
        }

        let admin = if self.config.admin.enabled {
            let listener = TcpListener::bind(&self.config.admin.bind_address).await?;
            Some((listener, setup_admin_router(state.clone())))
        } else {
            None
        };

        let listener = TcpListener::bind(&self.config.listener.bind_address).await?;
        tracing::info!(
            address = %listener.local_addr()?,
            upstream = %self.config.upstream.base_url,
            admin_enabled = self.config.admin.enabled,
            "Listening for connections"
        );

        if let Some((listener, router)) = admin {
            let rx = shutdown.subscribe();
            tasks.push(tokio::spawn(async move {
                if let Err(e) = serve("admin", listener, router, rx).await {
                    tracing::error!(error = %e, "Admin server failed");
                }
            }));
        }

        tasks.push(spawn_purger(self.store.clone(), shutdown));

        let result = HttpServer::new(state).run(listener, shutdown.subscribe()).await;

        // The public server only returns early on error; stop the rest too
        shutdown.trigger();
        shutdown.drain(tasks, DRAIN_DEADLINE).await;

        if let Err(e) = self.store.save_to_file() {
            tracing::error!(error = %e, "Failed to save store snapshot");
        }

        result.map_err(StartupError::from)
    }
}

fn parse_addr(addr: &str) -> Result<SocketAddr, StartupError> {
    addr.parse()
        .map_err(|_| StartupError::Address(addr.to_string()))
}

/// Periodically drop hard-expired entries so the snapshot stays small.
fn spawn_purger(store: Arc<MemoryStore>, shutdown: &Shutdown) -> tokio::task::JoinHandle<()> {
    let mut rx = shutdown.subscribe();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PURGE_INTERVAL);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let removed = store.purge_expired();
                    if removed > 0 {
                        tracing::debug!(removed, remaining = store.len(), "Purged expired store entries");
                    }
                }
                _ = rx.recv() => break,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    #[test]
    fn test_defaults_load_without_file() {
        let config = load(None).unwrap();
        assert_eq!(config.breaker.failure_threshold, 2);
    }

    #[test]
    fn test_bad_address() {
        assert!(matches!(parse_addr("nowhere"), Err(StartupError::Address(_))));
    }

    #[tokio::test]
    async fn test_build_with_defaults() {
        let runtime = Runtime::build(ServiceConfig::default(), Arc::new(ManualClock::new(0))).unwrap();
        assert!(runtime.store.is_empty());
        assert!(runtime.service.breaker("booking-site").is_some());
    }
}
