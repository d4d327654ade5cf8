//! Upstream fetcher boundary.
//!
//! # Data Flow
//! ```text
//! FallbackChain::resolve_with
//!     → fetch_with_deadline (timeout + CancelToken)
//!     → UpstreamFetcher::fetch
//!         → http.rs (scraper service over HTTP, bounded retries)
//!         → session.rs (scoped browser-automation session, closed on every path)
//! ```
//!
//! # Design Decisions
//! - The fetcher is opaque: succeed with data or fail with `UpstreamError`
//! - Timeouts cancel the token and drop the fetch future; owned sessions are
//!   torn down by their guard before the caller resumes
//! - Errors here never reach end users; the fallback chain absorbs them

pub mod cancel;
pub mod http;
pub mod session;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::resilience::retries::RetryError;
use crate::resilience::timeouts::TimedOut;

pub use cancel::CancelToken;
pub use http::HttpFetcher;
pub use session::{with_session, AutomationSession, SessionFactory, SessionGuard};

/// Ways an upstream fetch can fail.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("upstream timed out after {0:?}")]
    Timeout(Duration),

    /// Upstream answered with a non-success status.
    #[error("upstream returned status {0}")]
    Status(u16),

    #[error("upstream transport error: {0}")]
    Transport(String),

    #[error("upstream response could not be decoded: {0}")]
    Decode(String),

    /// Automation session could not be opened or failed mid-flight.
    #[error("automation session error: {0}")]
    Session(String),

    #[error("upstream fetch cancelled")]
    Cancelled,

    #[error("invalid upstream endpoint: {0}")]
    Endpoint(String),
}

impl From<TimedOut> for UpstreamError {
    fn from(t: TimedOut) -> Self {
        UpstreamError::Timeout(t.0)
    }
}

impl From<RetryError<UpstreamError>> for UpstreamError {
    fn from(err: RetryError<UpstreamError>) -> Self {
        match err {
            RetryError::Timeout { timeout, .. } => UpstreamError::Timeout(timeout),
            RetryError::Operation { source, .. } => source,
        }
    }
}

impl From<reqwest::Error> for UpstreamError {
    fn from(e: reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            UpstreamError::Status(status.as_u16())
        } else if e.is_decode() {
            UpstreamError::Decode(e.to_string())
        } else {
            UpstreamError::Transport(e.to_string())
        }
    }
}

/// Produces fresh domain data for a key.
#[async_trait]
pub trait UpstreamFetcher<T>: Send + Sync {
    /// Fetch the value for `key`. Implementations should stop work once
    /// `cancel` fires.
    async fn fetch(&self, key: &str, cancel: CancelToken) -> Result<T, UpstreamError>;
}

/// Run `fetcher` under `limit`.
///
/// On expiry the token is cancelled and the in-flight fetch is dropped before
/// this returns, so any session it held has already been released.
pub async fn fetch_with_deadline<T, F>(
    fetcher: &F,
    key: &str,
    limit: Duration,
) -> Result<T, UpstreamError>
where
    F: UpstreamFetcher<T> + ?Sized,
{
    let cancel = CancelToken::new();
    let result = tokio::select! {
        result = fetcher.fetch(key, cancel.clone()) => result,
        _ = tokio::time::sleep(limit) => Err(UpstreamError::Timeout(limit)),
    };
    if matches!(result, Err(UpstreamError::Timeout(_))) {
        cancel.cancel();
    }
    result
}
