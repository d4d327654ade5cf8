//! HTTP client for the internal scraper service.
//!
//! # Responsibilities
//! - Build endpoint URLs under the configured base URL
//! - Issue GET requests through the bounded retry executor
//! - Map transport, status and decode failures into `UpstreamError`
//!
//! # Design Decisions
//! - The scraper service owns its own browser timeouts; this side only
//!   bounds how long it waits per attempt
//! - Each attempt carries its schedule timeout on the reqwest request itself
//! - A cancelled token abandons the in-flight attempt

use reqwest::header::{HeaderValue, ACCEPT};
use serde::de::DeserializeOwned;
use url::Url;

use crate::resilience::retries::{with_retry, RetryPolicy};
use crate::upstream::{CancelToken, UpstreamError};

/// Client for one scraper service base URL.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    base_url: Url,
    policy: RetryPolicy,
}

impl HttpFetcher {
    /// Create a fetcher rooted at `base_url`.
    pub fn new(base_url: &str, policy: RetryPolicy) -> Result<Self, UpstreamError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| UpstreamError::Endpoint(format!("'{}': {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(UpstreamError::Endpoint(format!(
                "'{}' cannot be used as a base URL",
                base_url
            )));
        }

        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            policy,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// URL for `segments` appended to the base path, each percent-encoded.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url, UpstreamError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| UpstreamError::Endpoint(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// GET `segments` and decode the JSON body.
    pub async fn get_json<T>(&self, segments: &[&str], cancel: &CancelToken) -> Result<T, UpstreamError>
    where
        T: DeserializeOwned,
    {
        let url = self.endpoint(segments)?;
        let operation = operation_label(segments);

        let attempts = with_retry(operation, &self.policy, |attempt| {
            let request = self
                .client
                .get(url.clone())
                .header(ACCEPT, HeaderValue::from_static("application/json"))
                .timeout(attempt.timeout);
            async move {
                let response = request.send().await?;
                let status = response.status();
                if !status.is_success() {
                    return Err(UpstreamError::Status(status.as_u16()));
                }
                response
                    .json::<T>()
                    .await
                    .map_err(|e| UpstreamError::Decode(e.to_string()))
            }
        });

        let result = tokio::select! {
            result = attempts => result.map_err(UpstreamError::from),
            _ = cancel.cancelled() => Err(UpstreamError::Cancelled),
        };

        if let Err(e) = &result {
            tracing::warn!(url = %url, error = %e, "Scraper service request failed");
        }
        result
    }
}

/// Metric and log label for a request: the endpoint name, never its arguments.
fn operation_label<'a>(segments: &[&'a str]) -> &'a str {
    segments.first().copied().unwrap_or("root")
}

impl std::fmt::Debug for HttpFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpFetcher")
            .field("base_url", &self.base_url.as_str())
            .field("max_attempts", &self.policy.max_attempts())
            .finish()
    }
}
