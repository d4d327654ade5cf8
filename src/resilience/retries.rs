//! Bounded retry executor.
//!
//! # Responsibilities
//! - Run one logical call over an internal service boundary at most
//!   `max_attempts` times
//! - Give each attempt its own timeout from a non-decreasing schedule
//!
//! # Design Decisions
//! - Attempts are back-to-back; this bounds time spent waiting, not request rate
//! - A later attempt gets at least as much patience as the one before it, since
//!   cold starts and transient contention are the usual cause of a first failure
//! - Never wrapped around the raw browser scrape, which is too expensive to
//!   repeat blindly

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;

use crate::config::RetryConfig;
use crate::observability::metrics;

const FALLBACK_TIMEOUT: Duration = Duration::from_secs(30);

/// How many attempts to make and how long each may take.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    timeout_schedule: Vec<Duration>,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, timeout_schedule: Vec<Duration>) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            timeout_schedule,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(
            config.max_attempts,
            config
                .timeout_schedule_ms
                .iter()
                .map(|ms| Duration::from_millis(*ms))
                .collect(),
        )
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Timeout for the 1-based `attempt`. Reuses the last entry past the end.
    pub fn timeout_for(&self, attempt: u32) -> Duration {
        let idx = attempt.saturating_sub(1) as usize;
        self.timeout_schedule
            .get(idx)
            .or(self.timeout_schedule.last())
            .copied()
            .unwrap_or(FALLBACK_TIMEOUT)
    }
}

/// Context handed to each attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attempt {
    /// 1-based attempt number.
    pub number: u32,
    pub timeout: Duration,
}

/// Why the executor gave up. Carries the final attempt's failure.
#[derive(Debug, Error)]
pub enum RetryError<E> {
    #[error("attempt {attempts} timed out after {timeout:?}")]
    Timeout { attempts: u32, timeout: Duration },

    #[error("failed after {attempts} attempt(s): {source}")]
    Operation {
        attempts: u32,
        #[source]
        source: E,
    },
}

impl<E> RetryError<E> {
    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::Timeout { attempts, .. } | RetryError::Operation { attempts, .. } => {
                *attempts
            }
        }
    }
}

/// Run `op` under `policy`, returning the first success or the last failure.
pub async fn with_retry<T, E, F, Fut>(
    operation: &str,
    policy: &RetryPolicy,
    mut op: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut(Attempt) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut number = 1;
    loop {
        let timeout = policy.timeout_for(number);
        metrics::record_retry_attempt(operation, number);

        let err = match tokio::time::timeout(timeout, op(Attempt { number, timeout })).await {
            Ok(Ok(value)) => {
                if number > 1 {
                    tracing::info!(operation, attempt = number, "Succeeded after retry");
                }
                return Ok(value);
            }
            Ok(Err(e)) => {
                tracing::warn!(operation, attempt = number, error = %e, "Attempt failed");
                RetryError::Operation {
                    attempts: number,
                    source: e,
                }
            }
            Err(_) => {
                tracing::warn!(operation, attempt = number, timeout = ?timeout, "Attempt timed out");
                RetryError::Timeout {
                    attempts: number,
                    timeout,
                }
            }
        };

        if number >= policy.max_attempts {
            return Err(err);
        }
        number += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn policy(ms: &[u64], max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, ms.iter().map(|m| Duration::from_millis(*m)).collect())
    }

    #[test]
    fn test_timeout_schedule_lookup() {
        let p = policy(&[100, 250], 4);
        assert_eq!(p.timeout_for(1), Duration::from_millis(100));
        assert_eq!(p.timeout_for(2), Duration::from_millis(250));
        assert_eq!(p.timeout_for(4), Duration::from_millis(250));

        assert_eq!(policy(&[], 1).timeout_for(1), FALLBACK_TIMEOUT);
        assert_eq!(policy(&[10], 0).max_attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_attempt_gets_more_patience() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();

        // Needs 150ms: too slow for the first timeout, fine for the second
        let result: Result<&str, RetryError<String>> =
            with_retry("test", &policy(&[100, 200], 2), move |attempt| {
                s.lock().unwrap().push(attempt);
                async move {
                    tokio::time::sleep(Duration::from_millis(150)).await;
                    Ok("slots")
                }
            })
            .await;

        assert_eq!(result.unwrap(), "slots");
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].timeout, Duration::from_millis(100));
        assert_eq!(seen[1].number, 2);
        assert_eq!(seen[1].timeout, Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_returns_last_error() {
        let calls = Arc::new(Mutex::new(0u32));
        let c = calls.clone();

        let result: Result<(), RetryError<String>> =
            with_retry("test", &policy(&[50, 50], 2), move |attempt| {
                *c.lock().unwrap() += 1;
                async move { Err(format!("boom {}", attempt.number)) }
            })
            .await;

        let err = result.unwrap_err();
        assert_eq!(err.attempts(), 2);
        assert!(matches!(err, RetryError::Operation { ref source, .. } if source == "boom 2"));
        assert_eq!(*calls.lock().unwrap(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_attempt_does_not_retry() {
        let calls = Arc::new(Mutex::new(0u32));
        let c = calls.clone();

        let result: Result<(), RetryError<String>> =
            with_retry("test", &policy(&[20], 1), move |_| {
                *c.lock().unwrap() += 1;
                async {
                    tokio::time::sleep(Duration::from_secs(1)).await;
                    Ok(())
                }
            })
            .await;

        assert!(matches!(result, Err(RetryError::Timeout { attempts: 1, .. })));
        assert_eq!(*calls.lock().unwrap(), 1);
    }
}
