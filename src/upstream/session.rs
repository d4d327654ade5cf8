//! Scoped browser-automation sessions.
//!
//! # Responsibilities
//! - Open a session, run work against it, always release it
//! - Stop work when the fetch's cancellation token fires
//!
//! # Design Decisions
//! - `SessionGuard` owns the session; the happy path closes it gracefully,
//!   every other path (timeout drop, cancellation, panic) aborts it in `Drop`
//! - `abort` is synchronous so it can run from `Drop`
//! - A graceful close that hangs is abandoned and the session aborted

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use std::ops::{Deref, DerefMut};
use std::time::Duration;

use crate::upstream::{CancelToken, UpstreamError};

const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// A live automation handle (browser page, remote session).
#[async_trait]
pub trait AutomationSession: Send + 'static {
    /// Graceful shutdown.
    async fn close(&mut self) -> Result<(), UpstreamError>;

    /// Immediate teardown, e.g. killing the browser process.
    fn abort(&mut self);
}

/// Opens sessions.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    type Session: AutomationSession;

    async fn open(&self) -> Result<Self::Session, UpstreamError>;
}

/// Owns an open session until it is released or dropped.
pub struct SessionGuard<S: AutomationSession> {
    session: Option<S>,
}

impl<S: AutomationSession> SessionGuard<S> {
    pub fn new(session: S) -> Self {
        Self {
            session: Some(session),
        }
    }

    /// Close the session gracefully, aborting it if close fails or hangs.
    ///
    /// The guard keeps the session while `close` runs, so dropping this
    /// future mid-close still aborts it.
    pub async fn release(mut self) {
        let closed = match self.session.as_mut() {
            Some(session) => tokio::time::timeout(CLOSE_TIMEOUT, session.close()).await,
            None => return,
        };
        if let Some(mut session) = self.session.take() {
            match closed {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::warn!(error = %e, "Session close failed, aborting");
                    session.abort();
                }
                Err(_) => {
                    tracing::warn!("Session close timed out, aborting");
                    session.abort();
                }
            }
        }
    }
}

impl<S: AutomationSession> Deref for SessionGuard<S> {
    type Target = S;

    fn deref(&self) -> &S {
        // Only `release` and `Drop` take the session, and both own the guard
        self.session.as_ref().expect("session present until release")
    }
}

impl<S: AutomationSession> DerefMut for SessionGuard<S> {
    fn deref_mut(&mut self) -> &mut S {
        self.session.as_mut().expect("session present until release")
    }
}

impl<S: AutomationSession> Drop for SessionGuard<S> {
    fn drop(&mut self) {
        if let Some(mut session) = self.session.take() {
            tracing::debug!("Session dropped before release, aborting");
            session.abort();
        }
    }
}

/// Open a session from `factory`, run `work` on it, and release it.
///
/// Cancellation of `cancel` stops `work` and returns `Cancelled`. Dropping the
/// returned future mid-flight aborts the session through its guard.
pub async fn with_session<F, T, W>(
    factory: &F,
    cancel: &CancelToken,
    work: W,
) -> Result<T, UpstreamError>
where
    F: SessionFactory + ?Sized,
    W: for<'s> FnOnce(&'s mut F::Session) -> BoxFuture<'s, Result<T, UpstreamError>>,
{
    if cancel.is_cancelled() {
        return Err(UpstreamError::Cancelled);
    }

    let mut guard = SessionGuard::new(factory.open().await?);

    let result = tokio::select! {
        result = work(&mut *guard) => result,
        _ = cancel.cancelled() => Err(UpstreamError::Cancelled),
    };

    guard.release().await;
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct Counters {
        opened: AtomicUsize,
        closed: AtomicUsize,
        aborted: AtomicUsize,
    }

    struct FakeSession {
        counters: Arc<Counters>,
        fail_close: bool,
        close_delay: Option<Duration>,
    }

    #[async_trait]
    impl AutomationSession for FakeSession {
        async fn close(&mut self) -> Result<(), UpstreamError> {
            if let Some(delay) = self.close_delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail_close {
                return Err(UpstreamError::Session("browser gone".into()));
            }
            self.counters.closed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn abort(&mut self) {
            self.counters.aborted.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct FakeFactory {
        counters: Arc<Counters>,
        fail_close: bool,
        close_delay: Option<Duration>,
    }

    impl FakeFactory {
        fn new() -> Self {
            Self {
                counters: Arc::new(Counters::default()),
                fail_close: false,
                close_delay: None,
            }
        }

        fn released(&self) -> usize {
            self.counters.closed.load(Ordering::SeqCst) + self.counters.aborted.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SessionFactory for FakeFactory {
        type Session = FakeSession;

        async fn open(&self) -> Result<FakeSession, UpstreamError> {
            self.counters.opened.fetch_add(1, Ordering::SeqCst);
            Ok(FakeSession {
                counters: self.counters.clone(),
                fail_close: self.fail_close,
                close_delay: self.close_delay,
            })
        }
    }

    #[tokio::test]
    async fn test_success_closes_gracefully() {
        let factory = FakeFactory::new();
        let out = with_session(&factory, &CancelToken::new(), |_s| {
            Box::pin(async { Ok(vec!["haircut"]) })
        })
        .await
        .unwrap();

        assert_eq!(out, vec!["haircut"]);
        assert_eq!(factory.counters.closed.load(Ordering::SeqCst), 1);
        assert_eq!(factory.counters.aborted.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_error_still_releases() {
        let factory = FakeFactory::new();
        let result: Result<(), _> = with_session(&factory, &CancelToken::new(), |_s| {
            Box::pin(async { Err(UpstreamError::Session("selector not found".into())) })
        })
        .await;

        assert!(result.is_err());
        assert_eq!(factory.released(), 1);
    }

    #[tokio::test]
    async fn test_failed_close_aborts() {
        let mut factory = FakeFactory::new();
        factory.fail_close = true;
        let _ = with_session(&factory, &CancelToken::new(), |_s| {
            Box::pin(async { Ok(()) })
        })
        .await;

        assert_eq!(factory.counters.aborted.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_releases() {
        let factory = FakeFactory::new();
        let cancel = CancelToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });

        let result: Result<(), _> = with_session(&factory, &cancel, |_s| {
            Box::pin(async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(())
            })
        })
        .await;

        assert!(matches!(result, Err(UpstreamError::Cancelled)));
        assert_eq!(factory.released(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_outer_timeout_aborts_through_drop() {
        let factory = FakeFactory::new();
        let cancel = CancelToken::new();

        let outcome = tokio::time::timeout(
            Duration::from_millis(50),
            with_session(&factory, &cancel, |_s| {
                Box::pin(async {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    Ok(())
                })
            }),
        )
        .await;

        assert!(outcome.is_err());
        assert_eq!(factory.counters.opened.load(Ordering::SeqCst), 1);
        assert_eq!(factory.counters.aborted.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_close_aborts_when_dropped() {
        let mut factory = FakeFactory::new();
        factory.close_delay = Some(Duration::from_secs(2));
        let cancel = CancelToken::new();

        // Work finishes, then the caller gives up while close is still pending
        let outcome = tokio::time::timeout(
            Duration::from_millis(500),
            with_session(&factory, &cancel, |_s| {
                Box::pin(async {
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    Ok(())
                })
            }),
        )
        .await;

        assert!(outcome.is_err());
        assert_eq!(factory.counters.closed.load(Ordering::SeqCst), 0);
        assert_eq!(factory.counters.aborted.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_close_times_out_and_aborts() {
        let mut factory = FakeFactory::new();
        factory.close_delay = Some(CLOSE_TIMEOUT * 2);

        let result = with_session(&factory, &CancelToken::new(), |_s| {
            Box::pin(async { Ok(()) })
        })
        .await;

        assert!(result.is_ok());
        assert_eq!(factory.counters.closed.load(Ordering::SeqCst), 0);
        assert_eq!(factory.counters.aborted.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_already_cancelled_opens_nothing() {
        let factory = FakeFactory::new();
        let cancel = CancelToken::new();
        cancel.cancel();

        let result: Result<(), _> =
            with_session(&factory, &cancel, |_s| Box::pin(async { Ok(()) })).await;
        assert!(matches!(result, Err(UpstreamError::Cancelled)));
        assert_eq!(factory.counters.opened.load(Ordering::SeqCst), 0);
    }
}
