//! Single-flight credential refresh
//!
//! The first caller starts the refresh as a spawned task; everyone arriving
//! while it runs awaits the same shared handle. The task is detached from its
//! callers, so dropping any of them never cancels the refresh.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use tracing::{debug, warn};

/// Result of one refresh, shared by every caller that awaited it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// New credentials are stored and the session is active
    Refreshed,
    /// The refresh did not produce usable credentials
    Failed(String),
    /// The session was replaced while the refresh ran; its result was
    /// discarded and the current session is untouched
    Stale,
}

impl RefreshOutcome {
    /// `true` when new credentials are in place
    pub fn is_refreshed(&self) -> bool {
        matches!(self, Self::Refreshed)
    }
}

/// Performs the actual credential exchange
#[async_trait]
pub trait CredentialRefresher: Send + Sync {
    /// Exchange the refresh credential for a new pair
    async fn refresh_credentials(&self) -> RefreshOutcome;
}

type SharedRefresh = Shared<BoxFuture<'static, RefreshOutcome>>;

struct InFlight {
    id: u64,
    handle: SharedRefresh,
}

struct Inner {
    refresher: Arc<dyn CredentialRefresher>,
    slot: Mutex<Option<InFlight>>,
    next_id: AtomicU64,
}

impl Inner {
    /// Empty the slot if it still holds refresh `id`
    fn settle(&self, id: u64) {
        let mut slot = self.slot.lock();
        if slot.as_ref().is_some_and(|in_flight| in_flight.id == id) {
            *slot = None;
        }
    }
}

/// Deduplicates concurrent refresh requests
#[derive(Clone)]
pub struct RefreshCoordinator {
    inner: Arc<Inner>,
}

impl RefreshCoordinator {
    /// Coordinator running `refresher` at most once at a time
    pub fn new(refresher: Arc<dyn CredentialRefresher>) -> Self {
        Self {
            inner: Arc::new(Inner {
                refresher,
                slot: Mutex::new(None),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    /// Refresh credentials, joining a refresh already in flight
    ///
    /// Must be called from within a tokio runtime.
    pub async fn refresh(&self) -> RefreshOutcome {
        self.acquire().await
    }

    /// Whether a refresh is outstanding
    pub fn is_refreshing(&self) -> bool {
        self.inner.slot.lock().is_some()
    }

    fn acquire(&self) -> SharedRefresh {
        let mut slot = self.inner.slot.lock();
        if let Some(in_flight) = slot.as_ref() {
            debug!(refresh_id = in_flight.id, "Joining in-flight credential refresh");
            return in_flight.handle.clone();
        }

        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        debug!(refresh_id = id, "Starting credential refresh");

        let task_inner = Arc::clone(&self.inner);
        let task = tokio::spawn(async move {
            let outcome = task_inner.refresher.refresh_credentials().await;
            task_inner.settle(id);
            outcome
        });

        let waiter_inner = Arc::clone(&self.inner);
        let handle = async move {
            match task.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(refresh_id = id, error = %e, "Credential refresh task did not complete");
                    waiter_inner.settle(id);
                    RefreshOutcome::Failed(format!("refresh task did not complete: {e}"))
                }
            }
        }
        .boxed()
        .shared();

        *slot = Some(InFlight { id, handle: handle.clone() });
        handle
    }
}

impl std::fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshCoordinator")
            .field("is_refreshing", &self.is_refreshing())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use futures::future::join_all;

    use super::*;

    /// Counts calls and completions, returning a fixed outcome after a delay
    struct CountingRefresher {
        started: AtomicUsize,
        finished: AtomicUsize,
        delay: Duration,
        outcome: RefreshOutcome,
    }

    impl CountingRefresher {
        fn new(delay: Duration, outcome: RefreshOutcome) -> Arc<Self> {
            Arc::new(Self {
                started: AtomicUsize::new(0),
                finished: AtomicUsize::new(0),
                delay,
                outcome,
            })
        }
    }

    #[async_trait]
    impl CredentialRefresher for CountingRefresher {
        async fn refresh_credentials(&self) -> RefreshOutcome {
            self.started.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.finished.fetch_add(1, Ordering::SeqCst);
            self.outcome.clone()
        }
    }

    struct PanickingRefresher;

    #[async_trait]
    impl CredentialRefresher for PanickingRefresher {
        async fn refresh_credentials(&self) -> RefreshOutcome {
            panic!("refresh exploded");
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_callers_share_one_refresh() {
        let refresher = CountingRefresher::new(Duration::from_millis(100), RefreshOutcome::Refreshed);
        let coordinator = RefreshCoordinator::new(refresher.clone());

        let callers = (0..16).map(|_| {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.refresh().await })
        });
        let outcomes = join_all(callers).await;

        assert_eq!(refresher.started.load(Ordering::SeqCst), 1);
        assert!(outcomes.into_iter().all(|outcome| outcome.unwrap() == RefreshOutcome::Refreshed));
        assert!(!coordinator.is_refreshing());
    }

    #[tokio::test]
    async fn test_failure_is_shared_and_not_retried() {
        let refresher = CountingRefresher::new(
            Duration::from_millis(50),
            RefreshOutcome::Failed("rejected".into()),
        );
        let coordinator = RefreshCoordinator::new(refresher.clone());

        let (a, b) = tokio::join!(coordinator.refresh(), coordinator.refresh());

        assert_eq!(a, RefreshOutcome::Failed("rejected".into()));
        assert_eq!(a, b);
        assert_eq!(refresher.started.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_sequential_refreshes_run_separately() {
        let refresher = CountingRefresher::new(Duration::ZERO, RefreshOutcome::Refreshed);
        let coordinator = RefreshCoordinator::new(refresher.clone());

        coordinator.refresh().await;
        coordinator.refresh().await;

        assert_eq!(refresher.started.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_dropped_caller_does_not_cancel_refresh() {
        let refresher = CountingRefresher::new(Duration::from_millis(100), RefreshOutcome::Refreshed);
        let coordinator = RefreshCoordinator::new(refresher.clone());

        let first = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.refresh().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(coordinator.is_refreshing());
        first.abort();

        assert_eq!(coordinator.refresh().await, RefreshOutcome::Refreshed);
        assert_eq!(refresher.started.load(Ordering::SeqCst), 1);
        assert_eq!(refresher.finished.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_refresh_completes_with_no_one_waiting() {
        let refresher = CountingRefresher::new(Duration::from_millis(50), RefreshOutcome::Refreshed);
        let coordinator = RefreshCoordinator::new(refresher.clone());

        drop(coordinator.acquire());
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(refresher.finished.load(Ordering::SeqCst), 1);
        assert!(!coordinator.is_refreshing());
    }

    #[tokio::test]
    async fn test_panicking_refresh_resolves_as_failed() {
        let coordinator = RefreshCoordinator::new(Arc::new(PanickingRefresher));

        let outcome = coordinator.refresh().await;

        assert!(matches!(outcome, RefreshOutcome::Failed(_)));
        assert!(!coordinator.is_refreshing());
    }
}
