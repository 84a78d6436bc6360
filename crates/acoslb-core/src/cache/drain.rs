use std::time::Duration;

use serde::Serialize;
use tokio_util::task::TaskTracker;

/// Handle to the close tasks dispatched by
/// [`ClientCache::drain_all`](super::ClientCache::drain_all).
///
/// Dropping it does not cancel anything; the closes keep running.
#[derive(Debug)]
pub struct Drain {
    tracker: TaskTracker,
    dispatched: usize,
}

impl Drain {
    pub(super) fn new(tracker: TaskTracker, dispatched: usize) -> Self {
        tracker.close();
        Self {
            tracker,
            dispatched,
        }
    }

    /// Number of sessions whose close was dispatched.
    pub fn dispatched(&self) -> usize {
        self.dispatched
    }

    /// Close tasks still running.
    pub fn pending(&self) -> usize {
        self.tracker.len()
    }

    pub fn is_finished(&self) -> bool {
        self.tracker.is_empty()
    }

    /// Wait for every dispatched close to finish.
    pub async fn wait(&self) {
        self.tracker.wait().await;
    }

    /// Wait at most `grace`. Returns `true` if everything finished in time.
    pub async fn wait_for(&self, grace: Duration) -> bool {
        tokio::time::timeout(grace, self.wait()).await.is_ok()
    }
}

/// Outcome of [`ClientCache::shutdown`](super::ClientCache::shutdown).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ShutdownReport {
    /// Sessions drained from the cache.
    pub dispatched: usize,
    /// Close tasks still running when the grace period ended.
    pub pending: usize,
    /// Whether every close finished within the grace period.
    pub completed: bool,
}
