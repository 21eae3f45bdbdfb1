//! Background task ownership for ingestions.

use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Spawns detached ingestion tasks and drains them on shutdown.
#[derive(Clone, Default)]
pub struct TaskSpawner {
    tracker: TaskTracker,
    cancel: CancellationToken,
}

impl TaskSpawner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tracker.spawn(task);
    }

    /// Token cancelled when shutdown begins.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn active_tasks(&self) -> usize {
        self.tracker.len()
    }

    /// Wait for every spawned task to finish without cancelling anything.
    pub async fn drain(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }

    /// Signal cancellation and wait up to `grace` for running tasks.
    ///
    /// Returns `true` if every task finished in time.
    pub async fn shutdown(&self, grace: Duration) -> bool {
        self.cancel.cancel();
        self.tracker.close();

        match tokio::time::timeout(grace, self.tracker.wait()).await {
            Ok(()) => true,
            Err(_) => {
                tracing::warn!(
                    remaining = self.tracker.len(),
                    grace_secs = grace.as_secs(),
                    "Ingestion tasks still running after shutdown grace period"
                );
                false
            }
        }
    }
}
