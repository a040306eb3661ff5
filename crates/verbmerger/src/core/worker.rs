//! Module for tracking the background tasks a coalescer spawns.

use std::future::Future;

use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
use tokio_util::task::TaskTracker;

/// A handle over the timeout monitors and dispatch tasks of one coalescer.
///
/// Every task is spawned through the handle so that shutdown can both signal
/// cancellation and wait for work that is already running.
///
/// # Example
///
/// ```ignore
/// let workers = BatchWorkers::new();
/// let token = workers.token();
/// workers.spawn(async move {
///     tokio::select! {
///         _ = token.cancelled() => println!("cancelled"),
///         _ = tokio::time::sleep(Duration::from_secs(5)) => println!("Timeout"),
///     }
/// });
///
/// // Cancels and waits for the task above.
/// workers.shutdown().await;
/// ```
#[derive(Debug, Clone)]
pub(crate) struct BatchWorkers {
    /// Coalescer-wide cancellation signal
    token: CancellationToken,

    /// Tracks spawned monitor and dispatch tasks
    tracker: TaskTracker,
}

impl BatchWorkers {
    pub(crate) fn new() -> Self {
        Self {
            token: CancellationToken::new(),
            tracker: TaskTracker::new(),
        }
    }

    /// Spawns a tracked task on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub(crate) fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tracker.spawn(task);
    }

    pub(crate) fn cancel(&self) {
        self.token.cancel();
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once [`BatchWorkers::cancel`] has been called.
    pub(crate) fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }

    /// Returns a clone of the cancellation token.
    #[cfg(test)]
    pub(crate) fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Number of tracked tasks that have not finished yet.
    pub(crate) fn active(&self) -> usize {
        self.tracker.len()
    }

    /// Initiates a graceful shutdown and waits for every tracked task.
    ///
    /// This method:
    /// 1. Cancels the token, so monitors release their generations
    /// 2. Closes the tracker, so the wait below can complete
    /// 3. Waits for every monitor and in-flight dispatch to finish
    ///
    /// Tasks spawned after shutdown are still run, but not waited for by
    /// this call.
    pub(crate) async fn shutdown(&self) {
        self.token.cancel();
        self.tracker.close();
        self.tracker.wait().await;
    }
}
