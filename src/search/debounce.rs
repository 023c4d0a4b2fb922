use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Runs at most one delayed task at a time.
///
/// Scheduling cancels whatever is still waiting, so rapid calls collapse into
/// one task that fires `delay` after the last call. Once the delay has
/// elapsed the task runs to completion; later calls do not interrupt it.
pub struct Debouncer {
    delay: Duration,
    pending: Mutex<Option<CancellationToken>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Mutex::new(None),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Replaces the pending task with `task`. Must be called from within a
    /// tokio runtime.
    pub fn schedule<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let token = CancellationToken::new();
        if let Some(previous) = self.swap_pending(Some(token.clone())) {
            previous.cancel();
        }

        let delay = self.delay;
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!("Debounced task superseded");
                }
                _ = tokio::time::sleep(delay) => {
                    task.await;
                }
            }
        });
    }

    /// Drops the pending task, if any, without scheduling a new one.
    pub fn cancel(&self) {
        if let Some(previous) = self.swap_pending(None) {
            previous.cancel();
        }
    }

    fn swap_pending(&self, next: Option<CancellationToken>) -> Option<CancellationToken> {
        match self.pending.lock() {
            Ok(mut pending) => std::mem::replace(&mut *pending, next),
            Err(poisoned) => std::mem::replace(&mut *poisoned.into_inner(), next),
        }
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
