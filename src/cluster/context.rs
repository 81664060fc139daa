// * Cooperative cancellation for gather tasks
// * Every cluster API call goes through `GatherContext::guard` so a cancelled
// * cycle aborts at the next suspension point.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

use crate::cluster::errors::GatherError;

/// Cancellation token shared between the host and the gather tasks it runs.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the token as cancelled and wakes pending waiters.
    pub fn cancel(&self) {
        let already_cancelled = self.cancelled.swap(true, Ordering::SeqCst);
        if !already_cancelled {
            self.notify.notify_waiters();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once `cancel` has been called.
    pub async fn cancelled(&self) {
        let notified = self.notify.notified();
        tokio::pin!(notified);
        // * Register before re-checking the flag so a concurrent cancel is not missed
        notified.as_mut().enable();
        if self.is_cancelled() {
            return;
        }
        notified.await;
    }
}

/// Per-invocation context handed to every gather task.
#[derive(Debug, Clone, Default)]
pub struct GatherContext {
    token: CancellationToken,
}

impl GatherContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: CancellationToken) -> Self {
        Self { token }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Fails fast with `Cancelled` when the context is already cancelled.
    pub fn check(&self) -> Result<(), GatherError> {
        if self.is_cancelled() {
            Err(GatherError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Runs an API call, aborting it if the context is cancelled first.
    pub async fn guard<T, F>(&self, call: F) -> Result<T, GatherError>
    where
        F: Future<Output = Result<T, GatherError>>,
    {
        self.check()?;
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(GatherError::Cancelled),
            result = call => result,
        }
    }
}
