//! Run-scoped cancellation
//!
//! A [`RunToken`] is created once per run by its owner and cloned into every
//! stage, researcher task and backend call. Cancelling it is idempotent and
//! wakes every suspended operation, including ones already in flight.

use crate::types::{AppError, Result};
use parking_lot::Mutex;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

type Callback = Box<dyn FnOnce() + Send + 'static>;

#[derive(Default)]
struct Callbacks {
    fired: bool,
    pending: Vec<Callback>,
}

/// Cloneable cancellation signal shared by everything in one run.
#[derive(Clone, Default)]
pub struct RunToken {
    inner: CancellationToken,
    callbacks: Arc<Mutex<Callbacks>>,
}

impl RunToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire the token. Only the first call has any effect.
    pub fn cancel(&self) {
        let pending = {
            let mut callbacks = self.callbacks.lock();
            if callbacks.fired {
                return;
            }
            callbacks.fired = true;
            // Under the lock, so a late `on_cancel` never sees `fired`
            // before `is_cancelled()` does.
            self.inner.cancel();
            std::mem::take(&mut callbacks.pending)
        };

        tracing::debug!(callbacks = pending.len(), "run token cancelled");

        for callback in pending {
            callback();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.is_cancelled()
    }

    /// Register a callback to run once when the token fires. Runs immediately
    /// if the token already fired.
    pub fn on_cancel<F>(&self, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut callbacks = self.callbacks.lock();
        if callbacks.fired {
            drop(callbacks);
            callback();
        } else {
            callbacks.pending.push(Box::new(callback));
        }
    }

    /// Resolves once the token fires.
    pub async fn cancelled(&self) {
        self.inner.cancelled().await
    }

    /// `Err(Cancelled)` if the token already fired.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(AppError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Race `future` against the token. Cancellation wins ties and drops the
    /// future, which aborts whatever I/O it had in flight.
    pub async fn race<F, T>(&self, future: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::select! {
            biased;
            _ = self.inner.cancelled() => Err(AppError::Cancelled),
            result = future => result,
        }
    }

    /// Cancellable sleep used for pacing delays.
    pub async fn sleep(&self, duration: Duration) -> Result<()> {
        if duration.is_zero() {
            return self.check();
        }
        self.race(async {
            tokio::time::sleep(duration).await;
            Ok(())
        })
        .await
    }
}

impl fmt::Debug for RunToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
