//! Cancellation and deadlines for store operations.
//!
//! Every store call takes a [`Context`]. Operations check it before touching
//! any lock, and the bulk-import pool blocks on it alongside its work
//! channels so cancellation wakes idle workers immediately.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, Sender};

use crate::error::{StoreError, StoreResult};

#[derive(Debug)]
struct Inner {
    deadline: Option<Instant>,
    // Dropped on cancel; `done_rx` then reports disconnection to every waiter.
    cancel_tx: Mutex<Option<Sender<()>>>,
    done_rx: Receiver<()>,
}

/// Cancellation signal with an optional deadline.
///
/// Clones share state: cancelling any clone cancels all of them.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use inventory_store::Context;
///
/// let ctx = Context::with_timeout(Duration::from_secs(5));
/// assert!(ctx.check().is_ok());
/// ctx.cancel();
/// assert!(ctx.check().unwrap_err().is_cancellation());
/// ```
#[derive(Debug, Clone)]
pub struct Context {
    inner: Arc<Inner>,
}

impl Context {
    fn build(deadline: Option<Instant>) -> Self {
        let (tx, rx) = bounded::<()>(0);
        Self {
            inner: Arc::new(Inner {
                deadline,
                cancel_tx: Mutex::new(Some(tx)),
                done_rx: rx,
            }),
        }
    }

    /// A context that never expires unless cancelled.
    #[must_use]
    pub fn background() -> Self {
        Self::build(None)
    }

    /// A context that expires `timeout` from now.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::build(Instant::now().checked_add(timeout))
    }

    /// A context that expires at `deadline`.
    #[must_use]
    pub fn with_deadline(deadline: Instant) -> Self {
        Self::build(Some(deadline))
    }

    /// Cancels this context and every clone of it. Idempotent.
    pub fn cancel(&self) {
        let mut guard = match self.inner.cancel_tx.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.take();
    }

    /// Returns true once [`cancel`](Self::cancel) has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        match self.inner.cancel_tx.lock() {
            Ok(guard) => guard.is_none(),
            Err(poisoned) => poisoned.into_inner().is_none(),
        }
    }

    /// The deadline, if any.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// Returns `Err(Cancelled)` or `Err(DeadlineExceeded)` once the context
    /// is done. Explicit cancellation is reported ahead of an elapsed deadline.
    pub fn check(&self) -> StoreResult<()> {
        if self.is_cancelled() {
            return Err(StoreError::Cancelled);
        }
        if self.inner.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(StoreError::DeadlineExceeded);
        }
        Ok(())
    }

    /// Returns true if [`check`](Self::check) would fail.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.check().is_err()
    }

    /// A receiver that becomes ready (disconnected) when the context is
    /// cancelled. Never yields a value.
    #[must_use]
    pub fn cancelled(&self) -> &Receiver<()> {
        &self.inner.done_rx
    }

    /// A receiver that fires at the deadline, or never.
    #[must_use]
    pub fn deadline_timer(&self) -> Receiver<Instant> {
        match self.inner.deadline {
            Some(deadline) => crossbeam_channel::at(deadline),
            None => crossbeam_channel::never(),
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}
