//! Cooperative cancellation shared between the controller and workers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Signal that an operation was stopped by the user.
///
/// Distinct from every failure type so callers can tell "user stopped this"
/// apart from "this broke".
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("operation cancelled")]
pub struct Cancelled;

/// Cloneable cancellation flag, polled at every suspension point and at fixed
/// intervals inside loops over large offer lists.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag. Observed at the next checkpoint, never preemptively.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// Lower the flag so the token can be reused for the next computation.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::Relaxed);
    }

    pub fn checkpoint(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }
}
