use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// One-way cooperative cancellation signal shared by every task of a run.
///
/// Checked only between attempts and before dispatch; a synthesis call
/// already in flight always runs to completion.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the flag. Idempotent; there is no way to clear it.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}
