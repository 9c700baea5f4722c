//! The cancellation/progress contract consulted by long-running stages.
//!
//! Per the concurrency model, numerical cores never block; a stage instead
//! checks in with a [`ProgressLogger`] and a [`CancellationToken`] after each
//! spectrum and after each seed, and aborts by returning rather than by any
//! internal timeout.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A cooperative cancellation flag shared between a caller and a running stage.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    /// Creates a fresh, not-yet-cancelled token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation; observed the next time a stage checks in.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// `true` once [`Self::cancel`] has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Consulted by a stage after each spectrum and after each seed so a caller
/// can observe progress or request cancellation. Implementations must not
/// block; this is not an I/O boundary.
pub trait ProgressLogger: Send + Sync {
    /// Called once a spectrum has been fully processed.
    fn spectrum_done(&self, index: usize, total: usize) {
        let _ = (index, total);
    }

    /// Called once a feature-finder seed has been resolved (accepted or discarded).
    fn seed_done(&self, index: usize, total: usize) {
        let _ = (index, total);
    }
}

/// The default logger: emits `debug!`/`info!` records and never requests cancellation itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingProgressLogger;

impl ProgressLogger for LoggingProgressLogger {
    fn spectrum_done(&self, index: usize, total: usize) {
        log::debug!("processed spectrum {}/{}", index + 1, total);
    }

    fn seed_done(&self, index: usize, total: usize) {
        if (index + 1) % 100 == 0 || index + 1 == total {
            log::info!("resolved seed {}/{}", index + 1, total);
        } else {
            log::debug!("resolved seed {}/{}", index + 1, total);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_token_observed_after_cancel() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
        token.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn cloned_token_shares_state() {
        let token = CancellationToken::new();
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
    }
}
