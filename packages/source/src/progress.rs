//! Progress reporting for fetch traversals.
//!
//! Defines a [`ProgressCallback`] trait that decouples attempt progress
//! from any specific rendering backend (e.g., `indicatif` spinners,
//! log-only reporting, or silence). Implementations are provided upstream
//! in crates that choose a rendering strategy.

use std::sync::Arc;

/// Trait for reporting progress from a fetch traversal.
///
/// Implementations must be `Send + Sync` so they can be shared through an
/// `Arc` by the fetcher.
pub trait ProgressCallback: Send + Sync {
    /// Set the total number of attempts planned.
    fn set_total(&self, total: u64);

    /// Advance progress by `delta` attempts.
    fn inc(&self, delta: u64);

    /// Update the message displayed alongside the progress indicator.
    fn set_message(&self, msg: String);

    /// Mark progress as complete with a final message.
    fn finish(&self, msg: String);

    /// Mark progress as complete and remove the progress indicator.
    fn finish_and_clear(&self);
}

/// A no-op implementation of [`ProgressCallback`] that silently ignores
/// all progress updates.
///
/// Useful for library callers and tests that do not need visual progress
/// reporting.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
    fn finish_and_clear(&self) {}
}

/// Returns a shared [`NullProgress`] instance for convenient use.
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}
