//! Collaborator interfaces: progress reporting and commit/undo
//!
//! The connectivity core never owns a progress bar or an undo stack; it
//! drives them through these narrow traits. Progress reporters are polled for
//! cancellation from worker threads, so the trait requires `Send + Sync`.

use crate::board::EntityId;

/// Progress sink polled during long operations
pub trait ProgressReporter: Send + Sync {
    fn set_max_progress(&self, max: usize);

    /// Fractional progress in 0..=1
    fn set_current_progress(&self, fraction: f64);

    fn advance_progress(&self);

    fn is_cancelled(&self) -> bool;

    /// Services the UI pump; returns false when the operation should stop
    fn keep_refreshing(&self) -> bool;
}

/// Reporter that ignores everything and never cancels
#[derive(Debug, Default)]
pub struct NullProgressReporter;

impl ProgressReporter for NullProgressReporter {
    fn set_max_progress(&self, _max: usize) {}

    fn set_current_progress(&self, _fraction: f64) {}

    fn advance_progress(&self) {}

    fn is_cancelled(&self) -> bool {
        false
    }

    fn keep_refreshing(&self) -> bool {
        true
    }
}

/// Undo sink notified before an entity's net is mutated
pub trait BoardCommit {
    /// Called exactly once per entity, before the net change lands
    fn modify(&mut self, entity: EntityId);
}

/// Commit sink that records nothing
#[derive(Debug, Default)]
pub struct NullCommit;

impl BoardCommit for NullCommit {
    fn modify(&mut self, _entity: EntityId) {}
}
