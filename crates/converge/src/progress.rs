//! Progress reporting hooks for the applier
//!
//! Lets the CLI drive a progress bar without the engine depending on any
//! terminal crate.

use crate::change::ChangeRecord;

/// Progress callback for apply operations
pub trait ProgressCallback {
    /// Called once before the first change with the number of changes
    fn on_apply_start(&mut self, total: usize);

    /// Called before a change is handed to its resource
    fn on_change_start(&mut self, change: &ChangeRecord);

    /// Called after a change finished, `ok` is false when it failed
    fn on_change_complete(&mut self, change: &ChangeRecord, ok: bool);

    /// Called when the applier stops, successfully or not
    fn on_apply_complete(&mut self);
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_apply_start(&mut self, _total: usize) {}
    fn on_change_start(&mut self, _change: &ChangeRecord) {}
    fn on_change_complete(&mut self, _change: &ChangeRecord, _ok: bool) {}
    fn on_apply_complete(&mut self) {}
}
