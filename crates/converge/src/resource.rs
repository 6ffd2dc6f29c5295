//! Resource trait for declarative reconciliation
//!
//! A Resource is one managed thing on the host (a user, an installed
//! service). It can report what it looks like now, what it should look
//! like, the changes that close the gap, and how to carry them out.

use crate::change::ChangeRecord;
use crate::snapshot::Snapshot;
use anyhow::Result;
use std::fmt;

/// Core trait for reconcilable resources
///
/// # Example
///
/// ```ignore
/// use converge::{ChangeRecord, Resource, Snapshot};
///
/// #[derive(Debug)]
/// struct Marker { path: String }
///
/// impl Resource for Marker {
///     fn id(&self) -> String {
///         format!("marker:{}", self.path)
///     }
///
///     fn read_current_state(&self, _dry_run: bool) -> anyhow::Result<Option<Snapshot>> {
///         let exists = std::path::Path::new(&self.path).exists();
///         Ok(exists.then(|| Snapshot::new().with("path", self.path.as_str())))
///     }
///
///     fn desired_state(&self) -> Option<Snapshot> {
///         Some(Snapshot::new().with("path", self.path.as_str()))
///     }
///
///     fn diff(&self, current: Option<&Snapshot>, desired: Option<&Snapshot>)
///         -> anyhow::Result<Vec<ChangeRecord>> {
///         Ok(converge::diff::compare(&self.id(), current, desired))
///     }
///
///     fn apply(&self, dry_run: bool, changes: &[ChangeRecord]) -> anyhow::Result<()> {
///         if !dry_run {
///             std::fs::write(&self.path, "")?;
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait Resource: fmt::Debug {
    /// Stable identifier, `"<kind>:<name>"`
    ///
    /// Must be deterministic: the planner keys change records by it and
    /// the applier keys persisted snapshots by it.
    fn id(&self) -> String;

    /// Probe the live system
    ///
    /// Returns `Ok(None)` when the resource does not exist. Never mutates
    /// the host, whatever `dry_run` says.
    fn read_current_state(&self, dry_run: bool) -> Result<Option<Snapshot>>;

    /// The snapshot this resource should converge to
    fn desired_state(&self) -> Option<Snapshot>;

    /// Compute the changes that move `current` to `desired`
    ///
    /// Pure. Returns one `Create` (plus auxiliary changes) for an absent
    /// resource, one `Update` restricted to differing keys, or one `NoOp`.
    fn diff(&self, current: Option<&Snapshot>, desired: Option<&Snapshot>) -> Result<Vec<ChangeRecord>>;

    /// Execute the given changes in order
    ///
    /// Change kinds the resource does not support are logged and treated
    /// as success.
    fn apply(&self, dry_run: bool, changes: &[ChangeRecord]) -> Result<()>;
}
