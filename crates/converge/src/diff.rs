//! Diff helpers and plan summary statistics

use crate::change::{ChangeKind, ChangeRecord};
use crate::snapshot::{Attributes, Snapshot};
use serde::Serialize;

/// Message attached to `NoOp` records when nothing differs
pub const NO_CHANGES: &str = "No changes detected";

/// Message attached when a resource exists but no desired snapshot is known
pub const NO_DESIRED_STATE: &str = "Resource exists; no desired state to compare against";

/// Generic comparison of an observed and a desired snapshot
///
/// - absent and desired: one `Create` carrying every desired attribute
/// - absent and nothing desired: no changes
/// - present and nothing desired: one `NoOp` explaining why
/// - present and desired: one `Update` with the differing keys, or `NoOp`
///
/// Resources with auxiliary changes (group membership, configuration)
/// build their own `Create` and call this for the present case.
pub fn compare(resource_id: &str, current: Option<&Snapshot>, desired: Option<&Snapshot>) -> Vec<ChangeRecord> {
    match (current, desired) {
        (None, Some(desired)) => vec![ChangeRecord::create(resource_id, desired.attributes().clone())],
        (None, None) => Vec::new(),
        (Some(_), None) => vec![ChangeRecord::no_op(resource_id, NO_DESIRED_STATE)],
        (Some(current), Some(desired)) => vec![update_or_no_op(resource_id, current, desired, &[])],
    }
}

/// One `Update` restricted to differing keys, or `NoOp`
///
/// Keys listed in `ignore` are left out of the comparison; callers use it
/// for attributes they fix with a dedicated change kind.
pub fn update_or_no_op(resource_id: &str, current: &Snapshot, desired: &Snapshot, ignore: &[&str]) -> ChangeRecord {
    let keys: Vec<&str> = current
        .differing_keys(desired)
        .into_iter()
        .filter(|key| !ignore.contains(key))
        .collect();

    if keys.is_empty() {
        return ChangeRecord::no_op(resource_id, NO_CHANGES);
    }

    let pick = |snapshot: &Snapshot| -> Attributes {
        keys.iter()
            .filter_map(|key| snapshot.get(key).map(|v| ((*key).to_string(), v.clone())))
            .collect()
    };
    ChangeRecord::update(resource_id, pick(current), pick(desired))
}

/// Plan summary statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PlanSummary {
    pub create: usize,
    pub update: usize,
    pub delete: usize,
    pub configure: usize,
    pub set_group: usize,
    pub no_op: usize,
}

impl PlanSummary {
    /// Count change kinds
    pub fn from_changes(changes: &[ChangeRecord]) -> Self {
        let mut summary = Self::default();
        for change in changes {
            match change.kind() {
                ChangeKind::Create => summary.create += 1,
                ChangeKind::Update => summary.update += 1,
                ChangeKind::Delete => summary.delete += 1,
                ChangeKind::Configure => summary.configure += 1,
                ChangeKind::SetGroup => summary.set_group += 1,
                ChangeKind::NoOp => summary.no_op += 1,
            }
        }
        summary
    }

    /// Number of records that mutate something
    pub fn total_changes(&self) -> usize {
        self.create + self.update + self.delete + self.configure + self.set_group
    }

    pub fn has_changes(&self) -> bool {
        self.total_changes() > 0
    }
}

/// Group changes by the kind part of their resource id
///
/// Groups appear in first-seen order and keep the plan order inside each
/// group.
pub fn group_by_kind(changes: &[ChangeRecord]) -> Vec<(&str, Vec<&ChangeRecord>)> {
    let mut groups: Vec<(&str, Vec<&ChangeRecord>)> = Vec::new();
    for change in changes {
        let kind = change.resource_kind();
        match groups.iter_mut().find(|(k, _)| *k == kind) {
            Some((_, members)) => members.push(change),
            None => groups.push((kind, vec![change])),
        }
    }
    groups
}
