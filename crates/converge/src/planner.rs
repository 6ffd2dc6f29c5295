//! Planner - turns a desired resource list into an ordered plan

use crate::change::ChangeRecord;
use crate::diff::PlanSummary;
use crate::error::{Error, Result};
use crate::resource::Resource;
use crate::snapshot::Snapshot;
use crate::store::StateStore;
use serde::Serialize;
use std::collections::HashSet;

/// An ordered list of change records, in resource declaration order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Plan {
    changes: Vec<ChangeRecord>,
}

impl Plan {
    pub fn new(changes: Vec<ChangeRecord>) -> Self {
        Self { changes }
    }

    pub fn changes(&self) -> &[ChangeRecord] {
        &self.changes
    }

    pub fn into_changes(self) -> Vec<ChangeRecord> {
        self.changes
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn summary(&self) -> PlanSummary {
        PlanSummary::from_changes(&self.changes)
    }

    /// Whether applying this plan would mutate anything
    pub fn has_changes(&self) -> bool {
        self.changes.iter().any(ChangeRecord::is_change)
    }

    /// Copy of this plan with secret values masked
    pub fn masked(&self) -> Self {
        Self::new(self.changes.iter().map(ChangeRecord::masked).collect())
    }

    /// Keep only changes matching a target pattern
    ///
    /// Target format: "kind" or "kind.name", both matched exactly against
    /// the resource id `kind:name`.
    pub fn filter_by_target(self, target: Option<&str>) -> Self {
        match target {
            None => self,
            Some(t) => {
                let (kind, name) = parse_target(t);
                Self::new(
                    self.changes
                        .into_iter()
                        .filter(|c| matches_target(c, kind, name))
                        .collect(),
                )
            }
        }
    }
}

/// Parse a target string like "kind.name" into (kind, name)
fn parse_target(target: &str) -> (&str, Option<&str>) {
    match target.split_once('.') {
        Some((kind, name)) => (kind, Some(name)),
        None => (target, None),
    }
}

fn matches_target(change: &ChangeRecord, kind: &str, name: Option<&str>) -> bool {
    change.resource_kind() == kind && name.is_none_or(|n| change.resource_name() == n)
}

/// Where the planner takes the desired snapshot from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DesiredSource {
    /// Each resource's declared `desired_state()`
    #[default]
    Declared,
    /// A second read-only probe of the live system
    ///
    /// Kept for compatibility with earlier releases; every existing
    /// resource then diffs to `NoOp` and only absent ones produce changes.
    Probe,
}

/// Builds plans by probing and diffing resources in order
pub struct Planner<'a> {
    store: &'a dyn StateStore,
    dry_run: bool,
    desired_source: DesiredSource,
}

impl<'a> Planner<'a> {
    pub fn new(store: &'a dyn StateStore, dry_run: bool) -> Self {
        Self {
            store,
            dry_run,
            desired_source: DesiredSource::default(),
        }
    }

    pub fn with_desired_source(mut self, source: DesiredSource) -> Self {
        self.desired_source = source;
        self
    }

    /// Plan all resources
    ///
    /// All or nothing: the first probe or diff failure abandons the plan.
    pub fn plan<R: Resource>(&self, resources: &[R]) -> Result<Plan> {
        check_unique_ids(resources)?;

        let mut changes = Vec::new();
        for resource in resources {
            let id = resource.id();
            log::debug!("Probing {}", id);

            let current = resource
                .read_current_state(self.dry_run)
                .map_err(|source| Error::Probe {
                    resource_id: id.clone(),
                    source,
                })?;

            let desired = match self.desired_source {
                DesiredSource::Declared => resource.desired_state(),
                DesiredSource::Probe => {
                    resource
                        .read_current_state(true)
                        .map_err(|source| Error::Probe {
                            resource_id: id.clone(),
                            source,
                        })?
                }
            };

            let resource_changes = resource
                .diff(current.as_ref(), desired.as_ref())
                .map_err(|source| Error::Diff {
                    resource_id: id.clone(),
                    source,
                })?;

            self.note_drift(&id, current.as_ref());

            if resource_changes.is_empty() {
                log::info!("No changes for {}", id);
                continue;
            }
            log::info!("Planned {} change(s) for {}", resource_changes.len(), id);
            changes.extend(resource_changes);
        }

        Ok(Plan::new(changes))
    }

    /// Log when the live state moved away from the last recorded snapshot
    fn note_drift(&self, id: &str, current: Option<&Snapshot>) {
        match self.store.load_snapshot(id) {
            Ok(Some(last)) if current != Some(&last) => {
                log::info!("{} drifted from its last recorded state", id);
            }
            Ok(_) => {}
            Err(e) => log::warn!("Could not read recorded state for {}: {:#}", id, e),
        }
    }
}

fn check_unique_ids<R: Resource>(resources: &[R]) -> Result<()> {
    let mut seen = HashSet::new();
    for resource in resources {
        let id = resource.id();
        if !seen.insert(id.clone()) {
            return Err(Error::DuplicateResource(id));
        }
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::change::ChangeKind;
    use crate::diff;
    use crate::store::MemoryStore;
    use std::cell::{Cell, RefCell};

    /// Resource backed by a cell so tests can simulate a host changing
    #[derive(Debug)]
    pub struct FakeResource {
        pub id: String,
        pub live: RefCell<Option<Snapshot>>,
        pub desired: Snapshot,
        pub fail_probe: bool,
        pub fail_diff: bool,
        pub fail_apply: bool,
        pub probes: Cell<usize>,
        pub applied: RefCell<Vec<ChangeKind>>,
    }

    impl FakeResource {
        pub fn new(id: &str, live: Option<Snapshot>, desired: Snapshot) -> Self {
            Self {
                id: id.to_string(),
                live: RefCell::new(live),
                desired,
                fail_probe: false,
                fail_diff: false,
                fail_apply: false,
                probes: Cell::new(0),
                applied: RefCell::new(Vec::new()),
            }
        }
    }

    impl Resource for FakeResource {
        fn id(&self) -> String {
            self.id.clone()
        }

        fn read_current_state(&self, _dry_run: bool) -> anyhow::Result<Option<Snapshot>> {
            self.probes.set(self.probes.get() + 1);
            if self.fail_probe {
                anyhow::bail!("probe command not found");
            }
            Ok(self.live.borrow().clone())
        }

        fn desired_state(&self) -> Option<Snapshot> {
            Some(self.desired.clone())
        }

        fn diff(&self, current: Option<&Snapshot>, desired: Option<&Snapshot>) -> anyhow::Result<Vec<ChangeRecord>> {
            if self.fail_diff {
                anyhow::bail!("snapshot attribute 'installed' should be a boolean");
            }
            Ok(diff::compare(&self.id, current, desired))
        }

        fn apply(&self, dry_run: bool, changes: &[ChangeRecord]) -> anyhow::Result<()> {
            for change in changes {
                if self.fail_apply {
                    anyhow::bail!("installer exited with status 1");
                }
                self.applied.borrow_mut().push(change.kind());
                if !dry_run {
                    *self.live.borrow_mut() = Some(self.desired.clone());
                }
            }
            Ok(())
        }
    }

    pub fn present(name: &str) -> Snapshot {
        Snapshot::new().with("name", name).with("installed", true)
    }

    #[test]
    fn test_plan_keeps_declaration_order() {
        let resources = vec![
            FakeResource::new("incus:b", None, present("b")),
            FakeResource::new("vault:a", Some(present("a")), present("a")),
        ];
        let store = MemoryStore::new();
        let plan = Planner::new(&store, false).plan(&resources).unwrap();

        let ids: Vec<&str> = plan.changes().iter().map(|c| c.resource_id()).collect();
        assert_eq!(ids, vec!["incus:b", "vault:a"]);
        assert_eq!(plan.changes()[0].kind(), ChangeKind::Create);
        assert_eq!(plan.changes()[1].kind(), ChangeKind::NoOp);
        assert!(plan.has_changes());
        assert_eq!(plan.summary().create, 1);
    }

    #[test]
    fn test_duplicate_ids_are_rejected() {
        let resources = vec![
            FakeResource::new("user:ops", None, present("ops")),
            FakeResource::new("user:ops", None, present("ops")),
        ];
        let store = MemoryStore::new();
        let err = Planner::new(&store, false).plan(&resources).unwrap_err();
        assert!(matches!(err, Error::DuplicateResource(ref id) if id == "user:ops"));
        assert_eq!(resources[0].probes.get(), 0);
    }

    #[test]
    fn test_probe_failure_abandons_plan() {
        let mut broken = FakeResource::new("vault:v", None, present("v"));
        broken.fail_probe = true;
        let resources = vec![FakeResource::new("user:ops", None, present("ops")), broken];
        let store = MemoryStore::new();

        let err = Planner::new(&store, false).plan(&resources).unwrap_err();
        assert!(matches!(err, Error::Probe { .. }));
        assert_eq!(err.resource_id(), "vault:v");
    }

    #[test]
    fn test_diff_failure_abandons_plan() {
        let mut broken = FakeResource::new("vault:v", Some(present("v")), present("v"));
        broken.fail_diff = true;
        let resources = vec![
            FakeResource::new("user:ops", None, present("ops")),
            broken,
            FakeResource::new("incus:i", None, present("i")),
        ];
        let store = MemoryStore::new();

        let result = Planner::new(&store, false).plan(&resources);
        let Err(err) = result else {
            panic!("expected the plan to be abandoned");
        };
        assert!(matches!(err, Error::Diff { .. }));
        assert_eq!(err.resource_id(), "vault:v");
        let source = std::error::Error::source(&err).map(ToString::to_string);
        assert!(source.is_some_and(|s| s.contains("installed")));
        assert_eq!(resources[2].probes.get(), 0);
    }

    #[test]
    fn test_legacy_probe_source_never_updates_existing() {
        let live = Snapshot::new().with("name", "v").with("installed", false);
        let resources = vec![FakeResource::new("vault:v", Some(live), present("v"))];
        let store = MemoryStore::new();

        let declared = Planner::new(&store, false).plan(&resources).unwrap();
        assert_eq!(declared.changes()[0].kind(), ChangeKind::Update);

        let legacy = Planner::new(&store, false)
            .with_desired_source(DesiredSource::Probe)
            .plan(&resources)
            .unwrap();
        assert_eq!(legacy.changes()[0].kind(), ChangeKind::NoOp);
        assert_eq!(resources[0].probes.get(), 3);
    }

    #[test]
    fn test_corrupt_recorded_state_does_not_fail_planning() {
        use crate::store::StateStore;
        let mut store = MemoryStore::new();
        store.put("vault:v", b"not json").unwrap();
        let resources = vec![FakeResource::new("vault:v", Some(present("v")), present("v"))];
        let plan = Planner::new(&store, false).plan(&resources).unwrap();
        assert_eq!(plan.len(), 1);
    }

    #[test]
    fn test_filter_by_target() {
        let plan = Plan::new(vec![
            ChangeRecord::new(ChangeKind::Create, "user:ops"),
            ChangeRecord::new(ChangeKind::Create, "salt_master:m"),
            ChangeRecord::new(ChangeKind::Create, "salt_minion:w"),
            ChangeRecord::new(ChangeKind::Create, "vault:v"),
        ]);
        assert_eq!(plan.clone().filter_by_target(None).len(), 4);
        assert_eq!(plan.clone().filter_by_target(Some("salt_master")).len(), 1);
        assert_eq!(plan.clone().filter_by_target(Some("user")).len(), 1);
        assert!(plan.clone().filter_by_target(Some("salt")).is_empty());
        assert!(plan.clone().filter_by_target(Some("s")).is_empty());
        assert!(plan.clone().filter_by_target(Some("users")).is_empty());
        assert!(plan.clone().filter_by_target(Some("user.op")).is_empty());

        let one = plan.filter_by_target(Some("salt_minion.w"));
        assert_eq!(one.len(), 1);
        assert_eq!(one.changes()[0].resource_id(), "salt_minion:w");
    }

    #[test]
    fn test_parse_target() {
        assert_eq!(parse_target("vault"), ("vault", None));
        assert_eq!(parse_target("user.ops"), ("user", Some("ops")));
    }
}
