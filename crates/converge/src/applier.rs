//! Applier - executes a plan change by change and records resulting state

use crate::change::ChangeRecord;
use crate::error::{Error, Result};
use crate::progress::{NoProgress, ProgressCallback};
use crate::resource::Resource;
use crate::store::StateStore;
use std::collections::HashMap;

/// Outcome of a completed apply
#[derive(Debug, Default)]
pub struct ApplyReport {
    /// Changes handed to their resource successfully
    pub applied: usize,
    /// Resource ids of changes with no matching resource
    pub skipped: Vec<String>,
    /// Snapshots written to the state store
    pub persisted: usize,
    /// Snapshots that could not be recorded (always `Error::StatePersist`)
    pub persist_failures: Vec<Error>,
}

impl ApplyReport {
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty() && self.persist_failures.is_empty()
    }
}

/// Applies change records against their owning resources
pub struct Applier<'a> {
    store: &'a mut dyn StateStore,
    dry_run: bool,
    progress: Box<dyn ProgressCallback + 'a>,
}

impl<'a> Applier<'a> {
    pub fn new(store: &'a mut dyn StateStore, dry_run: bool) -> Self {
        Self {
            store,
            dry_run,
            progress: Box::new(NoProgress),
        }
    }

    pub fn with_progress(mut self, progress: impl ProgressCallback + 'a) -> Self {
        self.progress = Box::new(progress);
        self
    }

    /// Apply `changes` in order
    ///
    /// Fail-fast: the first failing change is returned as
    /// `Error::Apply`, changes before it stay applied and changes after it
    /// are never attempted. There is no rollback.
    pub fn apply<R: Resource>(&mut self, changes: &[ChangeRecord], resources: &[R]) -> Result<ApplyReport> {
        let by_id: HashMap<String, &R> = resources.iter().map(|r| (r.id(), r)).collect();
        let mut report = ApplyReport::default();

        self.progress.on_apply_start(changes.len());
        let result = self.apply_all(changes, &by_id, &mut report);
        self.progress.on_apply_complete();

        result.map(|()| report)
    }

    fn apply_all<R: Resource>(
        &mut self,
        changes: &[ChangeRecord],
        by_id: &HashMap<String, &R>,
        report: &mut ApplyReport,
    ) -> Result<()> {
        for change in changes {
            let id = change.resource_id();
            let Some(resource) = by_id.get(id) else {
                log::error!("No resource found for change {} on {}, skipping", change.kind(), id);
                report.skipped.push(id.to_string());
                continue;
            };

            self.progress.on_change_start(change);
            log::info!("Applying {} to {}", change.kind(), id);
            if let Err(source) = resource.apply(self.dry_run, std::slice::from_ref(change)) {
                self.progress.on_change_complete(change, false);
                return Err(Error::Apply {
                    resource_id: id.to_string(),
                    kind: change.kind(),
                    source,
                });
            }
            self.progress.on_change_complete(change, true);
            report.applied += 1;

            if !self.dry_run {
                self.record_state(*resource, id, report);
            }
        }
        Ok(())
    }

    /// Re-probe and persist; failures are reported, never fatal
    fn record_state<R: Resource>(&mut self, resource: &R, id: &str, report: &mut ApplyReport) {
        let outcome = resource
            .read_current_state(false)
            .and_then(|snapshot| match snapshot {
                Some(snapshot) => self.store.save_snapshot(id, &snapshot).map(|()| true),
                None => Ok(false),
            });

        match outcome {
            Ok(true) => report.persisted += 1,
            Ok(false) => log::debug!("{} not observable after apply, nothing recorded", id),
            Err(source) => {
                log::error!("Failed to persist state for {}: {:#}", id, source);
                report.persist_failures.push(Error::StatePersist {
                    resource_id: id.to_string(),
                    source,
                });
            }
        }
    }
}
