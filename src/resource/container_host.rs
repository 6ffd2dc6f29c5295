//! Container host resource (Incus)

use anyhow::{Context, Result};
use converge::diff::{NO_DESIRED_STATE, update_or_no_op};
use converge::{ChangeKind, ChangeRecord, Resource, Snapshot};
use provision::{CommandRunner, Host, incus};
use std::sync::Arc;

use super::{
    ResourceKind, apply_service_update, installed_and_running, new_uuid, probe_installed, skip_change,
};

#[derive(Debug, Clone)]
pub struct ContainerHost {
    pub name: String,
    uuid: String,
    runner: Arc<dyn CommandRunner>,
}

impl ContainerHost {
    pub fn new(name: &str, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            name: name.to_string(),
            uuid: new_uuid(),
            runner,
        }
    }

    fn host(&self, dry_run: bool) -> Host {
        Host::new(Arc::clone(&self.runner), dry_run)
    }
}

impl Resource for ContainerHost {
    fn id(&self) -> String {
        ResourceKind::ContainerHost.resource_id(&self.name)
    }

    fn read_current_state(&self, dry_run: bool) -> Result<Option<Snapshot>> {
        log::debug!("Reading current state for Incus {} (dry run: {})", self.name, dry_run);
        probe_installed(&self.host(dry_run), &self.name, incus::PACKAGE, incus::SERVICE)
    }

    fn desired_state(&self) -> Option<Snapshot> {
        Some(installed_and_running(&self.name))
    }

    fn diff(&self, current: Option<&Snapshot>, desired: Option<&Snapshot>) -> Result<Vec<ChangeRecord>> {
        let id = self.id();
        match (current, desired) {
            (None, _) => Ok(vec![
                ChangeRecord::new(ChangeKind::Create, &id)
                    .with_new("name", self.name.as_str())
                    .with_new("id", self.uuid.as_str())
                    .with_new("kind", "incus"),
            ]),
            (Some(_), None) => Ok(vec![ChangeRecord::no_op(&id, NO_DESIRED_STATE)]),
            (Some(current), Some(desired)) => Ok(vec![update_or_no_op(&id, current, desired, &[])]),
        }
    }

    fn apply(&self, dry_run: bool, changes: &[ChangeRecord]) -> Result<()> {
        let host = self.host(dry_run);
        for change in changes {
            log::info!("Applying {} for Incus {} (dry run: {})", change.kind(), self.name, dry_run);
            match change.kind() {
                ChangeKind::Create => {
                    incus::install_container_host(&host).context("Failed to install Incus")?;
                }
                ChangeKind::Update => apply_service_update(&host, &self.id(), incus::SERVICE, change)?,
                kind => skip_change(&self.id(), kind),
            }
        }
        Ok(())
    }
}
