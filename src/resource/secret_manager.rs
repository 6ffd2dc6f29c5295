//! Secrets manager resource (HashiCorp Vault)

use anyhow::{Context, Result};
use converge::diff::{NO_DESIRED_STATE, update_or_no_op};
use converge::{ChangeKind, ChangeRecord, Resource, Snapshot};
use provision::vault::{self, VaultSettings};
use provision::{CommandRunner, Host};
use std::sync::Arc;

use super::{
    ResourceKind, apply_service_update, installed_and_running, new_uuid, probe_installed, skip_change,
};

const KIND: &str = "hashicorp-vault";

/// Vault installed from the package repository and served over plain TCP
#[derive(Debug, Clone)]
pub struct SecretManager {
    pub name: String,
    uuid: String,
    settings: VaultSettings,
    runner: Arc<dyn CommandRunner>,
}

impl SecretManager {
    pub fn new(name: &str, settings: VaultSettings, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            name: name.to_string(),
            uuid: new_uuid(),
            settings,
            runner,
        }
    }

    pub fn settings(&self) -> &VaultSettings {
        &self.settings
    }

    fn host(&self, dry_run: bool) -> Host {
        Host::new(Arc::clone(&self.runner), dry_run)
    }
}

impl Resource for SecretManager {
    fn id(&self) -> String {
        ResourceKind::SecretManager.resource_id(&self.name)
    }

    fn read_current_state(&self, dry_run: bool) -> Result<Option<Snapshot>> {
        log::debug!("Reading current state for Vault {} (dry run: {})", self.name, dry_run);
        probe_installed(&self.host(dry_run), &self.name, vault::PACKAGE, vault::SERVICE)
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
                    .with_new("id", self.uuid.as_str()),
                ChangeRecord::new(ChangeKind::Configure, &id)
                    .with_new("address", self.settings.address.as_str())
                    .with_new("ui_enabled", self.settings.ui)
                    .with_new("kind", KIND)
                    .with_new("id", self.uuid.as_str()),
            ]),
            (Some(_), None) => Ok(vec![ChangeRecord::no_op(&id, NO_DESIRED_STATE)]),
            (Some(current), Some(desired)) => Ok(vec![update_or_no_op(&id, current, desired, &[])]),
        }
    }

    fn apply(&self, dry_run: bool, changes: &[ChangeRecord]) -> Result<()> {
        let host = self.host(dry_run);
        for change in changes {
            log::info!("Applying {} for Vault {} (dry run: {})", change.kind(), self.name, dry_run);
            match change.kind() {
                ChangeKind::Create => {
                    vault::install_secret_manager(&host).context("Failed to install Vault")?;
                }
                ChangeKind::Configure => {
                    let settings = VaultSettings {
                        address: change.new_str("address").unwrap_or(&self.settings.address).to_string(),
                        ui: change.new_bool("ui_enabled").unwrap_or(self.settings.ui),
                    };
                    vault::configure_secret_manager(&host, &settings).context("Failed to configure Vault")?;
                }
                ChangeKind::Update => apply_service_update(&host, &self.id(), vault::SERVICE, change)?,
                kind => skip_change(&self.id(), kind),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::tests::empty_host;
    use provision::CommandOutput;
    use provision::fake::ScriptedRunner;

    fn vault(runner: &Arc<ScriptedRunner>) -> SecretManager {
        SecretManager::new("sloth-vault", VaultSettings::default(), runner.clone())
    }

    #[test]
    fn test_absent_plans_create_then_configure() {
        let runner = Arc::new(empty_host());
        let resource = vault(&runner);
        let current = resource.read_current_state(true).unwrap();
        let changes = resource.diff(current.as_ref(), resource.desired_state().as_ref()).unwrap();

        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].kind(), ChangeKind::Create);
        assert_eq!(changes[1].kind(), ChangeKind::Configure);
        assert!(changes.iter().all(|c| c.resource_id() == "vault:sloth-vault"));
        assert_eq!(changes[0].new_str("name"), Some("sloth-vault"));
        assert_eq!(changes[1].new_str("address"), Some("0.0.0.0:8200"));
        assert_eq!(changes[1].new_bool("ui_enabled"), Some(true));
        assert_eq!(changes[1].new_str("kind"), Some(KIND));
        assert_eq!(changes[0].new_str("id"), changes[1].new_str("id"));
    }

    #[test]
    fn test_stopped_service_plans_update() {
        let runner = Arc::new(
            ScriptedRunner::new().respond("systemctl is-active", CommandOutput::failed(3, "")),
        );
        let resource = vault(&runner);
        let current = resource.read_current_state(true).unwrap().unwrap();
        assert!(!current.get_bool("service_active").unwrap());

        let changes = resource.diff(Some(&current), resource.desired_state().as_ref()).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].kind(), ChangeKind::Update);
        assert_eq!(changes[0].diff_properties()["service_active"], "false -> true");
    }

    #[test]
    fn test_running_service_is_noop() {
        let runner = Arc::new(ScriptedRunner::new());
        let resource = vault(&runner);
        let current = resource.read_current_state(true).unwrap();
        let changes = resource.diff(current.as_ref(), resource.desired_state().as_ref()).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].kind(), ChangeKind::NoOp);
    }

    #[test]
    fn test_apply_installs_and_configures() {
        let runner = Arc::new(ScriptedRunner::new());
        let resource = vault(&runner);
        let changes = resource.diff(None, None).unwrap();
        resource.apply(false, &changes).unwrap();

        let commands = runner.commands();
        assert_eq!(commands[0], "sudo pacman --noconfirm -S vault");
        assert!(commands.contains(&"sudo tee /etc/vault/vault.hcl".to_string()));
        assert_eq!(commands.last().map(String::as_str), Some("sudo systemctl start vault"));
        let config = runner.stdin_for("sudo tee /etc/vault/vault.hcl").unwrap();
        assert!(config.contains("address     = \"0.0.0.0:8200\""));
    }

    #[test]
    fn test_apply_update_starts_service() {
        let runner = Arc::new(
            ScriptedRunner::new().respond("systemctl is-active", CommandOutput::failed(3, "")),
        );
        let resource = vault(&runner);
        let update = ChangeRecord::new(ChangeKind::Update, resource.id()).with_new("service_active", true);
        resource.apply(false, &[update]).unwrap();
        assert_eq!(
            runner.commands(),
            vec![
                "systemctl is-active --quiet vault",
                "sudo systemctl enable vault",
                "sudo systemctl start vault",
            ]
        );
    }

    #[test]
    fn test_dry_run_apply_only_probes() {
        let runner = Arc::new(ScriptedRunner::new());
        let resource = vault(&runner);
        let changes = resource.diff(None, None).unwrap();
        resource.apply(true, &changes).unwrap();
        assert!(runner.commands().is_empty());
    }
}
