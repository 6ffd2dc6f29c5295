//! Configuration management cluster nodes (Salt master and minion)

use anyhow::{Context, Result};
use converge::diff::{NO_DESIRED_STATE, update_or_no_op};
use converge::{ChangeKind, ChangeRecord, Resource, Snapshot};
use provision::salt::{self, NodeRole};
use provision::{CommandRunner, Host};
use std::sync::Arc;

use super::{
    ResourceKind, apply_service_update, installed_and_running, new_uuid, probe_installed, skip_change,
};

/// A Salt node. The role decides whether it is the control or a worker node.
#[derive(Debug, Clone)]
pub struct ClusterNode {
    pub name: String,
    uuid: String,
    role: NodeRole,
    runner: Arc<dyn CommandRunner>,
}

impl ClusterNode {
    pub fn new(name: &str, role: NodeRole, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            name: name.to_string(),
            uuid: new_uuid(),
            role,
            runner,
        }
    }

    pub fn role(&self) -> &NodeRole {
        &self.role
    }

    fn kind(&self) -> ResourceKind {
        match self.role {
            NodeRole::Control { .. } => ResourceKind::ClusterControlNode,
            NodeRole::Worker { .. } => ResourceKind::ClusterWorkerNode,
        }
    }

    /// Package and service whose presence stands for this node
    fn unit(&self) -> (&'static str, &'static str) {
        match self.role {
            NodeRole::Control { .. } => ("salt-master", salt::MASTER_SERVICE),
            NodeRole::Worker { .. } => ("salt", salt::MINION_SERVICE),
        }
    }

    fn host(&self, dry_run: bool) -> Host {
        Host::new(Arc::clone(&self.runner), dry_run)
    }

    fn create(&self) -> ChangeRecord {
        let record = ChangeRecord::new(ChangeKind::Create, self.id())
            .with_new("name", self.name.as_str())
            .with_new("id", self.uuid.as_str())
            .with_new("kind", self.kind().prefix());
        match &self.role {
            NodeRole::Control { gitfs_remote, api_user } => {
                let record = record.with_new("gitfs_remote", gitfs_remote.as_str());
                match api_user {
                    Some(api) => record
                        .with_new("api_user", api.username.as_str())
                        .with_new("api_password", api.password.as_str()),
                    None => record,
                }
            }
            NodeRole::Worker { master } => record.with_new("master", master.as_str()),
        }
    }
}

impl Resource for ClusterNode {
    fn id(&self) -> String {
        self.kind().resource_id(&self.name)
    }

    fn read_current_state(&self, dry_run: bool) -> Result<Option<Snapshot>> {
        log::debug!("Reading current state for {} (dry run: {})", self.id(), dry_run);
        let (package, service) = self.unit();
        probe_installed(&self.host(dry_run), &self.name, package, service)
    }

    fn desired_state(&self) -> Option<Snapshot> {
        Some(installed_and_running(&self.name))
    }

    fn diff(&self, current: Option<&Snapshot>, desired: Option<&Snapshot>) -> Result<Vec<ChangeRecord>> {
        let id = self.id();
        match (current, desired) {
            (None, _) => Ok(vec![self.create()]),
            (Some(_), None) => Ok(vec![ChangeRecord::no_op(&id, NO_DESIRED_STATE)]),
            (Some(current), Some(desired)) => Ok(vec![update_or_no_op(&id, current, desired, &[])]),
        }
    }

    fn apply(&self, dry_run: bool, changes: &[ChangeRecord]) -> Result<()> {
        let host = self.host(dry_run);
        let id = self.id();
        for change in changes {
            log::info!("Applying {} for {} (dry run: {})", change.kind(), id, dry_run);
            match change.kind() {
                ChangeKind::Create => {
                    salt::install_cluster_node(&host, &self.role)
                        .with_context(|| format!("Failed to install Salt for {id}"))?;
                }
                ChangeKind::Update => apply_service_update(&host, &id, self.unit().1, change)?,
                kind => skip_change(&id, kind),
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

    fn control(password: Option<&str>) -> NodeRole {
        NodeRole::Control {
            gitfs_remote: "https://git.example.com/states.git".to_string(),
            api_user: password.map(|pw| salt::ApiUser {
                username: "saltuser".to_string(),
                password: pw.to_string(),
            }),
        }
    }

    #[test]
    fn test_control_create_values() {
        let runner = Arc::new(empty_host());
        let node = ClusterNode::new("sloth-salt-master", control(Some("s3cret")), runner);
        let changes = node.diff(None, node.desired_state().as_ref()).unwrap();

        assert_eq!(changes.len(), 1);
        let create = &changes[0];
        assert_eq!(create.resource_id(), "salt_master:sloth-salt-master");
        assert_eq!(create.new_str("kind"), Some("salt_master"));
        assert_eq!(create.new_str("api_user"), Some("saltuser"));
        assert_eq!(create.masked().new_str("api_password"), Some(converge::MASKED));
        assert!(!format!("{node:?}").contains("s3cret"));
    }

    #[test]
    fn test_worker_create_values() {
        let runner = Arc::new(empty_host());
        let node = ClusterNode::new(
            "sloth-salt-minion",
            NodeRole::Worker {
                master: "127.0.0.1".to_string(),
            },
            runner,
        );
        let current = node.read_current_state(true).unwrap();
        let changes = node.diff(current.as_ref(), node.desired_state().as_ref()).unwrap();
        let create = &changes[0];
        assert_eq!(create.resource_id(), "salt_minion:sloth-salt-minion");
        assert_eq!(create.new_str("kind"), Some("salt_minion"));
        assert_eq!(create.new_str("master"), Some("127.0.0.1"));
    }

    #[test]
    fn test_control_probe_uses_master_unit() {
        let runner = Arc::new(ScriptedRunner::new());
        let node = ClusterNode::new("sloth-salt-master", control(None), runner.clone());
        node.read_current_state(true).unwrap();
        assert_eq!(
            runner.commands(),
            vec!["pacman -Q salt-master", "systemctl is-active --quiet salt-master"]
        );
    }

    #[test]
    fn test_apply_create_installs_master() {
        let runner = Arc::new(ScriptedRunner::new());
        let node = ClusterNode::new("sloth-salt-master", control(None), runner.clone());
        let changes = node.diff(None, None).unwrap();
        node.apply(false, &changes).unwrap();
        assert_eq!(runner.commands()[0], "sudo pacman --noconfirm -S salt salt-master");
        assert!(runner.commands().contains(&"sudo systemctl start salt-minion".to_string()));
    }

    #[test]
    fn test_install_failure_is_reported() {
        let runner = Arc::new(
            ScriptedRunner::new().respond("sudo pacman", CommandOutput::failed(1, "target not found: salt")),
        );
        let node = ClusterNode::new(
            "sloth-salt-minion",
            NodeRole::Worker {
                master: "10.0.0.5".to_string(),
            },
            runner,
        );
        let changes = node.diff(None, None).unwrap();
        let err = node.apply(false, &changes).unwrap_err();
        assert!(format!("{err:#}").contains("salt_minion:sloth-salt-minion"));
    }
}
