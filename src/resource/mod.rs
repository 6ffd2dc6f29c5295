//! Host resources managed by slothctl
//!
//! The variant set is closed: [`HostResource`] wraps every kind the engine
//! knows and dispatches the [`Resource`] contract with an exhaustive match.
//! Resources are rebuilt from configuration on every invocation and never
//! persisted themselves; only their observed snapshots are.

mod cluster_node;
mod container_host;
mod secret_manager;
mod user;

pub use cluster_node::ClusterNode;
pub use container_host::ContainerHost;
pub use secret_manager::SecretManager;
pub use user::UserAccount;

use anyhow::{Context, Result};
use converge::{ChangeKind, ChangeRecord, Resource, Snapshot};
use provision::{CommandRunner, Host, salt, service, vault};
use std::sync::Arc;

use crate::config::Config;

/// Kind prefix used in resource ids (`<prefix>:<name>`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    User,
    SecretManager,
    ContainerHost,
    ClusterControlNode,
    ClusterWorkerNode,
}

impl ResourceKind {
    pub const ALL: [Self; 5] = [
        Self::User,
        Self::SecretManager,
        Self::ContainerHost,
        Self::ClusterControlNode,
        Self::ClusterWorkerNode,
    ];

    pub fn prefix(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::SecretManager => "vault",
            Self::ContainerHost => "incus",
            Self::ClusterControlNode => "salt_master",
            Self::ClusterWorkerNode => "salt_minion",
        }
    }

    pub fn from_prefix(prefix: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.prefix() == prefix)
    }

    pub fn resource_id(self, name: &str) -> String {
        format!("{}:{}", self.prefix(), name)
    }
}

/// A resource that may be declared for the host
#[derive(Debug, Clone)]
pub enum HostResource {
    User(UserAccount),
    SecretManager(SecretManager),
    ContainerHost(ContainerHost),
    ClusterControlNode(ClusterNode),
    ClusterWorkerNode(ClusterNode),
}

impl HostResource {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::User(_) => ResourceKind::User,
            Self::SecretManager(_) => ResourceKind::SecretManager,
            Self::ContainerHost(_) => ResourceKind::ContainerHost,
            Self::ClusterControlNode(_) => ResourceKind::ClusterControlNode,
            Self::ClusterWorkerNode(_) => ResourceKind::ClusterWorkerNode,
        }
    }
}

impl Resource for HostResource {
    fn id(&self) -> String {
        match self {
            Self::User(r) => r.id(),
            Self::SecretManager(r) => r.id(),
            Self::ContainerHost(r) => r.id(),
            Self::ClusterControlNode(r) | Self::ClusterWorkerNode(r) => r.id(),
        }
    }

    fn read_current_state(&self, dry_run: bool) -> Result<Option<Snapshot>> {
        match self {
            Self::User(r) => r.read_current_state(dry_run),
            Self::SecretManager(r) => r.read_current_state(dry_run),
            Self::ContainerHost(r) => r.read_current_state(dry_run),
            Self::ClusterControlNode(r) | Self::ClusterWorkerNode(r) => r.read_current_state(dry_run),
        }
    }

    fn desired_state(&self) -> Option<Snapshot> {
        match self {
            Self::User(r) => r.desired_state(),
            Self::SecretManager(r) => r.desired_state(),
            Self::ContainerHost(r) => r.desired_state(),
            Self::ClusterControlNode(r) | Self::ClusterWorkerNode(r) => r.desired_state(),
        }
    }

    fn diff(&self, current: Option<&Snapshot>, desired: Option<&Snapshot>) -> Result<Vec<ChangeRecord>> {
        match self {
            Self::User(r) => r.diff(current, desired),
            Self::SecretManager(r) => r.diff(current, desired),
            Self::ContainerHost(r) => r.diff(current, desired),
            Self::ClusterControlNode(r) | Self::ClusterWorkerNode(r) => r.diff(current, desired),
        }
    }

    fn apply(&self, dry_run: bool, changes: &[ChangeRecord]) -> Result<()> {
        match self {
            Self::User(r) => r.apply(dry_run, changes),
            Self::SecretManager(r) => r.apply(dry_run, changes),
            Self::ContainerHost(r) => r.apply(dry_run, changes),
            Self::ClusterControlNode(r) | Self::ClusterWorkerNode(r) => r.apply(dry_run, changes),
        }
    }
}

/// Values given on the command line that take precedence over the config file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub user: Option<String>,
    pub salt_api_password: Option<String>,
}

/// Build the desired resource list in apply order:
/// user, secrets manager, container host, cluster control and worker nodes.
pub fn build_resources(
    config: &Config,
    overrides: &Overrides,
    runner: &Arc<dyn CommandRunner>,
) -> Vec<HostResource> {
    let res = &config.resources;
    let mut resources = Vec::new();

    if res.user.enabled {
        let name = overrides.user.as_deref().unwrap_or(&res.user.name);
        resources.push(HostResource::User(UserAccount::new(
            name,
            res.user.resolved_password(),
            Arc::clone(runner),
        )));
    }
    if res.vault.enabled {
        let settings = vault::VaultSettings {
            address: res.vault.address.clone(),
            ui: res.vault.ui,
        };
        resources.push(HostResource::SecretManager(SecretManager::new(
            &res.vault.name,
            settings,
            Arc::clone(runner),
        )));
    }
    if res.incus.enabled {
        resources.push(HostResource::ContainerHost(ContainerHost::new(
            &res.incus.name,
            Arc::clone(runner),
        )));
    }
    if res.salt_master.enabled {
        let password = overrides
            .salt_api_password
            .clone()
            .or_else(|| res.salt_master.api_password.clone())
            .filter(|pw| !pw.is_empty());
        let role = salt::NodeRole::Control {
            gitfs_remote: res.salt_master.gitfs_remote.clone(),
            api_user: password.map(|password| salt::ApiUser {
                username: res.salt_master.api_user.clone(),
                password,
            }),
        };
        resources.push(HostResource::ClusterControlNode(ClusterNode::new(
            &res.salt_master.name,
            role,
            Arc::clone(runner),
        )));
    }
    if res.salt_minion.enabled {
        let role = salt::NodeRole::Worker {
            master: res.salt_minion.master.clone(),
        };
        resources.push(HostResource::ClusterWorkerNode(ClusterNode::new(
            &res.salt_minion.name,
            role,
            Arc::clone(runner),
        )));
    }

    resources
}

// ============================================================================
// Shared helpers for package + service backed resources
// ============================================================================

fn new_uuid() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Probe a package and its service: `None` when the package is missing
fn probe_installed(host: &Host, name: &str, package: &str, unit: &str) -> Result<Option<Snapshot>> {
    let installed = host
        .package_installed(package)
        .with_context(|| format!("Failed to query package {package}"))?;
    if !installed {
        return Ok(None);
    }
    let active = host
        .service_active(unit)
        .with_context(|| format!("Failed to query service {unit}"))?;
    Ok(Some(
        Snapshot::new()
            .with("name", name)
            .with("installed", true)
            .with("service_active", active),
    ))
}

/// Desired snapshot of an installed, running service
fn installed_and_running(name: &str) -> Snapshot {
    Snapshot::new()
        .with("name", name)
        .with("installed", true)
        .with("service_active", true)
}

/// Apply an `Update` on a service backed resource
fn apply_service_update(host: &Host, resource_id: &str, unit: &str, change: &ChangeRecord) -> Result<()> {
    if change.new_bool("service_active") == Some(true) {
        service::ensure_running(host, unit).with_context(|| format!("Failed to start {unit} for {resource_id}"))?;
    } else {
        skip_change(resource_id, change.kind());
    }
    Ok(())
}

/// Log a change kind the resource does not act on
fn skip_change(resource_id: &str, kind: ChangeKind) {
    match kind {
        ChangeKind::NoOp => log::info!("No operation for {resource_id}"),
        _ => log::info!("{kind} is not supported for {resource_id}, skipping"),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use provision::CommandOutput;
    use provision::fake::ScriptedRunner;

    /// A runner where nothing is installed and no user exists
    pub(crate) fn empty_host() -> ScriptedRunner {
        ScriptedRunner::new()
            .respond("pacman -Q", CommandOutput::failed(1, "error: package was not found"))
            .respond("systemctl is-active", CommandOutput::failed(3, ""))
            .respond("id -u", CommandOutput::failed(1, "id: no such user"))
    }

    fn runner(r: ScriptedRunner) -> Arc<dyn CommandRunner> {
        Arc::new(r)
    }

    #[test]
    fn test_default_resource_list_order() {
        let resources = build_resources(&Config::default(), &Overrides::default(), &runner(empty_host()));
        let ids: Vec<String> = resources.iter().map(Resource::id).collect();
        assert_eq!(
            ids,
            vec![
                "user:myadmin",
                "vault:sloth-vault",
                "incus:sloth-incus-host",
                "salt_master:sloth-salt-master",
                "salt_minion:sloth-salt-minion",
            ]
        );
    }

    #[test]
    fn test_overrides_and_disabled_resources() {
        let mut config = Config::default();
        config.resources.incus.enabled = false;
        config.resources.salt_minion.enabled = false;
        let overrides = Overrides {
            user: Some("ops".to_string()),
            salt_api_password: None,
        };

        let resources = build_resources(&config, &overrides, &runner(empty_host()));
        let kinds: Vec<ResourceKind> = resources.iter().map(HostResource::kind).collect();
        assert_eq!(
            kinds,
            vec![ResourceKind::User, ResourceKind::SecretManager, ResourceKind::ClusterControlNode]
        );
        assert_eq!(resources[0].id(), "user:ops");
    }

    #[test]
    fn test_kind_prefix_round_trip() {
        for kind in ResourceKind::ALL {
            assert_eq!(ResourceKind::from_prefix(kind.prefix()), Some(kind));
        }
        assert_eq!(ResourceKind::from_prefix("brew"), None);
    }

    #[test]
    fn test_absent_host_plans_creates() {
        let resources = build_resources(&Config::default(), &Overrides::default(), &runner(empty_host()));
        for resource in &resources {
            let current = resource.read_current_state(true).unwrap();
            assert!(current.is_none(), "{} should be absent", resource.id());
            let changes = resource.diff(None, resource.desired_state().as_ref()).unwrap();
            assert_eq!(changes[0].kind(), ChangeKind::Create);
            assert!(changes.iter().all(|c| c.resource_id() == resource.id()));
        }
    }
}
