//! Control plane bootstrap
//!
//! Installs the secrets manager, the container host and the cluster control
//! node side by side on a rayon pool. Bootstrap does not go through the
//! applier: nothing is planned per change and no state is recorded.

use anyhow::{Context, Result};
use provision::{CommandRunner, Host, incus, salt, vault};
use rayon::prelude::*;
use std::sync::Arc;

use crate::resource::HostResource;

/// One independent installer run
#[derive(Debug)]
enum Task {
    SecretManager(vault::VaultSettings),
    ContainerHost,
    ClusterControl(salt::NodeRole),
}

impl Task {
    fn label(&self) -> &'static str {
        match self {
            Self::SecretManager(_) => "Vault",
            Self::ContainerHost => "Incus",
            Self::ClusterControl(_) => "SaltStack",
        }
    }

    fn run(&self, host: &Host) -> provision::Result<()> {
        match self {
            Self::SecretManager(settings) => {
                vault::install_secret_manager(host)?;
                vault::configure_secret_manager(host, settings)
            }
            Self::ContainerHost => incus::install_container_host(host),
            Self::ClusterControl(role) => salt::install_cluster_node(host, role),
        }
    }
}

/// Control plane tasks for the declared resources, in declaration order
fn tasks(resources: &[HostResource]) -> Vec<Task> {
    resources
        .iter()
        .filter_map(|resource| match resource {
            HostResource::SecretManager(r) => Some(Task::SecretManager(r.settings().clone())),
            HostResource::ContainerHost(_) => Some(Task::ContainerHost),
            HostResource::ClusterControlNode(r) => Some(Task::ClusterControl(r.role().clone())),
            HostResource::User(_) | HostResource::ClusterWorkerNode(_) => None,
        })
        .collect()
}

/// Run every control plane installer in parallel and wait for all of them.
///
/// Returns the first failure in declaration order.
pub fn run(resources: &[HostResource], runner: &Arc<dyn CommandRunner>, dry_run: bool) -> Result<()> {
    let tasks = tasks(resources);
    if tasks.is_empty() {
        log::info!("Nothing to bootstrap");
        return Ok(());
    }
    log::info!("Bootstrapping control plane ({} tasks, dry run: {})", tasks.len(), dry_run);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(tasks.len())
        .build()
        .context("Failed to create bootstrap thread pool")?;

    let results: Vec<(&'static str, provision::Result<()>)> = pool.install(|| {
        tasks
            .par_iter()
            .map(|task| {
                let host = Host::new(Arc::clone(runner), dry_run);
                log::info!("Starting {} setup", task.label());
                let result = task.run(&host);
                match &result {
                    Ok(()) => log::info!("{} setup complete", task.label()),
                    Err(e) => log::error!("{} setup failed: {}", task.label(), e),
                }
                (task.label(), result)
            })
            .collect()
    });

    for (label, result) in results {
        result.with_context(|| format!("{label} bootstrap failed"))?;
    }
    Ok(())
}
