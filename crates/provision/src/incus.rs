//! Incus container host installation.

use crate::error::Result;
use crate::host::Host;
use crate::runner::CommandSpec;

pub const PACKAGE: &str = "incus";
pub const SERVICE: &str = "incus";

/// Install Incus, start the daemon and initialize it with defaults.
///
/// Initialization is skipped when `incus info` already succeeds. A dry run
/// never asks the daemon and assumes it still needs initializing.
pub fn install_container_host(host: &Host) -> Result<()> {
    log::info!("Installing Incus");
    host.install_packages(&[PACKAGE])?;
    host.enable_service(SERVICE)?;
    host.start_service(SERVICE)?;

    if host.is_dry_run() {
        log::info!("Dry run: assuming Incus is not initialized");
    } else if host.probe(&CommandSpec::sudo("incus").arg("info"))?.success() {
        log::info!("Incus is already initialized");
        return Ok(());
    }

    log::info!("Initializing Incus with default storage and network");
    host.run(&CommandSpec::sudo("incus").args(["admin", "init", "--auto"]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::ScriptedRunner;
    use crate::runner::CommandOutput;
    use std::sync::Arc;

    #[test]
    fn test_fresh_install_initializes() {
        let runner = Arc::new(ScriptedRunner::new().respond("sudo incus info", CommandOutput::failed(1, "not initialized")));
        let host = Host::new(runner.clone(), false);
        install_container_host(&host).unwrap();
        assert_eq!(
            runner.commands(),
            vec![
                "sudo pacman --noconfirm -S incus",
                "sudo systemctl enable incus",
                "sudo systemctl start incus",
                "sudo incus info",
                "sudo incus admin init --auto",
            ]
        );
    }

    #[test]
    fn test_dry_run_issues_no_commands() {
        let runner = Arc::new(ScriptedRunner::new());
        let host = Host::new(runner.clone(), true);
        install_container_host(&host).unwrap();
        assert!(runner.commands().is_empty());
    }

    #[test]
    fn test_initialized_host_skips_init() {
        let runner = Arc::new(ScriptedRunner::new());
        let host = Host::new(runner.clone(), false);
        install_container_host(&host).unwrap();
        assert_eq!(runner.commands().last().map(String::as_str), Some("sudo incus info"));
    }
}
