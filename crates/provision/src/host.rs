//! Dry-run aware access to the target host.

use crate::error::{Error, Result};
use crate::runner::{CommandOutput, CommandRunner, CommandSpec};
use std::sync::Arc;

/// The host being provisioned.
///
/// Mutating commands go through [`Host::run`], which only logs them in dry
/// run. Read-only probes go through [`Host::probe`] and always execute.
#[derive(Debug, Clone)]
pub struct Host {
    runner: Arc<dyn CommandRunner>,
    dry_run: bool,
}

impl Host {
    pub fn new(runner: Arc<dyn CommandRunner>, dry_run: bool) -> Self {
        Self { runner, dry_run }
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Run a mutating command, failing on a non-zero exit.
    pub fn run(&self, spec: &CommandSpec) -> Result<()> {
        log::info!("Running: {spec}");
        if self.dry_run {
            log::info!("Dry run: command not executed");
            return Ok(());
        }
        self.runner.output(spec)?.check(spec)?;
        Ok(())
    }

    /// Run a read-only command, even in dry run. Exit status is not checked.
    pub fn probe(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        log::debug!("Probing: {spec}");
        self.runner.output(spec)
    }

    /// Whether a pacman package is installed.
    pub fn package_installed(&self, package: &str) -> Result<bool> {
        Ok(self
            .probe(&CommandSpec::new("pacman").args(["-Q", package]))?
            .success())
    }

    /// Whether a systemd unit is active.
    pub fn service_active(&self, service: &str) -> Result<bool> {
        Ok(self
            .probe(&CommandSpec::new("systemctl").args(["is-active", "--quiet", service]))?
            .success())
    }

    /// Install packages with pacman.
    pub fn install_packages(&self, packages: &[&str]) -> Result<()> {
        if packages.is_empty() {
            return Err(Error::InvalidInput("no packages to install".to_string()));
        }
        log::info!("Installing packages: {}", packages.join(", "));
        self.run(
            &CommandSpec::sudo("pacman")
                .args(["--noconfirm", "-S"])
                .args(packages.iter().copied()),
        )
    }

    pub fn enable_service(&self, service: &str) -> Result<()> {
        self.run(&CommandSpec::sudo("systemctl").args(["enable", service]))
    }

    pub fn start_service(&self, service: &str) -> Result<()> {
        self.run(&CommandSpec::sudo("systemctl").args(["start", service]))
    }

    /// Write a root-owned file through `sudo tee`.
    pub fn write_root_file(&self, path: &str, contents: &str) -> Result<()> {
        self.run(&CommandSpec::sudo("tee").arg(path).stdin(contents))
    }

    pub fn make_dir(&self, path: &str) -> Result<()> {
        self.run(&CommandSpec::sudo("mkdir").args(["-p", path]))
    }

    pub fn chown(&self, owner: &str, path: &str) -> Result<()> {
        self.run(&CommandSpec::sudo("chown").args([owner, path]))
    }
}
