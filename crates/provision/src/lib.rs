//! # Provision
//!
//! Host installers for a pacman and systemd based machine.
//!
//! Every installer takes a [`Host`], which wraps a [`CommandRunner`] and a
//! dry-run flag. In dry run, mutating commands are logged and skipped while
//! read-only probes (`pacman -Q`, `systemctl is-active`, `id`) still run.
//!
//! ## Example
//!
//! ```no_run
//! use provision::{Host, SystemRunner, vault};
//! use std::sync::Arc;
//!
//! let host = Host::new(Arc::new(SystemRunner), true);
//! vault::install_secret_manager(&host)?;
//! vault::configure_secret_manager(&host, &vault::VaultSettings::default())?;
//! # Ok::<(), provision::Error>(())
//! ```

mod error;
mod host;
mod runner;

pub mod incus;
pub mod salt;
pub mod service;
pub mod user;
pub mod vault;

#[cfg(any(test, feature = "test-util"))]
pub mod fake;

pub use error::{Error, Result};
pub use host::Host;
pub use runner::{CommandOutput, CommandRunner, CommandSpec, SystemRunner};
