//! Centralized path resolution for slothctl
//!
//! # Environment Variables
//!
//! - `SLOTHCTL_CONFIG_DIR` - Override config directory
//! - `SLOTHCTL_DATABASE_PATH` - Override the state database file (read by the CLI)
//!
//! # Path Resolution Priority
//!
//! For config_dir():
//! 1. `SLOTHCTL_CONFIG_DIR` environment variable
//! 2. `~/.slothctl`

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Environment variable for config directory override
pub const ENV_CONFIG_DIR: &str = "SLOTHCTL_CONFIG_DIR";

/// Environment variable for database path override
pub const ENV_DATABASE_PATH: &str = "SLOTHCTL_DATABASE_PATH";

/// Config file name inside the config directory
pub const CONFIG_FILE: &str = "config.toml";

/// Database path written to fresh config files, expanded at load time
pub const DEFAULT_DATABASE_PATH: &str = "$HOME/.slothctl/slothctl.db";

/// Get the slothctl config directory path
pub fn config_dir() -> Result<PathBuf> {
    config_dir_from(std::env::var(ENV_CONFIG_DIR).ok())
}

fn config_dir_from(env_dir: Option<String>) -> Result<PathBuf> {
    if let Some(dir) = env_dir {
        let path = expand(&dir);
        log::debug!(
            "Using config dir from {}: {}",
            ENV_CONFIG_DIR,
            path.display()
        );
        return Ok(path);
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = home.join(".slothctl");
    log::debug!("Using default config dir: {}", path.display());
    Ok(path)
}

/// Path of the config file
pub fn config_file() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE))
}

/// Expand ~ and environment variables in a path string.
///
/// Unknown variables are left as written.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

// ============================================================================
// Tests
// ============================================================================
