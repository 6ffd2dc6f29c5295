use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::paths;

/// Environment variable holding the managed user's password
pub const ENV_USER_PASSWORD: &str = "SLOTHCTL_USER_PASSWORD";

// ============================================================================
// Config
// ============================================================================

/// Contents of `config.toml`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// State database, `~` and `$VARS` are expanded
    pub database_path: String,
    pub resources: ResourcesConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: paths::DEFAULT_DATABASE_PATH.to_string(),
            resources: ResourcesConfig::default(),
        }
    }
}

/// Desired attributes of every managed resource, in apply order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourcesConfig {
    pub user: UserConfig,
    pub vault: VaultConfig,
    pub incus: IncusConfig,
    pub salt_master: SaltMasterConfig,
    pub salt_minion: SaltMinionConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    pub enabled: bool,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            name: "myadmin".to_string(),
            password: None,
        }
    }
}

impl UserConfig {
    /// Password from the file, else from `SLOTHCTL_USER_PASSWORD`
    pub fn resolved_password(&self) -> Option<String> {
        self.password_or(std::env::var(ENV_USER_PASSWORD).ok())
    }

    fn password_or(&self, from_env: Option<String>) -> Option<String> {
        self.password
            .clone()
            .or(from_env)
            .filter(|pw| !pw.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    pub enabled: bool,
    pub name: String,
    pub address: String,
    pub ui: bool,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            name: "sloth-vault".to_string(),
            address: "0.0.0.0:8200".to_string(),
            ui: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IncusConfig {
    pub enabled: bool,
    pub name: String,
}

impl Default for IncusConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            name: "sloth-incus-host".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaltMasterConfig {
    pub enabled: bool,
    pub name: String,
    pub gitfs_remote: String,
    /// PAM user granted Salt API access
    pub api_user: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_password: Option<String>,
}

impl Default for SaltMasterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            name: "sloth-salt-master".to_string(),
            gitfs_remote: "https://github.com/your-org/your-salt-states.git".to_string(),
            api_user: provision::salt::DEFAULT_API_USER.to_string(),
            api_password: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaltMinionConfig {
    pub enabled: bool,
    pub name: String,
    pub master: String,
}

impl Default for SaltMinionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            name: "sloth-salt-minion".to_string(),
            master: "127.0.0.1".to_string(),
        }
    }
}

impl Config {
    /// Load from the config dir, defaults when the file does not exist
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_file()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Invalid config in {}", path.display()))
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Could not create {}", dir.display()))?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content).with_context(|| format!("Could not write {}", path.display()))?;
        Ok(())
    }

    /// Write the default config unless a file already exists.
    ///
    /// Returns true when a file was written.
    pub fn init_default(path: &Path) -> Result<bool> {
        if path.exists() {
            return Ok(false);
        }
        Self::default().save_to(path)?;
        log::info!("Wrote default config to {}", path.display());
        Ok(true)
    }

    /// Database location: CLI or env override, then the config file
    pub fn database_path(&self, cli_override: Option<&Path>) -> PathBuf {
        cli_override.map_or_else(|| paths::expand(&self.database_path), Path::to_path_buf)
    }
}

// ============================================================================
// Tests
// ============================================================================
