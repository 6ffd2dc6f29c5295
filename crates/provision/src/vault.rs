//! HashiCorp Vault installation and configuration.

use crate::error::Result;
use crate::host::Host;

pub const PACKAGE: &str = "vault";
pub const SERVICE: &str = "vault";
pub const CONFIG_PATH: &str = "/etc/vault/vault.hcl";
pub const CONFIG_DIR: &str = "/etc/vault";
pub const DATA_PATH: &str = "/opt/vault/data";

/// Listener and UI settings written to the server config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultSettings {
    pub address: String,
    pub ui: bool,
}

impl Default for VaultSettings {
    fn default() -> Self {
        Self {
            address: "0.0.0.0:8200".to_string(),
            ui: true,
        }
    }
}

/// Render `vault.hcl` with file storage under [`DATA_PATH`].
pub fn render_config(settings: &VaultSettings) -> String {
    format!(
        r#"storage "file" {{
  path = "{DATA_PATH}"
}}

listener "tcp" {{
  address     = "{}"
  tls_disable = 1
}}

ui = {}
"#,
        settings.address, settings.ui
    )
}

/// Install the Vault package.
pub fn install_secret_manager(host: &Host) -> Result<()> {
    log::info!("Installing HashiCorp Vault");
    host.install_packages(&[PACKAGE])
}

/// Create the data directory, write the config and start the service.
///
/// Vault still needs `vault operator init` and unsealing afterwards.
pub fn configure_secret_manager(host: &Host, settings: &VaultSettings) -> Result<()> {
    log::info!("Configuring Vault on {}", settings.address);
    host.make_dir(DATA_PATH)?;
    host.chown("vault:vault", DATA_PATH)?;
    host.make_dir(CONFIG_DIR)?;
    host.write_root_file(CONFIG_PATH, &render_config(settings))?;
    host.enable_service(SERVICE)?;
    host.start_service(SERVICE)?;
    log::info!("Vault service started");
    Ok(())
}
