//! Salt master and minion installation.

use crate::error::Result;
use crate::host::Host;
use crate::user;

pub const MASTER_CONFIG_PATH: &str = "/etc/salt/master";
pub const MINION_CONFIG_PATH: &str = "/etc/salt/minion";
pub const MASTER_SERVICE: &str = "salt-master";
pub const MINION_SERVICE: &str = "salt-minion";

/// Default name of the PAM user allowed to drive the Salt API.
pub const DEFAULT_API_USER: &str = "saltuser";

/// Credentials of the dedicated Salt API user.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiUser {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for ApiUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiUser")
            .field("username", &self.username)
            .field("password", &"[secret]")
            .finish()
    }
}

/// What a node does in the cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeRole {
    /// Runs the master (and a local minion), serving states from git
    Control {
        gitfs_remote: String,
        api_user: Option<ApiUser>,
    },
    /// Runs a minion pointed at a master
    Worker { master: String },
}

impl NodeRole {
    pub fn packages(&self) -> &'static [&'static str] {
        match self {
            Self::Control { .. } => &["salt", "salt-master"],
            Self::Worker { .. } => &["salt"],
        }
    }

    /// Master address the local minion points at
    pub fn master_address(&self) -> &str {
        match self {
            Self::Control { .. } => "127.0.0.1",
            Self::Worker { master } => master,
        }
    }
}

/// Render the master config: roots + gitfs, optional PAM API access.
pub fn render_master_config(gitfs_remote: &str, api_user: Option<&str>) -> String {
    let mut config = format!(
        "fileserver_backend:\n  - roots\n  - git\n\ngitfs_remotes:\n  - {gitfs_remote}\n"
    );
    if let Some(name) = api_user {
        config.push_str(&format!(
            "\nexternal_auth:\n  pam:\n    {name}:\n      - .*\n\nclient_acl:\n  {name}:\n    - .*\n"
        ));
    }
    config
}

pub fn render_minion_config(master: &str) -> String {
    format!("master: {master}\n")
}

/// Install and start a Salt node for the given role.
pub fn install_cluster_node(host: &Host, role: &NodeRole) -> Result<()> {
    log::info!("Installing Salt ({})", role.packages().join(", "));
    host.install_packages(role.packages())?;

    if let NodeRole::Control { gitfs_remote, api_user } = role {
        if let Some(api) = api_user {
            user::create_user(host, &api.username, Some(&api.password))?;
        }
        let config = render_master_config(gitfs_remote, api_user.as_ref().map(|u| u.username.as_str()));
        host.write_root_file(MASTER_CONFIG_PATH, &config)?;
        host.enable_service(MASTER_SERVICE)?;
        host.start_service(MASTER_SERVICE)?;
        log::info!("Salt master started");
    }

    host.write_root_file(MINION_CONFIG_PATH, &render_minion_config(role.master_address()))?;
    host.enable_service(MINION_SERVICE)?;
    host.start_service(MINION_SERVICE)?;
    log::info!("Salt minion started");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::ScriptedRunner;
    use crate::runner::CommandOutput;
    use std::sync::Arc;

    #[test]
    fn test_master_config_with_api_user() {
        let config = render_master_config("https://git.example.com/states.git", Some("saltuser"));
        assert!(config.contains("  - https://git.example.com/states.git"));
        assert!(config.contains("external_auth:\n  pam:\n    saltuser:"));
        assert!(config.contains("client_acl:\n  saltuser:"));

        let plain = render_master_config("https://git.example.com/states.git", None);
        assert!(!plain.contains("external_auth"));
    }

    #[test]
    fn test_control_node_sequence() {
        let runner = Arc::new(ScriptedRunner::new().respond("id -u", CommandOutput::failed(1, "no such user")));
        let host = Host::new(runner.clone(), false);
        let role = NodeRole::Control {
            gitfs_remote: "https://git.example.com/states.git".into(),
            api_user: Some(ApiUser {
                username: DEFAULT_API_USER.into(),
                password: "s3cret".into(),
            }),
        };
        install_cluster_node(&host, &role).unwrap();

        assert_eq!(
            runner.commands(),
            vec![
                "sudo pacman --noconfirm -S salt salt-master",
                "id -u saltuser",
                "sudo useradd -m -s /bin/bash saltuser",
                "sudo chpasswd",
                "sudo tee /etc/salt/master",
                "sudo systemctl enable salt-master",
                "sudo systemctl start salt-master",
                "sudo tee /etc/salt/minion",
                "sudo systemctl enable salt-minion",
                "sudo systemctl start salt-minion",
            ]
        );
        assert_eq!(runner.stdin_for("sudo tee /etc/salt/minion").as_deref(), Some("master: 127.0.0.1\n"));
        assert!(!format!("{role:?}").contains("s3cret"));
    }

    #[test]
    fn test_worker_points_at_master() {
        let runner = Arc::new(ScriptedRunner::new());
        let host = Host::new(runner.clone(), false);
        install_cluster_node(&host, &NodeRole::Worker { master: "10.0.0.5".into() }).unwrap();

        assert_eq!(runner.commands()[0], "sudo pacman --noconfirm -S salt");
        assert!(!runner.commands().iter().any(|c| c.contains("salt-master")));
        assert_eq!(runner.stdin_for("sudo tee /etc/salt/minion").as_deref(), Some("master: 10.0.0.5\n"));
    }
}
