//! System user management.

use crate::error::{Error, Result};
use crate::host::Host;
use crate::runner::CommandSpec;

/// Observed facts about an existing user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserInfo {
    pub username: String,
    pub groups: Vec<String>,
}

impl UserInfo {
    pub fn in_group(&self, group: &str) -> bool {
        self.groups.iter().any(|g| g == group)
    }
}

/// Look a user up with `id`. `Ok(None)` when the user does not exist.
pub fn probe_user(host: &Host, username: &str) -> Result<Option<UserInfo>> {
    validate_name(username)?;

    let uid_cmd = CommandSpec::new("id").args(["-u", username]);
    let uid = host.probe(&uid_cmd)?;
    if !uid.success() {
        let text = format!("{}{}", uid.stdout, uid.stderr).to_lowercase();
        if text.contains("no such user") {
            return Ok(None);
        }
        uid.check(&uid_cmd)?;
    }

    let groups_cmd = CommandSpec::new("id").args(["-Gn", username]);
    let groups = host.probe(&groups_cmd)?.check(&groups_cmd)?;
    Ok(Some(UserInfo {
        username: username.to_string(),
        groups: groups.stdout.split_whitespace().map(str::to_string).collect(),
    }))
}

/// Create a user with a home directory and bash, then set its password.
///
/// Does nothing when the user already exists. The password is passed to
/// `chpasswd` on standard input and never appears in a command line.
pub fn create_user(host: &Host, username: &str, password: Option<&str>) -> Result<()> {
    validate_name(username)?;
    if let Some(pw) = password
        && pw.contains(['\n', '\r'])
    {
        return Err(Error::InvalidInput("password must be a single line".to_string()));
    }

    if probe_user(host, username)?.is_some() {
        log::info!("User {username} already exists");
        return Ok(());
    }

    log::info!("Creating system user {username}");
    host.run(&CommandSpec::sudo("useradd").args(["-m", "-s", "/bin/bash", username]))?;

    if let Some(pw) = password.filter(|pw| !pw.is_empty()) {
        log::info!("Setting password for {username}");
        host.run(&CommandSpec::sudo("chpasswd").stdin(format!("{username}:{pw}")))?;
    }
    Ok(())
}

/// Add a user to a supplementary group.
pub fn add_user_to_group(host: &Host, username: &str, group: &str) -> Result<()> {
    validate_name(username)?;
    validate_name(group)?;
    log::info!("Adding {username} to group {group}");
    host.run(&CommandSpec::sudo("usermod").args(["-aG", group, username]))
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name.starts_with('-') || name.contains(|c: char| c == ':' || c.is_whitespace()) {
        return Err(Error::InvalidInput(format!("invalid user or group name '{name}'")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::ScriptedRunner;
    use crate::runner::CommandOutput;
    use std::sync::Arc;

    fn absent_user() -> ScriptedRunner {
        ScriptedRunner::new().respond("id -u", CommandOutput::failed(1, "id: 'ops': no such user"))
    }

    #[test]
    fn test_probe_absent_user() {
        let host = Host::new(Arc::new(absent_user()), false);
        assert_eq!(probe_user(&host, "ops").unwrap(), None);
    }

    #[test]
    fn test_probe_reads_groups() {
        let runner = ScriptedRunner::new()
            .respond("id -u", CommandOutput::ok("1001\n"))
            .respond("id -Gn", CommandOutput::ok("ops wheel root\n"));
        let host = Host::new(Arc::new(runner), false);
        let info = probe_user(&host, "ops").unwrap().unwrap();
        assert!(info.in_group("root"));
        assert!(!info.in_group("docker"));
    }

    #[test]
    fn test_probe_other_failure_is_error() {
        let runner = ScriptedRunner::new().respond("id -u", CommandOutput::failed(2, "id: cannot access /etc/passwd"));
        let host = Host::new(Arc::new(runner), false);
        assert!(matches!(probe_user(&host, "ops"), Err(Error::CommandFailed { .. })));
    }

    #[test]
    fn test_create_user_sets_password_over_stdin() {
        let runner = Arc::new(absent_user());
        let host = Host::new(runner.clone(), false);
        create_user(&host, "ops", Some("hunter2")).unwrap();

        assert_eq!(
            runner.commands(),
            vec!["id -u ops", "sudo useradd -m -s /bin/bash ops", "sudo chpasswd"]
        );
        assert_eq!(runner.stdin_for("sudo chpasswd").as_deref(), Some("ops:hunter2"));
        assert!(runner.commands().iter().all(|c| !c.contains("hunter2")));
    }

    #[test]
    fn test_create_existing_user_is_noop() {
        let runner = Arc::new(ScriptedRunner::new());
        let host = Host::new(runner.clone(), false);
        create_user(&host, "ops", None).unwrap();
        assert_eq!(runner.commands(), vec!["id -u ops", "id -Gn ops"]);
    }

    #[test]
    fn test_dry_run_create_only_probes() {
        let runner = Arc::new(absent_user());
        let host = Host::new(runner.clone(), true);
        create_user(&host, "ops", Some("hunter2")).unwrap();
        assert_eq!(runner.commands(), vec!["id -u ops"]);
    }

    #[test]
    fn test_rejects_bad_names() {
        let host = Host::new(Arc::new(ScriptedRunner::new()), false);
        assert!(create_user(&host, "", None).is_err());
        assert!(create_user(&host, "a b", None).is_err());
        assert!(add_user_to_group(&host, "ops", "-rf").is_err());
        assert!(create_user(&host, "ops", Some("line\nbreak")).is_err());
    }

    #[test]
    fn test_add_to_group() {
        let runner = Arc::new(ScriptedRunner::new());
        let host = Host::new(runner.clone(), false);
        add_user_to_group(&host, "ops", "root").unwrap();
        assert_eq!(runner.commands(), vec!["sudo usermod -aG root ops"]);
    }
}
