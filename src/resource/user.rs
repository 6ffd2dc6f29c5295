//! System user resource - an account in the root group

use anyhow::{Context, Result};
use converge::diff::{NO_CHANGES, NO_DESIRED_STATE, update_or_no_op};
use converge::{Attributes, ChangeKind, ChangeRecord, Resource, Snapshot};
use provision::{CommandRunner, Host, user};
use std::fmt;
use std::sync::Arc;

use super::{ResourceKind, new_uuid, skip_change};

const ROOT_GROUP: &str = "root";

/// A login user that must exist and belong to the root group
#[derive(Clone)]
pub struct UserAccount {
    pub username: String,
    password: Option<String>,
    uuid: String,
    runner: Arc<dyn CommandRunner>,
}

impl fmt::Debug for UserAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserAccount")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| converge::MASKED))
            .field("uuid", &self.uuid)
            .finish_non_exhaustive()
    }
}

impl UserAccount {
    pub fn new(username: &str, password: Option<String>, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            username: username.to_string(),
            password,
            uuid: new_uuid(),
            runner,
        }
    }

    fn host(&self, dry_run: bool) -> Host {
        Host::new(Arc::clone(&self.runner), dry_run)
    }

    fn set_group(&self) -> ChangeRecord {
        ChangeRecord::new(ChangeKind::SetGroup, self.id()).with_new("group", ROOT_GROUP)
    }
}

impl Resource for UserAccount {
    fn id(&self) -> String {
        ResourceKind::User.resource_id(&self.username)
    }

    fn read_current_state(&self, dry_run: bool) -> Result<Option<Snapshot>> {
        log::debug!("Reading current state for user {} (dry run: {})", self.username, dry_run);
        let info = user::probe_user(&self.host(dry_run), &self.username)
            .with_context(|| format!("Failed to check user {}", self.username))?;

        Ok(info.map(|info| {
            Snapshot::new()
                .with("username", info.username.as_str())
                .with("exists", true)
                .with("in_root_group", info.in_group(ROOT_GROUP))
        }))
    }

    fn desired_state(&self) -> Option<Snapshot> {
        Some(
            Snapshot::new()
                .with("username", self.username.as_str())
                .with("exists", true)
                .with("in_root_group", true),
        )
    }

    fn diff(&self, current: Option<&Snapshot>, desired: Option<&Snapshot>) -> Result<Vec<ChangeRecord>> {
        let id = self.id();

        // a snapshot recording a missing account means the same as no snapshot
        let current = match current {
            Some(snapshot) if !snapshot.get_bool_or("exists", true)? => None,
            other => other,
        };

        let Some(current) = current else {
            let mut values = Attributes::new();
            values.insert("username".into(), self.username.as_str().into());
            values.insert("id".into(), self.uuid.as_str().into());
            if let Some(password) = &self.password {
                values.insert("password".into(), password.as_str().into());
            }
            return Ok(vec![ChangeRecord::create(&id, values), self.set_group()]);
        };

        let Some(desired) = desired else {
            return Ok(vec![ChangeRecord::no_op(&id, NO_DESIRED_STATE)]);
        };

        let mut changes = Vec::new();
        // root membership is fixed by SetGroup, not by an Update key
        let update = update_or_no_op(&id, current, desired, &["in_root_group"]);
        if update.is_change() {
            changes.push(update);
        }
        let want_root = desired.get_bool_or("in_root_group", true)?;
        if want_root && !current.get_bool_or("in_root_group", false)? {
            changes.push(self.set_group());
        }
        if changes.is_empty() {
            changes.push(ChangeRecord::no_op(&id, NO_CHANGES));
        }
        Ok(changes)
    }

    fn apply(&self, dry_run: bool, changes: &[ChangeRecord]) -> Result<()> {
        let host = self.host(dry_run);
        for change in changes {
            log::info!("Applying {} for user {} (dry run: {})", change.kind(), self.username, dry_run);
            match change.kind() {
                ChangeKind::Create => {
                    user::create_user(&host, &self.username, self.password.as_deref())
                        .with_context(|| format!("Failed to create user {}", self.username))?;
                }
                ChangeKind::SetGroup => {
                    let group = change.new_str("group").unwrap_or(ROOT_GROUP);
                    user::add_user_to_group(&host, &self.username, group).with_context(|| {
                        format!("Failed to add user {} to group {}", self.username, group)
                    })?;
                }
                kind => skip_change(&self.id(), kind),
            }
        }
        Ok(())
    }
}
