//! Plan rendering - grouped text for people, JSON for tools

use anyhow::{Context, Result};
use colored::Colorize;
use converge::{ChangeKind, ChangeRecord, Plan, display_value, group_by_kind};
use std::fmt::Write;

use crate::resource::ResourceKind;

const NO_CHANGES: &str = "No changes. Your infrastructure matches the configuration.";
const RULE: &str = "─────────────────────────────────────────────────────";

/// Display category of a resource kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    User,
    SecretManager,
    PackageManager,
}

impl Category {
    pub fn of(kind: ResourceKind) -> Self {
        match kind {
            ResourceKind::User => Self::User,
            ResourceKind::SecretManager => Self::SecretManager,
            ResourceKind::ContainerHost | ResourceKind::ClusterControlNode | ResourceKind::ClusterWorkerNode => {
                Self::PackageManager
            }
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::User => "Core:User",
            Self::SecretManager => "Core:SecretManager",
            Self::PackageManager => "Core:PackageManager",
        }
    }
}

/// Group records by display category, keeping first-seen order
fn by_category(changes: &[ChangeRecord]) -> Vec<(String, Vec<&ChangeRecord>)> {
    let mut groups: Vec<(String, Vec<&ChangeRecord>)> = Vec::new();
    for (kind, records) in group_by_kind(changes) {
        let label = ResourceKind::from_prefix(kind)
            .map_or_else(|| kind.to_string(), |k| Category::of(k).label().to_string());
        match groups.iter_mut().find(|(existing, _)| *existing == label) {
            Some((_, group)) => group.extend(records),
            None => groups.push((label, records)),
        }
    }
    groups
}

fn symbol(kind: ChangeKind) -> String {
    let s = kind.symbol().to_string();
    match kind {
        ChangeKind::Create | ChangeKind::SetGroup | ChangeKind::Configure => s.green().to_string(),
        ChangeKind::Update => s.yellow().to_string(),
        ChangeKind::Delete => s.red().to_string(),
        ChangeKind::NoOp => s.dimmed().to_string(),
    }
}

/// Render the plan as a grouped box. Secrets are masked.
pub fn render_text(plan: &Plan) -> String {
    let mut out = String::new();
    if !plan.has_changes() {
        let _ = writeln!(out, "\n  {} {}", "✓".green(), NO_CHANGES);
        return out;
    }

    let _ = writeln!(out, "\n┌─ {} {}┐", "Plan".bold(), "─".repeat(46));
    let _ = writeln!(out, "│");

    for (label, records) in by_category(plan.changes()) {
        let changes: Vec<&ChangeRecord> = records.into_iter().filter(|c| c.is_change()).collect();
        if changes.is_empty() {
            continue;
        }
        let _ = writeln!(out, "│ {}", label.bold());
        for change in changes {
            let _ = writeln!(
                out,
                "│   {} {:<10} {}",
                symbol(change.kind()),
                change.kind().as_str(),
                change.resource_id()
            );
            let attributes = match change.kind() {
                ChangeKind::Update => change.diff_properties(),
                _ => change.new_values(),
            };
            for (key, value) in attributes {
                let _ = writeln!(out, "│       ├─ {:<16} {}", key, display_value(key, value).dimmed());
            }
        }
        let _ = writeln!(out, "│");
    }

    let summary = plan.summary();
    let _ = writeln!(out, "├{RULE}┤");
    let _ = writeln!(out, "│ Resources:");
    let _ = writeln!(out, "│   {} {} to create", "+".green(), summary.create);
    let _ = writeln!(out, "│   {} {} to update", "~".yellow(), summary.update);
    let _ = writeln!(out, "│   {} {} to delete", "-".red(), summary.delete);
    let _ = writeln!(out, "└{RULE}┘");
    out
}

/// Render the plan as JSON: masked change records plus the summary
pub fn render_json(plan: &Plan) -> Result<String> {
    let value = serde_json::json!({
        "changes": plan.masked(),
        "summary": plan.summary(),
    });
    serde_json::to_string_pretty(&value).context("Failed to serialize plan")
}

#[cfg(test)]
mod tests {
    use super::*;
    use converge::Attributes;
    use serde_json::Value;

    fn user_plan() -> Plan {
        let mut values = Attributes::new();
        values.insert("username".into(), "ops".into());
        values.insert("password".into(), "hunter2".into());
        values.insert("api_token".into(), "tok-123".into());
        Plan::new(vec![
            ChangeRecord::create("user:ops", values),
            ChangeRecord::new(ChangeKind::SetGroup, "user:ops").with_new("group", "root"),
            ChangeRecord::new(ChangeKind::Create, "incus:sloth-incus-host").with_new("kind", "incus"),
            ChangeRecord::new(ChangeKind::Create, "salt_minion:sloth-salt-minion").with_new("kind", "salt_minion"),
            ChangeRecord::no_op("vault:sloth-vault", "No changes detected"),
        ])
    }

    #[test]
    fn test_category_grouping() {
        let plan = user_plan();
        let groups = by_category(plan.changes());
        let labels: Vec<&str> = groups.iter().map(|(label, _)| label.as_str()).collect();
        assert_eq!(labels, vec!["Core:User", "Core:PackageManager", "Core:SecretManager"]);
        assert_eq!(groups[1].1.len(), 2);
    }

    #[test]
    fn test_text_masks_secrets() {
        let text = render_text(&user_plan());
        assert!(text.contains("user:ops"));
        assert!(text.contains("Core:PackageManager"));
        assert!(!text.contains("hunter2"));
        assert!(!text.contains("tok-123"));
        assert!(text.contains("[secret]"));
        assert!(text.contains("3 to create"));
        assert!(text.contains("0 to update"));
        assert!(text.contains("0 to delete"));
        assert!(!text.contains("vault:sloth-vault"));
    }

    #[test]
    fn test_update_shows_diff_properties() {
        let mut old = Attributes::new();
        old.insert("service_active".into(), false.into());
        let mut new = Attributes::new();
        new.insert("service_active".into(), true.into());
        let plan = Plan::new(vec![ChangeRecord::update("vault:sloth-vault", old, new)]);

        let text = render_text(&plan);
        assert!(text.contains("Core:SecretManager"));
        assert!(text.contains("false -> true"));
        assert!(text.contains("1 to update"));
    }

    #[test]
    fn test_no_changes_message() {
        let plan = Plan::new(vec![ChangeRecord::no_op("user:ops", "No changes detected")]);
        assert!(render_text(&plan).contains(NO_CHANGES));
        assert!(render_text(&Plan::new(Vec::new())).contains(NO_CHANGES));
    }

    #[test]
    fn test_json_output() {
        let json: Value = serde_json::from_str(&render_json(&user_plan()).unwrap()).unwrap();
        let changes = json["changes"].as_array().unwrap();
        assert_eq!(changes.len(), 5);
        assert_eq!(changes[0]["kind"], "create");
        assert_eq!(changes[0]["resource_id"], "user:ops");
        assert_eq!(changes[0]["new_values"]["username"], "ops");
        assert_eq!(changes[0]["new_values"]["password"], "[secret]");
        assert_eq!(changes[1]["kind"], "set-group");
        assert_eq!(changes[4]["kind"], "no-op");
        assert_eq!(json["summary"]["create"], 3);
        assert_eq!(json["summary"]["set_group"], 1);
    }
}
