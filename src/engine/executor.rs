//! Apply orchestration - confirmation, progress and summary around the applier

use anyhow::Result;
use colored::Colorize;
use converge::{Applier, ApplyReport, ChangeRecord, Plan, ProgressCallback, StateStore};
use indicatif::{ProgressBar, ProgressStyle};

use crate::resource::HostResource;

/// Options for applying a plan
#[derive(Debug, Clone, Default)]
pub struct ApplyOptions {
    pub dry_run: bool,
    /// Skip the confirmation prompt
    pub yes: bool,
    /// Hide the progress bar
    pub quiet: bool,
}

/// Progress bar driven by the applier
pub struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
        {
            bar.set_style(style.progress_chars("=>-"));
        }
        Self { bar }
    }
}

impl ProgressCallback for BarProgress {
    fn on_apply_start(&mut self, total: usize) {
        self.bar.set_length(total as u64);
    }

    fn on_change_start(&mut self, change: &ChangeRecord) {
        self.bar
            .set_message(format!("{} {}", change.kind(), change.resource_id()));
    }

    fn on_change_complete(&mut self, change: &ChangeRecord, ok: bool) {
        if ok {
            self.bar.inc(1);
        } else {
            self.bar
                .abandon_with_message(format!("{} {} failed", change.kind(), change.resource_id()));
        }
    }

    fn on_apply_complete(&mut self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}

/// Apply a plan after confirmation.
///
/// Returns `None` when there was nothing to do or the user declined.
pub fn execute(
    plan: &Plan,
    resources: &[HostResource],
    store: &mut dyn StateStore,
    opts: &ApplyOptions,
) -> Result<Option<ApplyReport>> {
    if !plan.has_changes() {
        return Ok(None);
    }

    if !opts.yes && !opts.dry_run && !confirm_proceed()? {
        println!();
        println!("  {} Aborted", "✗".red());
        return Ok(None);
    }

    let mut applier = Applier::new(store, opts.dry_run);
    if !opts.quiet {
        applier = applier.with_progress(BarProgress::new());
    }
    let report = applier.apply(plan.changes(), resources)?;

    if !opts.quiet {
        print_summary(&report, opts.dry_run);
    }
    Ok(Some(report))
}

/// Confirm with user
pub fn confirm_proceed() -> Result<bool> {
    use dialoguer::Confirm;

    let confirmed = Confirm::new()
        .with_prompt("Continue?")
        .default(true)
        .interact()?;

    Ok(confirmed)
}

fn print_summary(report: &ApplyReport, dry_run: bool) {
    println!();
    if dry_run {
        println!("  {} Dry run complete, nothing was changed", "ℹ".blue());
    } else if report.is_clean() {
        println!("  {} Configuration applied successfully!", "✓".green().bold());
    } else {
        println!("  {} Configuration applied with warnings", "⚠".yellow().bold());
    }

    println!("    • {} changes applied", report.applied);
    if report.persisted > 0 {
        println!("    • {} snapshots recorded", report.persisted);
    }
    if !report.skipped.is_empty() {
        println!(
            "    • {} changes skipped (no resource): {}",
            report.skipped.len(),
            report.skipped.join(", ")
        );
    }
    for failure in &report.persist_failures {
        println!("    • {} {}", "state not recorded:".red(), failure);
    }
}
