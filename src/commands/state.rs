//! `slothctl state` - inspect and prune recorded snapshots

use anyhow::{Context as _, Result, bail};
use colored::Colorize;
use statestore::{STATE_BUCKET, StateDb};
use std::path::PathBuf;

use crate::Context;
use crate::config::Config;
use crate::engine::executor;
use crate::ui;

fn database_path(ctx: &Context) -> Result<PathBuf> {
    match &ctx.database {
        Some(path) => Ok(path.clone()),
        None => Ok(Config::load()?.database_path(None)),
    }
}

fn open(ctx: &Context) -> Result<StateDb> {
    let path = database_path(ctx)?;
    StateDb::open(&path).with_context(|| format!("Failed to open state database {}", path.display()))
}

pub fn list(ctx: &Context) -> Result<()> {
    let db = open(ctx)?;
    let entries = db.list(STATE_BUCKET)?;

    if entries.is_empty() {
        if !ctx.quiet {
            ui::info("No state recorded yet. Run `slothctl configure init --mode apply` first.");
        }
        return Ok(());
    }

    ui::header("Recorded state");
    for entry in &entries {
        println!(
            "  {:<40} {}",
            entry.key,
            entry.updated_at.format("%Y-%m-%d %H:%M:%S UTC").to_string().dimmed()
        );
    }
    Ok(())
}

pub fn show(ctx: &Context, resource_id: &str) -> Result<()> {
    let db = open(ctx)?;
    let Some(snapshot) = db
        .snapshot(resource_id)
        .with_context(|| format!("Failed to read state for {resource_id}"))?
    else {
        bail!("No state recorded for {resource_id}");
    };
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

pub fn forget(ctx: &Context, resource_id: &str, yes: bool) -> Result<()> {
    let mut db = open(ctx)?;
    if db.get_in(STATE_BUCKET, resource_id)?.is_none() {
        bail!("No state recorded for {resource_id}");
    }

    if !yes {
        ui::warn(&format!("The next plan will treat {resource_id} as never observed"));
        if !executor::confirm_proceed()? {
            ui::error("Aborted");
            return Ok(());
        }
    }

    db.delete_in(STATE_BUCKET, resource_id)?;
    if !ctx.quiet {
        ui::success(&format!("Forgot {resource_id}"));
    }
    Ok(())
}
