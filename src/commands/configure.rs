//! `slothctl configure` - plan the host and converge it
//!
//! `init` always plans first. What happens next depends on the mode:
//! - `plan` - print the plan and stop
//! - `apply` - apply the plan change by change, recording state
//! - `bootstrap` - run the control plane installers in parallel

use anyhow::{Context as _, Result};
use converge::{DesiredSource, Planner};
use provision::{CommandRunner, SystemRunner};
use statestore::StateDb;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::Context;
use crate::cli::{InitArgs, Mode, OutputFormat};
use crate::config::Config;
use crate::engine::executor::{self, ApplyOptions};
use crate::engine::{bootstrap, render};
use crate::paths;
use crate::resource::{Overrides, build_resources};
use crate::ui;

pub fn init(ctx: &Context, args: &InitArgs) -> Result<()> {
    let config_path = paths::config_file()?;
    let runner: Arc<dyn CommandRunner> = Arc::new(SystemRunner);
    run_init(ctx, args, &config_path, &runner)
}

fn run_init(ctx: &Context, args: &InitArgs, config_path: &Path, runner: &Arc<dyn CommandRunner>) -> Result<()> {
    if Config::init_default(config_path)? && !ctx.quiet {
        ui::info(&format!("Default config file created at {}", config_path.display()));
    }
    let config = Config::load_from(config_path)?;

    let db_path = config.database_path(ctx.database.as_deref());
    let mut store = StateDb::open(&db_path)
        .with_context(|| format!("Failed to open state database {}", db_path.display()))?;

    let overrides = Overrides {
        user: args.user.clone(),
        salt_api_password: args.salt_user_password.clone(),
    };
    let resources = build_resources(&config, &overrides, runner);

    let source = if args.legacy_desired_probe {
        DesiredSource::Probe
    } else {
        DesiredSource::Declared
    };
    let plan = Planner::new(&store, args.dry_run)
        .with_desired_source(source)
        .plan(&resources)
        .context("Failed to generate plan")?
        .filter_by_target(args.target.as_deref());

    match args.format {
        OutputFormat::Text => print!("{}", render::render_text(&plan)),
        OutputFormat::Json => println!("{}", render::render_json(&plan)?),
    }

    match args.mode {
        Mode::Plan => {
            log::info!("Plan mode: exiting after plan generation");
            Ok(())
        }
        Mode::Apply => {
            let opts = ApplyOptions {
                dry_run: args.dry_run,
                yes: args.yes,
                quiet: ctx.quiet || args.format == OutputFormat::Json,
            };
            executor::execute(&plan, &resources, &mut store, &opts).context("Failed to apply changes")?;
            Ok(())
        }
        Mode::Bootstrap => {
            if args.target.is_some() {
                ui::warn("--target only narrows the plan; bootstrap installs the whole control plane");
            }
            if !args.yes && !args.dry_run && !executor::confirm_proceed()? {
                ui::error("Aborted");
                return Ok(());
            }
            bootstrap::run(&resources, runner, args.dry_run).context("Control plane bootstrap failed")?;
            if !ctx.quiet {
                ui::success("Control plane bootstrap complete");
            }
            Ok(())
        }
    }
}

/// Write the default config if missing and set up the state database
pub fn database(ctx: &Context) -> Result<()> {
    let config_path = paths::config_file()?;
    let db_path = run_database(ctx, &config_path)?;
    if !ctx.quiet {
        ui::success(&format!("State database ready at {}", db_path.display()));
    }
    Ok(())
}

fn run_database(ctx: &Context, config_path: &Path) -> Result<PathBuf> {
    if Config::init_default(config_path)? && !ctx.quiet {
        ui::info(&format!("Default config file created at {}", config_path.display()));
    }
    let config = Config::load_from(config_path)?;
    let db_path = config.database_path(ctx.database.as_deref());
    log::info!("Initializing state database {}", db_path.display());

    let db = StateDb::open(&db_path)
        .with_context(|| format!("Failed to open state database {}", db_path.display()))?;
    log::debug!("Buckets: {}", db.buckets()?.join(", "));
    Ok(db_path)
}

/// Print the effective configuration as TOML
pub fn show(ctx: &Context) -> Result<()> {
    let path = paths::config_file()?;
    let config = Config::load_from(&path)?;

    ui::header("Configuration");
    ui::kv("file", &path.display().to_string());
    ui::kv("database", &config.database_path(ctx.database.as_deref()).display().to_string());
    println!();

    let mut shown = config;
    if shown.resources.user.password.is_some() {
        shown.resources.user.password = Some(converge::MASKED.to_string());
    }
    if shown.resources.salt_master.api_password.is_some() {
        shown.resources.salt_master.api_password = Some(converge::MASKED.to_string());
    }
    print!("{}", toml::to_string_pretty(&shown).context("Failed to serialize config")?);
    Ok(())
}
