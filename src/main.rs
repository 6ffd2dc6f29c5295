mod cli;
mod commands;
mod config;
mod engine;
mod paths;
mod resource;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command, ConfigureCommand, StateCommand};
use std::io;
use std::path::PathBuf;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    /// State database override from `--database` or `SLOTHCTL_DATABASE_PATH`
    pub database: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        database: cli.database,
    };
    log::debug!("slothctl {} (verbosity {})", env!("CARGO_PKG_VERSION"), ctx.verbose);

    match cli.command {
        Command::Configure(cmd) => match cmd {
            ConfigureCommand::Init(args) => commands::configure::init(&ctx, &args),
            ConfigureCommand::Database => commands::configure::database(&ctx),
            ConfigureCommand::Show => commands::configure::show(&ctx),
        },
        Command::State(cmd) => match cmd {
            StateCommand::List => commands::state::list(&ctx),
            StateCommand::Show { resource_id } => commands::state::show(&ctx, &resource_id),
            StateCommand::Forget { resource_id, yes } => {
                commands::state::forget(&ctx, &resource_id, yes)
            }
        },
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "slothctl", &mut io::stdout());
            Ok(())
        }
    }
}
