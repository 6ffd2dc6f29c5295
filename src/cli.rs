use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;

use crate::paths;

#[derive(Parser)]
#[command(name = "slothctl")]
#[command(version)]
#[command(about = "Declarative host reconciliation for the sloth control plane", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// State database file (overrides the config file)
    #[arg(long, global = true, env = paths::ENV_DATABASE_PATH)]
    pub database: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Plan and converge the host configuration
    #[command(subcommand)]
    Configure(ConfigureCommand),

    /// Inspect recorded resource state
    #[command(subcommand)]
    State(StateCommand),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Configure
// ============================================================================

#[derive(Subcommand)]
pub enum ConfigureCommand {
    /// Write the default config if missing, plan, then plan/apply/bootstrap
    Init(InitArgs),

    /// Create the state database and its buckets if missing
    Database,

    /// Show the effective configuration
    Show,
}

#[derive(Parser)]
pub struct InitArgs {
    /// What to do after planning
    #[arg(long, value_enum, default_value_t = Mode::Bootstrap)]
    pub mode: Mode,

    /// Probe and log, but change nothing on the host
    #[arg(long)]
    pub dry_run: bool,

    /// Name of the managed admin user (overrides the config file)
    #[arg(long)]
    pub user: Option<String>,

    /// Password for the Salt API user
    #[arg(long, env = "SLOTHCTL_SALT_USER_PASSWORD", hide_env_values = true)]
    pub salt_user_password: Option<String>,

    /// Only apply changes for a kind or a single resource (e.g. `vault` or `user.ops`)
    #[arg(short, long)]
    pub target: Option<String>,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Plan output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Take the desired state from a second probe instead of the config
    #[arg(long)]
    pub legacy_desired_probe: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Print the plan and stop
    Plan,
    /// Apply the plan change by change, recording state
    Apply,
    /// Run the control plane installers in parallel
    Bootstrap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

// ============================================================================
// State
// ============================================================================

#[derive(Subcommand)]
pub enum StateCommand {
    /// List resources with recorded state
    List,

    /// Print the recorded snapshot of a resource
    Show {
        /// Resource id, e.g. `user:myadmin`
        resource_id: String,
    },

    /// Drop the recorded snapshot of a resource
    Forget {
        /// Resource id, e.g. `vault:sloth-vault`
        resource_id: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}
