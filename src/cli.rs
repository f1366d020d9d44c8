use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "k5sync")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Keep Kerberos .k5login files in their declared state", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Desired-state file (TOML or JSON)
    #[arg(short, long, global = true, env = "K5SYNC_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show the current state of every declared file
    Status(TargetArgs),

    /// Preview what apply would change
    Diff(TargetArgs),

    /// Converge every declared file to its desired state
    Apply(ApplyArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args)]
pub struct TargetArgs {
    /// Limit to matching resources: "k5login", "k5login:<fragment>" or a path
    pub target: Option<String>,
}

#[derive(Args)]
pub struct ApplyArgs {
    /// Limit to matching resources: "k5login", "k5login:<fragment>" or a path
    pub target: Option<String>,

    /// Show what would change without touching anything
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}
