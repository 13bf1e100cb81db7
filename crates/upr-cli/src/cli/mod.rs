use clap::{Parser, Subcommand};
use upr_core::prompt::ConfirmPolicy;

pub mod args;

pub use args::{DbArgs, DriveArgs, NginxArgs};

/// Top-level CLI parser for the `upr` binary.
#[derive(Debug, Parser)]
#[command(name = "upr", version, about = "Uproot - migrate a web stack between servers")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Answer yes to every confirmation
    #[arg(short = 'y', long, global = true, conflicts_with = "no")]
    pub yes: bool,

    /// Answer no to every confirmation; destructive actions are skipped
    #[arg(short = 'n', long, global = true)]
    pub no: bool,

    /// Explicit configuration file, layered over the usual sources
    #[arg(short = 'c', long, global = true, value_name = "FILE")]
    pub config: Option<std::path::PathBuf>,
}

impl Cli {
    /// Confirmation policy for a run: explicit flags win over the config
    /// section's policy.
    #[must_use]
    pub const fn policy(&self, configured: ConfirmPolicy) -> ConfirmPolicy {
        if self.yes {
            ConfirmPolicy::AlwaysYes
        } else if self.no {
            ConfirmPolicy::AlwaysNo
        } else {
            configured
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Migrate PostgreSQL databases from a source server to a destination
    Db(DbArgs),
    /// Repair the local nginx installation after a migration
    Nginx(NginxArgs),
    /// Drive the full host/service migration step sequence
    Drive(DriveArgs),
}
