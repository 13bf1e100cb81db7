//! Per-subcommand argument structs.

use clap::Args;

#[derive(Debug, Args)]
pub struct DbArgs {
    /// Source PostgreSQL host
    #[arg(long)]
    pub source_host: String,

    #[arg(long, default_value_t = 5432)]
    pub source_port: u16,

    #[arg(long, default_value = "postgres")]
    pub source_user: String,

    /// Source password; prompted for without echo when omitted
    #[arg(long)]
    pub source_password: Option<String>,

    /// Destination PostgreSQL host
    #[arg(long)]
    pub dest_host: String,

    #[arg(long, default_value_t = 5432)]
    pub dest_port: u16,

    #[arg(long, default_value = "postgres")]
    pub dest_user: String,

    /// Destination password; prompted for without echo when omitted
    #[arg(long)]
    pub dest_password: Option<String>,

    /// Migrate a single database instead of every non-template one
    #[arg(long, conflicts_with = "all")]
    pub database: Option<String>,

    /// Migrate every non-template database (the default)
    #[arg(long)]
    pub all: bool,
}

#[derive(Debug, Args)]
pub struct NginxArgs {
    /// Candidate nginx configuration prefix; repeatable, overrides config
    #[arg(long = "prefix")]
    pub prefixes: Vec<String>,
}

#[derive(Debug, Args)]
pub struct DriveArgs {
    /// Old server to migrate away from
    #[arg(long)]
    pub source_host: String,

    #[arg(long, default_value = "root")]
    pub source_user: String,

    #[arg(long, default_value_t = 22)]
    pub source_port: u16,

    /// New server to migrate onto
    #[arg(long)]
    pub dest_host: String,

    #[arg(long, default_value = "root")]
    pub dest_user: String,

    #[arg(long, default_value_t = 22)]
    pub dest_port: u16,

    /// Skip steps completed in a previous run (reads the state file)
    #[arg(long)]
    pub resume: bool,
}
