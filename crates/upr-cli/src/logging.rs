//! Tracing initialization: console output plus a no-ANSI per-run log file.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

pub fn init(quiet: bool, verbose: bool, log_dir: &Path) -> anyhow::Result<()> {
    let level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "info"
    };

    let filter = tracing_subscriber::EnvFilter::try_from_env("UPROOT_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let console = tracing_subscriber::fmt::layer()
        .with_target(false)
        .without_time();

    // The file mirror is best-effort; an unwritable log dir (no root) must
    // not keep the tool from running.
    let file = match open_log_file(log_dir) {
        Ok(file) => Some(
            tracing_subscriber::fmt::layer()
                .with_writer(Arc::new(file))
                .with_ansi(false)
                .with_target(false),
        ),
        Err(error) => {
            eprintln!("upr: log file unavailable in {}: {error}", log_dir.display());
            None
        }
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))
}

fn open_log_file(log_dir: &Path) -> std::io::Result<File> {
    std::fs::create_dir_all(log_dir)?;
    let path = upr_core::artifacts::timestamped_path(log_dir, "upr", "log", chrono::Utc::now());
    File::create(path)
}
