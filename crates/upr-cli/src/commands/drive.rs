//! `upr drive` - the host/service migration sequence.

use std::path::{Path, PathBuf};

use chrono::Utc;
use upr_config::UprConfig;
use upr_core::artifacts::timestamped_path;
use upr_core::prompt::PolicyPrompt;
use upr_driver::{DriveReport, MigrationDriver, RemoteHost};
use upr_exec::SystemRunner;

use crate::cli::{Cli, DriveArgs};
use crate::prompt::TerminalPrompt;
use crate::ui;

pub async fn handle(args: &DriveArgs, cli: &Cli, config: &UprConfig) -> anyhow::Result<i32> {
    let runner = SystemRunner;
    let prompt = PolicyPrompt::new(cli.policy(config.driver.confirm), TerminalPrompt::new());
    let source = RemoteHost::new(&args.source_user, &args.source_host).with_port(args.source_port);
    let dest = RemoteHost::new(&args.dest_user, &args.dest_host).with_port(args.dest_port);

    let driver = MigrationDriver::new(
        &runner,
        &prompt,
        &config.driver,
        source,
        dest,
        PathBuf::from(&config.general.log_dir),
    )
    .resume(args.resume);
    let snapshot = driver.snapshot();
    let report_dir = PathBuf::from(&config.general.report_dir);

    tokio::select! {
        result = driver.run() => {
            let report = result?;
            write_report(&report, &report_dir)?;
            if report.aborted {
                println!("{}", ui::fail("migration aborted"));
            } else if report.failed_steps() > 0 {
                println!("{}", ui::warn("migration finished with failed steps"));
            } else {
                println!("{}", ui::ok("migration complete"));
            }
            Ok(report.exit_code())
        }
        _ = tokio::signal::ctrl_c() => {
            // The current step's subprocess may still be running; nothing is
            // rolled back, the report just covers what was attempted.
            let mut report = snapshot
                .lock()
                .map_err(|_| anyhow::anyhow!("interrupted, and the report snapshot is poisoned"))?
                .clone();
            report.aborted = true;
            write_report(&report, &report_dir)?;
            println!("{}", ui::fail("interrupted; partial report written"));
            Ok(130)
        }
    }
}

fn write_report(report: &DriveReport, report_dir: &Path) -> anyhow::Result<()> {
    let path = timestamped_path(report_dir, "drive", "txt", Utc::now());
    report.summary().write_to(&path)?;
    println!("{}", report.summary().render());
    println!("report written to {}", path.display());
    Ok(())
}
