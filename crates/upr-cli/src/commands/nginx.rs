//! `upr nginx` - repair the local nginx installation.

use std::path::Path;

use chrono::Utc;
use upr_config::UprConfig;
use upr_core::artifacts::timestamped_path;
use upr_core::prompt::PolicyPrompt;
use upr_exec::SystemRunner;
use upr_nginx::NginxRepair;

use crate::cli::{Cli, NginxArgs};
use crate::prompt::TerminalPrompt;
use crate::ui;

pub async fn handle(args: &NginxArgs, cli: &Cli, config: &UprConfig) -> anyhow::Result<i32> {
    let runner = SystemRunner;
    let prompt = PolicyPrompt::new(cli.policy(config.repair.confirm), TerminalPrompt::new());

    let mut repair_config = config.repair.clone();
    if !args.prefixes.is_empty() {
        repair_config.nginx_prefixes = args.prefixes.clone();
    }

    let backup_dir = Path::new(&config.general.log_dir).join("backups");
    let report = NginxRepair::new(&runner, &prompt, &repair_config, backup_dir)
        .run()
        .await?;

    let summary = report.summary();
    let path = timestamped_path(Path::new(&config.general.report_dir), "nginx-repair", "txt", Utc::now());
    summary.write_to(&path)?;
    println!("{}", summary.render());
    println!("report written to {}", path.display());

    if report.config_ok {
        println!("{}", ui::ok("nginx configuration test passes"));
    } else {
        println!("{}", ui::fail("nginx configuration test still failing"));
    }
    Ok(report.exit_code())
}
