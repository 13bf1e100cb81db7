//! `upr db` - database migration.

use std::path::Path;

use chrono::Utc;
use upr_config::UprConfig;
use upr_core::artifacts::timestamped_path;
use upr_core::prompt::{PolicyPrompt, Prompt};
use upr_db::{DbEndpoint, DbMigrator, MigrationScope};
use upr_exec::SystemRunner;

use crate::cli::{Cli, DbArgs};
use crate::progress::Progress;
use crate::prompt::TerminalPrompt;
use crate::ui;

pub async fn handle(args: &DbArgs, cli: &Cli, config: &UprConfig) -> anyhow::Result<i32> {
    let terminal = TerminalPrompt::new();
    let source_password = password_for(&terminal, args.source_password.as_deref(), &args.source_user, &args.source_host)?;
    let dest_password = password_for(&terminal, args.dest_password.as_deref(), &args.dest_user, &args.dest_host)?;

    let runner = SystemRunner;
    let prompt = PolicyPrompt::new(cli.policy(config.database.confirm), terminal);
    let source = DbEndpoint::new(&args.source_host, args.source_port, &args.source_user, source_password);
    let dest = DbEndpoint::new(&args.dest_host, args.dest_port, &args.dest_user, dest_password);

    let scope = args
        .database
        .clone()
        .map_or(MigrationScope::All, MigrationScope::One);

    let spinner = Progress::spinner("migrating databases");
    let summary = DbMigrator::new(&runner, &prompt, &config.database, source, dest)
        .run(scope)
        .await?;
    spinner.finish("database migration finished");

    let report = summary.report();
    let path = timestamped_path(Path::new(&config.general.report_dir), "db-migration", "txt", Utc::now());
    report.write_to(&path)?;
    println!("{}", report.render());
    println!("report written to {}", path.display());

    let code = summary.exit_code();
    if code == 0 {
        println!("{}", ui::ok("all databases migrated"));
    } else {
        println!("{}", ui::fail(&format!("{code} database(s) failed")));
    }
    Ok(code)
}

fn password_for(
    terminal: &TerminalPrompt,
    given: Option<&str>,
    user: &str,
    host: &str,
) -> anyhow::Result<String> {
    match given {
        Some(password) => Ok(password.to_string()),
        None => Ok(terminal.password(&format!("password for {user}@{host}: "))?),
    }
}
