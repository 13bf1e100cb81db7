use clap::Parser;

mod cli;
mod commands;
mod logging;
mod progress;
mod prompt;
mod ui;

#[tokio::main]
async fn main() {
    let code = match run().await {
        Ok(code) => code,
        Err(error) => {
            eprintln!("upr error: {error:#}");
            1
        }
    };
    std::process::exit(code);
}

async fn run() -> anyhow::Result<i32> {
    let cli = cli::Cli::parse();
    let config = upr_config::UprConfig::load_with_dotenv(cli.config.as_deref())?;
    logging::init(cli.quiet, cli.verbose, std::path::Path::new(&config.general.log_dir))?;
    ui::init(cli.quiet);

    match &cli.command {
        cli::Commands::Db(args) => commands::db::handle(args, &cli, &config).await,
        cli::Commands::Nginx(args) => commands::nginx::handle(args, &cli, &config).await,
        cli::Commands::Drive(args) => commands::drive::handle(args, &cli, &config).await,
    }
}
