use anyhow::Result;
use clap::Parser;
use log::{debug, info};

mod cli;

use cli::Commands;
use cli::commands::{handle_check_command, handle_navigate_command, load_config};
use cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    // Log to file, truncated on each run
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open("page-transitions.log")?;
    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .init();

    let cli = Cli::parse();
    info!("Starting page-transitions");

    let config = load_config(cli.config.as_deref(), &cli.exclusions)?;
    debug!("{} external exclusion(s) active", config.interception.exclusions.len());

    match cli.command {
        Commands::Navigate(args) => handle_navigate_command(args, config).await,
        Commands::Check(args) => handle_check_command(args, config).await,
    }
}
