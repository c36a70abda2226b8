//! FX signal pipeline CLI.

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use fxsignal_config::load_config;
use fxsignal_monitor::setup_logging;
use std::path::Path;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = cli.log_level.as_str();

    match cli.command {
        Commands::Run(args) => {
            let app = load_config(&cli.config)
                .with_context(|| format!("Failed to load {}", cli.config.display()))?;
            let json = cli.json_logs || app.logging.format == "json";
            let _guard = setup_logging(level, json, app.logging.file.as_deref().map(Path::new))
                .context("Failed to initialize logging")?;
            cli::commands::run::run(args, app).await
        }
        Commands::Strategies => {
            let _guard = setup_logging(level, cli.json_logs, None)
                .context("Failed to initialize logging")?;
            cli::commands::strategies::run().await
        }
        Commands::ValidateConfig => {
            let _guard = setup_logging(level, cli.json_logs, None)
                .context("Failed to initialize logging")?;
            cli::commands::validate::run(&cli.config).await
        }
    }
}
