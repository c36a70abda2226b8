//! Validate configuration command.

use anyhow::{Context, Result};
use fxsignal_config::load_config;
use std::path::Path;

pub async fn run(config_path: &Path) -> Result<()> {
    println!("Validating configuration: {:?}", config_path);

    let config = match load_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            println!("Configuration error: {}", e);
            return Err(e.into());
        }
    };

    println!("Configuration is valid!");
    println!();
    println!("App: {}", config.app.name);
    println!("Environment: {}", config.app.environment);
    println!("Instruments: {}", config.instruments().join(", "));
    println!("Accounts: {}", config.risk.accounts.len());
    for strategy in &config.strategies {
        println!(
            "Strategy: {} ({}) on {} via {}",
            strategy.id(),
            strategy.kind,
            strategy.instruments.join(", "),
            strategy.account
        );
    }
    println!();
    println!("Effective settings:");
    println!(
        "{}",
        serde_json::to_string_pretty(&config).context("Failed to render configuration")?
    );

    Ok(())
}
