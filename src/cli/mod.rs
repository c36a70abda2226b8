//! CLI definitions.

pub mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "fxsignal")]
#[command(author, version, about = "Quality-gated FX signal pipeline with adaptive risk governance")]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config/default.toml", env = "FXSIGNAL_CONFIG")]
    pub config: PathBuf,

    /// Log level
    #[arg(short, long, default_value = "info")]
    pub log_level: LogLevel,

    /// Enable JSON log format
    #[arg(long)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Replay recorded prices through the pipeline against the paper gateway
    Run(RunArgs),
    /// List available strategy kinds
    Strategies,
    /// Validate configuration and print the effective settings
    ValidateConfig,
}

#[derive(clap::Args)]
pub struct RunArgs {
    /// Price CSV (timestamp,instrument,bid,ask[,volume])
    #[arg(short, long)]
    pub data: PathBuf,

    /// Append signal, trade and adaptation records to this JSONL file
    #[arg(short, long)]
    pub journal: Option<PathBuf>,

    /// Run this many governance cycles on data time instead of the
    /// wall-clock scheduler
    #[arg(long)]
    pub cycles: Option<usize>,
}
