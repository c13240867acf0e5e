// src/cli.rs

//! Command-line arguments (`clap` derive).

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::default_config_path;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "tupledag",
    version,
    about = "Replay tuple lifecycle requests against an in-memory ledger.",
    long_about = None
)]
pub struct CliArgs {
    /// Config file with the seeded assets and the `[[step]]` requests.
    #[arg(long, value_name = "PATH", default_value_os_t = default_config_path())]
    pub config: PathBuf,

    /// Overrides `TUPLEDAG_LOG` for every target.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Validate the config and list what would be replayed.
    #[arg(long)]
    pub dry_run: bool,

    /// Stop at the first rejected step and exit with an error.
    #[arg(long)]
    pub stop_on_error: bool,
}

#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

pub fn parse() -> CliArgs {
    CliArgs::parse()
}
