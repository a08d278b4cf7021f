//! Command-line interface definitions.
//!
//! Defines the `oddsync` CLI using `clap`: watching a topic, listing the
//! sports catalog, and validating configuration.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Resilient sportsbook odds synchronization
#[derive(Parser, Debug)]
#[command(name = "oddsync")]
#[command(version)]
pub struct Cli {
    /// JSON output for scripting
    #[arg(long, global = true)]
    pub json: bool,

    /// Decrease output verbosity
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Increase output verbosity
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Poll and stream one topic, printing best prices as they change
    Watch(WatchArgs),

    /// Print the sports catalog
    Sports(ConfigPathArg),

    /// Validate a configuration file
    CheckConfig(ConfigPathArg),
}

/// Shared argument for commands that only need a config path.
#[derive(Parser, Debug)]
pub struct ConfigPathArg {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,
}

/// Arguments for the `watch` subcommand.
#[derive(Parser, Debug)]
pub struct WatchArgs {
    /// Sport key (e.g. basketball_nba), `popular`, or `popular-games`
    pub topic: String,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Poll only; do not open the push feed
    #[arg(long)]
    pub no_push: bool,

    /// Override poll interval in seconds
    #[arg(long)]
    pub interval: Option<u64>,

    /// Stop after this many seconds
    #[arg(long)]
    pub duration: Option<u64>,

    /// Override log level (debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Use JSON log format instead of pretty
    #[arg(long)]
    pub json_logs: bool,
}
