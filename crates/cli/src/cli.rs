//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// jobq - distributed job-dispatch subsystem
#[derive(Parser, Debug)]
#[command(
    name = "jobq",
    author,
    version,
    about = "Distributed job-dispatch manager/worker",
    long_about = "A lightweight distributed job-dispatch subsystem.\n\n\
                  The manager accepts job submissions and fans them out to \n\
                  connected workers; workers execute the requested operation and \n\
                  report outcomes back over the notification channel."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "JOBQ_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "JOBQ_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the configured manager/worker roles
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(short, long, default_value = "config.toml", env = "JOBQ_CONFIG")]
    pub config: PathBuf,

    /// Override bind/connect host from configuration
    #[arg(long, env = "JOBQ_HOST")]
    pub host: Option<String>,

    /// Override fanout port from configuration
    #[arg(long, env = "JOBQ_PORT")]
    pub port: Option<u16>,

    /// Override notify port from configuration (0 = disable notify)
    #[arg(long, env = "JOBQ_NOTIFY_PORT")]
    pub notify_port: Option<u16>,

    /// Run in single-process applet mode (worker role disabled)
    #[arg(long)]
    pub applet: bool,

    /// Validate configuration and exit without starting roles
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "9600", env = "JOBQ_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}
