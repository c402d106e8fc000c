//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// mqueue - publish events to queues, buses and streams
#[derive(Parser, Debug)]
#[command(
    name = "mqueue",
    author,
    version,
    about = "Publish events through a configured handler tree",
    long_about = "Publishes JSON events through the handler tree described by a publisher\n\
                  configuration file. Handlers run in sequence or fan out concurrently,\n\
                  and every handler failure is reported."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "MQUEUE_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "compact",
        global = true,
        env = "MQUEUE_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Publish one or more events
    Publish(PublishArgs),

    /// Validate configuration file without publishing
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `publish` command
#[derive(Parser, Debug, Clone)]
pub struct PublishArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "publisher.toml",
        env = "MQUEUE_CONFIG"
    )]
    pub config: PathBuf,

    /// Event payload as JSON
    #[arg(short, long, default_value = "{}")]
    pub data: String,

    /// Event name stamped on the record
    #[arg(short, long)]
    pub event: Option<String>,

    /// Number of records to publish
    #[arg(long, default_value = "1")]
    pub count: u64,

    /// Per-publish deadline in milliseconds (0 = no deadline)
    #[arg(long, default_value = "0", env = "MQUEUE_TIMEOUT_MS")]
    pub timeout_ms: u64,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "MQUEUE_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "publisher.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "publisher.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    Pretty,
    /// Compact single-line format
    #[default]
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}
