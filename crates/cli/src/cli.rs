//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Label Syncer - merge labeled record streams into synchronized tuples
#[derive(Parser, Debug)]
#[command(
    name = "label-syncer",
    author,
    version,
    about = "Labeled stream synchronizer",
    long_about = "Reads newline-delimited JSON records, labels each one by a configured field,\n\
                  and merges the labeled streams into tuples holding one value per label.\n\n\
                  Tuples are written to stdout as JSON; logs and the run summary go to stderr."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "LABEL_SYNCER_VERBOSE")]
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
        env = "LABEL_SYNCER_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Synchronize a stream of labeled records
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
    #[arg(
        short,
        long,
        default_value = "syncer.toml",
        env = "LABEL_SYNCER_CONFIG"
    )]
    pub config: PathBuf,

    /// Input file of newline-delimited JSON records ("-" = stdin)
    #[arg(short, long, default_value = "-", env = "LABEL_SYNCER_INPUT")]
    pub input: String,

    /// Override output.max_tuples from configuration (0 = unlimited)
    #[arg(long, env = "LABEL_SYNCER_MAX_TUPLES")]
    pub max_tuples: Option<u64>,

    /// Override sync.back_pressure from configuration (0 = latest-value mode)
    #[arg(long, env = "LABEL_SYNCER_BACK_PRESSURE")]
    pub back_pressure: Option<usize>,

    /// Validate configuration and exit without reading input
    #[arg(long)]
    pub dry_run: bool,

    /// Channel buffer size between the reader and the synchronizer
    #[arg(long, default_value = "1024", env = "LABEL_SYNCER_BUFFER_SIZE")]
    pub buffer_size: usize,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "LABEL_SYNCER_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "syncer.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "syncer.toml")]
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
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => observability::LogFormat::Json,
            LogFormat::Pretty => observability::LogFormat::Pretty,
            LogFormat::Compact => observability::LogFormat::Compact,
        }
    }
}
