//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Ingest Dispatch - hands files to a configured processor, one invocation per file
#[derive(Parser, Debug)]
#[command(
    name = "ingest-dispatch",
    author,
    version,
    about = "Blob ingestion dispatcher",
    long_about = "A local trigger host for the blob ingestion dispatcher.\n\n\
                  Reads each given file, builds a request context carrying the API key \n\
                  and file name, and hands the stream to the configured processor."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "INGEST_VERBOSE")]
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
        env = "INGEST_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Dispatch one or more files to the configured processor
    Dispatch(DispatchArgs),

    /// Validate configuration file without dispatching
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `dispatch` command
#[derive(Parser, Debug, Clone)]
pub struct DispatchArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(short, long, default_value = "ingest.toml", env = "INGEST_CONFIG")]
    pub config: PathBuf,

    /// Files to dispatch
    #[arg(required = true, num_args = 1..)]
    pub files: Vec<PathBuf>,

    /// Blob name to report instead of the file name (single file only)
    #[arg(long)]
    pub name: Option<String>,

    /// API key (overrides the variable named by dispatcher.api_key_env)
    #[arg(long)]
    pub api_key: Option<String>,

    /// Per-file deadline in milliseconds (0 = use configuration)
    #[arg(long, default_value = "0", env = "INGEST_TIMEOUT_MS")]
    pub timeout_ms: u64,

    /// Maximum number of files in flight
    #[arg(long, default_value = "4", env = "INGEST_CONCURRENCY")]
    pub concurrency: usize,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "INGEST_METRICS_PORT")]
    pub metrics_port: u16,

    /// Validate configuration and inputs, then exit without dispatching
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "ingest.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "ingest.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show processor parameters
    #[arg(long)]
    pub params: bool,
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

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}
