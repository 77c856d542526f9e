//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use nowcal_core::TracingOutputFormat;

/// nowcal - Print the calendar events of the current hour
#[derive(Debug, Default, Parser)]
#[command(name = "nowcal")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Calendar to read (an email address, or "primary")
    #[arg(long, env = "NOWCAL_CALENDAR")]
    pub calendar: Option<String>,

    /// Google client-secret JSON file [default: credentials.json]
    #[arg(long, env = "NOWCAL_CREDENTIALS_FILE")]
    pub credentials_file: Option<PathBuf>,

    /// Where the OAuth token is cached [default: token.json]
    #[arg(long, env = "NOWCAL_TOKEN_FILE")]
    pub token_file: Option<PathBuf>,

    /// Run the interactive authorization even if a token is cached
    #[arg(long)]
    pub update: bool,

    /// Extra OAuth scope to request (can be repeated)
    #[arg(long, action = clap::ArgAction::Append)]
    pub scope: Vec<String>,

    /// Path to configuration file
    #[arg(long, short, env = "NOWCAL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Timeout in seconds for each HTTP request [default: 30]
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Maximum number of events to print [default: 10]
    #[arg(long)]
    pub max_results: Option<usize>,

    /// Enable debug output
    #[arg(long, short = 'v')]
    pub debug: bool,

    /// Format of log lines written to stderr
    #[arg(long, value_enum, default_value_t, env = "NOWCAL_LOG_FORMAT")]
    pub log_format: LogFormat,
}

/// Log line formats selectable on the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// One line per event
    #[default]
    Compact,
    /// Multi-line, human-readable
    Pretty,
    /// JSON lines
    Json,
}

impl From<LogFormat> for TracingOutputFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Compact => Self::Compact,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Json => Self::Json,
        }
    }
}
