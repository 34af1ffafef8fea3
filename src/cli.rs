//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

/// Gentrack - daily generation tracking for Google Sheets
///
/// Reads the target date and area from the tracking sheet, aggregates the
/// database sheet and writes counts, averages and client lists back.
///
/// Examples:
///   gentrack --spreadsheet-id 1AbC...
///   gentrack --local workbook.json --dry-run --format json
///   gentrack --serve --port 8080
///   gentrack --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Spreadsheet ID to process
    ///
    /// Overrides sheets.spreadsheet_id from the config file.
    #[arg(short, long, value_name = "ID", env = "GENTRACK_SPREADSHEET_ID")]
    pub spreadsheet_id: Option<String>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .gentrack.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Local JSON workbook to use instead of the Sheets API
    #[arg(long, value_name = "FILE")]
    pub local: Option<PathBuf>,

    /// Start the HTTP trigger instead of running once
    #[arg(long)]
    pub serve: bool,

    /// Address to bind in --serve mode
    #[arg(long, value_name = "HOST")]
    pub host: Option<String>,

    /// Port to bind in --serve mode
    #[arg(long, value_name = "PORT", env = "PORT")]
    pub port: Option<u16>,

    /// Read and aggregate without writing results back
    #[arg(long, conflicts_with = "serve")]
    pub dry_run: bool,

    /// Write all results in a single batch request
    #[arg(long)]
    pub batch_writes: bool,

    /// Request timeout in seconds for the Sheets API
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Output format for the console report (text, json)
    #[arg(long, default_value = "text", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .gentrack.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the console report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Plain text (default)
    #[default]
    Text,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref id) = self.spreadsheet_id {
            if id.trim().is_empty() {
                return Err("Spreadsheet ID must not be empty".to_string());
            }
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        if let Some(ref local_path) = self.local {
            if !local_path.is_file() {
                return Err(format!(
                    "Local workbook does not exist: {}",
                    local_path.display()
                ));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self, config_verbose: bool) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose || config_verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
