//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.gentrack.toml` files.

use crate::sheets::a1::{validate_cell, RangeRef};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file name.
pub const CONFIG_FILE: &str = ".gentrack.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Spreadsheet location and input cells.
    #[serde(default)]
    pub sheets: SheetsConfig,

    /// Where results are written.
    #[serde(default)]
    pub layout: LayoutConfig,

    /// Google API credentials.
    #[serde(default)]
    pub auth: AuthConfig,

    /// HTTP trigger settings.
    #[serde(default)]
    pub server: ServerConfig,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

/// Spreadsheet settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetsConfig {
    /// Spreadsheet ID (the long token in the sheet URL).
    #[serde(default)]
    pub spreadsheet_id: String,

    /// Sheets API base URL.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Sheet holding the filter cells and receiving the results.
    #[serde(default = "default_tracking_sheet")]
    pub tracking_sheet: String,

    /// Sheet holding the records.
    #[serde(default = "default_database_sheet")]
    pub database_sheet: String,

    /// Range of the records, header row included.
    #[serde(default = "default_database_range")]
    pub database_range: String,

    /// Cell with the target date.
    #[serde(default = "default_date_cell")]
    pub date_cell: String,

    /// Cell with the selected area.
    #[serde(default = "default_area_cell")]
    pub area_cell: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Send all results in one batch request instead of one request per table.
    #[serde(default)]
    pub batch_writes: bool,
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            spreadsheet_id: String::new(),
            api_base_url: default_api_base_url(),
            tracking_sheet: default_tracking_sheet(),
            database_sheet: default_database_sheet(),
            database_range: default_database_range(),
            date_cell: default_date_cell(),
            area_cell: default_area_cell(),
            timeout_seconds: default_timeout(),
            batch_writes: false,
        }
    }
}

fn default_api_base_url() -> String {
    "https://sheets.googleapis.com".to_string()
}

fn default_tracking_sheet() -> String {
    "Generation Tracking".to_string()
}

fn default_database_sheet() -> String {
    "Database".to_string()
}

fn default_database_range() -> String {
    "A1:Z".to_string()
}

fn default_date_cell() -> String {
    "A1".to_string()
}

fn default_area_cell() -> String {
    "G1".to_string()
}

fn default_timeout() -> u64 {
    30
}

/// Placement of the count / average / area average figures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum SummaryPlacement {
    /// One column starting at `start`: count, average, area average.
    Block { start: String },
    /// Each figure in its own cell.
    Split {
        count: String,
        average: String,
        area_average: String,
    },
}

/// Block at D1 by default: count D1, average D2, area average D3. The
/// D1/D2/H1 layout is `Split`.
impl Default for SummaryPlacement {
    fn default() -> Self {
        SummaryPlacement::Block {
            start: "D1".to_string(),
        }
    }
}

impl SummaryPlacement {
    fn cells(&self) -> Vec<&str> {
        match self {
            SummaryPlacement::Block { start } => vec![start.as_str()],
            SummaryPlacement::Split {
                count,
                average,
                area_average,
            } => vec![count.as_str(), average.as_str(), area_average.as_str()],
        }
    }
}

/// Output cells on the tracking sheet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    #[serde(default)]
    pub summary: SummaryPlacement,

    #[serde(default = "default_below_average")]
    pub below_average: String,

    #[serde(default = "default_above_average")]
    pub above_average: String,

    #[serde(default = "default_area_clients")]
    pub area_clients: String,

    #[serde(default = "default_cleaning_done")]
    pub cleaning_done: String,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            summary: SummaryPlacement::default(),
            below_average: default_below_average(),
            above_average: default_above_average(),
            area_clients: default_area_clients(),
            cleaning_done: default_cleaning_done(),
        }
    }
}

fn default_below_average() -> String {
    "A5".to_string()
}

fn default_above_average() -> String {
    "A42".to_string()
}

fn default_area_clients() -> String {
    "G3".to_string()
}

fn default_cleaning_done() -> String {
    "J3".to_string()
}

/// Google API credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Env var holding the service account key JSON.
    #[serde(default = "default_credentials_env")]
    pub credentials_env: String,

    /// Service account key file. Takes precedence over `credentials_env`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials_file: Option<PathBuf>,

    /// Env var holding a ready bearer token. Takes precedence over the key.
    #[serde(default = "default_access_token_env")]
    pub access_token_env: String,

    /// OAuth scope requested for service account tokens.
    #[serde(default = "default_scope")]
    pub scope: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            credentials_env: default_credentials_env(),
            credentials_file: None,
            access_token_env: default_access_token_env(),
            scope: default_scope(),
        }
    }
}

fn default_credentials_env() -> String {
    "GOOGLE_APPLICATION_CREDENTIALS_JSON".to_string()
}

fn default_access_token_env() -> String {
    "GOOGLE_SHEETS_ACCESS_TOKEN".to_string()
}

fn default_scope() -> String {
    "https://www.googleapis.com/auth/spreadsheets".to_string()
}

/// HTTP trigger settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl ServerConfig {
    /// `host:port` for binding.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref id) = args.spreadsheet_id {
            self.sheets.spreadsheet_id = id.clone();
        }
        if args.batch_writes {
            self.sheets.batch_writes = true;
        }
        if let Some(timeout) = args.timeout {
            self.sheets.timeout_seconds = timeout;
        }
        if let Some(ref host) = args.host {
            self.server.host = host.clone();
        }
        if let Some(port) = args.port {
            self.server.port = port;
        }
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Check cell references before any request is made.
    pub fn validate(&self) -> Result<()> {
        let sheets = &self.sheets;
        for cell in [&sheets.date_cell, &sheets.area_cell] {
            validate_cell(cell).with_context(|| format!("Invalid input cell '{}'", cell))?;
        }
        sheets
            .database_range
            .parse::<RangeRef>()
            .with_context(|| format!("Invalid database range '{}'", sheets.database_range))?;

        let layout = &self.layout;
        let mut cells = layout.summary.cells();
        cells.extend([
            layout.below_average.as_str(),
            layout.above_average.as_str(),
            layout.area_clients.as_str(),
            layout.cleaning_done.as_str(),
        ]);
        for cell in cells {
            validate_cell(cell).with_context(|| format!("Invalid output cell '{}'", cell))?;
        }

        Ok(())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
