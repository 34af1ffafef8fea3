//! Gentrack - daily generation tracking for Google Sheets
//!
//! Reads the target date and area from the tracking sheet, aggregates the
//! database sheet and writes the summary and client lists back. Runs once
//! from the command line or behind an HTTP trigger (`--serve`).
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (config, credentials, Sheets API, etc.)
//!   3 - Nothing to aggregate (empty database or no target date)

mod analysis;
mod cli;
mod config;
mod models;
mod pipeline;
mod report;
mod server;
mod sheets;

use anyhow::{bail, Context, Result};
use cli::{Args, OutputFormat};
use config::{Config, CONFIG_FILE};
use pipeline::{run_pipeline, PipelineError, PipelineSettings, RunMode};
use sheets::{LocalWorkbook, SheetsClient, Workbook};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

/// Exit code when the workbook holds nothing to aggregate.
const EXIT_NO_DATA: i32 = 3;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };

    init_logging(&args, &config);

    info!("Gentrack v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args, config).await {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(e) => {
            error!("Run failed: {:#}", e);
            eprintln!("\nError: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .gentrack.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "{} already exists. Remove it first or edit it manually.",
            CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("Created {} with default settings.", CONFIG_FILE);
    println!("   Set sheets.spreadsheet_id and the credentials before running.");
    Ok(())
}

/// Initialize logging. `RUST_LOG` wins over the verbosity flags.
fn init_logging(args: &Args, config: &Config) {
    let level = args.log_level(config.general.verbose);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();
}

/// Load configuration from file or defaults, then apply CLI overrides.
fn load_config(args: &Args) -> Result<Config> {
    let mut config = match args.config {
        Some(ref config_path) => Config::load(config_path)?,
        None => Config::load_default()?.unwrap_or_default(),
    };

    config.merge_with_args(args);
    config.validate()?;
    Ok(config)
}

/// Open the workbook the run works against.
fn open_workbook(args: &Args, config: &Config) -> Result<Arc<dyn Workbook>> {
    if let Some(ref local) = args.local {
        info!("Using local workbook: {}", local.display());
        let workbook = LocalWorkbook::open(local)
            .with_context(|| format!("Failed to open {}", local.display()))?;
        return Ok(Arc::new(workbook));
    }

    if config.sheets.spreadsheet_id.trim().is_empty() {
        bail!(
            "No spreadsheet ID. Pass --spreadsheet-id, set GENTRACK_SPREADSHEET_ID or sheets.spreadsheet_id in {}",
            CONFIG_FILE
        );
    }

    info!("Using spreadsheet {}", config.sheets.spreadsheet_id);
    let client = SheetsClient::new(&config.sheets, &config.auth)
        .context("Failed to set up the Sheets client")?;
    Ok(Arc::new(client))
}

/// Run once or serve. Returns the exit code.
async fn run(args: Args, config: Config) -> Result<i32> {
    let workbook = open_workbook(&args, &config)?;
    let settings = PipelineSettings::from(&config);

    if args.serve {
        let state = server::AppState {
            workbook,
            settings: Arc::new(settings),
        };
        server::serve(state, &config.server.bind_addr()).await?;
        return Ok(0);
    }

    let mode = if args.dry_run {
        RunMode::DryRun
    } else {
        RunMode::Write
    };

    let start_time = Instant::now();
    let outcome = match run_pipeline(workbook.as_ref(), &settings, mode).await {
        Ok(outcome) => outcome,
        Err(PipelineError::InsufficientData(reason)) => {
            warn!("Nothing to aggregate: {}", reason);
            println!("{}", reason);
            return Ok(EXIT_NO_DATA);
        }
        Err(e) => return Err(e.into()),
    };
    debug!("Run took {:.2}s", start_time.elapsed().as_secs_f64());

    let output = match args.format {
        OutputFormat::Text => report::generate_text_report(&outcome),
        OutputFormat::Json => report::generate_json_report(&outcome)?,
    };
    if !args.quiet || args.format == OutputFormat::Json {
        println!("{}", output);
    }

    Ok(0)
}
