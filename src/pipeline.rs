//! Read → aggregate → write pipeline.
//!
//! Reads the filter cells and the database table from the workbook, runs the
//! aggregator and writes the five result tables back to the tracking sheet.

use crate::analysis::aggregate;
use crate::config::{Config, LayoutConfig, SummaryPlacement};
use crate::models::{client_table, AggregateReport, Table};
use crate::sheets::{SheetsError, Workbook};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Pipeline failures.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Nothing to aggregate. Reported to the user, nothing is written.
    #[error("{0}")]
    InsufficientData(String),

    #[error(transparent)]
    Sheets(#[from] SheetsError),
}

/// Where the pipeline reads and writes.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub tracking_sheet: String,
    pub database_sheet: String,
    pub database_range: String,
    pub date_cell: String,
    pub area_cell: String,
    pub layout: LayoutConfig,
    pub batch_writes: bool,
}

impl From<&Config> for PipelineSettings {
    fn from(config: &Config) -> Self {
        Self {
            tracking_sheet: config.sheets.tracking_sheet.clone(),
            database_sheet: config.sheets.database_sheet.clone(),
            database_range: config.sheets.database_range.clone(),
            date_cell: config.sheets.date_cell.clone(),
            area_cell: config.sheets.area_cell.clone(),
            layout: config.layout.clone(),
            batch_writes: config.sheets.batch_writes,
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

/// Whether results are written back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Write,
    DryRun,
}

/// Result of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutcome {
    pub target_date: String,
    pub selected_area: String,
    /// Rows read from the database sheet, header included.
    pub rows_read: usize,
    pub report: AggregateReport,
    /// Whether the results were written to the workbook.
    pub written: bool,
}

/// The tables to write, each paired with its start cell, in write order.
pub fn output_tables(report: &AggregateReport, layout: &LayoutConfig) -> Vec<(String, Table)> {
    let mut tables = Vec::with_capacity(7);

    let summary = report.summary.to_table();
    match &layout.summary {
        SummaryPlacement::Block { start } => tables.push((start.clone(), summary)),
        SummaryPlacement::Split {
            count,
            average,
            area_average,
        } => {
            for (cell, row) in [count, average, area_average].into_iter().zip(summary) {
                tables.push((cell.clone(), vec![row]));
            }
        }
    }

    tables.push((layout.below_average.clone(), client_table(&report.below_average)));
    tables.push((layout.above_average.clone(), client_table(&report.above_average)));
    tables.push((layout.area_clients.clone(), client_table(&report.area_matches)));
    tables.push((layout.cleaning_done.clone(), client_table(&report.cleaning_done)));

    tables
}

/// Run the pipeline once against a workbook.
pub async fn run_pipeline(
    workbook: &dyn Workbook,
    settings: &PipelineSettings,
    mode: RunMode,
) -> Result<PipelineOutcome, PipelineError> {
    let target_date = workbook
        .read_cell(&settings.tracking_sheet, &settings.date_cell)
        .await?;
    let selected_area = workbook
        .read_cell(&settings.tracking_sheet, &settings.area_cell)
        .await?;
    info!(
        "Target date {:?}, selected area {:?}",
        target_date, selected_area
    );

    let rows = workbook
        .read_range(&settings.database_sheet, &settings.database_range)
        .await?;
    debug!("Read {} rows from {}", rows.len(), settings.database_sheet);

    if rows.len() < 2 {
        warn!("Database sheet {} has no records", settings.database_sheet);
        return Err(PipelineError::InsufficientData(
            "No data found in Database.".to_string(),
        ));
    }
    if target_date.is_empty() {
        warn!("Target date cell {} is empty", settings.date_cell);
        return Err(PipelineError::InsufficientData(format!(
            "No target date set in {}!{}.",
            settings.tracking_sheet, settings.date_cell
        )));
    }

    let report = aggregate(&rows, &target_date, &selected_area);
    info!(
        "{} records on {}, average {}, area average {}",
        report.summary.count, target_date, report.summary.average, report.summary.area_average
    );

    let written = match mode {
        RunMode::DryRun => {
            info!("Dry run, nothing written");
            false
        }
        RunMode::Write => {
            write_outputs(workbook, settings, &report).await?;
            true
        }
    };

    Ok(PipelineOutcome {
        target_date,
        selected_area,
        rows_read: rows.len(),
        report,
        written,
    })
}

async fn write_outputs(
    workbook: &dyn Workbook,
    settings: &PipelineSettings,
    report: &AggregateReport,
) -> Result<(), SheetsError> {
    let tables = output_tables(report, &settings.layout);
    let sheet = &settings.tracking_sheet;

    if settings.batch_writes {
        debug!("Writing {} tables in one batch", tables.len());
        workbook.write_ranges(sheet, &tables).await?;
    } else {
        for (start_cell, table) in &tables {
            debug!("Writing {} rows at {}", table.len(), start_cell);
            workbook.write_range(sheet, start_cell, table).await?;
        }
    }

    workbook.flush().await?;
    info!("Wrote {} tables to {}", tables.len(), sheet);
    Ok(())
}
