//! Spreadsheet access.
//!
//! The pipeline talks to a workbook through [`TableReader`] and
//! [`TableWriter`]. Two implementations exist: the Google Sheets REST client
//! and a JSON-file workbook for offline runs and tests.

pub mod a1;
pub mod auth;
pub mod client;
pub mod local;

#[cfg(test)]
mod fake_api;

pub use client::SheetsClient;
pub use local::LocalWorkbook;

use crate::models::{cell_text, Table};
use async_trait::async_trait;
use thiserror::Error;

/// Errors raised by the spreadsheet layer.
#[derive(Debug, Error)]
pub enum SheetsError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Sheets API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Invalid credentials: {0}")]
    Credentials(String),

    #[error("Invalid cell reference: {0}")]
    InvalidReference(String),

    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),

    #[error("Sheet not found: {0}")]
    UnknownSheet(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Read access to a workbook.
#[async_trait]
pub trait TableReader: Send + Sync {
    /// Read the rows of a range. Missing data yields an empty table.
    async fn read_range(&self, sheet: &str, range: &str) -> Result<Table, SheetsError>;

    /// Read a single cell as text, `""` when empty.
    async fn read_cell(&self, sheet: &str, cell: &str) -> Result<String, SheetsError> {
        let table = self.read_range(sheet, cell).await?;
        Ok(table
            .first()
            .and_then(|row| row.first())
            .map(cell_text)
            .unwrap_or_default())
    }
}

/// Write access to a workbook.
#[async_trait]
pub trait TableWriter: Send + Sync {
    /// Write a table with its top-left corner at `start_cell`.
    async fn write_range(&self, sheet: &str, start_cell: &str, table: &Table)
        -> Result<(), SheetsError>;

    /// Write several tables. Implementations may send them in one request.
    async fn write_ranges(&self, sheet: &str, writes: &[(String, Table)]) -> Result<(), SheetsError> {
        for (start_cell, table) in writes {
            self.write_range(sheet, start_cell, table).await?;
        }
        Ok(())
    }

    /// Persist buffered writes, if the backend buffers any.
    async fn flush(&self) -> Result<(), SheetsError> {
        Ok(())
    }
}

/// A workbook that can be both read and written.
pub trait Workbook: TableReader + TableWriter {}

impl<T: TableReader + TableWriter + ?Sized> Workbook for T {}
