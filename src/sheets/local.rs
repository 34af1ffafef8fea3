//! JSON-file workbook.
//!
//! A workbook snapshot stored as `{ "<sheet>": [[cell, ...], ...] }`. Reads
//! behave like the Sheets API: trailing empty cells and rows are dropped.

use super::a1::{CellRef, RangeRef};
use super::{SheetsError, TableReader, TableWriter};
use crate::models::{Cell, Row, Table};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

/// Sheets keyed by name.
pub type Sheets = BTreeMap<String, Table>;

/// A workbook held in memory, optionally backed by a JSON file.
#[derive(Debug)]
pub struct LocalWorkbook {
    path: Option<PathBuf>,
    sheets: Mutex<Sheets>,
}

impl LocalWorkbook {
    /// Build an in-memory workbook that is never saved.
    pub fn from_sheets(sheets: Sheets) -> Self {
        Self {
            path: None,
            sheets: Mutex::new(sheets),
        }
    }

    /// Load a workbook from a JSON file.
    pub fn open(path: &Path) -> Result<Self, SheetsError> {
        let content = std::fs::read_to_string(path)?;
        let sheets: Sheets = serde_json::from_str(&content)?;
        info!(
            "Loaded local workbook {} ({} sheets)",
            path.display(),
            sheets.len()
        );

        Ok(Self {
            path: Some(path.to_path_buf()),
            sheets: Mutex::new(sheets),
        })
    }

    /// Write the workbook back to its file. No-op for in-memory workbooks.
    pub fn save(&self) -> Result<(), SheetsError> {
        let Some(ref path) = self.path else {
            return Ok(());
        };

        let content = serde_json::to_string_pretty(&*self.lock())?;
        std::fs::write(path, content)?;
        debug!("Saved local workbook to {}", path.display());
        Ok(())
    }

    /// Snapshot of one sheet.
    #[cfg(test)]
    pub fn sheet(&self, name: &str) -> Option<Table> {
        self.lock().get(name).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, Sheets> {
        self.sheets.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn is_blank(cell: &Cell) -> bool {
    match cell {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

fn trim_row(mut row: Row) -> Row {
    while row.last().is_some_and(is_blank) {
        row.pop();
    }
    row
}

fn extract(table: &Table, range: &RangeRef) -> Table {
    let mut rows: Table = table
        .iter()
        .enumerate()
        .filter(|(idx, _)| range.contains_row(*idx))
        .map(|(_, row)| {
            let cells = row
                .iter()
                .enumerate()
                .filter(|(idx, _)| range.contains_col(*idx))
                .map(|(_, cell)| cell.clone())
                .collect();
            trim_row(cells)
        })
        .collect();

    while rows.last().is_some_and(Vec::is_empty) {
        rows.pop();
    }
    rows
}

#[async_trait]
impl TableReader for LocalWorkbook {
    async fn read_range(&self, sheet: &str, range: &str) -> Result<Table, SheetsError> {
        let range: RangeRef = range.parse()?;
        let sheets = self.lock();
        let table = sheets
            .get(sheet)
            .ok_or_else(|| SheetsError::UnknownSheet(sheet.to_string()))?;
        Ok(extract(table, &range))
    }
}

#[async_trait]
impl TableWriter for LocalWorkbook {
    async fn write_range(
        &self,
        sheet: &str,
        start_cell: &str,
        table: &Table,
    ) -> Result<(), SheetsError> {
        let start: CellRef = start_cell.parse()?;
        let mut sheets = self.lock();
        let target = sheets
            .get_mut(sheet)
            .ok_or_else(|| SheetsError::UnknownSheet(sheet.to_string()))?;

        for (i, row) in table.iter().enumerate() {
            let row_idx = start.row + i;
            if target.len() <= row_idx {
                target.resize_with(row_idx + 1, Vec::new);
            }

            let target_row = &mut target[row_idx];
            for (j, cell) in row.iter().enumerate() {
                let col_idx = start.col + j;
                if target_row.len() <= col_idx {
                    target_row.resize(col_idx + 1, Value::Null);
                }
                target_row[col_idx] = cell.clone();
            }
        }

        Ok(())
    }

    async fn flush(&self) -> Result<(), SheetsError> {
        self.save()
    }
}
