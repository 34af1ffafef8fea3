//! Daily generation aggregation.
//!
//! This module folds the database table into the summary figures and
//! client lists written back to the tracking sheet.

use crate::models::{AggregateReport, ClientEntry, RecordRow, Row, SummaryResult};
use tracing::debug;

/// Running totals for one group of records.
#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    count: usize,
    sum: f64,
}

impl Tally {
    fn add(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
    }

    fn average(&self) -> f64 {
        if self.count > 0 {
            self.sum / self.count as f64
        } else {
            0.0
        }
    }
}

/// Format a figure with exactly two decimals.
pub fn format_two_decimals(value: f64) -> String {
    format!("{:.2}", value)
}

/// Aggregate the database table for one date and area.
///
/// The first row is treated as a header and skipped. Rows shorter than the
/// record schema are ignored. A record counts when its date text equals
/// `target_date` exactly. The area comparison lower-cases the record's area
/// but uses `selected_area` as given, so a selected area containing capitals
/// never matches. An empty `selected_area` disables area matching.
///
/// `below_average` and `above_average` are returned empty.
pub fn aggregate(rows: &[Row], target_date: &str, selected_area: &str) -> AggregateReport {
    let mut total = Tally::default();
    let mut area = Tally::default();
    let mut area_matches = Vec::new();
    let mut cleaning_done = Vec::new();
    let mut skipped = 0usize;

    for row in rows.iter().skip(1) {
        let Some(record) = RecordRow::from_cells(row) else {
            skipped += 1;
            continue;
        };

        if record.date != target_date {
            continue;
        }

        total.add(record.unit_per_kw);

        if !selected_area.is_empty() && record.area == selected_area {
            area.add(record.unit_per_kw);
            area_matches.push(ClientEntry::new(record.client.clone(), record.unit_per_kw));
        }

        if record.is_cleaning_done() {
            cleaning_done.push(ClientEntry::new(record.client, record.unit_per_kw));
        }
    }

    if skipped > 0 {
        debug!("Skipped {} short rows", skipped);
    }
    debug!(
        "Aggregated {} records for {:?} ({} in area {:?})",
        total.count, target_date, area.count, selected_area
    );

    AggregateReport {
        summary: SummaryResult {
            count: total.count,
            average: format_two_decimals(total.average()),
            area_average: format_two_decimals(area.average()),
        },
        below_average: Vec::new(),
        above_average: Vec::new(),
        area_matches,
        cleaning_done,
    }
}
