//! Data models for the generation tracker.
//!
//! This module contains the record schema used to read rows from the
//! database sheet and the result types produced by the aggregator.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single spreadsheet cell. Cells are dynamically typed (text, number,
/// boolean or empty), exactly as the Sheets API returns them.
pub type Cell = Value;

/// One row of cells.
pub type Row = Vec<Cell>;

/// An ordered sequence of rows. The first row of a database table is a header.
pub type Table = Vec<Row>;

/// Cleaning status value that puts a client on the cleaning-done list.
pub const CLEANING_DONE: &str = "Cleaning done";

/// Column positions of the database sheet.
pub mod columns {
    pub const CLIENT: usize = 0;
    pub const DATE: usize = 1;
    pub const UNIT_PER_KW: usize = 10;
    pub const PROBLEM: usize = 11;
    pub const CLEANING_STATUS: usize = 12;
    pub const AREA: usize = 13;

    /// Rows with fewer cells than this are not records.
    pub const MIN_FIELDS: usize = 14;
}

/// Render a cell the way it reads in the sheet.
pub fn cell_text(cell: &Cell) -> String {
    match cell {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(true) => "TRUE".to_string(),
        Value::Bool(false) => "FALSE".to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// Parse a numeric cell, falling back to `0.0` for anything unreadable.
///
/// Text is parsed locale-invariantly: `.` is the decimal separator and `,`
/// groups digits in the integer part only. Surrounding whitespace, a leading
/// or trailing sign, parentheses for negatives (without a sign inside) and
/// exponents are accepted. Currency symbols are not. `NaN` and `Infinity`
/// are read as `0.0` rather than carried into the averages.
pub fn parse_number(cell: &Cell) -> f64 {
    let parsed = match cell {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_number_text(s),
        _ => None,
    };

    match parsed {
        Some(v) if v.is_finite() => v,
        _ => 0.0,
    }
}

fn parse_number_text(s: &str) -> Option<f64> {
    let s = s.trim();
    let (s, parenthesized) = match s.strip_prefix('(').and_then(|r| r.strip_suffix(')')) {
        Some(inner) => (inner.trim(), true),
        None => (s, false),
    };

    let (s, sign) = split_sign(s);
    if parenthesized && sign.is_some() {
        return None;
    }
    let negative = parenthesized || sign == Some('-');

    if s.is_empty() || s.starts_with(['+', '-', ',']) {
        return None;
    }
    if !s
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | 'e' | 'E' | '+' | '-'))
    {
        return None;
    }

    // Group separators only before the decimal point or exponent.
    let integer_end = s.find(['.', 'e', 'E']).unwrap_or(s.len());
    if s[integer_end..].contains(',') {
        return None;
    }

    let value: f64 = s.replace(',', "").parse().ok()?;
    Some(if negative { -value } else { value })
}

/// Strip one leading or trailing sign.
fn split_sign(s: &str) -> (&str, Option<char>) {
    for sign in ['-', '+'] {
        if let Some(rest) = s.strip_prefix(sign) {
            return (rest.trim_start(), Some(sign));
        }
        if let Some(rest) = s.strip_suffix(sign) {
            return (rest.trim_end(), Some(sign));
        }
    }
    (s, None)
}

/// Named view of one database row.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordRow {
    /// Client name.
    pub client: String,
    /// Record date, kept as the raw sheet text.
    pub date: String,
    /// Generated units per installed kW.
    pub unit_per_kw: f64,
    /// Free-text problem description (not aggregated).
    pub problem: String,
    /// Cleaning status text.
    pub cleaning_status: String,
    /// Area, lower-cased.
    pub area: String,
}

impl RecordRow {
    /// Map a raw row onto the record schema.
    ///
    /// Returns `None` when the row has fewer than [`columns::MIN_FIELDS`] cells.
    pub fn from_cells(row: &[Cell]) -> Option<Self> {
        if row.len() < columns::MIN_FIELDS {
            return None;
        }

        let text = |idx: usize| row.get(idx).map(cell_text).unwrap_or_default();

        Some(Self {
            client: text(columns::CLIENT),
            date: text(columns::DATE),
            unit_per_kw: row.get(columns::UNIT_PER_KW).map(parse_number).unwrap_or(0.0),
            problem: text(columns::PROBLEM),
            cleaning_status: text(columns::CLEANING_STATUS),
            area: text(columns::AREA).to_lowercase(),
        })
    }

    /// Whether the cleaning for this record is finished.
    pub fn is_cleaning_done(&self) -> bool {
        self.cleaning_status == CLEANING_DONE
    }
}

/// A client listed in one of the output tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientEntry {
    /// Client name.
    pub name: String,
    /// Units per kW for the target date.
    pub unit_per_kw: f64,
}

impl ClientEntry {
    pub fn new(name: impl Into<String>, unit_per_kw: f64) -> Self {
        Self {
            name: name.into(),
            unit_per_kw,
        }
    }

    /// Sheet row `[name, value]`.
    pub fn to_row(&self) -> Row {
        vec![Value::from(self.name.clone()), Value::from(self.unit_per_kw)]
    }
}

/// Headline figures for the target date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryResult {
    /// Number of records on the target date.
    pub count: usize,
    /// Average units per kW, two decimals.
    pub average: String,
    /// Average units per kW inside the selected area, two decimals.
    pub area_average: String,
}

impl SummaryResult {
    /// The summary as a one-column block: count, average, area average.
    pub fn to_table(&self) -> Table {
        vec![
            vec![Value::from(self.count)],
            vec![Value::from(self.average.clone())],
            vec![Value::from(self.area_average.clone())],
        ]
    }
}

/// Everything the aggregator produces for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateReport {
    pub summary: SummaryResult,
    /// Clients under the daily average. Not populated yet.
    pub below_average: Vec<ClientEntry>,
    /// Clients over the daily average. Not populated yet.
    pub above_average: Vec<ClientEntry>,
    /// Records in the selected area.
    pub area_matches: Vec<ClientEntry>,
    /// Records whose cleaning is done.
    pub cleaning_done: Vec<ClientEntry>,
}

/// Convert a client list into sheet rows.
pub fn client_table(entries: &[ClientEntry]) -> Table {
    entries.iter().map(ClientEntry::to_row).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn full_row(cells: &[(usize, Value)]) -> Row {
        let mut row = vec![Value::from(""); columns::MIN_FIELDS];
        for (idx, value) in cells {
            row[*idx] = value.clone();
        }
        row
    }

    #[test]
    fn test_parse_number_plain() {
        assert_eq!(parse_number(&json!(5.5)), 5.5);
        assert_eq!(parse_number(&json!(3)), 3.0);
        assert_eq!(parse_number(&json!("4.25")), 4.25);
        assert_eq!(parse_number(&json!("  7 ")), 7.0);
    }

    #[test]
    fn test_parse_number_lenient_forms() {
        assert_eq!(parse_number(&json!("1,234.5")), 1234.5);
        assert_eq!(parse_number(&json!("12,345,678")), 12345678.0);
        assert_eq!(parse_number(&json!("(2.5)")), -2.5);
        assert_eq!(parse_number(&json!("2.5-")), -2.5);
        assert_eq!(parse_number(&json!("-3")), -3.0);
        assert_eq!(parse_number(&json!("+3")), 3.0);
        assert_eq!(parse_number(&json!("1e2")), 100.0);
        assert_eq!(parse_number(&json!("-1.5e-1")), -0.15);
    }

    #[test]
    fn test_parse_number_rejects_currency_symbols() {
        assert_eq!(parse_number(&json!("$10.00")), 0.0);
        assert_eq!(parse_number(&json!("$12")), 0.0);
        assert_eq!(parse_number(&json!("12$")), 0.0);
    }

    #[test]
    fn test_parse_number_group_separator_after_decimal_point() {
        assert_eq!(parse_number(&json!("1.2,3")), 0.0);
        assert_eq!(parse_number(&json!("1e1,0")), 0.0);
        assert_eq!(parse_number(&json!(",5")), 0.0);
    }

    #[test]
    fn test_parse_number_sign_inside_parentheses() {
        assert_eq!(parse_number(&json!("(-2)")), 0.0);
        assert_eq!(parse_number(&json!("(2-)")), 0.0);
        assert_eq!(parse_number(&json!("(+2)")), 0.0);
        assert_eq!(parse_number(&json!("-(2)")), 0.0);
    }

    #[test]
    fn test_parse_number_falls_back_to_zero() {
        assert_eq!(parse_number(&json!("")), 0.0);
        assert_eq!(parse_number(&json!("n/a")), 0.0);
        assert_eq!(parse_number(&json!("5,5 kW")), 0.0);
        assert_eq!(parse_number(&json!("NaN")), 0.0);
        assert_eq!(parse_number(&json!("Infinity")), 0.0);
        assert_eq!(parse_number(&json!("--1")), 0.0);
        assert_eq!(parse_number(&json!("-1-")), 0.0);
        assert_eq!(parse_number(&Value::Null), 0.0);
        assert_eq!(parse_number(&json!(true)), 0.0);
    }

    #[test]
    fn test_cell_text() {
        assert_eq!(cell_text(&json!("North")), "North");
        assert_eq!(cell_text(&json!(42)), "42");
        assert_eq!(cell_text(&json!(false)), "FALSE");
        assert_eq!(cell_text(&Value::Null), "");
    }

    #[test]
    fn test_record_row_mapping() {
        let row = full_row(&[
            (columns::CLIENT, json!("Alice")),
            (columns::DATE, json!("2024-01-01")),
            (columns::UNIT_PER_KW, json!("5.0")),
            (columns::PROBLEM, json!("Inverter trip")),
            (columns::CLEANING_STATUS, json!("Cleaning done")),
            (columns::AREA, json!("North")),
        ]);

        let record = RecordRow::from_cells(&row).unwrap();
        assert_eq!(record.client, "Alice");
        assert_eq!(record.date, "2024-01-01");
        assert_eq!(record.unit_per_kw, 5.0);
        assert_eq!(record.problem, "Inverter trip");
        assert_eq!(record.area, "north");
        assert!(record.is_cleaning_done());
    }

    #[test]
    fn test_record_row_requires_fourteen_fields() {
        let row = vec![Value::from("x"); columns::MIN_FIELDS - 1];
        assert!(RecordRow::from_cells(&row).is_none());
    }

    #[test]
    fn test_record_row_null_cells_default() {
        let row = vec![Value::Null; columns::MIN_FIELDS];
        let record = RecordRow::from_cells(&row).unwrap();
        assert_eq!(record.client, "");
        assert_eq!(record.unit_per_kw, 0.0);
        assert!(!record.is_cleaning_done());
    }

    #[test]
    fn test_summary_table_shape() {
        let summary = SummaryResult {
            count: 2,
            average: "6.00".to_string(),
            area_average: "7.00".to_string(),
        };
        assert_eq!(
            summary.to_table(),
            vec![vec![json!(2)], vec![json!("6.00")], vec![json!("7.00")]]
        );
    }

    #[test]
    fn test_client_table() {
        let table = client_table(&[ClientEntry::new("Bob", 7.0)]);
        assert_eq!(table, vec![vec![json!("Bob"), json!(7.0)]]);
    }
}
