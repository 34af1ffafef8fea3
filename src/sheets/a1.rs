//! A1 notation helpers.
//!
//! Cell and range references such as `D1`, `A1:Z` or `G3`, and sheet
//! qualification (`'Generation Tracking'!D1`).

use super::SheetsError;
use std::fmt;
use std::str::FromStr;

/// Zero-based cell position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRef {
    pub row: usize,
    pub col: usize,
}

impl CellRef {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", column_letters(self.col), self.row + 1)
    }
}

impl FromStr for CellRef {
    type Err = SheetsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match split_reference(s)? {
            (col, Some(row)) => Ok(Self { row, col }),
            (_, None) => Err(SheetsError::InvalidReference(s.to_string())),
        }
    }
}

/// A rectangular range. Missing end bounds mean "to the end of the data".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeRef {
    pub start: CellRef,
    pub end_row: Option<usize>,
    pub end_col: Option<usize>,
}

impl RangeRef {
    pub fn contains_col(&self, col: usize) -> bool {
        col >= self.start.col && self.end_col.is_none_or(|end| col <= end)
    }

    pub fn contains_row(&self, row: usize) -> bool {
        row >= self.start.row && self.end_row.is_none_or(|end| row <= end)
    }
}

impl FromStr for RangeRef {
    type Err = SheetsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (first, second) = match s.split_once(':') {
            Some((a, b)) => (a, Some(b)),
            None => (s, None),
        };

        let (start_col, start_row) = split_reference(first)?;
        let start = CellRef::new(start_row.unwrap_or(0), start_col);

        let (end_row, end_col) = match second {
            Some(end) => {
                let (col, row) = split_reference(end)?;
                (row, Some(col))
            }
            // A single cell, or a whole column when the row is missing.
            None => (start_row, Some(start_col)),
        };

        if end_col.is_some_and(|c| c < start.col) || end_row.is_some_and(|r| r < start.row) {
            return Err(SheetsError::InvalidReference(s.to_string()));
        }

        Ok(Self {
            start,
            end_row,
            end_col,
        })
    }
}

/// Split `AB12` into a zero-based column and an optional zero-based row.
fn split_reference(s: &str) -> Result<(usize, Option<usize>), SheetsError> {
    let invalid = || SheetsError::InvalidReference(s.to_string());

    let s = s.trim();
    let digits_at = s.find(|c: char| c.is_ascii_digit()).unwrap_or(s.len());
    let (letters, digits) = s.split_at(digits_at);

    let col = column_index(letters).ok_or_else(invalid)?;
    let row = if digits.is_empty() {
        None
    } else {
        let n: usize = digits.parse().map_err(|_| invalid())?;
        if n == 0 {
            return Err(invalid());
        }
        Some(n - 1)
    };

    Ok((col, row))
}

/// Zero-based index of a column name (`A` → 0, `AA` → 26).
pub fn column_index(letters: &str) -> Option<usize> {
    if letters.is_empty() {
        return None;
    }

    letters.chars().try_fold(0usize, |acc, c| {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        let digit = (c.to_ascii_uppercase() as u8 - b'A') as usize + 1;
        acc.checked_mul(26)?.checked_add(digit)
    })
    .map(|n| n - 1)
}

/// Column name for a zero-based index (0 → `A`, 26 → `AA`).
pub fn column_letters(mut index: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push((b'A' + (index % 26) as u8) as char);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    letters.iter().rev().collect()
}

/// Prefix a reference with its quoted sheet name.
pub fn qualified(sheet: &str, reference: &str) -> String {
    format!("'{}'!{}", sheet.replace('\'', "''"), reference)
}

/// Check that a string is a valid single-cell reference.
pub fn validate_cell(reference: &str) -> Result<(), SheetsError> {
    reference.parse::<CellRef>().map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_index() {
        assert_eq!(column_index("A"), Some(0));
        assert_eq!(column_index("z"), Some(25));
        assert_eq!(column_index("AA"), Some(26));
        assert_eq!(column_index("AZ"), Some(51));
        assert_eq!(column_index(""), None);
        assert_eq!(column_index("A1"), None);
    }

    #[test]
    fn test_column_letters() {
        assert_eq!(column_letters(0), "A");
        assert_eq!(column_letters(9), "J");
        assert_eq!(column_letters(25), "Z");
        assert_eq!(column_letters(26), "AA");
        assert_eq!(column_letters(701), "ZZ");
        assert_eq!(column_letters(702), "AAA");
    }

    #[test]
    fn test_parse_cell() {
        assert_eq!("D1".parse::<CellRef>().unwrap(), CellRef::new(0, 3));
        assert_eq!("j3".parse::<CellRef>().unwrap(), CellRef::new(2, 9));
        assert_eq!("A42".parse::<CellRef>().unwrap().to_string(), "A42");
        assert!("D".parse::<CellRef>().is_err());
        assert!("D0".parse::<CellRef>().is_err());
        assert!("12".parse::<CellRef>().is_err());
    }

    #[test]
    fn test_parse_open_ended_range() {
        let range: RangeRef = "A1:Z".parse().unwrap();
        assert_eq!(range.start, CellRef::new(0, 0));
        assert_eq!(range.end_col, Some(25));
        assert_eq!(range.end_row, None);
        assert!(range.contains_row(10_000));
        assert!(!range.contains_col(26));
    }

    #[test]
    fn test_parse_single_cell_range() {
        let range: RangeRef = "G1".parse().unwrap();
        assert_eq!(range.start, CellRef::new(0, 6));
        assert_eq!(range.end_col, Some(6));
        assert_eq!(range.end_row, Some(0));
    }

    #[test]
    fn test_parse_reversed_range_fails() {
        assert!("C3:A1".parse::<RangeRef>().is_err());
    }

    #[test]
    fn test_qualified() {
        assert_eq!(qualified("Database", "A1:Z"), "'Database'!A1:Z");
        assert_eq!(qualified("Bob's", "D1"), "'Bob''s'!D1");
    }
}
