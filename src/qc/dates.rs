//! Date keys of QC rows.

use crate::constants::datetime::{ISO_DATE_FORMAT, SORT_KEY_FORMAT};
use crate::error::{QcError, Result};
use chrono::NaiveDate;

/// Parse a date cell with the configured format, falling back to ISO for
/// columns that were already typed as dates.
pub fn parse_date(row: usize, value: &str, format: &str) -> Result<NaiveDate> {
    let trimmed = value.trim();
    NaiveDate::parse_from_str(trimmed, format)
        .or_else(|_| NaiveDate::parse_from_str(trimmed, ISO_DATE_FORMAT))
        .map_err(|_| QcError::MalformedDate {
            row,
            value: value.to_string(),
        })
}

/// Chronologically sortable `YYYY.MM.DD` key
pub fn sort_key(date: NaiveDate) -> String {
    date.format(SORT_KEY_FORMAT).to_string()
}
