//! CSV loader for the MGA reference table
//!
//! The table is a semicolon-separated file in the Quebec locale: amounts look
//! like `57 400 $`, rates like `5,25 %`, and blank or `nan` cells mean the
//! value has to be derived. Columns are read by position.

use super::table::RawReferenceRow;
use crate::error::LoadError;
use csv::{ReaderBuilder, StringRecord};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Default path to the reference table
pub const DEFAULT_REFERENCE_PATH: &str = "data/reference/mga.csv";

/// Years outside this window are treated as unreadable
pub const YEAR_RANGE: std::ops::RangeInclusive<i32> = 1900..=2200;

/// Reference table shipped with the crate
const BUNDLED_REFERENCE_CSV: &str = include_str!("../../data/reference/mga.csv");

/// Parse a numeric cell, stripping spaces, `$` and `%`.
///
/// A decimal comma is accepted when the cell has no decimal point.
/// Returns `None` for blank, `nan` or otherwise unparseable cells.
pub fn clean_numeric(cell: &str) -> Option<f64> {
    let cleaned: String = cell
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '$' && *c != '%')
        .collect();

    if cleaned.is_empty() || cleaned.eq_ignore_ascii_case("nan") {
        return None;
    }

    let normalized = if cleaned.contains('.') {
        cleaned.replace(',', "")
    } else {
        cleaned.replacen(',', ".", 1)
    };

    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn cell(record: &StringRecord, index: usize) -> Option<f64> {
    record.get(index).and_then(clean_numeric)
}

fn parse_row(record: &StringRecord) -> Option<RawReferenceRow> {
    let year = cell(record, 0)?;
    if year.fract() != 0.0 || year < f64::from(*YEAR_RANGE.start()) || year > f64::from(*YEAR_RANGE.end()) {
        return None;
    }

    Some(RawReferenceRow {
        year: year as i32,
        ceiling_earnings: cell(record, 1),
        trailing5_avg_ceiling: cell(record, 2),
        trailing5_avg_monthly_ceiling: cell(record, 3),
        supplementary_ceiling: cell(record, 4),
        base_rate: cell(record, 5),
        exemption: cell(record, 6),
        supplementary_rate_v1: cell(record, 7),
        supplementary_rate_v2: cell(record, 8),
        unrounded_ceiling: cell(record, 9),
        introduction_fraction_v1: cell(record, 10),
    })
}

/// Load raw reference rows from any reader (file, string buffer, network stream)
pub fn load_reference_rows_from_reader<R: Read>(reader: R) -> Result<Vec<RawReferenceRow>, LoadError> {
    let mut csv_reader = ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut rows = Vec::new();

    for (index, result) in csv_reader.records().enumerate() {
        let record = result?;
        match parse_row(&record) {
            Some(row) => rows.push(row),
            None => log::warn!(
                "skipping reference row {}: unreadable or out-of-range year {:?}",
                index + 2,
                record.get(0).unwrap_or("")
            ),
        }
    }

    log::debug!("loaded {} raw reference rows", rows.len());
    Ok(rows)
}

/// Load raw reference rows from a CSV file
pub fn load_reference_rows<P: AsRef<Path>>(path: P) -> Result<Vec<RawReferenceRow>, LoadError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    load_reference_rows_from_reader(file)
}

/// Rows of the reference table compiled into the crate
pub fn load_bundled_rows() -> Result<Vec<RawReferenceRow>, LoadError> {
    load_reference_rows_from_reader(BUNDLED_REFERENCE_CSV.as_bytes())
}
