//! Price-matrix CSV ingest and export.
//!
//! Layout: a header row with a date column (`Date`, else the first column)
//! followed by one column per symbol. Cells that do not parse as finite
//! numbers become missing; rows whose date does not parse are dropped.

use super::provider::DataError;
use super::symbols::SymbolNormalizer;
use crate::matrix::PriceMatrix;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::collections::{BTreeMap, HashSet};
use std::io::{Read, Write};
use std::path::Path;
use tracing::debug;

/// Date column read from a price matrix when present.
pub const DATE_COLUMN: &str = "Date";

/// Load a price matrix from a CSV file.
pub fn read_price_matrix(
    path: &Path,
    normalizer: &SymbolNormalizer,
) -> Result<PriceMatrix, DataError> {
    let file = std::fs::File::open(path)?;
    read_price_matrix_from(file, normalizer)
}

/// Same as [`read_price_matrix`] over any reader.
pub fn read_price_matrix_from<R: Read>(
    reader: R,
    normalizer: &SymbolNormalizer,
) -> Result<PriceMatrix, DataError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    if headers.is_empty() {
        return Ok(PriceMatrix::empty());
    }
    let date_idx = headers
        .iter()
        .position(|h| h.trim() == DATE_COLUMN)
        .unwrap_or(0);

    // (csv index, label) for every symbol column kept
    let mut seen = HashSet::new();
    let mut value_cols: Vec<(usize, String)> = Vec::new();
    for (i, header) in headers.iter().enumerate() {
        if i == date_idx {
            continue;
        }
        let label = normalizer.column_label(header);
        if label.is_empty() {
            debug!(column = i, "skipping unlabeled column");
            continue;
        }
        if seen.insert(label.clone()) {
            value_cols.push((i, label));
        } else {
            debug!(symbol = %label, "skipping duplicate column");
        }
    }

    let mut rows: BTreeMap<NaiveDate, Vec<Option<f64>>> = BTreeMap::new();
    let mut dropped = 0usize;
    for record in rdr.records() {
        let record = record?;
        let Some(date) = record.get(date_idx).and_then(parse_date) else {
            dropped += 1;
            continue;
        };
        rows.entry(date).or_insert_with(|| {
            value_cols
                .iter()
                .map(|(i, _)| record.get(*i).and_then(parse_price))
                .collect()
        });
    }
    if dropped > 0 {
        debug!(dropped, "dropped rows with unparseable dates");
    }

    let dates: Vec<NaiveDate> = rows.keys().copied().collect();
    let mut columns: Vec<Vec<Option<f64>>> = vec![Vec::with_capacity(dates.len()); value_cols.len()];
    for values in rows.into_values() {
        for (column, value) in columns.iter_mut().zip(values) {
            column.push(value);
        }
    }
    let symbols = value_cols.into_iter().map(|(_, label)| label).collect();

    Ok(PriceMatrix::from_aligned(dates, symbols, columns))
}

/// Write a price matrix as CSV (`Date` column, then one column per symbol).
pub fn write_price_matrix(path: &Path, matrix: &PriceMatrix) -> Result<(), DataError> {
    let file = std::fs::File::create(path)?;
    write_price_matrix_to(file, matrix)
}

/// Same as [`write_price_matrix`] over any writer.
pub fn write_price_matrix_to<W: Write>(writer: W, matrix: &PriceMatrix) -> Result<(), DataError> {
    let mut wtr = csv::Writer::from_writer(writer);

    let mut header = Vec::with_capacity(matrix.n_cols() + 1);
    header.push(DATE_COLUMN.to_string());
    header.extend(matrix.symbols().iter().cloned());
    wtr.write_record(&header)?;

    for (row, date) in matrix.dates().iter().enumerate() {
        let mut record = Vec::with_capacity(matrix.n_cols() + 1);
        record.push(date.to_string());
        for column in matrix.columns() {
            record.push(column[row].map(|v| v.to_string()).unwrap_or_default());
        }
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Parse the date part of a date or timestamp cell.
///
/// Timestamps with an offset keep their local calendar date.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    for fmt in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%:z")
        .ok()
        .map(|dt| dt.date_naive())
}

fn parse_price(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}
