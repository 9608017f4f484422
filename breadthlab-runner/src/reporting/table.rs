//! Breadth table export (CSV).

use super::ReportError;
use breadthlab_core::breadth::BreadthTable;
use std::fs::File;
use std::io::Write;
use std::path::Path;

pub fn write_breadth_csv(path: &Path, table: &BreadthTable) -> Result<(), ReportError> {
    let file = File::create(path).map_err(|e| ReportError::io(path, e))?;
    write_breadth_csv_to(file, table)
}

/// `Date` column followed by the four value columns, one row per date.
pub fn write_breadth_csv_to<W: Write>(writer: W, table: &BreadthTable) -> Result<(), ReportError> {
    let mut wtr = csv::Writer::from_writer(writer);

    let [pct_fast, pct_slow, valid_fast, valid_slow] = table.column_names();
    wtr.write_record([
        "Date",
        pct_fast.as_str(),
        pct_slow.as_str(),
        valid_fast.as_str(),
        valid_slow.as_str(),
    ])?;

    for row in &table.rows {
        wtr.write_record([
            row.date.to_string(),
            row.pct_fast.to_string(),
            row.pct_slow.to_string(),
            row.valid_fast.to_string(),
            row.valid_slow.to_string(),
        ])?;
    }
    wtr.flush().map_err(csv::Error::from)?;
    Ok(())
}
