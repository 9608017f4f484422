//! Breadth table export (Parquet).

use super::ReportError;
use breadthlab_core::breadth::BreadthTable;
use chrono::{Datelike, NaiveDate};
use polars::prelude::{Column, DataFrame, DataType, NamedFrom, ParquetWriter};
use std::fs::File;
use std::path::Path;

/// Days from 0001-01-01 (CE day 1) to 1970-01-01.
const UNIX_EPOCH_CE_DAYS: i32 = 719_163;

fn epoch_days(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_CE_DAYS
}

pub fn write_breadth_parquet(path: &Path, table: &BreadthTable) -> Result<(), ReportError> {
    let [pct_fast, pct_slow, valid_fast, valid_slow] = table.column_names();
    let rows = &table.rows;

    let dates: Vec<i32> = rows.iter().map(|r| epoch_days(r.date)).collect();
    let fast: Vec<f64> = rows.iter().map(|r| r.pct_fast).collect();
    let slow: Vec<f64> = rows.iter().map(|r| r.pct_slow).collect();
    let fast_n: Vec<u64> = rows.iter().map(|r| r.valid_fast as u64).collect();
    let slow_n: Vec<u64> = rows.iter().map(|r| r.valid_slow as u64).collect();

    let mut df = DataFrame::new(vec![
        Column::new("Date".into(), dates).cast(&DataType::Date)?,
        Column::new(pct_fast.as_str().into(), fast),
        Column::new(pct_slow.as_str().into(), slow),
        Column::new(valid_fast.as_str().into(), fast_n),
        Column::new(valid_slow.as_str().into(), slow_n),
    ])?;

    let mut file = File::create(path).map_err(|e| ReportError::io(path, e))?;
    ParquetWriter::new(&mut file).finish(&mut df)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_days_counts_from_1970() {
        assert_eq!(epoch_days(NaiveDate::from_ymd_opt(1970, 1, 1).unwrap()), 0);
        assert_eq!(epoch_days(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()), 19_724);
    }
}
