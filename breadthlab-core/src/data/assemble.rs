//! Merge per-batch close tables into one price matrix.
//!
//! Tables are aligned on the union of all dates they mention. A symbol with
//! no observation on a date gets `None` there (no forward-fill).

use super::shape::CloseTable;
use super::symbols::SymbolNormalizer;
use crate::matrix::PriceMatrix;
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, warn};

/// Concatenate batch tables column-wise into a [`PriceMatrix`].
///
/// - dates: outer union, sorted ascending
/// - columns that are missing on every date are dropped
/// - when a symbol appears more than once, the first remaining column wins
/// - labels lose the provider fetch suffix
///
/// Returns `None` when nothing survives (no tables, or only empty columns).
pub fn assemble(tables: &[CloseTable], normalizer: &SymbolNormalizer) -> Option<PriceMatrix> {
    let dates: Vec<NaiveDate> = tables
        .iter()
        .flat_map(|t| t.dates.iter().copied())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    if dates.is_empty() {
        return None;
    }

    let mut symbols: Vec<String> = Vec::new();
    let mut columns: Vec<Vec<Option<f64>>> = Vec::new();
    let mut kept: HashMap<String, usize> = HashMap::new();
    let mut dropped_empty = 0usize;

    for table in tables {
        for (symbol, series) in &table.columns {
            let aligned = align_column(&dates, &table.dates, series);
            if aligned.iter().all(Option::is_none) {
                dropped_empty += 1;
                continue;
            }

            let label = normalizer.display_label(symbol);
            match kept.get(&label) {
                Some(&i) => {
                    let conflicts = count_conflicts(&columns[i], &aligned);
                    if conflicts > 0 {
                        warn!(
                            symbol = %label,
                            conflicts,
                            "duplicate column disagrees with first occurrence; keeping first"
                        );
                    } else {
                        debug!(symbol = %label, "dropping duplicate column");
                    }
                }
                None => {
                    kept.insert(label.clone(), symbols.len());
                    symbols.push(label);
                    columns.push(aligned);
                }
            }
        }
    }

    if dropped_empty > 0 {
        debug!(dropped_empty, "dropped all-missing columns");
    }
    if symbols.is_empty() {
        return None;
    }

    Some(PriceMatrix::from_aligned(dates, symbols, columns))
}

/// Re-index one column onto the merged date axis. A date repeated inside the
/// table keeps its first value.
fn align_column(
    axis: &[NaiveDate],
    table_dates: &[NaiveDate],
    series: &[Option<f64>],
) -> Vec<Option<f64>> {
    let mut by_date: HashMap<NaiveDate, Option<f64>> = HashMap::with_capacity(table_dates.len());
    for (date, value) in table_dates.iter().zip(series) {
        by_date
            .entry(*date)
            .or_insert(value.filter(|v| v.is_finite()));
    }
    axis.iter()
        .map(|d| by_date.get(d).copied().flatten())
        .collect()
}

fn count_conflicts(first: &[Option<f64>], other: &[Option<f64>]) -> usize {
    first
        .iter()
        .zip(other)
        .filter(|(a, b)| matches!((a, b), (Some(x), Some(y)) if x != y))
        .count()
}
