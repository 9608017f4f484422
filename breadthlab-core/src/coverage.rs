//! Per-symbol data coverage and the coverage filter.
//!
//! Coverage is measured once on the assembled matrix, over its full date
//! range, before any rolling computation.

use crate::matrix::PriceMatrix;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// Default minimum fraction of present prices a symbol needs to be kept.
pub const DEFAULT_MIN_COVERAGE: f64 = 0.80;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoverageError {
    #[error("minimum coverage must be within [0, 1], got {0}")]
    InvalidThreshold(f64),
}

/// Coverage of one symbol and whether it passed the filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolCoverage {
    pub symbol: String,
    pub present: usize,
    pub ratio: f64,
    pub kept: bool,
}

/// Result of one filter pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageReport {
    pub threshold: f64,
    pub total_rows: usize,
    pub symbols: Vec<SymbolCoverage>,
}

impl CoverageReport {
    pub fn kept(&self) -> impl Iterator<Item = &str> {
        self.symbols
            .iter()
            .filter(|s| s.kept)
            .map(|s| s.symbol.as_str())
    }

    pub fn dropped(&self) -> impl Iterator<Item = &str> {
        self.symbols
            .iter()
            .filter(|s| !s.kept)
            .map(|s| s.symbol.as_str())
    }
}

/// Fraction of non-missing values in a column. An empty column has ratio 0.
pub fn coverage_ratio(column: &[Option<f64>]) -> f64 {
    if column.is_empty() {
        return 0.0;
    }
    let present = column.iter().filter(|v| v.is_some()).count();
    present as f64 / column.len() as f64
}

/// Keep the symbols whose coverage is at least `min_coverage`. All dates are
/// retained.
pub fn filter_by_coverage(
    matrix: &PriceMatrix,
    min_coverage: f64,
) -> Result<(PriceMatrix, CoverageReport), CoverageError> {
    if !(0.0..=1.0).contains(&min_coverage) {
        return Err(CoverageError::InvalidThreshold(min_coverage));
    }

    let symbols: Vec<SymbolCoverage> = matrix
        .iter_columns()
        .map(|(symbol, column)| {
            let ratio = coverage_ratio(column);
            SymbolCoverage {
                symbol: symbol.to_string(),
                present: column.iter().filter(|v| v.is_some()).count(),
                ratio,
                kept: ratio >= min_coverage,
            }
        })
        .collect();

    for dropped in symbols.iter().filter(|s| !s.kept) {
        debug!(symbol = %dropped.symbol, ratio = dropped.ratio, "below coverage threshold");
    }

    let mut verdicts = symbols.iter().map(|s| s.kept);
    let filtered = matrix.retain_columns(|_, _| verdicts.next().unwrap_or(false));

    info!(
        kept = filtered.n_cols(),
        dropped = matrix.n_cols() - filtered.n_cols(),
        min_coverage,
        "coverage filter applied"
    );

    let report = CoverageReport {
        threshold: min_coverage,
        total_rows: matrix.n_rows(),
        symbols,
    };
    Ok((filtered, report))
}
