//! Date-by-symbol closing-price matrix.
//!
//! Storage is column-major: one `Vec<Option<f64>>` per symbol, each exactly as
//! long as the date axis. `None` is the only representation of a missing
//! price. Non-finite inputs (NaN, ±inf) are converted to `None` on
//! construction so downstream code never has to test for sentinels.

use chrono::NaiveDate;
use std::collections::HashSet;
use thiserror::Error;

/// Structural violations rejected by [`PriceMatrix::new`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MatrixError {
    #[error("dates must be strictly increasing (row {row}: {date})")]
    UnsortedDates { row: usize, date: NaiveDate },

    #[error("duplicate symbol column: {0}")]
    DuplicateSymbol(String),

    #[error("column '{symbol}' has {actual} rows, expected {expected}")]
    RaggedColumn {
        symbol: String,
        expected: usize,
        actual: usize,
    },

    #[error("{symbols} symbol labels supplied for {columns} columns")]
    LabelCountMismatch { symbols: usize, columns: usize },
}

/// Closing prices keyed by (trading date, symbol).
#[derive(Debug, Clone, PartialEq)]
pub struct PriceMatrix {
    dates: Vec<NaiveDate>,
    symbols: Vec<String>,
    columns: Vec<Vec<Option<f64>>>,
}

impl PriceMatrix {
    /// Build a matrix, validating the date axis and column layout.
    pub fn new(
        dates: Vec<NaiveDate>,
        symbols: Vec<String>,
        columns: Vec<Vec<Option<f64>>>,
    ) -> Result<Self, MatrixError> {
        if symbols.len() != columns.len() {
            return Err(MatrixError::LabelCountMismatch {
                symbols: symbols.len(),
                columns: columns.len(),
            });
        }

        for (row, pair) in dates.windows(2).enumerate() {
            if pair[1] <= pair[0] {
                return Err(MatrixError::UnsortedDates {
                    row: row + 1,
                    date: pair[1],
                });
            }
        }

        let mut seen = HashSet::with_capacity(symbols.len());
        for (symbol, column) in symbols.iter().zip(&columns) {
            if !seen.insert(symbol.as_str()) {
                return Err(MatrixError::DuplicateSymbol(symbol.clone()));
            }
            if column.len() != dates.len() {
                return Err(MatrixError::RaggedColumn {
                    symbol: symbol.clone(),
                    expected: dates.len(),
                    actual: column.len(),
                });
            }
        }

        let columns = columns
            .into_iter()
            .map(|col| {
                col.into_iter()
                    .map(|v| v.filter(|x| x.is_finite()))
                    .collect()
            })
            .collect();

        Ok(Self {
            dates,
            symbols,
            columns,
        })
    }

    /// Build from parts the caller has already aligned: dates strictly
    /// increasing, labels unique, every column as long as `dates`.
    pub(crate) fn from_aligned(
        dates: Vec<NaiveDate>,
        symbols: Vec<String>,
        columns: Vec<Vec<Option<f64>>>,
    ) -> Self {
        debug_assert!(dates.windows(2).all(|w| w[0] < w[1]));
        debug_assert!(columns.iter().all(|c| c.len() == dates.len()));
        Self {
            dates,
            symbols,
            columns,
        }
    }

    /// A matrix with no dates and no symbols.
    pub fn empty() -> Self {
        Self {
            dates: Vec::new(),
            symbols: Vec::new(),
            columns: Vec::new(),
        }
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn columns(&self) -> &[Vec<Option<f64>>] {
        &self.columns
    }

    /// Prices for one symbol, aligned to [`dates`](Self::dates).
    pub fn column(&self, symbol: &str) -> Option<&[Option<f64>]> {
        self.symbols
            .iter()
            .position(|s| s == symbol)
            .map(|i| self.columns[i].as_slice())
    }

    pub fn n_rows(&self) -> usize {
        self.dates.len()
    }

    pub fn n_cols(&self) -> usize {
        self.symbols.len()
    }

    /// True when there is nothing to compute on (no rows or no columns).
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty() || self.symbols.is_empty()
    }

    /// Iterate `(symbol, column)` pairs in column order.
    pub fn iter_columns(&self) -> impl Iterator<Item = (&str, &[Option<f64>])> {
        self.symbols
            .iter()
            .map(String::as_str)
            .zip(self.columns.iter().map(Vec::as_slice))
    }

    /// Keep only the columns for which `keep` returns true. All dates are retained.
    pub fn retain_columns<F>(&self, mut keep: F) -> PriceMatrix
    where
        F: FnMut(&str, &[Option<f64>]) -> bool,
    {
        let mut symbols = Vec::new();
        let mut columns = Vec::new();
        for (symbol, column) in self.iter_columns() {
            if keep(symbol, column) {
                symbols.push(symbol.to_string());
                columns.push(column.to_vec());
            }
        }
        PriceMatrix {
            dates: self.dates.clone(),
            symbols,
            columns,
        }
    }
}
