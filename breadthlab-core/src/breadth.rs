//! Market breadth: share of symbols trading above their moving average.
//!
//! For each window length W, every symbol gets a W-row simple moving average.
//! On each date a symbol contributes only if its average is defined there; it
//! counts as "above" when its close is strictly greater than the average. The
//! breadth value is `100 * above / valid`, undefined when `valid` is 0.

use crate::indicators::rolling_mean;
use crate::matrix::PriceMatrix;
use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BreadthError {
    #[error("{label} window must be at least 1 day")]
    InvalidWindow { label: &'static str, window: usize },
}

/// Fast and slow window lengths, in trading days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreadthParams {
    pub fast: usize,
    pub slow: usize,
}

impl Default for BreadthParams {
    fn default() -> Self {
        Self { fast: 50, slow: 200 }
    }
}

impl BreadthParams {
    pub fn new(fast: usize, slow: usize) -> Self {
        Self { fast, slow }
    }

    /// Both windows must be positive. `fast < slow` is conventional, not required.
    pub fn validate(&self) -> Result<(), BreadthError> {
        if self.fast == 0 {
            return Err(BreadthError::InvalidWindow {
                label: "fast",
                window: self.fast,
            });
        }
        if self.slow == 0 {
            return Err(BreadthError::InvalidWindow {
                label: "slow",
                window: self.slow,
            });
        }
        Ok(())
    }
}

/// Daily breadth for one window length, aligned to the matrix dates.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowBreadth {
    pub window: usize,
    /// Percentage above the average; `None` where no symbol had a defined average.
    pub pct_above: Vec<Option<f64>>,
    /// Number of symbols with a defined average on each date.
    pub valid: Vec<usize>,
}

/// Per-date above/below flags for one column. `None` where the average is undefined.
pub fn above_flags(closes: &[Option<f64>], window: usize) -> Vec<Option<bool>> {
    rolling_mean(closes, window)
        .into_iter()
        .zip(closes)
        .map(|(mean, close)| match (mean, close) {
            (Some(m), Some(c)) => Some(*c > m),
            _ => None,
        })
        .collect()
}

/// Cross-sectional breadth for a single window.
pub fn window_breadth(matrix: &PriceMatrix, window: usize) -> Result<WindowBreadth, BreadthError> {
    if window == 0 {
        return Err(BreadthError::InvalidWindow {
            label: "moving-average",
            window,
        });
    }

    let flags: Vec<Vec<Option<bool>>> = matrix
        .columns()
        .par_iter()
        .map(|column| above_flags(column, window))
        .collect();

    let n = matrix.n_rows();
    let mut above = vec![0usize; n];
    let mut valid = vec![0usize; n];
    for column in &flags {
        for (row, flag) in column.iter().enumerate() {
            if let Some(is_above) = flag {
                valid[row] += 1;
                if *is_above {
                    above[row] += 1;
                }
            }
        }
    }

    let pct_above = above
        .iter()
        .zip(&valid)
        .map(|(&a, &v)| (v > 0).then(|| 100.0 * a as f64 / v as f64))
        .collect();

    Ok(WindowBreadth {
        window,
        pct_above,
        valid,
    })
}

/// One output row. Only dates where both windows are defined appear.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreadthRow {
    pub date: NaiveDate,
    pub pct_fast: f64,
    pub pct_slow: f64,
    pub valid_fast: usize,
    pub valid_slow: usize,
}

/// Final breadth series for a fast/slow pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreadthTable {
    pub params: BreadthParams,
    pub rows: Vec<BreadthRow>,
}

impl BreadthTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Value column names, in output order.
    pub fn column_names(&self) -> [String; 4] {
        let BreadthParams { fast, slow } = self.params;
        [
            format!("pct_above_{fast}dma"),
            format!("pct_above_{slow}dma"),
            format!("valid_stocks_{fast}dma"),
            format!("valid_stocks_{slow}dma"),
        ]
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.rows.first().map(|r| r.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.rows.last().map(|r| r.date)
    }
}

/// Compute the fast and slow breadth series and keep the fully defined dates.
///
/// A window longer than the history leaves every date undefined, which yields
/// an empty table rather than an error.
pub fn compute_breadth(
    matrix: &PriceMatrix,
    params: BreadthParams,
) -> Result<BreadthTable, BreadthError> {
    params.validate()?;

    let fast = window_breadth(matrix, params.fast)?;
    let slow = window_breadth(matrix, params.slow)?;

    let rows: Vec<BreadthRow> = matrix
        .dates()
        .iter()
        .enumerate()
        .filter_map(|(i, &date)| {
            Some(BreadthRow {
                date,
                pct_fast: fast.pct_above[i]?,
                pct_slow: slow.pct_above[i]?,
                valid_fast: fast.valid[i],
                valid_slow: slow.valid[i],
            })
        })
        .collect();

    let dropped = matrix.n_rows() - rows.len();
    if dropped > 0 {
        debug!(dropped, "dates without a defined breadth value removed");
    }
    info!(
        fast = params.fast,
        slow = params.slow,
        symbols = matrix.n_cols(),
        rows = rows.len(),
        "breadth computed"
    );

    Ok(BreadthTable { params, rows })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(n: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, n).unwrap()
    }

    fn matrix(columns: &[(&str, &[Option<f64>])]) -> PriceMatrix {
        let n = columns[0].1.len();
        PriceMatrix::new(
            (1..=n as u32).map(day).collect(),
            columns.iter().map(|(s, _)| s.to_string()).collect(),
            columns.iter().map(|(_, c)| c.to_vec()).collect(),
        )
        .unwrap()
    }

    #[test]
    fn close_equal_to_average_is_not_above() {
        let flags = above_flags(&[Some(5.0), Some(5.0), Some(5.0)], 2);
        assert_eq!(flags, vec![None, Some(false), Some(false)]);
    }

    #[test]
    fn flat_closes_after_a_spike_are_never_above() {
        let mut closes = vec![Some(1.1), Some(2.7), Some(3.3), Some(123.456), Some(0.7)];
        closes.extend(std::iter::repeat(Some(0.1)).take(20));
        let flags = above_flags(&closes, 3);
        assert!(flags[7..].iter().all(|f| *f == Some(false)));
    }

    #[test]
    fn window_breadth_counts_only_defined_flags() {
        let m = matrix(&[
            ("A", &[Some(1.0), Some(2.0), Some(3.0)]),
            ("B", &[Some(3.0), Some(2.0), Some(1.0)]),
            ("C", &[None, Some(2.0), Some(3.0)]),
        ]);
        let wb = window_breadth(&m, 2).unwrap();
        assert_eq!(wb.valid, vec![0, 2, 3]);
        assert_eq!(wb.pct_above[0], None);
        assert_eq!(wb.pct_above[1], Some(50.0));
        assert!((wb.pct_above[2].unwrap() - 200.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn rejects_zero_windows() {
        let m = matrix(&[("A", &[Some(1.0)])]);
        assert!(matches!(
            compute_breadth(&m, BreadthParams::new(0, 5)),
            Err(BreadthError::InvalidWindow { label: "fast", .. })
        ));
        assert!(matches!(
            compute_breadth(&m, BreadthParams::new(2, 0)),
            Err(BreadthError::InvalidWindow { label: "slow", .. })
        ));
    }

    #[test]
    fn window_longer_than_history_gives_empty_table() {
        let m = matrix(&[("A", &[Some(1.0), Some(2.0), Some(3.0)])]);
        let table = compute_breadth(&m, BreadthParams::new(2, 10)).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn rows_start_where_slow_window_fills() {
        let m = matrix(&[
            ("A", &[Some(1.0), Some(2.0), Some(3.0), Some(4.0)]),
            ("B", &[Some(4.0), Some(3.0), Some(2.0), Some(1.0)]),
        ]);
        let table = compute_breadth(&m, BreadthParams::new(2, 3)).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.first_date(), Some(day(3)));
        assert_eq!(table.rows[0].pct_fast, 50.0);
        assert_eq!(table.rows[0].valid_slow, 2);
    }

    #[test]
    fn column_names_embed_windows() {
        let table = BreadthTable {
            params: BreadthParams::new(20, 100),
            rows: vec![],
        };
        assert_eq!(
            table.column_names(),
            [
                "pct_above_20dma".to_string(),
                "pct_above_100dma".to_string(),
                "valid_stocks_20dma".to_string(),
                "valid_stocks_100dma".to_string(),
            ]
        );
    }
}
