//! Simple Moving Average (SMA) over a column that may have gaps.
//!
//! The mean at row `i` covers rows `i+1-window ..= i`. It is defined only
//! when every value in that window is present, so the first defined value is
//! at index `window - 1` and any gap blanks the next `window` rows.
//! Each defined window is summed from scratch, O(n·window).

/// Rolling mean of `values` over `window` rows.
///
/// A window of 0 defines nothing.
pub fn rolling_mean(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    let n = values.len();
    let mut result = vec![None; n];
    if window == 0 || n < window {
        return result;
    }

    let mut missing = 0usize;
    for i in 0..n {
        if values[i].is_none() {
            missing += 1;
        }
        if i >= window && values[i - window].is_none() {
            missing -= 1;
        }
        if i + 1 < window || missing > 0 {
            continue;
        }

        // Deviations from the newest value; a flat window averages to exactly it.
        let anchor = values[i].unwrap_or_default();
        let deviation: f64 = values[i + 1 - window..=i]
            .iter()
            .flatten()
            .map(|x| x - anchor)
            .sum();
        result[i] = Some(anchor + deviation / window as f64);
    }

    result
}
