//! Quote provider trait and structured error types.
//!
//! The QuoteProvider trait abstracts over the external quote source so the
//! retriever can be driven by Yahoo Finance in production and by scripted
//! mocks in tests.

use super::period::LookbackPeriod;
use super::shape::QuoteFrame;
use thiserror::Error;

/// Structured error types for data operations.
///
/// These are designed to be displayable in CLI output and in log lines.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("HTTP {status} for {symbol}")]
    HttpStatus { status: u16, symbol: String },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("batch failed for every symbol: {0}")]
    BatchFailed(String),

    #[error("invalid lookback period '{0}' (expected e.g. 5d, 6mo, 2y, ytd, max)")]
    InvalidPeriod(String),

    #[error("{path}: {reason}")]
    InvalidInput { path: String, reason: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DataError {
    /// Transport-level failures that are worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DataError::NetworkUnreachable(_)
                | DataError::RateLimited { .. }
                | DataError::HttpStatus { .. }
                | DataError::BatchFailed(_)
        )
    }
}

/// Bar interval requested from the provider. Only daily bars are supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interval {
    #[default]
    Daily,
}

impl Interval {
    pub fn as_token(&self) -> &'static str {
        match self {
            Interval::Daily => "1d",
        }
    }
}

/// One batch fetch: provider-ready symbols plus the lookback window.
#[derive(Debug, Clone, Copy)]
pub struct BatchRequest<'a> {
    pub symbols: &'a [String],
    pub period: LookbackPeriod,
    pub interval: Interval,
    /// Fill the close field with split/dividend adjusted prices.
    pub adjusted: bool,
}

/// Trait for quote providers.
///
/// A provider may parallelise internally across the symbols of one batch;
/// the caller only waits for the call to return. An empty or partial frame
/// is a valid answer, not an error.
pub trait QuoteProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch daily price fields for every symbol in the batch.
    fn fetch_batch(&self, request: &BatchRequest<'_>) -> Result<QuoteFrame, DataError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_errors_are_transient() {
        assert!(DataError::NetworkUnreachable("reset".into()).is_transient());
        assert!(DataError::RateLimited {
            retry_after_secs: 60
        }
        .is_transient());
        assert!(!DataError::SymbolNotFound {
            symbol: "XYZ.NS".into()
        }
        .is_transient());
        assert!(!DataError::ResponseFormatChanged("no quote".into()).is_transient());
    }

    #[test]
    fn daily_interval_token() {
        assert_eq!(Interval::default().as_token(), "1d");
    }
}
