//! Yahoo Finance quote provider.
//!
//! Fetches daily bars from Yahoo's v8 chart API, one request per symbol, and
//! fans the symbols of a batch out over the rayon pool. The per-symbol series
//! are merged into a flat frame (one symbol) or a field-major layered frame
//! (several symbols).
//!
//! Yahoo Finance has no official API and is subject to unannounced format
//! changes. Retrying is left to the caller; this provider makes one pass.

use super::provider::{BatchRequest, DataError, QuoteProvider};
use super::shape::{FlatFrame, LayerOrder, LayeredFrame, QuoteFrame, Series, CLOSE_FIELD};
use chrono::NaiveDate;
use rayon::prelude::*;
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use std::time::Duration;
use tracing::{debug, warn};

const DEFAULT_BASE_URL: &str = "https://query2.finance.yahoo.com/v8/finance/chart";

/// Yahoo Finance v8 chart API response.
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    meta: Option<ChartMeta>,
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    gmtoffset: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
    adjclose: Option<Vec<AdjCloseData>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct QuoteData {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct AdjCloseData {
    adjclose: Vec<Option<f64>>,
}

/// Daily fields for one symbol, keyed by exchange-local date.
#[derive(Debug, Clone, PartialEq)]
struct SymbolSeries {
    dates: Vec<NaiveDate>,
    open: Series,
    high: Series,
    low: Series,
    close: Series,
    adj_close: Series,
    volume: Series,
}

/// Yahoo Finance data provider.
pub struct YahooProvider {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl YahooProvider {
    pub fn new() -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| DataError::NetworkUnreachable(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Point the provider at a different chart endpoint (mirrors, test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Build the chart API URL for a symbol. The symbol is percent-encoded as
    /// a path segment (`M&M.NS` is a valid ticker).
    fn chart_url(&self, symbol: &str, request: &BatchRequest<'_>) -> Result<reqwest::Url, DataError> {
        let invalid = |reason: String| DataError::InvalidInput {
            path: self.base_url.clone(),
            reason,
        };
        let mut url = reqwest::Url::parse(&self.base_url).map_err(|e| invalid(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| invalid("base URL cannot take path segments".into()))?
            .push(symbol);
        url.query_pairs_mut()
            .append_pair("range", &request.period.to_string())
            .append_pair("interval", request.interval.as_token())
            .append_pair("includeAdjustedClose", "true");
        Ok(url)
    }

    /// Parse the chart API response for one symbol.
    fn parse_response(symbol: &str, resp: ChartResponse) -> Result<SymbolSeries, DataError> {
        let result = resp.chart.result.ok_or_else(|| match resp.chart.error {
            Some(err) if err.code == "Not Found" => DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            },
            Some(err) => {
                DataError::ResponseFormatChanged(format!("{}: {}", err.code, err.description))
            }
            None => DataError::ResponseFormatChanged("empty result with no error".into()),
        })?;

        let data = result
            .into_iter()
            .next()
            .ok_or_else(|| DataError::ResponseFormatChanged("result array is empty".into()))?;

        let offset = data.meta.and_then(|m| m.gmtoffset).unwrap_or(0);
        let timestamps = data.timestamp.unwrap_or_default();
        let quote = data.indicators.quote.into_iter().next().unwrap_or_default();
        let adj = data
            .indicators
            .adjclose
            .and_then(|v| v.into_iter().next())
            .map(|a| a.adjclose)
            .unwrap_or_default();

        let at = |v: &Series, i: usize| v.get(i).copied().flatten();
        let mut series = SymbolSeries {
            dates: Vec::with_capacity(timestamps.len()),
            open: Vec::with_capacity(timestamps.len()),
            high: Vec::with_capacity(timestamps.len()),
            low: Vec::with_capacity(timestamps.len()),
            close: Vec::with_capacity(timestamps.len()),
            adj_close: Vec::with_capacity(timestamps.len()),
            volume: Vec::with_capacity(timestamps.len()),
        };

        for (i, &ts) in timestamps.iter().enumerate() {
            let date = chrono::DateTime::from_timestamp(ts + offset, 0)
                .map(|dt| dt.naive_utc().date())
                .ok_or_else(|| {
                    DataError::ResponseFormatChanged(format!("invalid timestamp: {ts}"))
                })?;

            let (open, high, low, close) =
                (at(&quote.open, i), at(&quote.high, i), at(&quote.low, i), at(&quote.close, i));

            // Holidays and halted sessions come back as all-null rows
            if open.is_none() && high.is_none() && low.is_none() && close.is_none() {
                continue;
            }

            series.dates.push(date);
            series.open.push(open);
            series.high.push(high);
            series.low.push(low);
            series.close.push(close);
            series.adj_close.push(at(&adj, i));
            series.volume.push(at(&quote.volume, i));
        }

        Ok(series)
    }

    /// Execute a single HTTP request for one symbol.
    fn fetch_symbol(
        &self,
        symbol: &str,
        request: &BatchRequest<'_>,
    ) -> Result<SymbolSeries, DataError> {
        let url = self.chart_url(symbol, request)?;
        let resp = self
            .client
            .get(url)
            .send()
            .map_err(|e| DataError::NetworkUnreachable(e.to_string()))?;

        let status = resp.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(60);
            return Err(DataError::RateLimited {
                retry_after_secs: retry_after,
            });
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }
        if !status.is_success() {
            return Err(DataError::HttpStatus {
                status: status.as_u16(),
                symbol: symbol.to_string(),
            });
        }

        let chart: ChartResponse = resp.json().map_err(|e| {
            DataError::ResponseFormatChanged(format!("failed to parse response for {symbol}: {e}"))
        })?;
        Self::parse_response(symbol, chart)
    }
}

impl QuoteProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn fetch_batch(&self, request: &BatchRequest<'_>) -> Result<QuoteFrame, DataError> {
        let results: Vec<(String, Result<SymbolSeries, DataError>)> = request
            .symbols
            .par_iter()
            .map(|symbol| (symbol.clone(), self.fetch_symbol(symbol, request)))
            .collect();
        settle_batch(results, request.adjusted)
    }
}

/// Fold per-symbol results into one batch frame.
///
/// Empty and non-retryable symbols are dropped. The batch fails only when
/// nothing was fetched and at least one symbol hit a retryable error.
fn settle_batch(
    results: Vec<(String, Result<SymbolSeries, DataError>)>,
    adjusted: bool,
) -> Result<QuoteFrame, DataError> {
    let mut fetched: Vec<(String, SymbolSeries)> = Vec::new();
    let mut transient: Vec<String> = Vec::new();
    for (symbol, result) in results {
        match result {
            Ok(series) if series.dates.is_empty() => {
                debug!(%symbol, "no rows returned");
            }
            Ok(series) => fetched.push((symbol, series)),
            Err(e) if e.is_transient() => {
                warn!(%symbol, error = %e, "symbol fetch failed");
                transient.push(format!("{symbol}: {e}"));
            }
            Err(e) => debug!(%symbol, error = %e, "symbol skipped"),
        }
    }

    if fetched.is_empty() && !transient.is_empty() {
        return Err(DataError::BatchFailed(transient.join("; ")));
    }
    Ok(build_frame(fetched, adjusted))
}

/// Field columns for one symbol, in provider order.
fn field_columns(series: &SymbolSeries, adjusted: bool) -> Vec<(&'static str, &Series)> {
    let close = if adjusted && series.adj_close.iter().any(Option::is_some) {
        &series.adj_close
    } else {
        &series.close
    };
    let mut fields = vec![
        ("Open", &series.open),
        ("High", &series.high),
        ("Low", &series.low),
        (CLOSE_FIELD, close),
    ];
    if !adjusted {
        fields.push(("Adj Close", &series.adj_close));
    }
    fields.push(("Volume", &series.volume));
    fields
}

/// Merge per-symbol series onto a shared date axis.
fn build_frame(fetched: Vec<(String, SymbolSeries)>, adjusted: bool) -> QuoteFrame {
    if fetched.is_empty() {
        return QuoteFrame::empty();
    }

    if fetched.len() == 1 {
        let (symbol, series) = &fetched[0];
        let fields = field_columns(series, adjusted)
            .into_iter()
            .map(|(name, values)| (name.to_string(), values.clone()))
            .collect();
        return QuoteFrame::Flat(FlatFrame {
            symbol: symbol.clone(),
            dates: series.dates.clone(),
            fields,
        });
    }

    let dates: Vec<NaiveDate> = fetched
        .iter()
        .flat_map(|(_, s)| s.dates.iter().copied())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let row_of: HashMap<NaiveDate, usize> = dates.iter().enumerate().map(|(i, d)| (*d, i)).collect();

    let mut by_field: Vec<((String, String), Series)> = Vec::new();
    for (symbol, series) in &fetched {
        for (name, values) in field_columns(series, adjusted) {
            let mut aligned = vec![None; dates.len()];
            for (date, value) in series.dates.iter().zip(values) {
                aligned[row_of[date]] = *value;
            }
            by_field.push(((name.to_string(), symbol.clone()), aligned));
        }
    }
    // Field-major: all Close columns together, then the next field, and so on.
    let field_rank = |name: &str| match name {
        "Open" => 0,
        "High" => 1,
        "Low" => 2,
        CLOSE_FIELD => 3,
        "Adj Close" => 4,
        _ => 5,
    };
    by_field.sort_by_key(|((field, _), _)| field_rank(field));

    QuoteFrame::Layered(LayeredFrame {
        order: LayerOrder::FieldMajor,
        dates,
        columns: by_field,
    })
}
