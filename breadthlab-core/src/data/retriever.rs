//! Batched close-price retrieval.
//!
//! Splits the symbol list into fixed-size batches and fetches them strictly in
//! order. Each batch runs a small state machine:
//!
//! ```text
//! Pending -> Attempting(0) -> Attempting(1) -> ... -> Succeeded | Exhausted
//! ```
//!
//! A failed attempt waits `BackoffPolicy::delay(n)` before the next one. An
//! exhausted batch is logged and skipped; it never aborts the run. The caller
//! decides what an entirely empty [`Retrieval`] means.

use super::backoff::BackoffPolicy;
use super::period::LookbackPeriod;
use super::provider::{BatchRequest, Interval, QuoteProvider};
use super::shape::{extract_close, CloseTable};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Lifecycle of one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    Pending,
    /// Attempt number, 0-based.
    Attempting(u32),
    Succeeded,
    Exhausted,
}

impl BatchState {
    /// Pending batches move to their first attempt; other states are unchanged.
    pub fn begin(self) -> Self {
        match self {
            BatchState::Pending => BatchState::Attempting(0),
            other => other,
        }
    }

    pub fn on_success(self) -> Self {
        match self {
            BatchState::Attempting(_) => BatchState::Succeeded,
            other => other,
        }
    }

    /// After a failed attempt: retry while attempts remain, otherwise exhaust.
    pub fn on_failure(self, max_retries: u32) -> Self {
        match self {
            BatchState::Attempting(n) if n < max_retries => BatchState::Attempting(n + 1),
            BatchState::Attempting(_) => BatchState::Exhausted,
            other => other,
        }
    }
}

/// Parameters for a retrieval run.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalConfig {
    pub batch_size: usize,
    /// Sleep between batches; also the backoff base.
    pub pause: Duration,
    pub max_retries: u32,
    pub max_backoff: Option<Duration>,
    pub period: LookbackPeriod,
    pub adjusted: bool,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            batch_size: 50,
            pause: Duration::from_secs(1),
            max_retries: 2,
            max_backoff: None,
            period: LookbackPeriod::default(),
            adjusted: false,
        }
    }
}

impl RetrievalConfig {
    pub fn backoff(&self) -> BackoffPolicy {
        BackoffPolicy::new(self.pause).with_cap(self.max_backoff)
    }
}

/// What happened to one batch.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutcome {
    /// 0-based batch index.
    pub index: usize,
    pub symbols: Vec<String>,
    pub state: BatchState,
    /// Number of fetch calls made.
    pub attempts: u32,
    /// Backoff delays waited between attempts.
    pub waits: Vec<Duration>,
    pub last_error: Option<String>,
    /// Close columns contributed (0 for empty responses and exhausted batches).
    pub columns: usize,
}

/// Per-batch close tables plus the outcome log.
#[derive(Debug, Default)]
pub struct Retrieval {
    pub tables: Vec<CloseTable>,
    pub outcomes: Vec<BatchOutcome>,
}

impl Retrieval {
    /// True when no batch contributed any data.
    pub fn is_empty(&self) -> bool {
        self.tables.iter().all(CloseTable::is_empty)
    }

    pub fn failed_batches(&self) -> impl Iterator<Item = &BatchOutcome> {
        self.outcomes
            .iter()
            .filter(|o| o.state == BatchState::Exhausted)
    }

    pub fn retried_batches(&self) -> impl Iterator<Item = &BatchOutcome> {
        self.outcomes.iter().filter(|o| o.attempts > 1)
    }
}

/// Fetch close prices for `symbols` in batches.
pub fn retrieve_closes(
    provider: &dyn QuoteProvider,
    symbols: &[String],
    config: &RetrievalConfig,
) -> Retrieval {
    let batch_size = config.batch_size.max(1);
    let total = symbols.len().div_ceil(batch_size);
    let backoff = config.backoff();
    let mut retrieval = Retrieval::default();

    info!(
        provider = provider.name(),
        symbols = symbols.len(),
        batches = total,
        period = %config.period,
        "starting close-price retrieval"
    );

    for (index, chunk) in symbols.chunks(batch_size).enumerate() {
        let (outcome, table) = fetch_batch(provider, index, total, chunk, config, &backoff);
        if let Some(table) = table.filter(|t| !t.is_empty()) {
            retrieval.tables.push(table);
        }
        retrieval.outcomes.push(outcome);

        if index + 1 < total {
            std::thread::sleep(config.pause);
        }
    }

    let failed = retrieval.failed_batches().count();
    info!(
        batches = total,
        failed,
        tables = retrieval.tables.len(),
        "close-price retrieval finished"
    );
    retrieval
}

fn fetch_batch(
    provider: &dyn QuoteProvider,
    index: usize,
    total: usize,
    chunk: &[String],
    config: &RetrievalConfig,
    backoff: &BackoffPolicy,
) -> (BatchOutcome, Option<CloseTable>) {
    let request = BatchRequest {
        symbols: chunk,
        period: config.period,
        interval: Interval::Daily,
        adjusted: config.adjusted,
    };

    let mut state = BatchState::Pending.begin();
    let mut attempts = 0;
    let mut waits = Vec::new();
    let mut last_error = None;
    let mut table = None;

    while let BatchState::Attempting(attempt) = state {
        attempts += 1;
        match provider.fetch_batch(&request) {
            Ok(frame) => {
                let close = extract_close(&frame);
                if close.is_empty() {
                    debug!(batch = index + 1, "batch returned no close prices");
                }
                table = Some(close);
                state = state.on_success();
            }
            Err(e) => {
                state = state.on_failure(config.max_retries);
                if let BatchState::Attempting(_) = state {
                    let wait = backoff.delay(attempt);
                    warn!(
                        batch = index + 1,
                        retry = attempt + 1,
                        max_retries = config.max_retries,
                        wait_secs = wait.as_secs_f64(),
                        error = %e,
                        "batch fetch failed, retrying"
                    );
                    std::thread::sleep(wait);
                    waits.push(wait);
                } else {
                    error!(
                        batch = index + 1,
                        of = total,
                        error = %e,
                        "batch failed after all retries, skipping"
                    );
                }
                last_error = Some(e.to_string());
            }
        }
    }

    let columns = table.as_ref().map_or(0, |t| t.columns.len());
    if state == BatchState::Succeeded {
        debug!(batch = index + 1, of = total, columns, attempts, "batch fetched");
    }

    let outcome = BatchOutcome {
        index,
        symbols: chunk.to_vec(),
        state,
        attempts,
        waits,
        last_error,
        columns,
    };
    (outcome, table)
}
