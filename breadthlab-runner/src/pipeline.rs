//! Download and breadth stages.
//!
//! Two entry points plus a combined run:
//! - `run_download()`: symbol list -> batched retrieval -> `close.csv`
//! - `run_breadth()`: `close.csv` -> coverage filter -> breadth -> reports
//! - `run_all()`: both stages in one process, without re-reading the matrix
//!
//! An empty download is fatal. An empty breadth table is not an error but is
//! reported as [`BreadthOutcome::NoResult`] and writes nothing.

use crate::config::{BreadthConfig, ConfigError};
use crate::reporting::{BreadthManifest, ReportError, ReportOptions, ReportPaths, ReportWriter};
use breadthlab_core::breadth::{compute_breadth, BreadthError, BreadthTable};
use breadthlab_core::coverage::{filter_by_coverage, CoverageError, CoverageReport};
use breadthlab_core::data::{
    assemble, read_price_matrix, read_symbol_list, retrieve_closes, write_price_matrix, DataError,
    QuoteProvider,
};
use breadthlab_core::PriceMatrix;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("data error: {0}")]
    Data(#[from] DataError),

    #[error("coverage error: {0}")]
    Coverage(#[from] CoverageError),

    #[error("breadth error: {0}")]
    Breadth(#[from] BreadthError),

    #[error("report error: {0}")]
    Report(#[from] ReportError),

    #[error("no symbols found in {0}")]
    EmptySymbolList(String),

    #[error("no close prices downloaded")]
    NoData,
}

/// Result of a successful download stage.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadSummary {
    pub path: PathBuf,
    pub requested: usize,
    pub rows: usize,
    pub cols: usize,
    pub batches: usize,
    pub failed_batches: usize,
    pub retried_batches: usize,
}

/// Why a breadth run produced nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoResultReason {
    /// The price matrix had no rows or no columns.
    EmptyMatrix,
    /// Every symbol fell below the coverage threshold.
    NoSymbolsKept,
    /// Not enough history for the slow (or fast) window on any date.
    InsufficientHistory,
}

impl std::fmt::Display for NoResultReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            NoResultReason::EmptyMatrix => "price matrix is empty",
            NoResultReason::NoSymbolsKept => "no symbol meets the coverage threshold",
            NoResultReason::InsufficientHistory => {
                "not enough history for the moving-average windows"
            }
        })
    }
}

/// Outcome of a breadth stage.
#[derive(Debug, Clone, PartialEq)]
pub enum BreadthOutcome {
    Written {
        table: BreadthTable,
        coverage: CoverageReport,
        manifest: BreadthManifest,
        paths: ReportPaths,
    },
    NoResult {
        reason: NoResultReason,
        coverage: Option<CoverageReport>,
    },
}

impl BreadthOutcome {
    pub fn is_written(&self) -> bool {
        matches!(self, BreadthOutcome::Written { .. })
    }
}

/// BLAKE3 over the matrix contents, in column order.
pub fn dataset_hash(matrix: &PriceMatrix) -> String {
    let mut hasher = blake3::Hasher::new();
    for date in matrix.dates() {
        hasher.update(date.to_string().as_bytes());
    }
    for (symbol, column) in matrix.iter_columns() {
        hasher.update(symbol.as_bytes());
        for value in column {
            match value {
                Some(v) => hasher.update(&v.to_le_bytes()),
                None => hasher.update(b"\0na"),
            };
        }
    }
    hasher.finalize().to_hex().to_string()
}

/// Read symbols, fetch closes and write `{data_dir}/{universe}/close.csv`.
pub fn run_download(
    config: &BreadthConfig,
    provider: &dyn QuoteProvider,
    symbols_csv: &Path,
) -> Result<DownloadSummary, PipelineError> {
    download_matrix(config, provider, symbols_csv).map(|(summary, _)| summary)
}

fn download_matrix(
    config: &BreadthConfig,
    provider: &dyn QuoteProvider,
    symbols_csv: &Path,
) -> Result<(DownloadSummary, PriceMatrix), PipelineError> {
    config.validate()?;
    let normalizer = config.normalizer();

    let raw = read_symbol_list(symbols_csv)?;
    let symbols = normalizer.normalize(&raw);
    if symbols.is_empty() {
        return Err(PipelineError::EmptySymbolList(symbols_csv.display().to_string()));
    }
    info!(
        universe = %config.universe,
        symbols = symbols.len(),
        period = %config.download.period,
        "download starting"
    );

    let retrieval = retrieve_closes(provider, &symbols, &config.retrieval());
    if retrieval.is_empty() {
        return Err(PipelineError::NoData);
    }
    let matrix = assemble(&retrieval.tables, &normalizer).ok_or(PipelineError::NoData)?;

    let path = config.close_csv_path();
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(DataError::from)?;
    }
    write_price_matrix(&path, &matrix)?;

    let summary = DownloadSummary {
        path,
        requested: symbols.len(),
        rows: matrix.n_rows(),
        cols: matrix.n_cols(),
        batches: retrieval.outcomes.len(),
        failed_batches: retrieval.failed_batches().count(),
        retried_batches: retrieval.retried_batches().count(),
    };
    if summary.failed_batches > 0 {
        warn!(failed = summary.failed_batches, "some batches were skipped");
    }
    info!(path = %summary.path.display(), rows = summary.rows, cols = summary.cols, "close prices saved");
    Ok((summary, matrix))
}

/// Load a price matrix and produce the breadth report.
pub fn run_breadth(
    config: &BreadthConfig,
    close_csv: &Path,
    options: ReportOptions,
) -> Result<BreadthOutcome, PipelineError> {
    config.validate()?;
    let matrix = read_price_matrix(close_csv, &config.normalizer())?;
    info!(
        path = %close_csv.display(),
        rows = matrix.n_rows(),
        cols = matrix.n_cols(),
        "price matrix loaded"
    );
    breadth_from_matrix(config, &matrix, options)
}

/// Breadth stage over an in-memory matrix. Nothing is written unless a
/// non-empty table comes out.
pub fn breadth_from_matrix(
    config: &BreadthConfig,
    matrix: &PriceMatrix,
    options: ReportOptions,
) -> Result<BreadthOutcome, PipelineError> {
    config.validate()?;
    if matrix.is_empty() {
        return Ok(BreadthOutcome::NoResult {
            reason: NoResultReason::EmptyMatrix,
            coverage: None,
        });
    }

    let (filtered, coverage) = filter_by_coverage(matrix, config.breadth.min_coverage)?;
    if filtered.n_cols() == 0 {
        return Ok(BreadthOutcome::NoResult {
            reason: NoResultReason::NoSymbolsKept,
            coverage: Some(coverage),
        });
    }

    let table = compute_breadth(&filtered, config.breadth_params())?;
    if table.is_empty() {
        return Ok(BreadthOutcome::NoResult {
            reason: NoResultReason::InsufficientHistory,
            coverage: Some(coverage),
        });
    }

    let manifest = BreadthManifest {
        schema_version: crate::reporting::MANIFEST_SCHEMA_VERSION,
        universe: config.universe.clone(),
        generated_at: chrono::Utc::now(),
        fast: table.params.fast,
        slow: table.params.slow,
        min_coverage: config.breadth.min_coverage,
        matrix_rows: matrix.n_rows(),
        matrix_cols: matrix.n_cols(),
        kept_symbols: coverage.kept().map(String::from).collect(),
        dropped_symbols: coverage.dropped().map(String::from).collect(),
        first_date: table.first_date(),
        last_date: table.last_date(),
        rows: table.len(),
        dataset_hash: dataset_hash(matrix),
    };

    let writer = ReportWriter::new(&config.output.output_dir, &config.output.images_dir);
    let paths = writer.save(&table, &manifest, options)?;

    Ok(BreadthOutcome::Written {
        table,
        coverage,
        manifest,
        paths,
    })
}

/// Download, then compute breadth on the downloaded matrix.
pub fn run_all(
    config: &BreadthConfig,
    provider: &dyn QuoteProvider,
    symbols_csv: &Path,
    options: ReportOptions,
) -> Result<(DownloadSummary, BreadthOutcome), PipelineError> {
    let (summary, matrix) = download_matrix(config, provider, symbols_csv)?;
    let outcome = breadth_from_matrix(config, &matrix, options)?;
    Ok((summary, outcome))
}
