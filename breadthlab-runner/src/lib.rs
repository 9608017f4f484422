//! BreadthLab Runner: configuration, pipeline stages, reporting.
//!
//! This crate builds on `breadthlab-core` to provide:
//! - TOML run configuration with CLI-overridable defaults
//! - The download stage (symbol list to `close.csv`)
//! - The breadth stage (price matrix to breadth table, chart and manifest)
//! - Report writers for CSV, Parquet, SVG and JSON

pub mod config;
pub mod pipeline;
pub mod reporting;

pub use config::{BreadthConfig, ConfigError};
pub use pipeline::{
    breadth_from_matrix, dataset_hash, run_all, run_breadth, run_download, BreadthOutcome,
    DownloadSummary, NoResultReason, PipelineError,
};
pub use reporting::{BreadthManifest, ReportError, ReportOptions, ReportPaths, ReportWriter};
