//! Breadth report export: CSV table, optional Parquet copy, SVG chart, JSON manifest.

mod chart;
mod manifest;
mod parquet;
mod table;

use breadthlab_core::breadth::BreadthTable;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

pub use chart::{chart_title, render_breadth_chart, REFERENCE_LEVELS};
pub use manifest::{read_manifest, write_manifest, BreadthManifest, MANIFEST_SCHEMA_VERSION};
pub use parquet::write_breadth_parquet;
pub use table::{write_breadth_csv, write_breadth_csv_to};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to create {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("parquet error: {0}")]
    Parquet(#[from] polars::prelude::PolarsError),

    #[error("chart rendering failed: {0}")]
    Chart(String),

    #[error("manifest error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ReportError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        ReportError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Which optional artifacts to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportOptions {
    pub parquet: bool,
    pub chart: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            parquet: false,
            chart: true,
        }
    }
}

/// Paths written for one breadth report.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportPaths {
    pub csv: PathBuf,
    pub parquet: Option<PathBuf>,
    pub chart: Option<PathBuf>,
    pub manifest: PathBuf,
}

impl ReportPaths {
    /// Every written path, table first.
    pub fn all(&self) -> Vec<&Path> {
        let mut paths = vec![self.csv.as_path()];
        paths.extend(self.parquet.as_deref());
        paths.extend(self.chart.as_deref());
        paths.push(self.manifest.as_path());
        paths
    }
}

/// Writes breadth artifacts under an output and an images directory.
#[derive(Debug, Clone)]
pub struct ReportWriter {
    output_dir: PathBuf,
    images_dir: PathBuf,
}

impl ReportWriter {
    pub fn new(output_dir: impl AsRef<Path>, images_dir: impl AsRef<Path>) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
            images_dir: images_dir.as_ref().to_path_buf(),
        }
    }

    /// `{output_dir}/{universe}_dma_breadth.csv`
    pub fn csv_path(&self, universe: &str) -> PathBuf {
        self.output_dir.join(format!("{universe}_dma_breadth.csv"))
    }

    pub fn parquet_path(&self, universe: &str) -> PathBuf {
        self.output_dir.join(format!("{universe}_dma_breadth.parquet"))
    }

    pub fn manifest_path(&self, universe: &str) -> PathBuf {
        self.output_dir
            .join(format!("{universe}_dma_breadth.manifest.json"))
    }

    /// `{images_dir}/{universe}_dma_breadth.svg`
    pub fn chart_path(&self, universe: &str) -> PathBuf {
        self.images_dir.join(format!("{universe}_dma_breadth.svg"))
    }

    /// Write every artifact for a computed breadth table.
    pub fn save(
        &self,
        table: &BreadthTable,
        manifest: &BreadthManifest,
        options: ReportOptions,
    ) -> Result<ReportPaths, ReportError> {
        let universe = manifest.universe.as_str();
        create_dir(&self.output_dir)?;

        let csv = self.csv_path(universe);
        write_breadth_csv(&csv, table)?;
        info!(path = %csv.display(), rows = table.len(), "breadth table saved");

        let parquet = if options.parquet {
            let path = self.parquet_path(universe);
            write_breadth_parquet(&path, table)?;
            Some(path)
        } else {
            None
        };

        let chart = if options.chart {
            create_dir(&self.images_dir)?;
            let path = self.chart_path(universe);
            render_breadth_chart(&path, table, &chart_title(universe))?;
            info!(path = %path.display(), "breadth chart saved");
            Some(path)
        } else {
            None
        };

        let manifest_path = self.manifest_path(universe);
        write_manifest(&manifest_path, manifest)?;

        Ok(ReportPaths {
            csv,
            parquet,
            chart,
            manifest: manifest_path,
        })
    }
}

pub(crate) fn create_dir(dir: &Path) -> Result<(), ReportError> {
    std::fs::create_dir_all(dir).map_err(|e| ReportError::io(dir, e))
}
