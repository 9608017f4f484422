//! Run manifest export (JSON).

use super::ReportError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const MANIFEST_SCHEMA_VERSION: u32 = 1;

fn default_schema_version() -> u32 {
    MANIFEST_SCHEMA_VERSION
}

/// Everything needed to tell two breadth runs apart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreadthManifest {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub universe: String,
    pub generated_at: DateTime<Utc>,
    pub fast: usize,
    pub slow: usize,
    pub min_coverage: f64,
    /// Shape of the input price matrix before the coverage filter.
    pub matrix_rows: usize,
    pub matrix_cols: usize,
    pub kept_symbols: Vec<String>,
    pub dropped_symbols: Vec<String>,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub rows: usize,
    /// BLAKE3 of the input price matrix.
    pub dataset_hash: String,
}

pub fn write_manifest(path: &Path, manifest: &BreadthManifest) -> Result<(), ReportError> {
    let json = serde_json::to_string_pretty(manifest)?;
    std::fs::write(path, json).map_err(|e| ReportError::io(path, e))
}

pub fn read_manifest(path: &Path) -> Result<BreadthManifest, ReportError> {
    let json = std::fs::read_to_string(path).map_err(|e| ReportError::io(path, e))?;
    Ok(serde_json::from_str(&json)?)
}
