//! TOML run configuration.
//!
//! Every field has a default, so an empty document is a valid config apart
//! from the universe name. CLI flags are applied on top of the loaded file.

use breadthlab_core::breadth::BreadthParams;
use breadthlab_core::coverage::DEFAULT_MIN_COVERAGE;
use breadthlab_core::data::{LookbackPeriod, MarketTokens, RetrievalConfig, SymbolNormalizer};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Complete configuration for download and breadth runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BreadthConfig {
    /// Universe name, used in output file names (e.g. `nifty500`).
    pub universe: String,
    pub market: MarketTokens,
    pub download: DownloadSection,
    pub breadth: BreadthSection,
    pub output: OutputSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DownloadSection {
    pub period: LookbackPeriod,
    pub batch_size: usize,
    pub pause_secs: f64,
    pub max_retries: u32,
    pub max_backoff_secs: Option<f64>,
    pub adjusted: bool,
}

impl Default for DownloadSection {
    fn default() -> Self {
        Self {
            period: LookbackPeriod::default(),
            batch_size: 50,
            pause_secs: 1.0,
            max_retries: 2,
            max_backoff_secs: None,
            adjusted: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BreadthSection {
    pub fast: usize,
    pub slow: usize,
    pub min_coverage: f64,
}

impl Default for BreadthSection {
    fn default() -> Self {
        let params = BreadthParams::default();
        Self {
            fast: params.fast,
            slow: params.slow,
            min_coverage: DEFAULT_MIN_COVERAGE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputSection {
    /// Downloaded matrices go to `{data_dir}/{universe}/close.csv`.
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    pub images_dir: PathBuf,
    /// Also write the breadth table as Parquet.
    pub parquet: bool,
    /// Render the SVG chart.
    pub chart: bool,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("output"),
            images_dir: PathBuf::from("images"),
            parquet: false,
            chart: true,
        }
    }
}

impl Default for BreadthConfig {
    fn default() -> Self {
        Self {
            universe: String::new(),
            market: MarketTokens::default(),
            download: DownloadSection::default(),
            breadth: BreadthSection::default(),
            output: OutputSection::default(),
        }
    }
}

impl BreadthConfig {
    /// Defaults with the given universe name.
    pub fn for_universe(universe: impl Into<String>) -> Self {
        Self {
            universe: universe.into(),
            ..Self::default()
        }
    }

    /// Load a config from a TOML file. Validation is left to the caller so
    /// that CLI overrides can be applied first.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| -> Result<(), ConfigError> { Err(ConfigError::Invalid(msg)) };

        if self.universe.trim().is_empty() {
            return invalid("universe name must not be empty".into());
        }
        if self
            .universe
            .contains(|c: char| c == '/' || c == '\\' || c.is_whitespace())
        {
            return invalid(format!(
                "universe name '{}' must not contain path separators or spaces",
                self.universe
            ));
        }
        if self.market.fetch_suffix.trim() != self.market.fetch_suffix {
            return invalid("market.fetch_suffix must not have surrounding whitespace".into());
        }

        let dl = &self.download;
        if dl.batch_size == 0 {
            return invalid("download.batch_size must be at least 1".into());
        }
        if !dl.pause_secs.is_finite() || dl.pause_secs < 0.0 {
            return invalid(format!(
                "download.pause_secs must be a non-negative number, got {}",
                dl.pause_secs
            ));
        }
        if let Some(cap) = dl.max_backoff_secs {
            if !cap.is_finite() || cap < 0.0 {
                return invalid(format!(
                    "download.max_backoff_secs must be a non-negative number, got {cap}"
                ));
            }
        }

        let br = &self.breadth;
        if br.fast == 0 || br.slow == 0 {
            return invalid(format!(
                "breadth windows must be at least 1 (fast = {}, slow = {})",
                br.fast, br.slow
            ));
        }
        if !(0.0..=1.0).contains(&br.min_coverage) {
            return invalid(format!(
                "breadth.min_coverage must be within [0, 1], got {}",
                br.min_coverage
            ));
        }
        Ok(())
    }

    pub fn normalizer(&self) -> SymbolNormalizer {
        SymbolNormalizer::new(self.market.clone())
    }

    /// Retriever settings. Call after [`validate`](Self::validate).
    pub fn retrieval(&self) -> RetrievalConfig {
        let dl = &self.download;
        RetrievalConfig {
            batch_size: dl.batch_size,
            pause: Duration::from_secs_f64(dl.pause_secs.max(0.0)),
            max_retries: dl.max_retries,
            max_backoff: dl.max_backoff_secs.map(|s| Duration::from_secs_f64(s.max(0.0))),
            period: dl.period,
            adjusted: dl.adjusted,
        }
    }

    pub fn breadth_params(&self) -> BreadthParams {
        BreadthParams::new(self.breadth.fast, self.breadth.slow)
    }

    /// `{data_dir}/{universe}/close.csv`
    pub fn close_csv_path(&self) -> PathBuf {
        self.output
            .data_dir
            .join(&self.universe)
            .join("close.csv")
    }
}
