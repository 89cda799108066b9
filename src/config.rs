//! Pipeline configuration
//!
//! Every path, sink setting and smoothing parameter the stages need lives in
//! [`PipelineConfig`]. Values come from defaults or an optional TOML file.

use crate::error::{EtlError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// File names of the three intermediate snapshots
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageFiles {
    #[serde(default = "default_raw_file")]
    pub raw: String,
    #[serde(default = "default_cleaned_file")]
    pub cleaned: String,
    #[serde(default = "default_enriched_file")]
    pub enriched: String,
}

impl Default for StageFiles {
    fn default() -> Self {
        Self {
            raw: default_raw_file(),
            cleaned: default_cleaned_file(),
            enriched: default_enriched_file(),
        }
    }
}

/// Configuration shared by all pipeline stages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Base directory holding the raw subdirectory and the snapshots
    #[serde(default = "default_source_directory")]
    pub source_directory: PathBuf,
    #[serde(default = "default_raw_subdirectory")]
    pub raw_subdirectory: String,
    /// File in the raw directory that is never read
    #[serde(default = "default_placeholder_file")]
    pub placeholder_file: String,
    #[serde(default)]
    pub stage_files: StageFiles,
    /// SQLite database path
    #[serde(default = "default_sink_connection_string")]
    pub sink_connection_string: String,
    #[serde(default = "default_table_name")]
    pub table_name: String,
    /// Maximum rows per sink transaction
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Centered rolling window size
    #[serde(default = "default_window_size")]
    pub window_size: usize,
    /// Outlier bound in standard deviations
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    /// Process groups on the rayon pool
    #[serde(default)]
    pub parallel_groups: bool,
    #[serde(default = "default_show_progress")]
    pub show_progress: bool,
}

fn default_raw_file() -> String {
    "0.raw.parquet".to_string()
}

fn default_cleaned_file() -> String {
    "1.limpo.parquet".to_string()
}

fn default_enriched_file() -> String {
    "2.atributos.parquet".to_string()
}

fn default_source_directory() -> PathBuf {
    PathBuf::from("dados")
}

fn default_raw_subdirectory() -> String {
    "raw".to_string()
}

fn default_placeholder_file() -> String {
    ".gitkeep".to_string()
}

fn default_sink_connection_string() -> String {
    "dados/covid.db".to_string()
}

fn default_table_name() -> String {
    "new_new_covid".to_string()
}

fn default_batch_size() -> usize {
    100_000
}

fn default_window_size() -> usize {
    3
}

fn default_threshold() -> f64 {
    2.0
}

fn default_show_progress() -> bool {
    true
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source_directory: default_source_directory(),
            raw_subdirectory: default_raw_subdirectory(),
            placeholder_file: default_placeholder_file(),
            stage_files: StageFiles::default(),
            sink_connection_string: default_sink_connection_string(),
            table_name: default_table_name(),
            batch_size: default_batch_size(),
            window_size: default_window_size(),
            threshold: default_threshold(),
            parallel_groups: false,
            show_progress: default_show_progress(),
        }
    }
}

impl PipelineConfig {
    /// Config rooted at `dir`, with the sink database inside it
    pub fn with_source_directory<P: Into<PathBuf>>(dir: P) -> Self {
        let source_directory = dir.into();
        let sink_connection_string = source_directory
            .join("covid.db")
            .to_string_lossy()
            .into_owned();
        Self {
            source_directory,
            sink_connection_string,
            ..Self::default()
        }
    }

    /// Parse a TOML document; absent keys take their defaults
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: PipelineConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            EtlError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&contents)
    }

    /// Load from a TOML file if it exists, otherwise use defaults
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            log::info!("Loading configuration from {}", path.display());
            Self::load(path)
        } else {
            log::info!("No configuration file at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.window_size == 0 {
            return Err(EtlError::Config("window_size must be at least 1".to_string()));
        }
        if self.batch_size == 0 {
            return Err(EtlError::Config("batch_size must be at least 1".to_string()));
        }
        if !self.threshold.is_finite() || self.threshold < 0.0 {
            return Err(EtlError::Config(format!(
                "threshold must be a non-negative number, got {}",
                self.threshold
            )));
        }
        if self.table_name.is_empty() {
            return Err(EtlError::Config("table_name must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn raw_directory(&self) -> PathBuf {
        self.source_directory.join(&self.raw_subdirectory)
    }

    pub fn raw_snapshot(&self) -> PathBuf {
        self.source_directory.join(&self.stage_files.raw)
    }

    pub fn cleaned_snapshot(&self) -> PathBuf {
        self.source_directory.join(&self.stage_files.cleaned)
    }

    pub fn enriched_snapshot(&self) -> PathBuf {
        self.source_directory.join(&self.stage_files.enriched)
    }
}
