use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::CmdbMapError;
use crate::graph::{DEFAULT_MAX_PATHS, DEFAULT_MAX_PATH_LENGTH};
use crate::labels::DEFAULT_LABEL_LENGTH;
use crate::layout::{LayoutAlgorithm, DEFAULT_ROOT_INSET};

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "CMDB_MAP_CONFIG";
/// Environment variable naming the data directory.
pub const DATA_DIR_ENV: &str = "CMDB_MAP_DATA_DIR";
/// Config file used when `CMDB_MAP_CONFIG` is not set.
pub const DEFAULT_CONFIG_FILE: &str = "cmdb-map.toml";

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub labels: LabelsConfig,
    #[serde(default)]
    pub layout: LayoutConfig,
    #[serde(default)]
    pub tables: TablesConfig,
    /// Directory holding the exported records, resolved by [`Config::load`].
    #[serde(skip)]
    pub data_dir: PathBuf,
}

/// Input data location
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DataConfig {
    pub dir: Option<PathBuf>,
}

/// Output locations
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_base_dir")]
    pub base_dir: PathBuf,
    #[serde(default = "default_graphs_dir")]
    pub graphs_dir: String,
    /// Sub-directory for the per-table batch.
    #[serde(default = "default_table_graphs_dir")]
    pub table_graphs_dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            base_dir: default_base_dir(),
            graphs_dir: default_graphs_dir(),
            table_graphs_dir: default_table_graphs_dir(),
        }
    }
}

fn default_base_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_graphs_dir() -> String {
    "path_graphs".to_string()
}

fn default_table_graphs_dir() -> String {
    "table_graphs".to_string()
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

/// Path search bounds
#[derive(Debug, Clone, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_max_paths")]
    pub max_paths: usize,
    /// Maximum edges in the walk reaching the target or its bridge ancestor.
    #[serde(default = "default_max_path_length")]
    pub max_path_length: usize,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            max_paths: default_max_paths(),
            max_path_length: default_max_path_length(),
        }
    }
}

fn default_max_paths() -> usize {
    DEFAULT_MAX_PATHS
}

fn default_max_path_length() -> usize {
    DEFAULT_MAX_PATH_LENGTH
}

/// Label lengths
#[derive(Debug, Clone, Deserialize)]
pub struct LabelsConfig {
    #[serde(default = "default_label_length")]
    pub max_length: usize,
    /// Label length used in `Path n:` console lines.
    #[serde(default = "default_path_label_length")]
    pub path_max_length: usize,
}

impl Default for LabelsConfig {
    fn default() -> Self {
        Self {
            max_length: default_label_length(),
            path_max_length: default_path_label_length(),
        }
    }
}

fn default_label_length() -> usize {
    DEFAULT_LABEL_LENGTH
}

fn default_path_label_length() -> usize {
    20
}

/// Layout selection
#[derive(Debug, Clone, Deserialize)]
pub struct LayoutConfig {
    #[serde(default)]
    pub algorithm: LayoutAlgorithm,
    /// Root anchor inset as a fraction of canvas width/height.
    #[serde(default = "default_root_inset")]
    pub root_inset: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            algorithm: LayoutAlgorithm::default(),
            root_inset: default_root_inset(),
        }
    }
}

fn default_root_inset() -> f64 {
    DEFAULT_ROOT_INSET
}

/// Selection for the per-table batch
#[derive(Debug, Clone, Deserialize)]
pub struct TablesConfig {
    /// Skip tables with fewer edges (in + out) than this.
    #[serde(default = "default_min_relationships")]
    pub min_relationships: usize,
    /// Render only the most connected tables.
    #[serde(default)]
    pub max_tables: Option<usize>,
}

impl Default for TablesConfig {
    fn default() -> Self {
        Self {
            min_relationships: default_min_relationships(),
            max_tables: None,
        }
    }
}

fn default_min_relationships() -> usize {
    1
}

impl Config {
    /// Load configuration
    ///
    /// Loads environment variables from .env file (if present) first.
    /// Looks for the config file in this order:
    /// 1. Path specified in CMDB_MAP_CONFIG environment variable (must exist)
    /// 2. ./cmdb-map.toml in current directory (defaults when absent)
    pub fn load() -> Result<Self> {
        // .env is optional
        let _ = dotenv::dotenv();

        let mut config = match std::env::var(CONFIG_ENV) {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) => {
                let path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    Self::from_file(&path)?
                } else {
                    log::debug!("No {} found, using defaults", DEFAULT_CONFIG_FILE);
                    Config::default()
                }
            }
        };

        config.data_dir = std::env::var(DATA_DIR_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .or_else(|| config.data.dir.clone())
            .unwrap_or_else(|| PathBuf::from("."));

        config.validate()?;

        Ok(config)
    }

    /// Parse a config file without consulting the environment.
    pub fn from_file(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config: Config = toml::from_str(&config_str)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        if let Some(dir) = &config.data.dir {
            config.data_dir = dir.clone();
        }

        Ok(config)
    }

    /// Override the data directory (command-line flag).
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.paths.max_paths == 0 {
            return Err(invalid("paths.max_paths must be greater than 0"));
        }

        if self.labels.max_length < 4 || self.labels.path_max_length < 4 {
            return Err(invalid("labels.max_length and labels.path_max_length must be at least 4"));
        }

        if !(0.0..0.5).contains(&self.layout.root_inset) {
            return Err(invalid("layout.root_inset must be in [0.0, 0.5)"));
        }

        if self.tables.max_tables == Some(0) {
            return Err(invalid("tables.max_tables must be greater than 0 when set"));
        }

        Ok(())
    }

    /// Get the data directory
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Timestamped directory for this run:
    /// `<base_dir>/cmdb_analysis_<YYYYmmdd_HHMMSS>`.
    pub fn run_dir(&self, started: DateTime<Local>) -> PathBuf {
        self.output
            .base_dir
            .join(format!("cmdb_analysis_{}", started.format("%Y%m%d_%H%M%S")))
    }

    /// `<run_dir>/<graphs_dir>`, where path and single-table graphs go.
    pub fn run_output_dir(&self, started: DateTime<Local>) -> PathBuf {
        self.run_dir(started).join(&self.output.graphs_dir)
    }

    /// `<run_dir>/<table_graphs_dir>`, where the per-table batch goes.
    pub fn table_output_dir(&self, started: DateTime<Local>) -> PathBuf {
        self.run_dir(started).join(&self.output.table_graphs_dir)
    }
}

fn invalid(message: &str) -> anyhow::Error {
    CmdbMapError::Config(message.to_string()).into()
}
