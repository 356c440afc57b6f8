//! Runner configuration file.
//!
//! One TOML document carries the pipeline configuration together with the
//! data location, the artifact directory and an optional sweep grid:
//!
//! ```toml
//! [data]
//! path = "data/btcusd_1d.csv"
//!
//! [output]
//! dir = "results"
//!
//! [pipeline]
//! initial_capital = 10000.0
//! trading_mode = "long_short"
//!
//! [pipeline.sizing]
//! units = 0.1
//! leverage = 2.0
//!
//! [sweep]
//! leverage = [1.0, 2.0, 3.0]
//! kelly = [false, true]
//! ```

use std::path::{Path, PathBuf};

use quantpipe_core::PipelineConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sweep::SweepGrid;

/// Errors from reading a runner configuration file.
#[derive(Debug, Error)]
pub enum RunnerConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse runner config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid pipeline config: {0}")]
    Pipeline(#[from] quantpipe_core::ConfigError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataConfig {
    /// CSV file with `timestamp,open,high,low,close,volume,signal` rows.
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory receiving one sub-directory of artifacts per run.
    pub dir: PathBuf,
}

/// Top-level runner configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunnerConfig {
    pub data: DataConfig,
    #[serde(default)]
    pub output: Option<OutputConfig>,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub sweep: Option<SweepGrid>,
}

impl RunnerConfig {
    /// Parse and validate a TOML string.
    ///
    /// A relative data path is kept as written; `from_file` resolves it
    /// against the config file's directory.
    pub fn from_toml_str(s: &str) -> Result<Self, RunnerConfigError> {
        let config: RunnerConfig = toml::from_str(s)?;
        config.pipeline.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, RunnerConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| RunnerConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&text)?;
        if let Some(base) = path.parent() {
            if config.data.path.is_relative() {
                config.data.path = base.join(&config.data.path);
            }
        }
        Ok(config)
    }

    pub fn output_dir(&self) -> Option<&Path> {
        self.output.as_ref().map(|o| o.dir.as_path())
    }
}
