//! Backtest runner: wires config, data loading, the engine and export.
//!
//! Entry points:
//! - `run_backtest()`: pre-loaded data, no I/O. Used by sweeps and tests.
//! - `run_backtest_from_config()`: loads the CSV named in a `RunnerConfig`,
//!   runs, and writes artifacts when an output directory is configured.

use std::path::PathBuf;

use quantpipe_core::{BacktestEngine, ConfigError, PipelineConfig, PipelineError, RunResult};
use thiserror::Error;
use tracing::info;

use crate::config::{RunnerConfig, RunnerConfigError};
use crate::data_loader::{load_csv, LoadError, LoadedData};
use crate::export::{save_artifacts, ExportError};
use crate::live::LiveError;

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("runner config error: {0}")]
    RunnerConfig(#[from] RunnerConfigError),

    #[error("data error: {0}")]
    Data(#[from] LoadError),

    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("export error: {0}")]
    Export(#[from] ExportError),

    #[error("live loop error: {0}")]
    Live(#[from] LiveError),
}

/// A finished backtest with its provenance.
#[derive(Debug, Clone)]
pub struct BacktestReport {
    pub result: RunResult,
    pub dataset_hash: String,
    /// Set when artifacts were written.
    pub artifacts_dir: Option<PathBuf>,
}

/// Run a backtest over pre-loaded data.
pub fn run_backtest(config: &PipelineConfig, data: &LoadedData) -> Result<RunResult, RunError> {
    let engine = BacktestEngine::new(config.clone())?;
    let mut signals = data.signal_source();
    Ok(engine.run(&data.bars, &mut signals)?)
}

/// Load data, run, and export as configured.
pub fn run_backtest_from_config(config: &RunnerConfig) -> Result<BacktestReport, RunError> {
    let data = load_csv(&config.data.path)?;
    let result = run_backtest(&config.pipeline, &data)?;

    let artifacts_dir = match config.output_dir() {
        Some(dir) => Some(save_artifacts(&result, Some(&data.dataset_hash), dir)?),
        None => None,
    };

    info!(
        run_hash = %result.fingerprint.run_hash,
        dataset_hash = %data.dataset_hash,
        final_equity = result.final_equity(),
        "run finished"
    );
    Ok(BacktestReport {
        result,
        dataset_hash: data.dataset_hash,
        artifacts_dir,
    })
}
