//! quantpipe runner: orchestration around the core pipeline.
//!
//! This crate builds on `quantpipe-core` to provide:
//! - The async `LiveLoop` (tokio) with shutdown handling and exactly-once close-out
//! - CSV loading of bars with their signals
//! - Artifact export (trade/equity CSV, attempt and manifest JSON)
//! - Parallel parameter sweeps (rayon)
//! - Runner configuration files (TOML)

pub mod config;
pub mod data_loader;
pub mod export;
pub mod live;
pub mod observers;
pub mod replay;
pub mod runner;
pub mod sweep;

pub use config::{RunnerConfig, RunnerConfigError};
pub use data_loader::{load_csv, parse_csv, LoadError, LoadedData};
pub use export::{load_manifest, save_artifacts, ExportError, RunManifest};
pub use live::{LiveError, LiveLoop, LiveReport, MarketEvent, StopReason};
pub use observers::{TracingObserver, WatchObserver};
pub use replay::spawn_replay;
pub use runner::{run_backtest, run_backtest_from_config, BacktestReport, RunError};
pub use sweep::{ParamSweep, SweepGrid, SweepPoint, SweepResults};
