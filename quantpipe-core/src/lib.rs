//! quantpipe core: the event-driven trading decision pipeline.
//!
//! This crate turns a per-bar signal in {-1, 0, +1} into position changes:
//! - Causal one-bar signal lag
//! - Flat / Long / Short state machine under long-only or long-short mode
//! - Proportional and fixed-plus-proportional transaction costs
//! - Risk gate: leverage clamp, fractional Kelly sizing, sticky drawdown breaker
//! - Execution adapters for simulated, paper and live venues
//! - Performance accumulation and a BLAKE3 run fingerprint
//!
//! Everything here is synchronous and deterministic. The async live loop lives
//! in `quantpipe-runner` and drives the same `engine::Pipeline`.

pub mod config;
pub mod costs;
pub mod domain;
pub mod engine;
pub mod error;
pub mod execution;
pub mod fingerprint;
pub mod performance;
pub mod position;
pub mod risk;
pub mod signal;

pub use config::{PipelineConfig, TradingMode, ZeroSignalPolicy};
pub use engine::{BacktestEngine, Pipeline, RunResult};
pub use error::{ConfigError, DataGapError, ExecutionFailure, PipelineError, SignalError};
