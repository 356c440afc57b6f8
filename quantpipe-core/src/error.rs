//! Error taxonomy for the pipeline.
//!
//! Configuration and data-integrity errors are fatal and surface immediately.
//! Execution failures are recoverable: they are logged, recorded in the attempt
//! log, and the run continues with the position unchanged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Invalid parameter combination, detected before any bar is processed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{field} must be > 0 (got {value})")]
    NonPositive { field: &'static str, value: f64 },

    #[error("{field} must be >= 0 (got {value})")]
    Negative { field: &'static str, value: f64 },

    #[error("{field} must lie in {range} (got {value})")]
    OutOfRange {
        field: &'static str,
        range: &'static str,
        value: f64,
    },

    #[error("periods_per_year must be > 0")]
    ZeroPeriodsPerYear,

    #[error("kelly window ({window}) must be >= min_samples ({min_samples}) and > 0")]
    KellyWindow { window: usize, min_samples: usize },

    #[error("failed to parse config: {0}")]
    Parse(String),
}

/// The bar/signal sequence violates its ordering precondition.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataGapError {
    #[error("bar {bar_index}: timestamp {timestamp} is not after previous bar {previous}")]
    OutOfOrder {
        bar_index: usize,
        previous: DateTime<Utc>,
        timestamp: DateTime<Utc>,
    },

    #[error("bar {bar_index}: duplicate timestamp {timestamp}")]
    Duplicate {
        bar_index: usize,
        timestamp: DateTime<Utc>,
    },

    #[error("bar {bar_index}: signal timestamp {signal} does not match bar timestamp {bar}")]
    SignalMismatch {
        bar_index: usize,
        bar: DateTime<Utc>,
        signal: DateTime<Utc>,
    },

    #[error("bar {bar_index} at {timestamp}: signal source exhausted")]
    SignalExhausted {
        bar_index: usize,
        timestamp: DateTime<Utc>,
    },

    #[error("bar {bar_index} at {timestamp}: malformed OHLC values")]
    MalformedBar {
        bar_index: usize,
        timestamp: DateTime<Utc>,
    },
}

/// A signal value outside {-1, 0, +1}.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("signal must be one of -1, 0, 1 (got {0})")]
pub struct SignalError(pub i64);

/// The execution venue did not confirm a fill.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExecutionFailure {
    #[error("insufficient balance: needed {needed:.4}, available {available:.4}")]
    InsufficientBalance { needed: f64, available: f64 },

    #[error("symbol halted by venue")]
    SymbolHalted,

    #[error("rate limited after {attempts} attempts")]
    RateLimited { attempts: u32 },

    #[error("order rejected: {reason}")]
    Rejected { reason: String },

    #[error("venue unreachable: {reason}")]
    Transport { reason: String },

    #[error("order acknowledged but nothing filled")]
    NothingFilled,

    #[error("close-out only partially filled, {remaining:.8} left open")]
    PartialCloseOut { remaining: f64 },
}

/// Fatal pipeline errors.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("data gap: {0}")]
    DataGap(#[from] DataGapError),

    #[error("pipeline already closed out")]
    AlreadyClosed,
}
