//! Orchestration core: the shared per-bar pipeline and the backtest engine.
//!
//! `Pipeline` owns every stage and runs them in a fixed order. The backtest
//! engine drives it from a finite bar series; the live loop in the runner
//! crate drives the same type from an async event stream.

pub mod accounting;
pub mod backtest;
pub mod observer;
pub mod pipeline;
pub mod result;

pub use accounting::Account;
pub use backtest::BacktestEngine;
pub use observer::{BarSnapshot, Observer, RecordingObserver};
pub use pipeline::Pipeline;
pub use result::RunResult;
