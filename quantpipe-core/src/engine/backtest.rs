//! Synchronous, deterministic historical replay.

use crate::config::PipelineConfig;
use crate::domain::Bar;
use crate::error::{ConfigError, DataGapError, PipelineError};
use crate::execution::{ExecutionAdapter, SimulatedExecution};
use crate::signal::SignalSource;
use tracing::{info, warn};

use super::observer::Observer;
use super::pipeline::Pipeline;
use super::result::RunResult;

/// Replays a finite bar series through the pipeline.
///
/// Any data gap is fatal. With `close_out_at_end` an open position is
/// flattened at the last bar's price after the loop.
#[derive(Debug, Clone)]
pub struct BacktestEngine {
    config: PipelineConfig,
}

impl BacktestEngine {
    pub fn new(config: PipelineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run with simulated execution and no observers.
    pub fn run(&self, bars: &[Bar], signals: &mut dyn SignalSource) -> Result<RunResult, PipelineError> {
        let executor = Box::new(SimulatedExecution::new(self.config.costs));
        self.run_with(bars, signals, executor, Vec::new())
    }

    pub fn run_with(
        &self,
        bars: &[Bar],
        signals: &mut dyn SignalSource,
        executor: Box<dyn ExecutionAdapter>,
        observers: Vec<Box<dyn Observer>>,
    ) -> Result<RunResult, PipelineError> {
        let mut pipeline = Pipeline::new(self.config.clone(), executor)?;
        for observer in observers {
            pipeline.add_observer(observer);
        }

        for (bar_index, bar) in bars.iter().enumerate() {
            let event = signals.next_signal().ok_or(DataGapError::SignalExhausted {
                bar_index,
                timestamp: bar.timestamp,
            })?;
            pipeline.process_bar(bar, &event)?;
        }

        if self.config.close_out_at_end {
            if let Err(failure) = pipeline.close_out() {
                warn!(%failure, "backtest close-out failed");
            }
        }

        let result = pipeline.finish();
        info!(
            bars = result.bars_processed,
            trades = result.summary.trade_count,
            final_equity = result.summary.final_equity,
            halted = result.risk.halted,
            "backtest complete"
        );
        Ok(result)
    }
}
