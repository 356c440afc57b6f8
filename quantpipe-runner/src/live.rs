//! Async live loop: the event-driven orchestrator.
//!
//! Waits on a market-event channel and a shutdown signal. Each event runs
//! the shared `Pipeline` to completion before the next await, so shutdown is
//! only ever observed between bars. On shutdown or end of stream the open
//! position is closed out exactly once, halted or not.

use quantpipe_core::domain::Bar;
use quantpipe_core::engine::{Observer, Pipeline};
use quantpipe_core::execution::ExecutionAdapter;
use quantpipe_core::signal::SignalEvent;
use quantpipe_core::{ConfigError, DataGapError, PipelineConfig, PipelineError, RunResult};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};

/// One bar and the signal computed on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketEvent {
    pub bar: Bar,
    pub signal: SignalEvent,
}

impl MarketEvent {
    pub fn new(bar: Bar, signal: SignalEvent) -> Self {
        Self { bar, signal }
    }
}

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    Shutdown,
    StreamEnded,
}

/// Result of a live session.
#[derive(Debug, Clone)]
pub struct LiveReport {
    pub result: RunResult,
    pub stop_reason: StopReason,
    /// Events dropped as data gaps when gaps are tolerated.
    pub skipped: Vec<DataGapError>,
}

#[derive(Debug, Error)]
pub enum LiveError {
    /// An intolerable data gap. The position was closed out before returning;
    /// `result` holds the run up to that point.
    #[error("live feed aborted: {source}")]
    DataGap {
        source: DataGapError,
        result: Box<RunResult>,
    },

    #[error("pipeline error: {0}")]
    Pipeline(PipelineError),
}

pub struct LiveLoop {
    pipeline: Pipeline,
}

impl LiveLoop {
    /// Validates the config before anything else.
    pub fn new(config: PipelineConfig, executor: Box<dyn ExecutionAdapter>) -> Result<Self, ConfigError> {
        Ok(Self {
            pipeline: Pipeline::new(config, executor)?,
        })
    }

    pub fn with_observer(mut self, observer: Box<dyn Observer>) -> Self {
        self.pipeline.add_observer(observer);
        self
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Drive the pipeline until shutdown or the event stream ends.
    pub async fn run(
        mut self,
        mut events: mpsc::Receiver<MarketEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<LiveReport, LiveError> {
        let tolerate_gaps = self.pipeline.config().tolerate_data_gaps;
        let mut skipped = Vec::new();
        let mut shutdown_open = true;

        info!(
            executor = self.pipeline.executor_name(),
            tolerate_gaps,
            "live loop started"
        );

        let stop_reason = if *shutdown.borrow_and_update() {
            StopReason::Shutdown
        } else {
            loop {
                tokio::select! {
                    biased;

                    changed = shutdown.changed(), if shutdown_open => {
                        match changed {
                            Ok(()) if *shutdown.borrow_and_update() => {
                                info!("shutdown signal received");
                                break StopReason::Shutdown;
                            }
                            Ok(()) => {}
                            // Sender gone: no shutdown can arrive any more, run until the stream ends
                            Err(_) => shutdown_open = false,
                        }
                    }

                    event = events.recv() => {
                        let Some(event) = event else {
                            info!("market stream ended");
                            break StopReason::StreamEnded;
                        };
                        match self.pipeline.process_bar(&event.bar, &event.signal) {
                            Ok(_) => {}
                            Err(PipelineError::DataGap(gap)) if tolerate_gaps => {
                                warn!(%gap, "skipping event");
                                skipped.push(gap);
                            }
                            Err(PipelineError::DataGap(gap)) => {
                                error!(%gap, "data gap, closing out");
                                self.close_out();
                                return Err(LiveError::DataGap {
                                    source: gap,
                                    result: Box::new(self.pipeline.finish()),
                                });
                            }
                            Err(other) => return Err(LiveError::Pipeline(other)),
                        }
                    }
                }
            }
        };

        self.close_out();
        let result = self.pipeline.finish();
        info!(
            reason = ?stop_reason,
            bars = result.bars_processed,
            skipped = skipped.len(),
            trades = result.summary.trade_count,
            final_equity = result.summary.final_equity,
            halted = result.risk.halted,
            "live loop stopped"
        );
        Ok(LiveReport {
            result,
            stop_reason,
            skipped,
        })
    }

    fn close_out(&mut self) {
        if let Err(failure) = self.pipeline.close_out() {
            warn!(%failure, "live close-out failed, position left open");
        }
    }
}
