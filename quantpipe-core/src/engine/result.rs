use crate::config::PipelineConfig;
use crate::domain::RunLog;
use crate::error::ExecutionFailure;
use crate::fingerprint::RunFingerprint;
use crate::performance::PerformanceSummary;
use crate::risk::RiskState;
use serde::{Deserialize, Serialize};

/// Output of a finished run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub fingerprint: RunFingerprint,
    pub log: RunLog,
    pub summary: PerformanceSummary,
    pub risk: RiskState,
    pub final_position: f64,
    pub bars_processed: usize,
    /// Set when the final close-out could not be executed.
    pub close_out_failure: Option<ExecutionFailure>,
}

impl RunResult {
    pub fn new(
        config: &PipelineConfig,
        log: RunLog,
        summary: PerformanceSummary,
        risk: RiskState,
        final_position: f64,
        bars_processed: usize,
        close_out_failure: Option<ExecutionFailure>,
    ) -> Self {
        Self {
            fingerprint: RunFingerprint::compute(config, &log),
            log,
            summary,
            risk,
            final_position,
            bars_processed,
            close_out_failure,
        }
    }

    pub fn final_equity(&self) -> f64 {
        self.summary.final_equity
    }
}
