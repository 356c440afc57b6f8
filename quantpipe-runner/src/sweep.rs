//! Parameter sweeps over pipeline configurations.
//!
//! Every grid point is an independent `BacktestEngine` run with its own
//! immutable config, so points execute in parallel on rayon with no shared
//! state. Results come back in grid order regardless of scheduling.

use quantpipe_core::costs::CostRegime;
use quantpipe_core::fingerprint::RunFingerprint;
use quantpipe_core::performance::PerformanceSummary;
use quantpipe_core::{BacktestEngine, PipelineConfig};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::data_loader::LoadedData;
use crate::runner::RunError;

/// Values to sweep per parameter. An empty list keeps the base config's value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepGrid {
    pub leverage: Vec<f64>,
    pub max_drawdown: Vec<f64>,
    pub kelly: Vec<bool>,
    /// Proportional cost rate; the fixed fee of the base regime is kept.
    pub ptc: Vec<f64>,
}

fn axis<T: Copy>(values: &[T], base: T) -> Vec<T> {
    if values.is_empty() {
        vec![base]
    } else {
        values.to_vec()
    }
}

impl SweepGrid {
    /// Number of configurations the grid expands to.
    pub fn size(&self) -> usize {
        [self.leverage.len(), self.max_drawdown.len(), self.kelly.len(), self.ptc.len()]
            .iter()
            .map(|&n| n.max(1))
            .product()
    }

    /// Expand into concrete configs, leverage outermost, ptc innermost.
    pub fn generate_configs(&self, base: &PipelineConfig) -> Vec<PipelineConfig> {
        let base_ptc = match base.costs.regime {
            CostRegime::ProportionalOnly { ptc } | CostRegime::FixedPlusProportional { ptc, .. } => ptc,
        };
        let mut configs = Vec::with_capacity(self.size());

        for &leverage in &axis(&self.leverage, base.sizing.leverage) {
            for &max_drawdown in &axis(&self.max_drawdown, base.risk.max_drawdown) {
                for &kelly in &axis(&self.kelly, base.sizing.kelly.enabled) {
                    for &ptc in &axis(&self.ptc, base_ptc) {
                        let mut config = base.clone();
                        config.sizing.leverage = leverage;
                        config.risk.max_drawdown = max_drawdown;
                        config.sizing.kelly.enabled = kelly;
                        config.costs.regime = match base.costs.regime {
                            CostRegime::ProportionalOnly { .. } => CostRegime::ProportionalOnly { ptc },
                            CostRegime::FixedPlusProportional { ftc, .. } => {
                                CostRegime::FixedPlusProportional { ftc, ptc }
                            }
                        };
                        configs.push(config);
                    }
                }
            }
        }
        configs
    }
}

/// Outcome of one grid point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepPoint {
    pub config: PipelineConfig,
    pub fingerprint: RunFingerprint,
    pub summary: PerformanceSummary,
    pub halted: bool,
}

/// All grid points, in grid order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepResults {
    pub points: Vec<SweepPoint>,
}

impl SweepResults {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Points sorted by descending Sharpe; ties keep grid order.
    pub fn ranked_by_sharpe(&self) -> Vec<&SweepPoint> {
        let mut ranked: Vec<&SweepPoint> = self.points.iter().collect();
        ranked.sort_by(|a, b| b.summary.sharpe.total_cmp(&a.summary.sharpe));
        ranked
    }

    pub fn best_by_sharpe(&self) -> Option<&SweepPoint> {
        self.ranked_by_sharpe().into_iter().next()
    }
}

/// Sweep executor over one loaded dataset.
pub struct ParamSweep<'a> {
    data: &'a LoadedData,
    parallel: bool,
}

impl<'a> ParamSweep<'a> {
    pub fn new(data: &'a LoadedData) -> Self {
        Self { data, parallel: true }
    }

    /// Enables or disables parallel execution.
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn sweep(&self, grid: &SweepGrid, base: &PipelineConfig) -> Result<SweepResults, RunError> {
        let configs = grid.generate_configs(base);
        info!(points = configs.len(), parallel = self.parallel, "starting sweep");

        let points = if self.parallel {
            configs
                .into_par_iter()
                .map(|config| self.run_point(config))
                .collect::<Result<Vec<_>, _>>()?
        } else {
            configs
                .into_iter()
                .map(|config| self.run_point(config))
                .collect::<Result<Vec<_>, _>>()?
        };

        Ok(SweepResults { points })
    }

    fn run_point(&self, config: PipelineConfig) -> Result<SweepPoint, RunError> {
        let engine = BacktestEngine::new(config.clone())?;
        let mut signals = self.data.signal_source();
        let result = engine.run(&self.data.bars, &mut signals)?;
        debug!(
            leverage = config.sizing.leverage,
            max_drawdown = config.risk.max_drawdown,
            kelly = config.sizing.kelly.enabled,
            sharpe = result.summary.sharpe,
            "sweep point done"
        );
        Ok(SweepPoint {
            halted: result.risk.halted,
            fingerprint: result.fingerprint,
            summary: result.summary,
            config,
        })
    }
}
