//! Performance accumulator: folds every equity point into running statistics
//! and produces a summary that can be recomputed from the run log alone.

pub mod metrics;
pub mod tail;

use crate::config::PerformanceConfig;
use crate::domain::{AttemptOutcome, EquityPoint, RunLog};
use crate::risk::{kelly_from_returns, optimal_leverage};
use serde::{Deserialize, Serialize};

/// Online statistics, updated per equity point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunningStats {
    pub periods: usize,
    pub peak_equity: f64,
    pub last_equity: f64,
    pub drawdown: f64,
    pub max_drawdown: f64,
    /// Mean of period log returns.
    pub mean_return: f64,
    m2: f64,
}

impl RunningStats {
    fn new(initial_equity: f64) -> Self {
        Self {
            periods: 0,
            peak_equity: initial_equity,
            last_equity: initial_equity,
            drawdown: 0.0,
            max_drawdown: 0.0,
            mean_return: 0.0,
            m2: 0.0,
        }
    }

    /// Population variance of period log returns.
    pub fn variance(&self) -> f64 {
        if self.periods == 0 {
            return 0.0;
        }
        self.m2 / self.periods as f64
    }
}

/// End-of-run performance figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    pub periods: usize,
    pub final_equity: f64,
    pub total_return: f64,
    pub annualized_return: f64,
    pub annualized_volatility: f64,
    pub sharpe: f64,
    pub sortino: f64,
    /// Positive fraction.
    pub max_drawdown: f64,
    pub var: f64,
    pub cvar: f64,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub kelly_fraction: f64,
    pub half_kelly: f64,
    /// `(mu - r) / sigma^2` on annualised figures.
    pub optimal_leverage: f64,
    pub total_costs: f64,
    pub trade_count: usize,
    pub halted_rejections: usize,
    pub execution_failures: usize,
    pub suppressed_intents: usize,
}

impl PerformanceSummary {
    /// Recompute the summary from a finished log.
    pub fn from_log(log: &RunLog, config: PerformanceConfig, initial_capital: f64) -> Self {
        let mut acc = PerformanceAccumulator::new(config, initial_capital);
        for point in &log.equity {
            acc.fold(point);
        }
        acc.summarize(log)
    }
}

#[derive(Debug, Clone)]
pub struct PerformanceAccumulator {
    config: PerformanceConfig,
    running: RunningStats,
    returns: Vec<f64>,
    equity_curve: Vec<f64>,
}

impl PerformanceAccumulator {
    pub fn new(config: PerformanceConfig, initial_capital: f64) -> Self {
        Self {
            config,
            running: RunningStats::new(initial_capital),
            returns: Vec::new(),
            equity_curve: vec![initial_capital],
        }
    }

    pub fn running(&self) -> &RunningStats {
        &self.running
    }

    pub fn returns(&self) -> &[f64] {
        &self.returns
    }

    /// Drawdown `equity` would have against the running peak.
    pub fn drawdown_at(&self, equity: f64) -> f64 {
        let peak = self.running.peak_equity.max(equity);
        if peak <= 0.0 {
            return 0.0;
        }
        ((peak - equity) / peak).max(0.0)
    }

    /// Fold one equity point. Returns the period log return.
    pub fn fold(&mut self, point: &EquityPoint) -> f64 {
        let r = metrics::log_return(self.running.last_equity, point.equity);
        let s = &mut self.running;
        s.periods += 1;
        let delta = r - s.mean_return;
        s.mean_return += delta / s.periods as f64;
        s.m2 += delta * (r - s.mean_return);

        s.peak_equity = s.peak_equity.max(point.equity);
        s.drawdown = if s.peak_equity > 0.0 {
            ((s.peak_equity - point.equity) / s.peak_equity).max(0.0)
        } else {
            0.0
        };
        s.max_drawdown = s.max_drawdown.max(s.drawdown);
        s.last_equity = point.equity;

        self.returns.push(r);
        self.equity_curve.push(point.equity);
        r
    }

    /// Full summary; trade and attempt counts come from `log`.
    pub fn summarize(&self, log: &RunLog) -> PerformanceSummary {
        let p = self.config.periods_per_year;
        let r = &self.returns;
        let kelly = kelly_from_returns(r).map(|k| k.kelly).unwrap_or(0.0);
        let ann_mean = metrics::mean_f64(r) * p as f64;
        let ann_var = metrics::population_variance(r) * p as f64;

        PerformanceSummary {
            periods: r.len(),
            final_equity: self.running.last_equity,
            total_return: metrics::total_return(r),
            annualized_return: metrics::annualized_return(r, p),
            annualized_volatility: metrics::annualized_volatility(r, p),
            sharpe: metrics::sharpe_ratio(r, p, self.config.risk_free_rate),
            sortino: metrics::sortino_ratio(r, p, self.config.risk_free_rate),
            max_drawdown: metrics::max_drawdown(&self.equity_curve),
            var: tail::historical_var(r, self.config.var_confidence),
            cvar: tail::historical_cvar(r, self.config.var_confidence),
            win_rate: metrics::win_rate(r),
            profit_factor: metrics::profit_factor(r),
            kelly_fraction: kelly,
            half_kelly: kelly * 0.5,
            optimal_leverage: optimal_leverage(ann_mean, ann_var, self.config.risk_free_rate),
            total_costs: log.total_costs(),
            trade_count: log.trades.len(),
            halted_rejections: count_outcomes(log, |o| matches!(o, AttemptOutcome::HaltedRejection)),
            execution_failures: count_outcomes(log, |o| matches!(o, AttemptOutcome::ExecutionFailed { .. })),
            suppressed_intents: count_outcomes(log, |o| matches!(o, AttemptOutcome::IntentSuppressed)),
        }
    }
}

fn count_outcomes(log: &RunLog, pred: impl Fn(&AttemptOutcome) -> bool) -> usize {
    log.attempts.iter().filter(|a| pred(&a.outcome)).count()
}
