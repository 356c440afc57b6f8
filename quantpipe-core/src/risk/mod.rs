//! Risk gate: sizing, leverage clamp, and the sticky drawdown circuit breaker.
//!
//! Per bar the gate is marked to market before any candidate is evaluated.
//! Once the breaker trips it stays tripped until `reset_halt()` is called
//! explicitly: risk-increasing candidates are rejected while risk-reducing
//! ones and close-outs still pass.

pub mod kelly;
pub mod sizing;

pub use kelly::{kelly_from_returns, optimal_leverage, simulate_growth, GrowthPaths, KellyEstimate};
pub use sizing::{SizeDecision, Sizer};

use crate::config::{PipelineConfig, RiskConfig, SizingConfig};
use crate::domain::TradeKind;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{info, warn};

/// Observable state of the gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskState {
    pub peak_equity: f64,
    pub current_equity: f64,
    /// Fractional drawdown from peak, >= 0.
    pub drawdown: f64,
    pub halted: bool,
    /// Bar at which the breaker tripped.
    pub halted_at: Option<usize>,
    pub failed_attempts: u64,
    pub halted_rejections: u64,
    pub suppressed_intents: u64,
}

impl RiskState {
    fn new(initial_equity: f64) -> Self {
        Self {
            peak_equity: initial_equity,
            current_equity: initial_equity,
            drawdown: 0.0,
            halted: false,
            halted_at: None,
            failed_attempts: 0,
            halted_rejections: 0,
            suppressed_intents: 0,
        }
    }
}

/// A proposed position change awaiting the gate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub from: f64,
    pub to: f64,
    pub cost: f64,
    pub kind: TradeKind,
}

impl Candidate {
    /// Moves toward flat without flipping sides.
    pub fn is_risk_reducing(&self) -> bool {
        let same_side_or_flat = self.to == 0.0 || self.to.signum() == self.from.signum();
        same_side_or_flat && self.to.abs() < self.from.abs()
    }
}

/// Gate verdict for a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Approved,
    HaltedRejection,
}

#[derive(Debug, Clone)]
pub struct RiskGate {
    config: RiskConfig,
    sizer: Sizer,
    kelly_window: usize,
    trailing: VecDeque<f64>,
    state: RiskState,
}

impl RiskGate {
    pub fn new(sizing: SizingConfig, config: RiskConfig, initial_equity: f64) -> Self {
        Self {
            config,
            sizer: Sizer::new(sizing),
            kelly_window: sizing.kelly.window.max(1),
            trailing: VecDeque::new(),
            state: RiskState::new(initial_equity),
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.sizing, config.risk, config.initial_capital)
    }

    pub fn state(&self) -> &RiskState {
        &self.state
    }

    pub fn is_halted(&self) -> bool {
        self.state.halted
    }

    pub fn max_position(&self) -> f64 {
        self.sizer.max_position()
    }

    /// Mark to market. Returns true when this update tripped the breaker.
    pub fn update_equity(&mut self, equity: f64, bar_index: usize) -> bool {
        self.state.current_equity = equity;
        if equity > self.state.peak_equity {
            self.state.peak_equity = equity;
        }
        self.state.drawdown = drawdown(self.state.peak_equity, equity);
        if !self.state.halted && self.state.drawdown >= self.config.max_drawdown {
            self.trip(bar_index, self.state.drawdown);
            return true;
        }
        false
    }

    /// Feed one period return into the trailing Kelly window.
    pub fn record_return(&mut self, period_return: f64) {
        if !period_return.is_finite() {
            return;
        }
        self.trailing.push_back(period_return);
        while self.trailing.len() > self.kelly_window {
            self.trailing.pop_front();
        }
    }

    /// Absolute size for a new directional target.
    pub fn size(&mut self) -> SizeDecision {
        self.sizer.size(self.trailing.make_contiguous())
    }

    /// Accept or reject a candidate.
    ///
    /// The candidate's cost is charged against current equity first: if paying
    /// it would breach the threshold, the breaker trips before the verdict.
    pub fn evaluate(&mut self, candidate: &Candidate, bar_index: usize) -> GateDecision {
        if candidate.kind == TradeKind::CloseOut {
            return GateDecision::Approved;
        }
        let reducing = candidate.is_risk_reducing();
        if !self.state.halted {
            let projected = drawdown(self.state.peak_equity, self.state.current_equity - candidate.cost);
            if projected >= self.config.max_drawdown {
                self.trip(bar_index, projected);
            }
        }
        if self.state.halted && !reducing {
            self.state.halted_rejections += 1;
            warn!(
                bar_index,
                from = candidate.from,
                to = candidate.to,
                "risk-increasing trade rejected while halted"
            );
            return GateDecision::HaltedRejection;
        }
        GateDecision::Approved
    }

    pub fn record_failure(&mut self) {
        self.state.failed_attempts += 1;
    }

    pub fn record_suppressed(&mut self) {
        self.state.suppressed_intents += 1;
    }

    /// Operator reset: clear the halt and restart the peak at current equity.
    pub fn reset_halt(&mut self) {
        if self.state.halted {
            info!(equity = self.state.current_equity, "circuit breaker reset");
        }
        self.state.halted = false;
        self.state.halted_at = None;
        self.state.peak_equity = self.state.current_equity;
        self.state.drawdown = 0.0;
    }

    fn trip(&mut self, bar_index: usize, drawdown: f64) {
        self.state.halted = true;
        self.state.halted_at = Some(bar_index);
        warn!(
            bar_index,
            drawdown,
            threshold = self.config.max_drawdown,
            peak = self.state.peak_equity,
            "circuit breaker tripped, trading halted"
        );
    }
}

fn drawdown(peak: f64, equity: f64) -> f64 {
    if peak <= 0.0 {
        return 0.0;
    }
    ((peak - equity) / peak).max(0.0)
}
