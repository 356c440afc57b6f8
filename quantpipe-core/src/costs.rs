//! Transaction cost model: proportional fees, optional fixed fee, and slippage.
//!
//! The cost of a candidate is computed from its signed position delta before the
//! risk gate sees it, so the gate can account for friction. A zero delta costs
//! nothing under every regime.
//!
//! Slippage is directional: buyers pay more (higher price), sellers receive less.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Fee schedule applied to every executed delta.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CostRegime {
    /// `|delta| * price * ptc`
    ProportionalOnly { ptc: f64 },
    /// `ftc + |delta| * price * ptc`, charged only when the delta is non-zero.
    FixedPlusProportional { ftc: f64, ptc: f64 },
}

/// Trade direction implied by a position delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// `None` for a zero delta.
    pub fn from_delta(delta: f64) -> Option<Self> {
        if delta > 0.0 {
            Some(Side::Buy)
        } else if delta < 0.0 {
            Some(Side::Sell)
        } else {
            None
        }
    }

    pub fn sign(self) -> f64 {
        match self {
            Side::Buy => 1.0,
            Side::Sell => -1.0,
        }
    }
}

/// Cost model for execution friction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransactionCostModel {
    pub regime: CostRegime,
    /// Slippage in basis points, applied directionally by simulated execution.
    #[serde(default)]
    pub slippage_bps: f64,
}

impl Default for TransactionCostModel {
    fn default() -> Self {
        Self::proportional(0.0005)
    }
}

impl TransactionCostModel {
    pub fn proportional(ptc: f64) -> Self {
        Self {
            regime: CostRegime::ProportionalOnly { ptc },
            slippage_bps: 0.0,
        }
    }

    pub fn fixed_plus_proportional(ftc: f64, ptc: f64) -> Self {
        Self {
            regime: CostRegime::FixedPlusProportional { ftc, ptc },
            slippage_bps: 0.0,
        }
    }

    pub fn frictionless() -> Self {
        Self::proportional(0.0)
    }

    pub fn with_slippage_bps(mut self, bps: f64) -> Self {
        self.slippage_bps = bps;
        self
    }

    /// Cost of changing the position by `delta` units at `price`.
    pub fn cost(&self, delta: f64, price: f64) -> f64 {
        if delta == 0.0 {
            return 0.0;
        }
        let notional = delta.abs() * price;
        match self.regime {
            CostRegime::ProportionalOnly { ptc } => notional * ptc,
            CostRegime::FixedPlusProportional { ftc, ptc } => ftc + notional * ptc,
        }
    }

    /// Cost of a further fill of an order whose fixed fee is already paid.
    pub fn follow_on_cost(&self, delta: f64, price: f64) -> f64 {
        let notional = delta.abs() * price;
        match self.regime {
            CostRegime::ProportionalOnly { ptc } | CostRegime::FixedPlusProportional { ptc, .. } => {
                notional * ptc
            }
        }
    }

    /// Apply slippage to a raw fill price.
    pub fn apply_slippage(&self, raw_price: f64, side: Side) -> f64 {
        if self.slippage_bps == 0.0 {
            return raw_price;
        }
        let slip_fraction = self.slippage_bps / 10_000.0;
        match side {
            Side::Buy => raw_price * (1.0 + slip_fraction),
            Side::Sell => raw_price * (1.0 - slip_fraction),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let (ftc, ptc) = match self.regime {
            CostRegime::ProportionalOnly { ptc } => (0.0, ptc),
            CostRegime::FixedPlusProportional { ftc, ptc } => (ftc, ptc),
        };
        if ftc.is_nan() || ftc < 0.0 {
            return Err(ConfigError::Negative { field: "ftc", value: ftc });
        }
        if ptc.is_nan() || ptc < 0.0 {
            return Err(ConfigError::Negative { field: "ptc", value: ptc });
        }
        if self.slippage_bps.is_nan() || self.slippage_bps < 0.0 {
            return Err(ConfigError::Negative {
                field: "slippage_bps",
                value: self.slippage_bps,
            });
        }
        Ok(())
    }
}
