//! Run log: the result artifact of a pipeline run.

use super::{EquityPoint, TradeAttempt, TradeRecord};
use serde::{Deserialize, Serialize};

/// Append-only record of everything a run did.
///
/// Backtest and live runs over the same stream produce identical logs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunLog {
    pub trades: Vec<TradeRecord>,
    pub equity: Vec<EquityPoint>,
    pub attempts: Vec<TradeAttempt>,
}

impl RunLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn final_equity(&self) -> Option<f64> {
        self.equity.last().map(|p| p.equity)
    }

    pub fn total_costs(&self) -> f64 {
        self.trades.iter().map(|t| t.cost).sum()
    }

    /// Canonical JSON used for byte-level comparison and fingerprinting.
    pub fn to_canonical_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// BLAKE3 hash of the canonical JSON.
    pub fn content_hash(&self) -> String {
        blake3::hash(self.to_canonical_json().as_bytes()).to_hex().to_string()
    }
}
