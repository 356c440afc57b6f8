//! Trade and attempt records: the append-only logs of a run.

use crate::error::ExecutionFailure;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Why a trade happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeKind {
    /// Driven by a lagged signal.
    Signal,
    /// Forced flattening: end of run, shutdown, or a breaker trip with `flatten_on_halt`.
    CloseOut,
}

/// One executed position change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub seq: u64,
    pub bar_index: usize,
    pub timestamp: DateTime<Utc>,
    pub from_position: f64,
    pub to_position: f64,
    pub price: f64,
    /// Signed filled delta.
    pub quantity: f64,
    pub cost: f64,
    pub kind: TradeKind,
    pub partial: bool,
}

impl TradeRecord {
    pub fn notional(&self) -> f64 {
        (self.quantity * self.price).abs()
    }
}

/// Sizing clamp applied to a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Clamp {
    pub requested: f64,
    pub allowed: f64,
}

/// Result of a candidate trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AttemptOutcome {
    Filled,
    PartiallyFilled { filled: f64 },
    HaltedRejection,
    ExecutionFailed { reason: ExecutionFailure },
    /// A short intent was dropped because the mode is long-only.
    IntentSuppressed,
}

/// Entry of the trade-attempt log: every candidate, accepted or not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeAttempt {
    pub bar_index: usize,
    pub timestamp: DateTime<Utc>,
    pub from_position: f64,
    pub requested_position: f64,
    pub kind: TradeKind,
    pub clamp: Option<Clamp>,
    pub outcome: AttemptOutcome,
}

impl TradeAttempt {
    pub fn is_filled(&self) -> bool {
        matches!(
            self.outcome,
            AttemptOutcome::Filled | AttemptOutcome::PartiallyFilled { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn attempt_outcome_serializes_with_tag() {
        let attempt = TradeAttempt {
            bar_index: 3,
            timestamp: Utc.with_ymd_and_hms(2024, 1, 4, 0, 0, 0).unwrap(),
            from_position: 0.0,
            requested_position: 1.0,
            kind: TradeKind::Signal,
            clamp: None,
            outcome: AttemptOutcome::ExecutionFailed {
                reason: ExecutionFailure::SymbolHalted,
            },
        };
        let json = serde_json::to_string(&attempt).unwrap();
        assert!(json.contains("\"outcome\":\"execution_failed\""));
        assert!(json.contains("symbol_halted"));
        assert!(!attempt.is_filled());
    }

    #[test]
    fn notional_is_unsigned() {
        let trade = TradeRecord {
            seq: 0,
            bar_index: 1,
            timestamp: Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
            from_position: 1.0,
            to_position: -1.0,
            price: 50.0,
            quantity: -2.0,
            cost: 0.0,
            kind: TradeKind::Signal,
            partial: false,
        };
        assert_eq!(trade.notional(), 100.0);
    }
}
