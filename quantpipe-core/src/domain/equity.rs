//! Per-bar account snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Account state after a bar has been fully processed.
///
/// Exactly one point is appended per processed bar. A close-out after the
/// final bar appends one extra point with `close_out = true`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub bar_index: usize,
    pub timestamp: DateTime<Utc>,
    pub price: f64,
    pub position: f64,
    pub cash: f64,
    pub equity: f64,
    pub drawdown: f64,
    pub halted: bool,
    pub close_out: bool,
}
