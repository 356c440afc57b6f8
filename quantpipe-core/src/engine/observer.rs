//! Observer hook: read-only per-bar snapshots for dashboards and logs.

use crate::domain::TradeRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// Immutable view of the pipeline after a bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarSnapshot {
    pub bar_index: usize,
    pub timestamp: DateTime<Utc>,
    pub position: f64,
    pub equity: f64,
    pub drawdown: f64,
    pub halted: bool,
    /// Trade executed on this bar, if any.
    pub last_trade: Option<TradeRecord>,
}

/// Receives a snapshot after every processed bar and after a close-out.
///
/// Observers get copies and cannot reach back into the pipeline.
pub trait Observer: Send {
    fn on_bar(&mut self, snapshot: &BarSnapshot);
}

/// Collects snapshots into a shared buffer readable from outside the run.
#[derive(Debug, Clone, Default)]
pub struct RecordingObserver {
    snapshots: Arc<Mutex<Vec<BarSnapshot>>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshots received so far.
    pub fn snapshots(&self) -> Vec<BarSnapshot> {
        self.snapshots.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl Observer for RecordingObserver {
    fn on_bar(&mut self, snapshot: &BarSnapshot) {
        if let Ok(mut buf) = self.snapshots.lock() {
            buf.push(snapshot.clone());
        }
    }
}
