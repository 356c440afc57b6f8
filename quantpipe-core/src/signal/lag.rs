//! Causal one-bar lag.
//!
//! A signal observed at the close of bar t may only influence the trade
//! executed at bar t+1. The lagger is the single place that enforces this.

use super::Signal;

/// One-slot buffer: `push(s_t)` returns `s_{t-1}`.
#[derive(Debug, Clone, Default)]
pub struct SignalLagger {
    previous: Option<Signal>,
}

impl SignalLagger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the current bar's signal and return the previous bar's.
    ///
    /// Returns `None` on the first bar.
    pub fn push(&mut self, current: Signal) -> Option<Signal> {
        self.previous.replace(current)
    }

    /// The signal that will be released on the next push.
    pub fn pending(&self) -> Option<Signal> {
        self.previous
    }
}
