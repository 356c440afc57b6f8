//! Execution adapters: the boundary between a decided trade and a confirmed fill.
//!
//! The pipeline never mutates the position on its own: it hands an
//! `ExecutionRequest` to an adapter and commits only what comes back as a `Fill`.

pub mod live;
pub mod paper;
pub mod simulated;

pub use live::{LiveExecution, OrderTicket, RateLimitBackoff, Venue, VenueError, VenueReport};
pub use paper::PaperVenue;
pub use simulated::SimulatedExecution;

use crate::domain::Fill;
use crate::error::ExecutionFailure;
use chrono::{DateTime, Utc};

/// A gated trade ready for execution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExecutionRequest {
    pub bar_index: usize,
    pub timestamp: DateTime<Utc>,
    pub from: f64,
    pub to: f64,
    /// Reference price for the bar.
    pub price: f64,
    /// Cost of the full delta from the cost model.
    pub cost: f64,
}

impl ExecutionRequest {
    pub fn delta(&self) -> f64 {
        self.to - self.from
    }
}

/// Turns requests into fills.
pub trait ExecutionAdapter: Send {
    fn name(&self) -> &str;

    fn execute(&mut self, request: &ExecutionRequest) -> Result<Fill, ExecutionFailure>;
}
