//! Live execution through a venue that places market orders and reports fills.
//!
//! Venue errors become `ExecutionFailure`s and are never coerced into a no-op.
//! Partial fills are retried for the remainder up to `max_retries`; whatever
//! is confirmed by then is returned as a partial fill. Rate-limit rejections
//! count against the same bounded retry budget, with an exponential backoff
//! between them. The adapter computes each delay and the venue decides how to
//! honour it through `Venue::wait`, so simulated venues never block.

use super::{ExecutionAdapter, ExecutionRequest};
use crate::costs::Side;
use crate::domain::{Fill, FillStatus};
use crate::error::ExecutionFailure;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

const QTY_EPSILON: f64 = 1e-12;

/// A market order as sent to the venue.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderTicket {
    pub side: Side,
    /// Unsigned quantity.
    pub quantity: f64,
    pub reference_price: f64,
    /// Unsigned quantity of the same logical order already filled by earlier
    /// submissions. Zero on the first fill.
    pub prior_fill: f64,
}

/// Venue confirmation of one order.
#[derive(Debug, Clone, PartialEq)]
pub struct VenueReport {
    pub order_id: String,
    /// Unsigned quantity filled, possibly less than requested.
    pub filled_quantity: f64,
    pub avg_price: f64,
    pub fee: f64,
}

/// Errors reported by a venue.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum VenueError {
    #[error("insufficient balance: needed {needed:.4}, available {available:.4}")]
    InsufficientBalance { needed: f64, available: f64 },

    #[error("symbol halted")]
    SymbolHalted,

    #[error("rate limited")]
    RateLimited,

    #[error("rejected: {0}")]
    Rejected(String),

    #[error("transport: {0}")]
    Transport(String),
}

impl From<VenueError> for ExecutionFailure {
    fn from(err: VenueError) -> Self {
        match err {
            VenueError::InsufficientBalance { needed, available } => {
                ExecutionFailure::InsufficientBalance { needed, available }
            }
            VenueError::SymbolHalted => ExecutionFailure::SymbolHalted,
            VenueError::RateLimited => ExecutionFailure::RateLimited { attempts: 1 },
            VenueError::Rejected(reason) => ExecutionFailure::Rejected { reason },
            VenueError::Transport(reason) => ExecutionFailure::Transport { reason },
        }
    }
}

/// "Place order, get fill". Protocol details live behind this trait.
pub trait Venue: Send {
    fn submit_market_order(&mut self, ticket: &OrderTicket) -> Result<VenueReport, VenueError>;

    /// Pause before resubmitting after a rate limit. The default does not
    /// block; venues backed by a real endpoint should sleep for `delay`.
    fn wait(&mut self, _delay: Duration) {}
}

/// Exponential delay between rate-limited submissions: `base * 2^n`, capped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitBackoff {
    pub base: Duration,
    pub max_delay: Duration,
}

impl Default for RateLimitBackoff {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RateLimitBackoff {
    /// Delay before retry number `retry` (0-based).
    pub fn delay(&self, retry: u32) -> Duration {
        self.base
            .saturating_mul(2u32.saturating_pow(retry))
            .min(self.max_delay)
    }
}

/// Execution adapter over a `Venue`.
#[derive(Debug)]
pub struct LiveExecution<V> {
    venue: V,
    max_retries: u32,
    backoff: RateLimitBackoff,
}

impl<V: Venue> LiveExecution<V> {
    pub fn new(venue: V) -> Self {
        Self {
            venue,
            max_retries: 3,
            backoff: RateLimitBackoff::default(),
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_backoff(mut self, backoff: RateLimitBackoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn venue(&self) -> &V {
        &self.venue
    }

    pub fn into_venue(self) -> V {
        self.venue
    }
}

impl<V: Venue> ExecutionAdapter for LiveExecution<V> {
    fn name(&self) -> &str {
        "live"
    }

    fn execute(&mut self, request: &ExecutionRequest) -> Result<Fill, ExecutionFailure> {
        let delta = request.delta();
        let Some(side) = Side::from_delta(delta) else {
            return Err(ExecutionFailure::NothingFilled);
        };

        let mut remaining = delta.abs();
        let mut filled = 0.0;
        let mut notional = 0.0;
        let mut fees = 0.0;
        let mut attempts = 0u32;
        let mut rate_limited = 0u32;
        let mut last_error: Option<VenueError> = None;

        while remaining > QTY_EPSILON && attempts <= self.max_retries {
            attempts += 1;
            let ticket = OrderTicket {
                side,
                quantity: remaining,
                reference_price: request.price,
                prior_fill: filled,
            };
            match self.venue.submit_market_order(&ticket) {
                Ok(report) => {
                    let qty = report.filled_quantity.min(remaining);
                    debug!(
                        order_id = %report.order_id,
                        requested = remaining,
                        filled = qty,
                        price = report.avg_price,
                        "venue report"
                    );
                    if qty <= QTY_EPSILON {
                        break;
                    }
                    filled += qty;
                    notional += qty * report.avg_price;
                    fees += report.fee;
                    remaining -= qty;
                }
                Err(VenueError::RateLimited) => {
                    let delay = self.backoff.delay(rate_limited);
                    rate_limited += 1;
                    warn!(
                        attempt = attempts,
                        max_retries = self.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        "venue rate limited"
                    );
                    if attempts <= self.max_retries {
                        self.venue.wait(delay);
                    }
                }
                Err(err) => {
                    last_error = Some(err);
                    break;
                }
            }
        }

        if filled <= QTY_EPSILON {
            return Err(match last_error {
                Some(err) => err.into(),
                None if rate_limited > 0 => ExecutionFailure::RateLimited { attempts },
                None => ExecutionFailure::NothingFilled,
            });
        }

        let status = if remaining > QTY_EPSILON {
            warn!(
                bar_index = request.bar_index,
                requested = delta,
                filled = side.sign() * filled,
                "order only partially filled"
            );
            FillStatus::Partial { requested: delta }
        } else {
            FillStatus::Full
        };
        Ok(Fill {
            price: notional / filled,
            quantity: side.sign() * filled,
            fee: fees,
            status,
        })
    }
}
