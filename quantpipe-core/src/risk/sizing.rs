//! Position sizing: fixed leverage or fractional Kelly, clamped to the leverage cap.

use super::kelly::kelly_from_returns;
use crate::config::SizingConfig;
use crate::domain::Clamp;

/// Sized absolute quantity for a directional target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizeDecision {
    pub requested: f64,
    pub allowed: f64,
}

impl SizeDecision {
    /// `Some` when the cap cut the requested size.
    pub fn clamp(&self) -> Option<Clamp> {
        (self.requested > self.allowed + 1e-12).then_some(Clamp {
            requested: self.requested,
            allowed: self.allowed,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Sizer {
    config: SizingConfig,
}

impl Sizer {
    pub fn new(config: SizingConfig) -> Self {
        Self { config }
    }

    pub fn max_position(&self) -> f64 {
        self.config.max_position()
    }

    /// Size from the trailing return window.
    ///
    /// The base request is `units * leverage`. Once enough non-zero returns
    /// exist and both wins and losses are present, Kelly scales that request
    /// by `kelly * fraction`. The leverage cap is applied last.
    pub fn size(&self, trailing: &[f64]) -> SizeDecision {
        let base = self.config.units * self.config.leverage;
        let kelly = &self.config.kelly;
        let requested = if kelly.enabled {
            let samples = trailing.iter().filter(|r| **r != 0.0).count();
            match kelly_from_returns(trailing) {
                Some(est) if samples >= kelly.min_samples => base * est.kelly.max(0.0) * kelly.fraction,
                _ => base,
            }
        } else {
            base
        };
        SizeDecision {
            requested,
            allowed: requested.min(self.max_position()),
        }
    }
}
