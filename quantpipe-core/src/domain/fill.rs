//! Fill: a confirmed execution result.

use serde::{Deserialize, Serialize};

/// Whether the venue filled the whole requested delta.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FillStatus {
    Full,
    /// Only part of `requested` (signed delta) was filled.
    Partial { requested: f64 },
}

/// A confirmed fill. `quantity` is the signed position delta actually filled.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub price: f64,
    pub quantity: f64,
    pub fee: f64,
    pub status: FillStatus,
}

impl Fill {
    pub fn full(price: f64, quantity: f64, fee: f64) -> Self {
        Self {
            price,
            quantity,
            fee,
            status: FillStatus::Full,
        }
    }

    pub fn is_partial(&self) -> bool {
        matches!(self.status, FillStatus::Partial { .. })
    }

    /// Signed cash flow of the fill: negative when buying.
    pub fn cash_delta(&self) -> f64 {
        -(self.quantity * self.price) - self.fee
    }
}
