//! Simulated execution for backtests: pure, always fills the whole delta.

use super::{ExecutionAdapter, ExecutionRequest};
use crate::costs::{Side, TransactionCostModel};
use crate::domain::Fill;
use crate::error::ExecutionFailure;

/// Fills at the reference price, moved by the cost model's slippage.
#[derive(Debug, Clone)]
pub struct SimulatedExecution {
    costs: TransactionCostModel,
}

impl SimulatedExecution {
    pub fn new(costs: TransactionCostModel) -> Self {
        Self { costs }
    }
}

impl ExecutionAdapter for SimulatedExecution {
    fn name(&self) -> &str {
        "simulated"
    }

    fn execute(&mut self, request: &ExecutionRequest) -> Result<Fill, ExecutionFailure> {
        let delta = request.delta();
        let Some(side) = Side::from_delta(delta) else {
            return Err(ExecutionFailure::NothingFilled);
        };
        let price = self.costs.apply_slippage(request.price, side);
        Ok(Fill::full(price, delta, request.cost))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn request(from: f64, to: f64) -> ExecutionRequest {
        ExecutionRequest {
            bar_index: 1,
            timestamp: Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
            from,
            to,
            price: 100.0,
            cost: 0.05,
        }
    }

    #[test]
    fn fills_full_delta_at_reference_price() {
        let mut sim = SimulatedExecution::new(TransactionCostModel::proportional(0.0005));
        let fill = sim.execute(&request(0.0, 1.0)).unwrap();
        assert_eq!(fill.quantity, 1.0);
        assert_eq!(fill.price, 100.0);
        assert_eq!(fill.fee, 0.05);
        assert!(!fill.is_partial());
    }

    #[test]
    fn slippage_moves_fill_against_trader() {
        let mut sim = SimulatedExecution::new(TransactionCostModel::frictionless().with_slippage_bps(10.0));
        let sell = sim.execute(&request(1.0, -1.0)).unwrap();
        assert_eq!(sell.quantity, -2.0);
        assert!((sell.price - 99.9).abs() < 1e-10);
    }

    #[test]
    fn zero_delta_is_not_a_fill() {
        let mut sim = SimulatedExecution::new(TransactionCostModel::frictionless());
        assert_eq!(sim.execute(&request(1.0, 1.0)), Err(ExecutionFailure::NothingFilled));
    }
}
