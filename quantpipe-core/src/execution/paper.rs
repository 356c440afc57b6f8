//! Paper venue: a virtual account behind the live execution path.
//!
//! Keeps cash and asset balances, charges the configured costs, and rejects
//! orders the balance cannot cover. Random rejections and partial fills can be
//! injected from a seeded generator to exercise failure handling.

use super::live::{OrderTicket, Venue, VenueError, VenueReport};
use crate::costs::{Side, TransactionCostModel};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Debug, Clone)]
pub struct PaperVenue {
    cash: f64,
    asset: f64,
    costs: TransactionCostModel,
    allow_short: bool,
    reject_probability: f64,
    partial_probability: f64,
    rng: StdRng,
    next_order: u64,
}

impl PaperVenue {
    pub fn new(cash: f64, costs: TransactionCostModel) -> Self {
        Self {
            cash,
            asset: 0.0,
            costs,
            allow_short: false,
            reject_probability: 0.0,
            partial_probability: 0.0,
            rng: StdRng::seed_from_u64(0),
            next_order: 0,
        }
    }

    pub fn with_shorting(mut self, allow: bool) -> Self {
        self.allow_short = allow;
        self
    }

    /// Inject random failures. Probabilities are clamped into [0, 1].
    pub fn with_faults(mut self, reject_probability: f64, partial_probability: f64, seed: u64) -> Self {
        self.reject_probability = clamp_probability(reject_probability);
        self.partial_probability = clamp_probability(partial_probability);
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn asset(&self) -> f64 {
        self.asset
    }
}

fn clamp_probability(p: f64) -> f64 {
    if p.is_nan() {
        0.0
    } else {
        p.clamp(0.0, 1.0)
    }
}

impl Venue for PaperVenue {
    fn submit_market_order(&mut self, ticket: &OrderTicket) -> Result<VenueReport, VenueError> {
        if self.rng.gen_bool(self.reject_probability) {
            return Err(VenueError::Rejected("paper venue random rejection".into()));
        }
        let mut quantity = ticket.quantity;
        if self.rng.gen_bool(self.partial_probability) {
            quantity *= 0.5;
        }
        let price = ticket.reference_price;
        // The fixed fee is charged once per logical order
        let fee = if ticket.prior_fill > 0.0 {
            self.costs.follow_on_cost(quantity, price)
        } else {
            self.costs.cost(quantity, price)
        };

        match ticket.side {
            Side::Buy => {
                let needed = quantity * price + fee;
                if needed > self.cash + 1e-9 {
                    return Err(VenueError::InsufficientBalance {
                        needed,
                        available: self.cash,
                    });
                }
                self.cash -= needed;
                self.asset += quantity;
            }
            Side::Sell => {
                if !self.allow_short && quantity > self.asset + 1e-12 {
                    return Err(VenueError::InsufficientBalance {
                        needed: quantity,
                        available: self.asset,
                    });
                }
                self.cash += quantity * price - fee;
                self.asset -= quantity;
            }
        }

        self.next_order += 1;
        Ok(VenueReport {
            order_id: format!("paper-{}", self.next_order),
            filled_quantity: quantity,
            avg_price: price,
            fee,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::{ExecutionAdapter, ExecutionRequest, LiveExecution};
    use chrono::{TimeZone, Utc};

    fn buy(quantity: f64, price: f64) -> OrderTicket {
        OrderTicket {
            side: Side::Buy,
            quantity,
            reference_price: price,
            prior_fill: 0.0,
        }
    }

    fn sell(quantity: f64, price: f64) -> OrderTicket {
        OrderTicket {
            side: Side::Sell,
            quantity,
            reference_price: price,
            prior_fill: 0.0,
        }
    }

    #[test]
    fn buy_then_sell_updates_balances() {
        let mut venue = PaperVenue::new(1_000.0, TransactionCostModel::proportional(0.001));
        let report = venue.submit_market_order(&buy(2.0, 100.0)).unwrap();
        assert_eq!(report.filled_quantity, 2.0);
        assert!((report.fee - 0.2).abs() < 1e-12);
        assert!((venue.cash() - 799.8).abs() < 1e-9);
        assert_eq!(venue.asset(), 2.0);

        venue.submit_market_order(&sell(2.0, 110.0)).unwrap();
        assert_eq!(venue.asset(), 0.0);
        assert!((venue.cash() - (799.8 + 220.0 - 0.22)).abs() < 1e-9);
    }

    #[test]
    fn insufficient_cash_rejected() {
        let mut venue = PaperVenue::new(100.0, TransactionCostModel::frictionless());
        let err = venue.submit_market_order(&buy(1.0, 30_000.0)).unwrap_err();
        assert!(matches!(err, VenueError::InsufficientBalance { .. }));
        assert_eq!(venue.cash(), 100.0);
    }

    #[test]
    fn short_sale_requires_permission() {
        let mut venue = PaperVenue::new(100.0, TransactionCostModel::frictionless());
        assert!(venue.submit_market_order(&sell(1.0, 10.0)).is_err());

        let mut venue = PaperVenue::new(100.0, TransactionCostModel::frictionless()).with_shorting(true);
        venue.submit_market_order(&sell(1.0, 10.0)).unwrap();
        assert_eq!(venue.asset(), -1.0);
        assert_eq!(venue.cash(), 110.0);
    }

    #[test]
    fn certain_rejection_always_fails() {
        let mut venue =
            PaperVenue::new(1_000.0, TransactionCostModel::frictionless()).with_faults(1.0, 0.0, 9);
        for _ in 0..5 {
            assert!(matches!(
                venue.submit_market_order(&buy(1.0, 1.0)),
                Err(VenueError::Rejected(_))
            ));
        }
    }

    #[test]
    fn certain_partial_halves_quantity() {
        let mut venue =
            PaperVenue::new(1_000.0, TransactionCostModel::frictionless()).with_faults(0.0, 1.0, 9);
        let report = venue.submit_market_order(&buy(4.0, 1.0)).unwrap();
        assert_eq!(report.filled_quantity, 2.0);
    }

    #[test]
    fn fixed_fee_charged_once_across_partial_retries() {
        let costs = TransactionCostModel::fixed_plus_proportional(1.0, 0.001);
        let venue = PaperVenue::new(1_000.0, costs).with_faults(0.0, 1.0, 5);
        let mut exec = LiveExecution::new(venue).with_max_retries(1);
        let request = ExecutionRequest {
            bar_index: 0,
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            from: 0.0,
            to: 4.0,
            price: 100.0,
            cost: costs.cost(4.0, 100.0),
        };
        let fill = exec.execute(&request).unwrap();
        // 2 then 1 unit filled: one ftc plus ptc on 300 of notional
        assert_eq!(fill.quantity, 3.0);
        assert!((fill.fee - (1.0 + 0.3)).abs() < 1e-12);
        assert!(fill.fee <= request.cost);
        assert!((exec.venue().cash() - (1_000.0 - 300.0 - 1.3)).abs() < 1e-9);
    }

    #[test]
    fn seeded_faults_are_reproducible() {
        let run = |seed| {
            let mut venue =
                PaperVenue::new(1e9, TransactionCostModel::frictionless()).with_faults(0.3, 0.3, seed);
            (0..50)
                .map(|_| venue.submit_market_order(&buy(1.0, 1.0)).map(|r| r.filled_quantity).ok())
                .collect::<Vec<_>>()
        };
        assert_eq!(run(42), run(42));
    }
}
