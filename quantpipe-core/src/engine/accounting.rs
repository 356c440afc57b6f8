use crate::domain::Fill;

/// Cash and fee tracker. The position quantity lives in the state machine.
#[derive(Debug, Clone)]
pub struct Account {
    initial_cash: f64,
    cash: f64,
    fees_paid: f64,
}

impl Account {
    pub fn new(initial_cash: f64) -> Self {
        Self {
            initial_cash,
            cash: initial_cash,
            fees_paid: 0.0,
        }
    }

    /// Apply a fill to cash: outflow for buys, inflow for sells, fee always deducted.
    pub fn apply_fill(&mut self, fill: &Fill) {
        self.cash += fill.cash_delta();
        self.fees_paid += fill.fee;
    }

    /// Cash plus the marked value of `position` at `price`.
    pub fn equity(&self, position: f64, price: f64) -> f64 {
        self.cash + position * price
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn initial_cash(&self) -> f64 {
        self.initial_cash
    }

    pub fn fees_paid(&self) -> f64 {
        self.fees_paid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_pnl_net_of_fees() {
        let mut acct = Account::new(1_000.0);
        acct.apply_fill(&Fill::full(100.0, 2.0, 1.0));
        assert_eq!(acct.cash(), 799.0);
        assert_eq!(acct.equity(2.0, 110.0), 1_019.0);

        acct.apply_fill(&Fill::full(110.0, -2.0, 1.0));
        assert_eq!(acct.cash(), 1_018.0);
        assert_eq!(acct.fees_paid(), 2.0);
        assert_eq!(acct.initial_cash(), 1_000.0);
    }

    #[test]
    fn short_position_marks_negative() {
        let mut acct = Account::new(1_000.0);
        acct.apply_fill(&Fill::full(100.0, -1.0, 0.0));
        assert_eq!(acct.cash(), 1_100.0);
        assert_eq!(acct.equity(-1.0, 120.0), 980.0);
    }
}
