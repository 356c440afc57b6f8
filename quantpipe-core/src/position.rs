//! Position state machine.
//!
//! Maps a lagged signal and the trading mode to a target direction. It never
//! decides magnitude (that is the risk gate's job) and it only advances when a
//! fill is committed, never on a proposal.

use crate::config::{TradingMode, ZeroSignalPolicy};
use crate::domain::Fill;
use crate::signal::Signal;
use serde::{Deserialize, Serialize};

/// Position direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionState {
    #[default]
    Flat,
    Long,
    Short,
}

impl PositionState {
    /// Direction of a signed quantity.
    pub fn from_quantity(quantity: f64) -> Self {
        if quantity > 0.0 {
            PositionState::Long
        } else if quantity < 0.0 {
            PositionState::Short
        } else {
            PositionState::Flat
        }
    }

    pub fn sign(self) -> f64 {
        match self {
            PositionState::Flat => 0.0,
            PositionState::Long => 1.0,
            PositionState::Short => -1.0,
        }
    }
}

/// Current holding.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub state: PositionState,
    /// Signed quantity in instrument units.
    pub quantity: f64,
    pub mode: TradingMode,
}

impl Position {
    pub fn flat(mode: TradingMode) -> Self {
        Self {
            state: PositionState::Flat,
            quantity: 0.0,
            mode,
        }
    }

    pub fn is_flat(&self) -> bool {
        self.quantity == 0.0
    }
}

/// Outcome of feeding one lagged signal to the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Proposal {
    pub target: PositionState,
    /// A short was requested in long-only mode and mapped to flat.
    pub short_suppressed: bool,
}

/// Flat / Long / Short machine driven by lagged signals.
#[derive(Debug, Clone)]
pub struct PositionStateMachine {
    position: Position,
    zero_signal: ZeroSignalPolicy,
}

impl PositionStateMachine {
    pub fn new(mode: TradingMode, zero_signal: ZeroSignalPolicy) -> Self {
        Self {
            position: Position::flat(mode),
            zero_signal,
        }
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    /// Target direction for `signal`. Pure: does not change the position.
    ///
    /// When the target equals the current state the caller must not trade.
    pub fn propose(&self, signal: Signal) -> Proposal {
        let current = self.position.state;
        let zero_target = match self.zero_signal {
            ZeroSignalPolicy::Hold => current,
            ZeroSignalPolicy::Flatten => PositionState::Flat,
        };
        match (self.position.mode, signal) {
            (_, Signal::Long) => Proposal {
                target: PositionState::Long,
                short_suppressed: false,
            },
            (_, Signal::Neutral) => Proposal {
                target: zero_target,
                short_suppressed: false,
            },
            (TradingMode::LongShort, Signal::Short) => Proposal {
                target: PositionState::Short,
                short_suppressed: false,
            },
            (TradingMode::LongOnly, Signal::Short) => Proposal {
                target: PositionState::Flat,
                short_suppressed: true,
            },
        }
    }

    /// Advance by a confirmed fill. The position moves by exactly the filled delta.
    pub fn commit(&mut self, fill: &Fill) {
        self.position.quantity += fill.quantity;
        if self.position.quantity.abs() < 1e-12 {
            self.position.quantity = 0.0;
        }
        self.position.state = PositionState::from_quantity(self.position.quantity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FillStatus;

    fn machine(mode: TradingMode) -> PositionStateMachine {
        PositionStateMachine::new(mode, ZeroSignalPolicy::Hold)
    }

    #[test]
    fn long_only_maps_short_to_flat_and_flags() {
        let sm = machine(TradingMode::LongOnly);
        let p = sm.propose(Signal::Short);
        assert_eq!(p.target, PositionState::Flat);
        assert!(p.short_suppressed);
    }

    #[test]
    fn long_short_allows_short() {
        let sm = machine(TradingMode::LongShort);
        let p = sm.propose(Signal::Short);
        assert_eq!(p.target, PositionState::Short);
        assert!(!p.short_suppressed);
    }

    #[test]
    fn neutral_holds_by_default() {
        let mut sm = machine(TradingMode::LongShort);
        sm.commit(&Fill::full(100.0, 1.0, 0.0));
        assert_eq!(sm.propose(Signal::Neutral).target, PositionState::Long);
    }

    #[test]
    fn neutral_flattens_when_configured() {
        let mut sm = PositionStateMachine::new(TradingMode::LongOnly, ZeroSignalPolicy::Flatten);
        sm.commit(&Fill::full(100.0, 1.0, 0.0));
        assert_eq!(sm.propose(Signal::Neutral).target, PositionState::Flat);
    }

    #[test]
    fn propose_does_not_advance_state() {
        let sm = machine(TradingMode::LongOnly);
        let _ = sm.propose(Signal::Long);
        assert_eq!(sm.position().state, PositionState::Flat);
        assert!(sm.position().is_flat());
    }

    #[test]
    fn commit_applies_only_filled_quantity() {
        let mut sm = machine(TradingMode::LongShort);
        sm.commit(&Fill {
            price: 100.0,
            quantity: 0.4,
            fee: 0.0,
            status: FillStatus::Partial { requested: 1.0 },
        });
        assert_eq!(sm.position().quantity, 0.4);
        assert_eq!(sm.position().state, PositionState::Long);

        sm.commit(&Fill::full(100.0, -1.4, 0.0));
        assert!((sm.position().quantity + 1.0).abs() < 1e-12);
        assert_eq!(sm.position().state, PositionState::Short);
    }

    #[test]
    fn commit_back_to_zero_is_flat() {
        let mut sm = machine(TradingMode::LongOnly);
        sm.commit(&Fill::full(100.0, 0.3, 0.0));
        sm.commit(&Fill::full(100.0, -0.3, 0.0));
        assert_eq!(sm.position().state, PositionState::Flat);
        assert_eq!(sm.position().quantity, 0.0);
    }
}
