//! The per-bar decision pipeline shared by the backtest engine and the live loop.
//!
//! Stages per bar, always in this order:
//! 1. Validate: timestamps strictly increase, the signal belongs to this bar
//! 2. Lag: store this bar's signal, release the previous one
//! 3. Mark: value the held position at this bar's price, update the breaker
//! 4. Decide: state machine direction, risk gate size, cost, gate verdict
//! 5. Execute: adapter fill, committed to the position and the account
//! 6. Record: one equity point, folded into performance, sent to observers

use crate::config::PipelineConfig;
use crate::costs::TransactionCostModel;
use crate::domain::{AttemptOutcome, Bar, Clamp, EquityPoint, RunLog, TradeAttempt, TradeKind, TradeRecord};
use crate::error::{ConfigError, DataGapError, ExecutionFailure, PipelineError};
use crate::execution::{ExecutionAdapter, ExecutionRequest};
use crate::performance::PerformanceAccumulator;
use crate::position::{Position, PositionState, PositionStateMachine};
use crate::risk::{Candidate, GateDecision, RiskGate, RiskState};
use crate::signal::{Signal, SignalEvent, SignalLagger};
use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use super::accounting::Account;
use super::observer::{BarSnapshot, Observer};
use super::result::RunResult;

pub struct Pipeline {
    config: PipelineConfig,
    lagger: SignalLagger,
    machine: PositionStateMachine,
    costs: TransactionCostModel,
    risk: RiskGate,
    executor: Box<dyn ExecutionAdapter>,
    account: Account,
    performance: PerformanceAccumulator,
    observers: Vec<Box<dyn Observer>>,
    log: RunLog,
    bars_processed: usize,
    last_timestamp: Option<DateTime<Utc>>,
    last_price: Option<f64>,
    trade_seq: u64,
    closed_out: bool,
    close_out_failure: Option<ExecutionFailure>,
}

/// Where a bar's trade stands in time.
#[derive(Debug, Clone, Copy)]
struct BarContext {
    bar_index: usize,
    timestamp: DateTime<Utc>,
    price: f64,
}

impl Pipeline {
    /// Build a pipeline. The configuration is validated before anything else.
    pub fn new(config: PipelineConfig, executor: Box<dyn ExecutionAdapter>) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            lagger: SignalLagger::new(),
            machine: PositionStateMachine::new(config.trading_mode, config.zero_signal),
            costs: config.costs,
            risk: RiskGate::from_config(&config),
            executor,
            account: Account::new(config.initial_capital),
            performance: PerformanceAccumulator::new(config.performance, config.initial_capital),
            observers: Vec::new(),
            log: RunLog::new(),
            bars_processed: 0,
            last_timestamp: None,
            last_price: None,
            trade_seq: 0,
            closed_out: false,
            close_out_failure: None,
            config,
        })
    }

    pub fn add_observer(&mut self, observer: Box<dyn Observer>) {
        self.observers.push(observer);
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn position(&self) -> &Position {
        self.machine.position()
    }

    pub fn risk_state(&self) -> &RiskState {
        self.risk.state()
    }

    pub fn log(&self) -> &RunLog {
        &self.log
    }

    pub fn bars_processed(&self) -> usize {
        self.bars_processed
    }

    pub fn is_closed_out(&self) -> bool {
        self.closed_out
    }

    pub fn executor_name(&self) -> &str {
        self.executor.name()
    }

    /// Operator reset of the circuit breaker.
    pub fn reset_halt(&mut self) {
        self.risk.reset_halt();
    }

    /// Run one bar through every stage.
    ///
    /// A data-gap error leaves the pipeline untouched, so a caller may skip the
    /// bar and continue.
    pub fn process_bar(&mut self, bar: &Bar, event: &SignalEvent) -> Result<BarSnapshot, PipelineError> {
        if self.closed_out {
            return Err(PipelineError::AlreadyClosed);
        }
        let bar_index = self.bars_processed;
        self.check_sequence(bar, event, bar_index)?;

        let ctx = BarContext {
            bar_index,
            timestamp: bar.timestamp,
            price: bar.price(self.config.price_field),
        };
        self.bars_processed += 1;
        self.last_timestamp = Some(ctx.timestamp);
        self.last_price = Some(ctx.price);

        // ─── Lag ───
        let lagged = self.lagger.push(event.signal);

        // ─── Mark to market with the position held into this bar ───
        let held = self.machine.position().quantity;
        let marked = self.account.equity(held, ctx.price);
        let tripped = self.risk.update_equity(marked, bar_index);

        // ─── Decide and execute ───
        let trade = if tripped && self.config.risk.flatten_on_halt && held != 0.0 {
            self.submit(ctx, 0.0, TradeKind::CloseOut, None).ok().flatten()
        } else if let Some(signal) = lagged {
            self.act_on_signal(ctx, signal)
        } else {
            None
        };

        // ─── Record ───
        let snapshot = self.record_point(ctx, false, trade);
        debug!(
            bar_index,
            price = ctx.price,
            position = snapshot.position,
            equity = snapshot.equity,
            halted = snapshot.halted,
            "bar processed"
        );
        Ok(snapshot)
    }

    /// Flatten any open position at the last processed price.
    ///
    /// Runs at most once; later calls return `Ok(None)`. Accepted even when
    /// the breaker is tripped. Any executed close-out trade appends one equity
    /// point flagged `close_out`. A fill that leaves the position open is an
    /// `ExecutionFailure::PartialCloseOut` carrying the remaining quantity.
    pub fn close_out(&mut self) -> Result<Option<TradeRecord>, ExecutionFailure> {
        if self.closed_out {
            return Ok(None);
        }
        self.closed_out = true;

        let (Some(timestamp), Some(price)) = (self.last_timestamp, self.last_price) else {
            return Ok(None);
        };
        if self.machine.position().is_flat() {
            return Ok(None);
        }
        let ctx = BarContext {
            bar_index: self.bars_processed.saturating_sub(1),
            timestamp,
            price,
        };
        match self.submit(ctx, 0.0, TradeKind::CloseOut, None) {
            Ok(trade) => {
                self.record_point(ctx, true, trade.clone());
                let remaining = self.machine.position().quantity;
                if remaining != 0.0 {
                    return Err(self.fail_close_out(ExecutionFailure::PartialCloseOut { remaining }));
                }
                if let Some(t) = &trade {
                    info!(quantity = t.quantity, price = t.price, "position closed out");
                }
                Ok(trade)
            }
            Err(failure) => Err(self.fail_close_out(failure)),
        }
    }

    fn fail_close_out(&mut self, failure: ExecutionFailure) -> ExecutionFailure {
        error!(%failure, position = self.machine.position().quantity, "close-out failed");
        self.close_out_failure = Some(failure.clone());
        failure
    }

    /// Consume the pipeline into its result.
    pub fn finish(self) -> RunResult {
        let summary = self.performance.summarize(&self.log);
        RunResult::new(
            &self.config,
            self.log,
            summary,
            self.risk.state().clone(),
            self.machine.position().quantity,
            self.bars_processed,
            self.close_out_failure,
        )
    }

    fn check_sequence(&self, bar: &Bar, event: &SignalEvent, bar_index: usize) -> Result<(), DataGapError> {
        if !bar.is_sane() {
            return Err(DataGapError::MalformedBar {
                bar_index,
                timestamp: bar.timestamp,
            });
        }
        if let Some(previous) = self.last_timestamp {
            if bar.timestamp == previous {
                return Err(DataGapError::Duplicate {
                    bar_index,
                    timestamp: bar.timestamp,
                });
            }
            if bar.timestamp < previous {
                return Err(DataGapError::OutOfOrder {
                    bar_index,
                    previous,
                    timestamp: bar.timestamp,
                });
            }
        }
        if event.timestamp != bar.timestamp {
            return Err(DataGapError::SignalMismatch {
                bar_index,
                bar: bar.timestamp,
                signal: event.timestamp,
            });
        }
        Ok(())
    }

    fn act_on_signal(&mut self, ctx: BarContext, signal: Signal) -> Option<TradeRecord> {
        let proposal = self.machine.propose(signal);
        let position = *self.machine.position();

        if proposal.short_suppressed {
            self.risk.record_suppressed();
            self.log.attempts.push(TradeAttempt {
                bar_index: ctx.bar_index,
                timestamp: ctx.timestamp,
                from_position: position.quantity,
                requested_position: position.quantity,
                kind: TradeKind::Signal,
                clamp: None,
                outcome: AttemptOutcome::IntentSuppressed,
            });
            debug!(bar_index = ctx.bar_index, "short intent suppressed in long-only mode");
        }

        if proposal.target == position.state {
            return None;
        }

        let (to, clamp) = match proposal.target {
            PositionState::Flat => (0.0, None),
            direction => {
                let size = self.risk.size();
                if size.allowed <= 0.0 {
                    debug!(bar_index = ctx.bar_index, "sized to zero, no trade");
                    return None;
                }
                if let Some(c) = size.clamp() {
                    info!(
                        bar_index = ctx.bar_index,
                        requested = c.requested,
                        allowed = c.allowed,
                        "position size clamped to leverage cap"
                    );
                }
                (direction.sign() * size.allowed, size.clamp())
            }
        };
        self.submit(ctx, to, TradeKind::Signal, clamp).ok().flatten()
    }

    /// Cost, gate, execute and commit one candidate.
    ///
    /// `Ok(None)` means no trade happened (zero delta or gate rejection);
    /// `Err` means the adapter failed and the position is unchanged.
    fn submit(
        &mut self,
        ctx: BarContext,
        to: f64,
        kind: TradeKind,
        clamp: Option<Clamp>,
    ) -> Result<Option<TradeRecord>, ExecutionFailure> {
        let from = self.machine.position().quantity;
        let delta = to - from;
        if delta == 0.0 {
            return Ok(None);
        }
        let cost = self.costs.cost(delta, ctx.price);
        let mut attempt = TradeAttempt {
            bar_index: ctx.bar_index,
            timestamp: ctx.timestamp,
            from_position: from,
            requested_position: to,
            kind,
            clamp,
            outcome: AttemptOutcome::Filled,
        };

        let candidate = Candidate { from, to, cost, kind };
        if self.risk.evaluate(&candidate, ctx.bar_index) == GateDecision::HaltedRejection {
            attempt.outcome = AttemptOutcome::HaltedRejection;
            self.log.attempts.push(attempt);
            return Ok(None);
        }

        let request = ExecutionRequest {
            bar_index: ctx.bar_index,
            timestamp: ctx.timestamp,
            from,
            to,
            price: ctx.price,
            cost,
        };
        match self.executor.execute(&request) {
            Ok(fill) => {
                self.account.apply_fill(&fill);
                self.machine.commit(&fill);
                attempt.outcome = if fill.is_partial() {
                    AttemptOutcome::PartiallyFilled { filled: fill.quantity }
                } else {
                    AttemptOutcome::Filled
                };
                self.log.attempts.push(attempt);

                let trade = TradeRecord {
                    seq: self.trade_seq,
                    bar_index: ctx.bar_index,
                    timestamp: ctx.timestamp,
                    from_position: from,
                    to_position: self.machine.position().quantity,
                    price: fill.price,
                    quantity: fill.quantity,
                    cost: fill.fee,
                    kind,
                    partial: fill.is_partial(),
                };
                self.trade_seq += 1;
                info!(
                    bar_index = ctx.bar_index,
                    seq = trade.seq,
                    from = trade.from_position,
                    to = trade.to_position,
                    price = trade.price,
                    cost = trade.cost,
                    kind = ?kind,
                    "trade executed"
                );
                self.log.trades.push(trade.clone());
                Ok(Some(trade))
            }
            Err(failure) => {
                self.risk.record_failure();
                warn!(
                    bar_index = ctx.bar_index,
                    adapter = self.executor.name(),
                    %failure,
                    from,
                    to,
                    "execution failed, position unchanged"
                );
                attempt.outcome = AttemptOutcome::ExecutionFailed {
                    reason: failure.clone(),
                };
                self.log.attempts.push(attempt);
                Err(failure)
            }
        }
    }

    fn record_point(&mut self, ctx: BarContext, close_out: bool, trade: Option<TradeRecord>) -> BarSnapshot {
        let position = self.machine.position().quantity;
        let equity = self.account.equity(position, ctx.price);
        let point = EquityPoint {
            bar_index: ctx.bar_index,
            timestamp: ctx.timestamp,
            price: ctx.price,
            position,
            cash: self.account.cash(),
            equity,
            drawdown: self.performance.drawdown_at(equity),
            halted: self.risk.is_halted(),
            close_out,
        };
        let period_return = self.performance.fold(&point);
        self.risk.record_return(period_return);

        let snapshot = BarSnapshot {
            bar_index: point.bar_index,
            timestamp: point.timestamp,
            position,
            equity,
            drawdown: point.drawdown,
            halted: point.halted,
            last_trade: trade,
        };
        self.log.equity.push(point);
        for observer in &mut self.observers {
            observer.on_bar(&snapshot);
        }
        snapshot
    }
}
