//! End-to-end scenarios through `BacktestEngine`.
//!
//! Each scenario is a small hand-checked bar/signal sequence with the exact
//! trades, halts and costs it must produce.

use chrono::{DateTime, Duration, TimeZone, Utc};
use quantpipe_core::costs::TransactionCostModel;
use quantpipe_core::domain::{AttemptOutcome, Bar, TradeKind};
use quantpipe_core::engine::{BacktestEngine, Observer, RecordingObserver};
use quantpipe_core::execution::SimulatedExecution;
use quantpipe_core::signal::VecSignalSource;
use quantpipe_core::{PipelineConfig, RunResult, TradingMode};

fn t(i: usize) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(i as i64)
}

fn bars(prices: &[f64]) -> Vec<Bar> {
    prices.iter().enumerate().map(|(i, &p)| Bar::flat(t(i), p)).collect()
}

fn run(config: PipelineConfig, prices: &[f64], signals: &[i8]) -> RunResult {
    let bars = bars(prices);
    let mut source =
        VecSignalSource::from_values(bars.iter().map(|b| b.timestamp), signals.iter().copied()).unwrap();
    BacktestEngine::new(config).unwrap().run(&bars, &mut source).unwrap()
}

fn unit_config() -> PipelineConfig {
    let mut c = PipelineConfig::default();
    c.initial_capital = 100.0;
    c.sizing.units = 1.0;
    c.sizing.leverage = 1.0;
    c.costs = TransactionCostModel::frictionless();
    c
}

// ── Long-only signal sequence ───────────────────────────────────────

#[test]
fn long_only_sequence_produces_two_trades() {
    let result = run(unit_config(), &[10.0, 10.0, 10.0, 10.0, 10.0], &[0, 1, 1, -1, 0]);

    assert_eq!(result.log.trades.len(), 2);
    let buy = &result.log.trades[0];
    let sell = &result.log.trades[1];
    // Signal at bar 1 acts at bar 2; signal at bar 3 acts at bar 4
    assert_eq!(buy.bar_index, 2);
    assert_eq!(buy.quantity, 1.0);
    assert_eq!(sell.bar_index, 4);
    assert_eq!(sell.to_position, 0.0);
    assert_eq!(sell.kind, TradeKind::Signal);

    assert_eq!(result.risk.suppressed_intents, 1);
    assert!(result
        .log
        .attempts
        .iter()
        .any(|a| a.bar_index == 4 && a.outcome == AttemptOutcome::IntentSuppressed));
}

#[test]
fn long_short_sequence_shorts_on_negative_signal() {
    let mut config = unit_config();
    config.trading_mode = TradingMode::LongShort;
    config.close_out_at_end = false;
    let result = run(config, &[10.0; 5], &[0, 1, 1, -1, 0]);

    assert_eq!(result.log.trades.len(), 2);
    assert_eq!(result.log.trades[1].to_position, -1.0);
    assert_eq!(result.final_position, -1.0);
    assert_eq!(result.risk.suppressed_intents, 0);
}

// ── Idempotence ─────────────────────────────────────────────────────

#[test]
fn repeated_signal_trades_once() {
    let mut config = unit_config();
    config.close_out_at_end = false;
    let result = run(config, &[10.0, 11.0, 12.0, 11.0, 13.0, 12.0], &[1, 1, 1, 1, 1, 1]);
    assert_eq!(result.log.trades.len(), 1);
    assert_eq!(result.log.attempts.len(), 1);
}

// ── Drawdown circuit breaker ────────────────────────────────────────

#[test]
fn drawdown_halts_at_first_breach_and_rejects_following_buy() {
    let prices = [100.0, 100.0, 90.0, 86.0, 84.0, 85.0, 85.0];
    let signals = [1, 1, 1, 1, -1, 1, 1];
    let result = run(unit_config(), &prices, &signals);

    // Equity tracks price once long from bar 1: 86 is 14% down, 84 is 16% down
    assert!(result.risk.halted);
    assert_eq!(result.risk.halted_at, Some(4));
    assert!(!result.log.equity[3].halted);
    assert!(result.log.equity[4].halted);

    // Exit at bar 5 is risk-reducing and accepted
    let exit = &result.log.trades[1];
    assert_eq!(exit.bar_index, 5);
    assert_eq!(exit.to_position, 0.0);

    // Re-entry at bar 6 is rejected
    assert_eq!(result.log.trades.len(), 2);
    let rejected: Vec<_> = result
        .log
        .attempts
        .iter()
        .filter(|a| a.outcome == AttemptOutcome::HaltedRejection)
        .collect();
    assert_eq!(rejected.len(), 1);
    assert_eq!(rejected[0].bar_index, 6);
    assert_eq!(result.risk.halted_rejections, 1);
    assert_eq!(result.summary.halted_rejections, 1);
}

#[test]
fn halted_run_still_closes_out() {
    let prices = [100.0, 100.0, 80.0, 81.0];
    let result = run(unit_config(), &prices, &[1, 1, 1, 1]);
    assert!(result.risk.halted);
    let last = result.log.trades.last().unwrap();
    assert_eq!(last.kind, TradeKind::CloseOut);
    assert_eq!(result.final_position, 0.0);
    assert!(result.log.equity.last().unwrap().close_out);
}

#[test]
fn mark_to_market_continues_after_halt() {
    let prices = [100.0, 100.0, 80.0, 90.0, 95.0];
    let mut config = unit_config();
    config.close_out_at_end = false;
    let result = run(config, &prices, &[1, 1, 1, 1, 1]);
    let equities: Vec<f64> = result.log.equity.iter().map(|p| p.equity).collect();
    assert_eq!(equities, vec![100.0, 100.0, 80.0, 90.0, 95.0]);
    assert!(result.log.equity[2..].iter().all(|p| p.halted));
}

// ── Transaction costs ───────────────────────────────────────────────

#[test]
fn fixed_plus_proportional_cost_on_one_unit() {
    let mut config = unit_config();
    config.initial_capital = 100_000.0;
    config.costs = TransactionCostModel::fixed_plus_proportional(1.0, 0.001);
    config.close_out_at_end = false;
    let result = run(config, &[30_000.0, 30_000.0, 30_000.0], &[1, 1, 1]);

    assert_eq!(result.log.trades.len(), 1);
    assert!((result.log.trades[0].cost - 31.0).abs() < 1e-9);
    // Cash: 100_000 - 30_000 - 31
    let last = result.log.equity.last().unwrap();
    assert!((last.cash - 69_969.0).abs() < 1e-9);
    assert!((result.summary.total_costs - 31.0).abs() < 1e-9);
}

#[test]
fn no_trade_no_cost() {
    let mut config = unit_config();
    config.costs = TransactionCostModel::fixed_plus_proportional(1.0, 0.001);
    let result = run(config, &[50.0; 4], &[0, 0, 0, 0]);
    assert!(result.log.trades.is_empty());
    assert_eq!(result.summary.total_costs, 0.0);
    assert_eq!(result.summary.final_equity, 100.0);
}

// ── Leverage clamp ──────────────────────────────────────────────────

#[test]
fn requested_leverage_above_cap_is_clamped_and_logged() {
    let mut config = unit_config();
    config.initial_capital = 1_000.0;
    config.sizing.leverage = 8.0;
    config.sizing.max_leverage = 3.0;
    config.close_out_at_end = false;
    let result = run(config, &[10.0; 3], &[1, 1, 1]);

    assert_eq!(result.final_position, 3.0);
    let clamp = result.log.attempts[0].clamp.unwrap();
    assert_eq!(clamp.requested, 8.0);
    assert_eq!(clamp.allowed, 3.0);
}

// ── Observers ───────────────────────────────────────────────────────

#[test]
fn observer_sees_every_bar_and_close_out() {
    let config = unit_config();
    let b = bars(&[10.0, 11.0, 12.0]);
    let mut source = VecSignalSource::from_values(b.iter().map(|x| x.timestamp), [1, 1, 1]).unwrap();
    let observer = RecordingObserver::new();
    let engine = BacktestEngine::new(config.clone()).unwrap();
    let result = engine
        .run_with(
            &b,
            &mut source,
            Box::new(SimulatedExecution::new(config.costs)),
            vec![Box::new(observer.clone()) as Box<dyn Observer>],
        )
        .unwrap();

    let snapshots = observer.snapshots();
    assert_eq!(snapshots.len(), result.log.equity.len());
    assert_eq!(snapshots.len(), 4);
    assert!(snapshots[1].last_trade.is_some());
    assert_eq!(snapshots[3].position, 0.0);
}
