//! Sweep determinism: parallel and sequential execution agree, repeated runs
//! agree, and the grid expands to exactly its advertised size.

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use quantpipe_core::domain::Bar;
use quantpipe_core::signal::{Signal, SignalEvent};
use quantpipe_core::{PipelineConfig, TradingMode};
use quantpipe_runner::{run_backtest, LoadedData, ParamSweep, SweepGrid};

fn dataset() -> LoadedData {
    let t0 = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
    let bars: Vec<Bar> = (0..250)
        .map(|i| {
            let trend = if (i / 50) % 2 == 0 { 0.4 } else { -0.5 };
            Bar::flat(t0 + Duration::days(i), 200.0 + trend * (i % 50) as f64 + (i as f64).cos())
        })
        .collect();
    let signals = bars
        .iter()
        .enumerate()
        .map(|(i, b)| {
            let s = if (i / 50) % 2 == 0 { Signal::Long } else { Signal::Short };
            SignalEvent::new(b.timestamp, s)
        })
        .collect();
    LoadedData::new(bars, signals)
}

fn base() -> PipelineConfig {
    let mut c = PipelineConfig::default();
    c.initial_capital = 10_000.0;
    c.trading_mode = TradingMode::LongShort;
    c.sizing.units = 10.0;
    c
}

fn grid() -> SweepGrid {
    SweepGrid {
        leverage: vec![0.5, 1.0, 2.0],
        max_drawdown: vec![0.05, 0.15],
        kelly: vec![false, true],
        ptc: vec![0.0, 0.001],
    }
}

#[test]
fn parallel_and_sequential_sweeps_agree() {
    let data = dataset();
    let parallel = ParamSweep::new(&data).sweep(&grid(), &base()).unwrap();
    let sequential = ParamSweep::new(&data)
        .with_parallelism(false)
        .sweep(&grid(), &base())
        .unwrap();
    assert_eq!(parallel.len(), 24);
    assert_eq!(parallel, sequential);
}

#[test]
fn repeated_parallel_sweeps_are_identical() {
    let data = dataset();
    let a = ParamSweep::new(&data).sweep(&grid(), &base()).unwrap();
    let b = ParamSweep::new(&data).sweep(&grid(), &base()).unwrap();
    let hashes = |r: &quantpipe_runner::SweepResults| {
        r.points.iter().map(|p| p.fingerprint.run_hash.clone()).collect::<Vec<_>>()
    };
    assert_eq!(hashes(&a), hashes(&b));
}

#[test]
fn sweep_point_matches_single_run() {
    let data = dataset();
    let results = ParamSweep::new(&data).sweep(&grid(), &base()).unwrap();
    let point = &results.points[7];
    let single = run_backtest(&point.config, &data).unwrap();
    assert_eq!(point.fingerprint, single.fingerprint);
    assert_eq!(point.summary, single.summary);
}

#[test]
fn ranking_is_descending_by_sharpe() {
    let data = dataset();
    let results = ParamSweep::new(&data).sweep(&grid(), &base()).unwrap();
    let ranked = results.ranked_by_sharpe();
    assert_eq!(ranked.len(), results.len());
    for pair in ranked.windows(2) {
        assert!(pair[0].summary.sharpe >= pair[1].summary.sharpe);
    }
    assert_eq!(results.best_by_sharpe(), ranked.first().copied());
}

#[test]
fn tighter_breaker_halts_at_least_as_often() {
    let data = dataset();
    let g = SweepGrid {
        leverage: vec![3.0],
        max_drawdown: vec![0.01, 0.9],
        ..SweepGrid::default()
    };
    let results = ParamSweep::new(&data).sweep(&g, &base()).unwrap();
    assert!(results.points[0].halted || !results.points[1].halted);
}

proptest! {
    #[test]
    fn grid_size_matches_expansion(
        leverage in prop::collection::vec(0.1..5.0_f64, 0..4),
        max_drawdown in prop::collection::vec(0.01..1.0_f64, 0..3),
        kelly in prop::collection::vec(any::<bool>(), 0..3),
        ptc in prop::collection::vec(0.0..0.01_f64, 0..3),
    ) {
        let grid = SweepGrid { leverage, max_drawdown, kelly, ptc };
        let configs = grid.generate_configs(&PipelineConfig::default());
        prop_assert_eq!(configs.len(), grid.size());
        prop_assert!(configs.iter().all(|c| c.validate().is_ok()));
    }
}
