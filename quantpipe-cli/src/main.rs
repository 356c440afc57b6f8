//! quantpipe CLI: backtest, sweep, paper-trading and Kelly commands.
//!
//! Commands:
//! - `backtest`: run a TOML config against its CSV data and save artifacts
//! - `sweep`: run the config's parameter grid in parallel and rank by Sharpe
//! - `paper`: replay the CSV through the live loop against a paper venue
//! - `kelly`: simulate growth paths for a set of bet fractions
//!
//! Logging goes through `tracing`; set `RUST_LOG` to adjust (default `info`).

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use quantpipe_core::execution::{LiveExecution, PaperVenue};
use quantpipe_core::risk::simulate_growth;
use quantpipe_core::RunResult;
use quantpipe_runner::{
    load_csv, run_backtest_from_config, save_artifacts, spawn_replay, LiveLoop, ParamSweep, RunnerConfig,
    TracingObserver,
};
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "quantpipe", about = "quantpipe: signal-to-position trading pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a backtest from a TOML config file.
    Backtest {
        /// Path to the runner config.
        #[arg(long)]
        config: PathBuf,

        /// Override the data CSV named in the config.
        #[arg(long)]
        data: Option<PathBuf>,

        /// Override the artifact directory named in the config.
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Print the full summary as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Run the config's `[sweep]` grid.
    Sweep {
        #[arg(long)]
        config: PathBuf,

        #[arg(long)]
        data: Option<PathBuf>,

        /// Run grid points one at a time.
        #[arg(long, default_value_t = false)]
        sequential: bool,

        /// Number of ranked results to print.
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
    /// Replay the data through the live loop against a paper venue.
    Paper {
        #[arg(long)]
        config: PathBuf,

        #[arg(long)]
        data: Option<PathBuf>,

        /// Delay between bars in milliseconds.
        #[arg(long, default_value_t = 0)]
        interval_ms: u64,

        /// Probability that the venue rejects an order.
        #[arg(long, default_value_t = 0.0)]
        reject_p: f64,

        /// Probability that the venue fills only half an order.
        #[arg(long, default_value_t = 0.0)]
        partial_p: f64,

        /// Seed for the venue's fault injection.
        #[arg(long, default_value_t = 0)]
        seed: u64,
    },
    /// Monte Carlo of wealth growth at several Kelly bet fractions.
    Kelly {
        /// Win probability of the even-odds bet.
        #[arg(long)]
        p: f64,

        /// Bet fractions, comma separated.
        #[arg(long, value_delimiter = ',', default_value = "0.25,0.5,1.0,1.5")]
        fractions: Vec<f64>,

        #[arg(long, default_value_t = 100)]
        trials: usize,

        #[arg(long, default_value_t = 500)]
        steps: usize,

        #[arg(long, default_value_t = 100.0)]
        initial_capital: f64,

        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Backtest {
            config,
            data,
            output_dir,
            json,
        } => run_backtest_cmd(config, data, output_dir, json),
        Commands::Sweep {
            config,
            data,
            sequential,
            top,
        } => run_sweep_cmd(config, data, sequential, top),
        Commands::Paper {
            config,
            data,
            interval_ms,
            reject_p,
            partial_p,
            seed,
        } => run_paper_cmd(config, data, interval_ms, reject_p, partial_p, seed),
        Commands::Kelly {
            p,
            fractions,
            trials,
            steps,
            initial_capital,
            seed,
        } => run_kelly_cmd(p, &fractions, trials, steps, initial_capital, seed),
    }
}

fn load_config(path: &Path, data: Option<PathBuf>) -> Result<RunnerConfig> {
    let mut config =
        RunnerConfig::from_file(path).with_context(|| format!("loading config {}", path.display()))?;
    if let Some(data) = data {
        config.data.path = data;
    }
    Ok(config)
}

fn run_backtest_cmd(
    config_path: PathBuf,
    data: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let mut config = load_config(&config_path, data)?;
    if let Some(dir) = output_dir {
        config.output = Some(quantpipe_runner::config::OutputConfig { dir });
    }

    let report = run_backtest_from_config(&config)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report.result.summary)?);
    } else {
        print_summary(&report.result);
    }
    if let Some(dir) = &report.artifacts_dir {
        println!("Artifacts saved to: {}", dir.display());
    }
    Ok(())
}

fn run_sweep_cmd(config_path: PathBuf, data: Option<PathBuf>, sequential: bool, top: usize) -> Result<()> {
    let config = load_config(&config_path, data)?;
    let Some(grid) = &config.sweep else {
        bail!("config {} has no [sweep] section", config_path.display());
    };

    let data = load_csv(&config.data.path)?;
    let results = ParamSweep::new(&data)
        .with_parallelism(!sequential)
        .sweep(grid, &config.pipeline)?;

    println!(
        "{:>4}  {:>8}  {:>7}  {:>5}  {:>8}  {:>8}  {:>8}  {:>6}",
        "rank", "leverage", "max_dd", "kelly", "ptc", "sharpe", "return", "halted"
    );
    for (rank, point) in results.ranked_by_sharpe().into_iter().take(top).enumerate() {
        let ptc = match point.config.costs.regime {
            quantpipe_core::costs::CostRegime::ProportionalOnly { ptc }
            | quantpipe_core::costs::CostRegime::FixedPlusProportional { ptc, .. } => ptc,
        };
        println!(
            "{:>4}  {:>8.2}  {:>7.3}  {:>5}  {:>8.5}  {:>8.3}  {:>7.2}%  {:>6}",
            rank + 1,
            point.config.sizing.leverage,
            point.config.risk.max_drawdown,
            point.config.sizing.kelly.enabled,
            ptc,
            point.summary.sharpe,
            point.summary.total_return * 100.0,
            point.halted,
        );
    }
    Ok(())
}

fn run_paper_cmd(
    config_path: PathBuf,
    data: Option<PathBuf>,
    interval_ms: u64,
    reject_p: f64,
    partial_p: f64,
    seed: u64,
) -> Result<()> {
    let config = load_config(&config_path, data)?;
    let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    let (result, dataset_hash) =
        runtime.block_on(paper_session(&config, interval_ms, reject_p, partial_p, seed))?;

    print_summary(&result);
    if let Some(dir) = config.output_dir() {
        let run_dir = save_artifacts(&result, Some(&dataset_hash), dir)?;
        println!("Artifacts saved to: {}", run_dir.display());
    }
    Ok(())
}

async fn paper_session(
    config: &RunnerConfig,
    interval_ms: u64,
    reject_p: f64,
    partial_p: f64,
    seed: u64,
) -> Result<(RunResult, String)> {
    let data = load_csv(&config.data.path)?;
    let dataset_hash = data.dataset_hash.clone();
    let pipeline = config.pipeline.clone();
    let allow_short = pipeline.trading_mode == quantpipe_core::TradingMode::LongShort;
    let venue = PaperVenue::new(pipeline.initial_capital, pipeline.costs)
        .with_shorting(allow_short)
        .with_faults(reject_p, partial_p, seed);

    let live = LiveLoop::new(pipeline, Box::new(LiveExecution::new(venue)))?
        .with_observer(Box::new(TracingObserver));

    let interval = (interval_ms > 0).then(|| Duration::from_millis(interval_ms));
    let (events, feeder) = spawn_replay(data, 64, interval);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("received Ctrl+C, initiating shutdown");
            let _ = shutdown_tx.send(true);
        }
    });

    let report = live.run(events, shutdown_rx).await?;
    feeder.abort();
    if !report.skipped.is_empty() {
        warn!(skipped = report.skipped.len(), "events skipped as data gaps");
    }
    info!(reason = ?report.stop_reason, "paper session finished");
    Ok((report.result, dataset_hash))
}

fn run_kelly_cmd(
    p: f64,
    fractions: &[f64],
    trials: usize,
    steps: usize,
    initial_capital: f64,
    seed: u64,
) -> Result<()> {
    if !(0.0..=1.0).contains(&p) {
        bail!("win probability must lie in [0, 1] (got {p})");
    }
    let kelly = 2.0 * p - 1.0;
    println!("Kelly fraction for even odds: {kelly:.4} (half-Kelly {:.4})", kelly / 2.0);
    println!("{:>8}  {:>16}", "fraction", "median terminal");
    for paths in simulate_growth(p, fractions, trials, steps, initial_capital, seed) {
        println!("{:>8.3}  {:>16.2}", paths.fraction, paths.median_terminal());
    }
    Ok(())
}

fn print_summary(result: &RunResult) {
    let s = &result.summary;
    println!("═══ Run Summary ═══");
    println!("Run hash:        {}", result.fingerprint.run_hash);
    println!("Bars:            {}", result.bars_processed);
    println!("Trades:          {}", s.trade_count);
    println!("Final equity:    {:.2}", s.final_equity);
    println!("Total return:    {:.2}%", s.total_return * 100.0);
    println!("Annual return:   {:.2}%", s.annualized_return * 100.0);
    println!("Annual vol:      {:.2}%", s.annualized_volatility * 100.0);
    println!("Sharpe:          {:.3}", s.sharpe);
    println!("Sortino:         {:.3}", s.sortino);
    println!("Max drawdown:    {:.2}%", s.max_drawdown * 100.0);
    println!("VaR / CVaR:      {:.4} / {:.4}", s.var, s.cvar);
    println!("Win rate:        {:.1}%", s.win_rate * 100.0);
    println!("Kelly / half:    {:.4} / {:.4}", s.kelly_fraction, s.half_kelly);
    println!("Optimal lev.:    {:.2}", s.optimal_leverage);
    println!("Costs:           {:.2}", s.total_costs);
    if result.risk.halted {
        println!(
            "HALTED at bar {} ({} rejections)",
            result.risk.halted_at.unwrap_or_default(),
            s.halted_rejections
        );
    }
    if s.execution_failures > 0 {
        println!("Execution failures: {}", s.execution_failures);
    }
    if let Some(failure) = &result.close_out_failure {
        println!("Close-out FAILED: {failure} (position {:.4} left open)", result.final_position);
    }
}
