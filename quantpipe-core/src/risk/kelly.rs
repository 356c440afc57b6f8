//! Kelly criterion estimates from period returns.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Win/loss statistics behind a Kelly fraction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KellyEstimate {
    pub win_rate: f64,
    /// Average win over average absolute loss.
    pub payoff_ratio: f64,
    /// Raw Kelly fraction `p - (1 - p) / b`. May be negative.
    pub kelly: f64,
}

/// Kelly fraction from non-zero returns.
///
/// Returns `None` unless at least one win and one loss are present.
pub fn kelly_from_returns(returns: &[f64]) -> Option<KellyEstimate> {
    let mut wins = 0usize;
    let mut losses = 0usize;
    let mut win_sum = 0.0;
    let mut loss_sum = 0.0;
    for &r in returns {
        if r > 0.0 {
            wins += 1;
            win_sum += r;
        } else if r < 0.0 {
            losses += 1;
            loss_sum += -r;
        }
    }
    if wins == 0 || losses == 0 {
        return None;
    }
    let n = (wins + losses) as f64;
    let win_rate = wins as f64 / n;
    let avg_win = win_sum / wins as f64;
    let avg_loss = loss_sum / losses as f64;
    let payoff_ratio = avg_win / avg_loss;
    Some(KellyEstimate {
        win_rate,
        payoff_ratio,
        kelly: win_rate - (1.0 - win_rate) / payoff_ratio,
    })
}

/// Continuous-time Kelly leverage `(mu - r) / sigma^2`, all per period.
///
/// Returns 0.0 when the variance is degenerate.
pub fn optimal_leverage(mean: f64, variance: f64, risk_free: f64) -> f64 {
    if variance < 1e-15 {
        return 0.0;
    }
    (mean - risk_free) / variance
}

/// Wealth paths of repeated even-odds bets at one bet fraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthPaths {
    pub fraction: f64,
    /// One path per trial, each `steps + 1` long starting at the initial capital.
    pub paths: Vec<Vec<f64>>,
}

impl GrowthPaths {
    /// Median terminal wealth across trials.
    pub fn median_terminal(&self) -> f64 {
        let mut terminal: Vec<f64> = self.paths.iter().filter_map(|p| p.last().copied()).collect();
        if terminal.is_empty() {
            return 0.0;
        }
        terminal.sort_by(|a, b| a.total_cmp(b));
        terminal[terminal.len() / 2]
    }
}

/// Monte Carlo of multiplicative growth `W * (1 ± f)` with win probability `p`.
///
/// Fractions are simulated in order from one seeded generator, so the output
/// is reproducible for a given seed.
pub fn simulate_growth(
    p: f64,
    fractions: &[f64],
    trials: usize,
    steps: usize,
    initial_capital: f64,
    seed: u64,
) -> Vec<GrowthPaths> {
    let mut rng = StdRng::seed_from_u64(seed);
    let p = p.clamp(0.0, 1.0);
    fractions
        .iter()
        .map(|&f| {
            let mut paths = vec![Vec::with_capacity(steps + 1); trials];
            for path in paths.iter_mut() {
                path.push(initial_capital);
            }
            for _ in 0..steps {
                for path in paths.iter_mut() {
                    let last = path.last().copied().unwrap_or(initial_capital);
                    let multiplier = if rng.gen::<f64>() < p { 1.0 + f } else { 1.0 - f };
                    path.push(last * multiplier);
                }
            }
            GrowthPaths { fraction: f, paths }
        })
        .collect()
}
