//! Performance metrics: pure functions over equity curves and period returns.
//!
//! Returns are log returns. Annualisation uses `periods_per_year` (365 for a
//! market that trades every day). Standard deviations are population (n)
//! statistics.

/// Log return between two equity values.
///
/// A non-positive starting equity yields 0.0; a wiped-out account is floored
/// at a tiny positive value so the series stays finite.
pub fn log_return(previous: f64, current: f64) -> f64 {
    if previous <= 0.0 {
        return 0.0;
    }
    (current.max(1e-12) / previous).ln()
}

/// Period log returns of `initial` followed by `equity_curve`.
pub fn equity_log_returns(initial: f64, equity_curve: &[f64]) -> Vec<f64> {
    let mut prev = initial;
    equity_curve
        .iter()
        .map(|&eq| {
            let r = log_return(prev, eq);
            prev = eq;
            r
        })
        .collect()
}

/// Cumulative simple return implied by a log-return series.
pub fn total_return(returns: &[f64]) -> f64 {
    returns.iter().sum::<f64>().exp() - 1.0
}

/// Geometric annualised return.
pub fn annualized_return(returns: &[f64], periods_per_year: u32) -> f64 {
    if returns.is_empty() || periods_per_year == 0 {
        return 0.0;
    }
    let years = returns.len() as f64 / periods_per_year as f64;
    let growth = 1.0 + total_return(returns);
    if growth <= 0.0 {
        return -1.0;
    }
    growth.powf(1.0 / years) - 1.0
}

pub fn annualized_volatility(returns: &[f64], periods_per_year: u32) -> f64 {
    population_std(returns) * (periods_per_year as f64).sqrt()
}

/// Annualised Sharpe ratio.
///
/// Sharpe = (mean - rf/P) / std * sqrt(P). Returns 0.0 for fewer than 2
/// returns or zero variance.
pub fn sharpe_ratio(returns: &[f64], periods_per_year: u32, risk_free_rate: f64) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let p = periods_per_year as f64;
    let std = population_std(returns);
    if std < 1e-15 {
        return 0.0;
    }
    (mean_f64(returns) - risk_free_rate / p) / std * p.sqrt()
}

/// Annualised Sortino ratio.
///
/// Sortino = (annualised return - rf) / (std of returns below rf/P * sqrt(P)).
/// Returns 0.0 with fewer than two downside observations.
pub fn sortino_ratio(returns: &[f64], periods_per_year: u32, risk_free_rate: f64) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let p = periods_per_year as f64;
    let per_period_rf = risk_free_rate / p;
    let downside: Vec<f64> = returns.iter().copied().filter(|r| *r < per_period_rf).collect();
    if downside.len() < 2 {
        return 0.0;
    }
    let downside_std = population_std(&downside) * p.sqrt();
    if downside_std < 1e-15 {
        return 0.0;
    }
    (annualized_return(returns, periods_per_year) - risk_free_rate) / downside_std
}

/// Maximum drawdown as a positive fraction (0.15 = 15% below peak).
pub fn max_drawdown(equity_curve: &[f64]) -> f64 {
    let mut peak = f64::MIN;
    let mut max_dd = 0.0_f64;
    for &eq in equity_curve {
        if eq > peak {
            peak = eq;
        }
        if peak > 0.0 {
            max_dd = max_dd.max((peak - eq) / peak);
        }
    }
    max_dd
}

/// Fraction of periods with a positive return.
pub fn win_rate(returns: &[f64]) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }
    returns.iter().filter(|r| **r > 0.0).count() as f64 / returns.len() as f64
}

/// Sum of positive returns over the absolute sum of negative returns.
///
/// Capped at 100.0 when there are no losses.
pub fn profit_factor(returns: &[f64]) -> f64 {
    let gross_profit: f64 = returns.iter().filter(|r| **r > 0.0).sum();
    let gross_loss: f64 = returns.iter().filter(|r| **r < 0.0).map(|r| r.abs()).sum();
    if gross_loss < 1e-15 {
        return if gross_profit > 0.0 { 100.0 } else { 0.0 };
    }
    (gross_profit / gross_loss).min(100.0)
}

// ─── Helpers ────────────────────────────────────────────────────────

pub fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub fn population_variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = mean_f64(values);
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64
}

pub fn population_std(values: &[f64]) -> f64 {
    population_variance(values).sqrt()
}
