//! Historical tail risk: Value at Risk and Conditional Value at Risk.
//!
//! Both are expressed in return units and are negative for a loss
//! (e.g. -0.025 means a 2.5% loss per period).

/// Historical VaR: the `confidence` quantile of the return distribution,
/// linearly interpolated between order statistics.
pub fn historical_var(returns: &[f64], confidence: f64) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }
    let sorted = sorted(returns);
    let rank = confidence.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let weight = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * weight
}

/// Historical CVaR: mean of returns at or below VaR.
///
/// Falls back to VaR itself when no observation lies in the tail.
pub fn historical_cvar(returns: &[f64], confidence: f64) -> f64 {
    let var = historical_var(returns, confidence);
    let tail: Vec<f64> = returns.iter().copied().filter(|r| *r <= var).collect();
    if tail.is_empty() {
        return var;
    }
    tail.iter().sum::<f64>() / tail.len() as f64
}

fn sorted(values: &[f64]) -> Vec<f64> {
    let mut v = values.to_vec();
    v.sort_by(|a, b| a.total_cmp(b));
    v
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hundred_returns() -> Vec<f64> {
        // -0.050, -0.049, ..., +0.049
        (0..100).map(|i| (i as f64 - 50.0) / 1000.0).collect()
    }

    #[test]
    fn var_interpolates_percentile() {
        let r = hundred_returns();
        // rank = 0.05 * 99 = 4.95 → between -0.046 and -0.045
        let var = historical_var(&r, 0.05);
        assert!((var - (-0.04505)).abs() < 1e-12);
    }

    #[test]
    fn cvar_is_mean_of_tail() {
        let r = hundred_returns();
        // tail: -0.050 .. -0.046 (five values)
        let cvar = historical_cvar(&r, 0.05);
        assert!((cvar - (-0.048)).abs() < 1e-12);
        assert!(cvar <= historical_var(&r, 0.05));
    }

    #[test]
    fn empty_returns_are_zero() {
        assert_eq!(historical_var(&[], 0.05), 0.0);
        assert_eq!(historical_cvar(&[], 0.05), 0.0);
    }

    #[test]
    fn single_return_is_its_own_tail() {
        assert_eq!(historical_var(&[-0.02], 0.05), -0.02);
        assert_eq!(historical_cvar(&[-0.02], 0.05), -0.02);
    }
}
