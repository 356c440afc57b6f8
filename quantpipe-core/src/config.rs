//! Pipeline configuration: an immutable value passed to every orchestrator.
//!
//! Every section has defaults so a TOML file only needs to name what it
//! overrides. `validate()` runs before any bar is processed.

use crate::costs::TransactionCostModel;
use crate::domain::PriceField;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Which directions the pipeline may hold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradingMode {
    #[default]
    LongOnly,
    LongShort,
}

/// What a neutral signal does to an open position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZeroSignalPolicy {
    /// Keep the current position.
    #[default]
    Hold,
    /// Close the current position.
    Flatten,
}

/// Fractional Kelly sizing from trailing period returns.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KellyConfig {
    pub enabled: bool,
    /// Multiplier on the raw Kelly fraction (0.5 = half-Kelly).
    pub fraction: f64,
    /// Number of trailing returns kept.
    pub window: usize,
    /// Minimum non-zero trailing returns before Kelly replaces fixed sizing.
    pub min_samples: usize,
}

impl Default for KellyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            fraction: 0.5,
            window: 100,
            min_samples: 20,
        }
    }
}

/// Position sizing and the leverage cap.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizingConfig {
    /// Base position size in instrument units.
    pub units: f64,
    /// Requested leverage. Values above `max_leverage` are clamped per trade.
    pub leverage: f64,
    pub max_leverage: f64,
    pub kelly: KellyConfig,
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            units: 0.001,
            leverage: 1.0,
            max_leverage: 5.0,
            kelly: KellyConfig::default(),
        }
    }
}

impl SizingConfig {
    /// Hard cap on absolute position size.
    pub fn max_position(&self) -> f64 {
        self.units * self.max_leverage
    }
}

/// Drawdown circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Drawdown from peak (fraction) at which trading halts.
    pub max_drawdown: f64,
    /// Close any open position on the bar the breaker trips.
    pub flatten_on_halt: bool,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            max_drawdown: 0.15,
            flatten_on_halt: false,
        }
    }
}

/// Settings for the performance summary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    pub periods_per_year: u32,
    /// Tail probability for VaR/CVaR (0.05 = 95% confidence).
    pub var_confidence: f64,
    /// Annual risk-free rate.
    pub risk_free_rate: f64,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            periods_per_year: 365,
            var_confidence: 0.05,
            risk_free_rate: 0.0,
        }
    }
}

/// Complete configuration of a pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub initial_capital: f64,
    pub trading_mode: TradingMode,
    pub zero_signal: ZeroSignalPolicy,
    pub price_field: PriceField,
    pub costs: TransactionCostModel,
    pub sizing: SizingConfig,
    pub risk: RiskConfig,
    pub performance: PerformanceConfig,
    /// Flatten an open position after the last bar of a backtest.
    pub close_out_at_end: bool,
    /// Live only: skip out-of-order bars instead of stopping.
    pub tolerate_data_gaps: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            initial_capital: 1_000.0,
            trading_mode: TradingMode::default(),
            zero_signal: ZeroSignalPolicy::default(),
            price_field: PriceField::default(),
            costs: TransactionCostModel::default(),
            sizing: SizingConfig::default(),
            risk: RiskConfig::default(),
            performance: PerformanceConfig::default(),
            close_out_at_end: true,
            tolerate_data_gaps: false,
        }
    }
}

impl PipelineConfig {
    /// Parse from TOML. The result is not validated.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Deterministic content hash of the configuration.
    ///
    /// Two configs with identical fields share the same id.
    pub fn config_id(&self) -> String {
        let json = serde_json::to_string(self).unwrap_or_default();
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("initial_capital", self.initial_capital)?;
        positive("units", self.sizing.units)?;
        positive("leverage", self.sizing.leverage)?;
        positive("max_leverage", self.sizing.max_leverage)?;

        let dd = self.risk.max_drawdown;
        if dd.is_nan() || dd <= 0.0 || dd > 1.0 {
            return Err(ConfigError::OutOfRange {
                field: "max_drawdown",
                range: "(0, 1]",
                value: dd,
            });
        }

        self.costs.validate()?;

        let kelly = &self.sizing.kelly;
        if kelly.fraction.is_nan() || kelly.fraction <= 0.0 || kelly.fraction > 1.0 {
            return Err(ConfigError::OutOfRange {
                field: "kelly.fraction",
                range: "(0, 1]",
                value: kelly.fraction,
            });
        }
        if kelly.enabled && (kelly.window == 0 || kelly.window < kelly.min_samples) {
            return Err(ConfigError::KellyWindow {
                window: kelly.window,
                min_samples: kelly.min_samples,
            });
        }

        let perf = &self.performance;
        if perf.periods_per_year == 0 {
            return Err(ConfigError::ZeroPeriodsPerYear);
        }
        let c = perf.var_confidence;
        if c.is_nan() || c <= 0.0 || c >= 1.0 {
            return Err(ConfigError::OutOfRange {
                field: "var_confidence",
                range: "(0, 1)",
                value: c,
            });
        }
        if !perf.risk_free_rate.is_finite() {
            return Err(ConfigError::OutOfRange {
                field: "risk_free_rate",
                range: "finite",
                value: perf.risk_free_rate,
            });
        }
        Ok(())
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_nan() || value <= 0.0 {
        return Err(ConfigError::NonPositive { field, value });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.performance.periods_per_year, 365);
        assert_eq!(config.sizing.kelly.fraction, 0.5);
        assert_eq!(config.risk.max_drawdown, 0.15);
    }

    #[test]
    fn config_id_is_deterministic() {
        let a = PipelineConfig::default();
        let b = PipelineConfig::default();
        assert_eq!(a.config_id(), b.config_id());
        assert_eq!(a.config_id().len(), 64);
    }

    #[test]
    fn config_id_changes_with_params() {
        let a = PipelineConfig::default();
        let mut b = a.clone();
        b.sizing.leverage = 2.0;
        assert_ne!(a.config_id(), b.config_id());
    }

    #[test]
    fn rejects_non_positive_units() {
        let mut config = PipelineConfig::default();
        config.sizing.units = 0.0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::NonPositive {
                field: "units",
                value: 0.0
            })
        );
    }

    #[test]
    fn leverage_above_cap_is_allowed_and_clamped_later() {
        let mut config = PipelineConfig::default();
        config.sizing.leverage = 6.0;
        assert!(config.validate().is_ok());
        assert!(config.sizing.units * config.sizing.leverage > config.sizing.max_position());
    }

    #[test]
    fn rejects_threshold_outside_unit_interval() {
        for bad in [0.0, -0.1, 1.5, f64::NAN] {
            let mut config = PipelineConfig::default();
            config.risk.max_drawdown = bad;
            assert!(config.validate().is_err(), "threshold {bad} accepted");
        }
    }

    #[test]
    fn rejects_bad_confidence_and_periods() {
        let mut config = PipelineConfig::default();
        config.performance.var_confidence = 1.0;
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.performance.periods_per_year = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroPeriodsPerYear));
    }

    #[test]
    fn rejects_kelly_window_smaller_than_min_samples() {
        let mut config = PipelineConfig::default();
        config.sizing.kelly.enabled = true;
        config.sizing.kelly.window = 5;
        config.sizing.kelly.min_samples = 10;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::KellyWindow { .. })
        ));
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config = PipelineConfig::from_toml_str(
            r#"
            trading_mode = "long_short"
            initial_capital = 100000.0

            [sizing]
            units = 1.0
            leverage = 2.0

            [risk]
            flatten_on_halt = true
            "#,
        )
        .unwrap();
        assert_eq!(config.trading_mode, TradingMode::LongShort);
        assert_eq!(config.sizing.units, 1.0);
        assert_eq!(config.sizing.max_leverage, 5.0);
        assert!(config.risk.flatten_on_halt);
        assert_eq!(config.risk.max_drawdown, 0.15);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        let err = PipelineConfig::from_toml_str("trading_mode = 3").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
