//! Immutable simulation configuration.
//!
//! A `SimConfig` is built once and passed by reference into every call
//! (`filters::evaluate`, `lifecycle::update`, `engine::run`). Nothing in the
//! engine mutates it. Scenario variants are produced by cloning and editing
//! a copy before the run starts.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::filters::FilterKind;

/// Full configuration for one simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub risk: RiskConfig,
    pub filters: FilterConfig,
    /// Currency amount committed per position (volume = notional / entry).
    pub trade_notional: f64,
    pub initial_balance: f64,
    pub max_concurrent_positions: usize,
    /// Lookback window length; the first evaluated tick is this index.
    pub warmup_candles: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            risk: RiskConfig::default(),
            filters: FilterConfig::default(),
            trade_notional: 100.0,
            initial_balance: 1000.0,
            max_concurrent_positions: 1,
            warmup_candles: 150,
        }
    }
}

impl SimConfig {
    /// Minimum number of candles for one evaluable tick.
    pub fn min_candles(&self) -> usize {
        self.warmup_candles + 1
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.risk.validate()?;
        self.filters.validate()?;

        if !(self.trade_notional.is_finite() && self.trade_notional > 0.0) {
            return Err(ConfigError::NonPositiveTradeNotional(self.trade_notional));
        }
        if !(self.initial_balance.is_finite() && self.initial_balance >= 0.0) {
            return Err(ConfigError::InvalidInitialBalance(self.initial_balance));
        }
        if self.warmup_candles == 0 {
            return Err(ConfigError::ZeroWarmup);
        }
        if self.max_concurrent_positions == 0 {
            return Err(ConfigError::ZeroMaxPositions);
        }
        Ok(())
    }
}

// ─── Risk ───────────────────────────────────────────────────────────

/// Protective exit levels, all in percent units relative to entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RiskConfig {
    pub stop_loss_pct: f64,
    pub take_profit_pct: f64,
    /// Distance of the trailing stop behind the water-mark.
    pub trailing_stop_pct: f64,
    /// Favorable move from entry required before the trailing stop arms.
    pub trailing_activation_pct: f64,
    pub trailing_enabled: bool,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            stop_loss_pct: 2.0,
            take_profit_pct: 3.0,
            trailing_stop_pct: 1.5,
            trailing_activation_pct: 1.0,
            trailing_enabled: true,
        }
    }
}

impl RiskConfig {
    /// take-profit distance over stop-loss distance.
    pub fn risk_reward_ratio(&self) -> f64 {
        if self.stop_loss_pct <= 0.0 {
            return 0.0;
        }
        self.take_profit_pct / self.stop_loss_pct
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("stop_loss_pct", self.stop_loss_pct)?;
        positive("take_profit_pct", self.take_profit_pct)?;
        non_negative("trailing_stop_pct", self.trailing_stop_pct)?;
        non_negative("trailing_activation_pct", self.trailing_activation_pct)?;
        Ok(())
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NonPositivePercentage { field, value })
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NegativePercentage { field, value })
    }
}

// ─── Filters ────────────────────────────────────────────────────────

/// One entry in the ordered filter list. Toggling a filter is data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterDescriptor {
    pub kind: FilterKind,
    pub enabled: bool,
}

/// Entry gate configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Minimum strength gate; always active.
    pub min_signal_strength: f64,
    pub descriptors: Vec<FilterDescriptor>,
    pub thresholds: FilterThresholds,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            min_signal_strength: 70.0,
            descriptors: FilterKind::ALL
                .iter()
                .map(|&kind| FilterDescriptor {
                    kind,
                    enabled: true,
                })
                .collect(),
            thresholds: FilterThresholds::default(),
        }
    }
}

impl FilterConfig {
    /// Enable exactly `kinds`, disable every other optional filter.
    pub fn only(mut self, kinds: &[FilterKind]) -> Self {
        for d in &mut self.descriptors {
            d.enabled = kinds.contains(&d.kind);
        }
        self
    }

    /// Disable a single filter, leaving the others as they were.
    pub fn without(mut self, kind: FilterKind) -> Self {
        for d in &mut self.descriptors {
            if d.kind == kind {
                d.enabled = false;
            }
        }
        self
    }

    /// Keep only the minimum-strength gate.
    pub fn none(self) -> Self {
        self.only(&[])
    }

    pub fn is_enabled(&self, kind: FilterKind) -> bool {
        self.descriptors.iter().any(|d| d.kind == kind && d.enabled)
    }

    pub fn enabled_kinds(&self) -> impl Iterator<Item = FilterKind> + '_ {
        self.descriptors
            .iter()
            .filter(|d| d.enabled)
            .map(|d| d.kind)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = self.min_signal_strength;
        if !(s.is_finite() && (0.0..=100.0).contains(&s)) {
            return Err(ConfigError::StrengthOutOfRange(s));
        }
        for (i, d) in self.descriptors.iter().enumerate() {
            if self.descriptors[..i].iter().any(|prev| prev.kind == d.kind) {
                return Err(ConfigError::DuplicateFilter(d.kind));
            }
        }
        Ok(())
    }
}

/// Trigger levels and strength reductions of the optional filters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilterThresholds {
    /// Closes back from the newest used as the trend reference (16 x 15m = 4h).
    pub trend_lookback: usize,
    pub trend_threshold_pct: f64,
    pub trend_reduction: f64,

    pub max_atr_pct: f64,
    pub volatility_reduction: f64,

    pub min_risk_reward: f64,
    pub risk_reward_reduction: f64,

    pub band_proximity_pct: f64,
    pub band_reduction: f64,

    pub rsi_overbought: f64,
    pub rsi_oversold: f64,
    pub rsi_reduction: f64,
}

impl Default for FilterThresholds {
    fn default() -> Self {
        Self {
            trend_lookback: 16,
            trend_threshold_pct: 2.0,
            trend_reduction: 30.0,
            max_atr_pct: 3.0,
            volatility_reduction: 20.0,
            min_risk_reward: 1.3,
            risk_reward_reduction: 20.0,
            band_proximity_pct: 1.0,
            band_reduction: 30.0,
            rsi_overbought: 75.0,
            rsi_oversold: 25.0,
            rsi_reduction: 25.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_reference_policy() {
        let cfg = SimConfig::default();
        assert_eq!(cfg.risk.stop_loss_pct, 2.0);
        assert_eq!(cfg.risk.take_profit_pct, 3.0);
        assert_eq!(cfg.risk.trailing_stop_pct, 1.5);
        assert_eq!(cfg.risk.trailing_activation_pct, 1.0);
        assert_eq!(cfg.filters.min_signal_strength, 70.0);
        assert_eq!(cfg.trade_notional, 100.0);
        assert_eq!(cfg.initial_balance, 1000.0);
        assert_eq!(cfg.max_concurrent_positions, 1);
        assert_eq!(cfg.min_candles(), 151);
        assert_eq!(cfg.filters.enabled_kinds().count(), 5);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn rejects_non_positive_stop_loss() {
        let mut cfg = SimConfig::default();
        cfg.risk.stop_loss_pct = 0.0;
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::NonPositivePercentage {
                field: "stop_loss_pct",
                value: 0.0
            })
        );
    }

    #[test]
    fn rejects_non_positive_notional() {
        let cfg = SimConfig {
            trade_notional: -5.0,
            ..SimConfig::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::NonPositiveTradeNotional(-5.0))
        );
    }

    #[test]
    fn rejects_strength_out_of_range() {
        let mut cfg = SimConfig::default();
        cfg.filters.min_signal_strength = 120.0;
        assert_eq!(cfg.validate(), Err(ConfigError::StrengthOutOfRange(120.0)));
    }

    #[test]
    fn rejects_duplicate_filter() {
        let mut cfg = SimConfig::default();
        let first = cfg.filters.descriptors[0];
        cfg.filters.descriptors.push(first);
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::DuplicateFilter(first.kind))
        );
    }

    #[test]
    fn toggles_are_independent() {
        let cfg = FilterConfig::default().without(FilterKind::Volatility);
        assert!(!cfg.is_enabled(FilterKind::Volatility));
        assert!(cfg.is_enabled(FilterKind::Trend));
        assert_eq!(cfg.enabled_kinds().count(), 4);

        let minimal = FilterConfig::default().only(&[FilterKind::Trend, FilterKind::Volatility]);
        assert_eq!(minimal.enabled_kinds().count(), 2);
        assert_eq!(FilterConfig::default().none().enabled_kinds().count(), 0);
    }

    #[test]
    fn risk_reward_ratio() {
        let risk = RiskConfig::default();
        assert!((risk.risk_reward_ratio() - 1.5).abs() < 1e-12);
    }

    #[test]
    fn partial_json_uses_defaults() {
        let cfg: SimConfig =
            serde_json::from_str(r#"{"risk":{"stop_loss_pct":1.0},"warmup_candles":20}"#).unwrap();
        assert_eq!(cfg.risk.stop_loss_pct, 1.0);
        assert_eq!(cfg.risk.take_profit_pct, 3.0);
        assert_eq!(cfg.warmup_candles, 20);
        assert_eq!(cfg.filters.descriptors.len(), 5);
    }
}
