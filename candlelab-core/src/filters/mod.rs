//! Signal filter pipeline: gates entries and discounts signal strength.
//!
//! Every optional filter is an independent rule implementing [`SignalFilter`].
//! The pipeline walks the configured descriptor list, evaluates each enabled
//! rule without short-circuiting, and folds the outcomes into a
//! [`FilterDecision`]. The minimum-strength gate is always applied.
//!
//! A rule whose indicator is missing from the signal reports
//! [`RuleOutcome::Skipped`]; it does not reduce strength and does not abort.

mod band_proximity;
mod risk_reward;
mod rsi_extreme;
mod trend;
mod volatility;

pub use band_proximity::BandProximityFilter;
pub use risk_reward::RiskRewardFilter;
pub use rsi_extreme::RsiExtremeFilter;
pub use trend::TrendFilter;
pub use volatility::VolatilityFilter;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::trace;

use crate::config::{FilterThresholds, RiskConfig, SimConfig};
use crate::domain::Signal;
use crate::error::FilterEvaluationError;
use crate::math::clamp;

/// Inputs a rule may look at. Rules never see engine state.
#[derive(Debug, Clone, Copy)]
pub struct FilterContext<'a> {
    pub signal: &'a Signal,
    /// Closes of the lookback window, oldest first, newest last.
    pub recent_closes: &'a [f64],
    pub current_price: f64,
    pub risk: &'a RiskConfig,
    pub thresholds: &'a FilterThresholds,
}

/// Result of one rule.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleOutcome {
    Pass,
    Triggered { reduction: f64, reason: String },
    Skipped(FilterEvaluationError),
}

/// A single toggleable entry rule.
pub trait SignalFilter: Send + Sync {
    fn kind(&self) -> FilterKind;

    fn evaluate(&self, ctx: &FilterContext<'_>) -> RuleOutcome;
}

// ─── Filter kinds ───────────────────────────────────────────────────

/// Tag for each optional filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    Trend,
    Volatility,
    RiskReward,
    BandProximity,
    RsiExtreme,
}

impl FilterKind {
    pub const ALL: [FilterKind; 5] = [
        FilterKind::Trend,
        FilterKind::Volatility,
        FilterKind::RiskReward,
        FilterKind::BandProximity,
        FilterKind::RsiExtreme,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FilterKind::Trend => "trend",
            FilterKind::Volatility => "volatility",
            FilterKind::RiskReward => "risk_reward",
            FilterKind::BandProximity => "band_proximity",
            FilterKind::RsiExtreme => "rsi_extreme",
        }
    }

    /// The rule implementing this kind.
    pub fn rule(self) -> &'static dyn SignalFilter {
        match self {
            FilterKind::Trend => &TrendFilter,
            FilterKind::Volatility => &VolatilityFilter,
            FilterKind::RiskReward => &RiskRewardFilter,
            FilterKind::BandProximity => &BandProximityFilter,
            FilterKind::RsiExtreme => &RsiExtremeFilter,
        }
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown filter '{0}' (expected one of: trend, volatility, risk_reward, band_proximity, rsi_extreme)")]
pub struct UnknownFilter(pub String);

impl FromStr for FilterKind {
    type Err = UnknownFilter;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        FilterKind::ALL
            .into_iter()
            .find(|k| k.name() == normalized)
            .ok_or_else(|| UnknownFilter(s.to_string()))
    }
}

// ─── Decision ───────────────────────────────────────────────────────

/// Outcome of the whole pipeline for one signal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterDecision {
    pub allowed: bool,
    /// Strength after reductions, clamped to 0..=100.
    pub adjusted_strength: f64,
    pub original_strength: f64,
    pub total_reduction: f64,
    /// One entry per triggered concern, in evaluation order.
    pub reasons: Vec<String>,
    /// Optional filters that triggered.
    pub hits: Vec<FilterKind>,
    /// Filters that could not be evaluated on this signal.
    pub skipped: Vec<FilterEvaluationError>,
}

/// Run the pipeline over `signal`.
///
/// `recent_closes` is the lookback window's closes, newest last. All rules
/// are evaluated so `reasons` and `total_reduction` reflect every concern.
pub fn evaluate(
    signal: &Signal,
    recent_closes: &[f64],
    current_price: f64,
    config: &SimConfig,
) -> FilterDecision {
    let min_strength = config.filters.min_signal_strength;
    let mut allowed = true;
    let mut reasons = Vec::new();

    if signal.is_neutral() {
        allowed = false;
        reasons.push("neutral signal never opens a position".to_string());
    }

    // strengths are on a 0..=100 scale; a non-finite one can never pass
    let strength = if signal.strength.is_finite() {
        clamp(signal.strength, 0.0, 100.0)
    } else {
        allowed = false;
        reasons.push(format!("strength {} is not a finite number", signal.strength));
        0.0
    };

    if strength < min_strength {
        allowed = false;
        reasons.push(format!(
            "strength {:.1} below minimum {:.1}",
            strength, min_strength
        ));
    }

    let ctx = FilterContext {
        signal,
        recent_closes,
        current_price,
        risk: &config.risk,
        thresholds: &config.filters.thresholds,
    };

    let mut total_reduction = 0.0;
    let mut hits = Vec::new();
    let mut skipped = Vec::new();

    for kind in config.filters.enabled_kinds() {
        match kind.rule().evaluate(&ctx) {
            RuleOutcome::Pass => {}
            RuleOutcome::Triggered { reduction, reason } => {
                total_reduction += reduction;
                reasons.push(reason);
                hits.push(kind);
            }
            RuleOutcome::Skipped(err) => {
                trace!(filter = %kind, error = %err, "filter skipped");
                skipped.push(err);
            }
        }
    }

    let adjusted_strength = clamp(strength - total_reduction, 0.0, 100.0);
    if adjusted_strength < min_strength {
        allowed = false;
    }

    FilterDecision {
        allowed,
        adjusted_strength,
        original_strength: signal.strength,
        total_reduction,
        reasons,
        hits,
        skipped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Direction;

    fn flat_closes(n: usize) -> Vec<f64> {
        vec![100.0; n]
    }

    fn quiet_long(strength: f64) -> Signal {
        Signal::long(strength)
            .with_atr(1.0)
            .with_rsi(50.0)
            .with_bollinger(110.0, 90.0)
    }

    #[test]
    fn clean_signal_is_allowed_unchanged() {
        let d = evaluate(&quiet_long(80.0), &flat_closes(150), 100.0, &SimConfig::default());
        assert!(d.allowed);
        assert_eq!(d.adjusted_strength, 80.0);
        assert_eq!(d.total_reduction, 0.0);
        assert!(d.reasons.is_empty());
        assert!(d.skipped.is_empty());
    }

    #[test]
    fn weak_signal_is_blocked_but_all_rules_still_run() {
        let signal = quiet_long(60.0).with_rsi(80.0);
        let d = evaluate(&signal, &flat_closes(150), 100.0, &SimConfig::default());
        assert!(!d.allowed);
        assert_eq!(d.hits, vec![FilterKind::RsiExtreme]);
        assert_eq!(d.total_reduction, 25.0);
        assert_eq!(d.reasons.len(), 2);
    }

    #[test]
    fn reductions_accumulate_and_clamp_at_zero() {
        // falling 5% over the last 16 closes, high ATR, near upper band, overbought
        let mut closes = flat_closes(150);
        let n = closes.len();
        closes[n - 16] = 105.0;
        let signal = Signal::long(90.0)
            .with_atr(4.0)
            .with_rsi(80.0)
            .with_bollinger(100.5, 90.0);
        let d = evaluate(&signal, &closes, 100.0, &SimConfig::default());
        assert_eq!(d.total_reduction, 30.0 + 20.0 + 30.0 + 25.0);
        assert_eq!(d.adjusted_strength, 0.0);
        assert!(!d.allowed);
        assert_eq!(
            d.hits,
            vec![
                FilterKind::Trend,
                FilterKind::Volatility,
                FilterKind::BandProximity,
                FilterKind::RsiExtreme
            ]
        );
    }

    #[test]
    fn reduction_below_minimum_blocks() {
        let signal = quiet_long(85.0).with_atr(5.0);
        let d = evaluate(&signal, &flat_closes(150), 100.0, &SimConfig::default());
        assert_eq!(d.adjusted_strength, 65.0);
        assert!(!d.allowed);
    }

    #[test]
    fn neutral_is_never_allowed() {
        let signal = Signal::new(Direction::Neutral, 100.0);
        let d = evaluate(&signal, &flat_closes(150), 100.0, &SimConfig::default());
        assert!(!d.allowed);
    }

    #[test]
    fn missing_indicators_are_skipped_not_triggered() {
        let d = evaluate(&Signal::long(80.0), &flat_closes(150), 100.0, &SimConfig::default());
        assert!(d.allowed);
        assert_eq!(d.skipped.len(), 3);
        assert_eq!(d.total_reduction, 0.0);
    }

    #[test]
    fn disabled_filter_does_not_apply() {
        let mut cfg = SimConfig::default();
        cfg.filters = cfg.filters.without(FilterKind::Volatility);
        let signal = quiet_long(85.0).with_atr(5.0);
        let d = evaluate(&signal, &flat_closes(150), 100.0, &cfg);
        assert!(d.allowed);
        assert_eq!(d.adjusted_strength, 85.0);
    }

    #[test]
    fn non_finite_strength_is_blocked() {
        let mut cfg = SimConfig::default();
        cfg.filters.min_signal_strength = 0.0;
        for strength in [f64::NAN, f64::INFINITY] {
            let d = evaluate(&quiet_long(strength), &flat_closes(150), 100.0, &cfg);
            assert!(!d.allowed);
            assert_eq!(d.adjusted_strength, 0.0);
            assert!(d.reasons[0].contains("not a finite number"));
        }
    }

    #[test]
    fn strength_above_scale_is_capped_before_reductions() {
        let mut cfg = SimConfig::default();
        cfg.filters.min_signal_strength = 80.0;
        let signal = quiet_long(150.0).with_rsi(80.0);
        let d = evaluate(&signal, &flat_closes(150), 100.0, &cfg);
        assert_eq!(d.original_strength, 150.0);
        assert_eq!(d.adjusted_strength, 75.0);
        assert!(!d.allowed);
    }

    #[test]
    fn kind_parses_from_name() {
        assert_eq!("rsi-extreme".parse::<FilterKind>(), Ok(FilterKind::RsiExtreme));
        assert_eq!("Trend".parse::<FilterKind>(), Ok(FilterKind::Trend));
        assert!("adx".parse::<FilterKind>().is_err());
        for kind in FilterKind::ALL {
            assert_eq!(kind.rule().kind(), kind);
        }
    }
}
