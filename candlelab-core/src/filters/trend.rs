//! Multi-timeframe trend filter.
//!
//! Compares the newest close with the close `trend_lookback` candles back
//! (16 x 15m = 4h by default). A move against the signal direction larger
//! than `trend_threshold_pct` discounts the signal.

use crate::domain::PositionSide;
use crate::math::percent_change;

use super::{FilterContext, FilterKind, RuleOutcome, SignalFilter};

#[derive(Debug, Clone, Copy, Default)]
pub struct TrendFilter;

impl TrendFilter {
    /// Percent change over the lookback, 0.0 if the window is too short.
    pub fn change_pct(closes: &[f64], lookback: usize) -> f64 {
        if lookback == 0 || closes.len() < lookback {
            return 0.0;
        }
        let reference = closes[closes.len() - lookback];
        let newest = closes[closes.len() - 1];
        percent_change(reference, newest)
    }
}

impl SignalFilter for TrendFilter {
    fn kind(&self) -> FilterKind {
        FilterKind::Trend
    }

    fn evaluate(&self, ctx: &FilterContext<'_>) -> RuleOutcome {
        let t = ctx.thresholds;
        let change = Self::change_pct(ctx.recent_closes, t.trend_lookback);

        let opposed = match ctx.signal.direction.side() {
            Some(PositionSide::Long) => change < -t.trend_threshold_pct,
            Some(PositionSide::Short) => change > t.trend_threshold_pct,
            None => false,
        };

        if opposed {
            RuleOutcome::Triggered {
                reduction: t.trend_reduction,
                reason: format!(
                    "higher-timeframe trend opposes {:?} ({:+.2}% over {} candles)",
                    ctx.signal.direction, change, t.trend_lookback
                ),
            }
        } else {
            RuleOutcome::Pass
        }
    }
}
