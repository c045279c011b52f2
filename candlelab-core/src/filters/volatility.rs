//! Volatility filter - discounts signals when ATR is large relative to price.

use crate::error::FilterEvaluationError;
use crate::math::pct_of;

use super::{FilterContext, FilterKind, RuleOutcome, SignalFilter};

/// Triggers when `atr / price * 100 > max_atr_pct`.
#[derive(Debug, Clone, Copy, Default)]
pub struct VolatilityFilter;

impl SignalFilter for VolatilityFilter {
    fn kind(&self) -> FilterKind {
        FilterKind::Volatility
    }

    fn evaluate(&self, ctx: &FilterContext<'_>) -> RuleOutcome {
        let Some(atr) = ctx.signal.indicators.atr.filter(|v| v.is_finite()) else {
            return RuleOutcome::Skipped(FilterEvaluationError::MissingIndicator {
                filter: FilterKind::Volatility.name(),
                indicator: "atr",
            });
        };

        let atr_pct = pct_of(atr, ctx.current_price);
        if atr_pct > ctx.thresholds.max_atr_pct {
            RuleOutcome::Triggered {
                reduction: ctx.thresholds.volatility_reduction,
                reason: format!(
                    "volatility too high: ATR {:.2}% of price (max {:.2}%)",
                    atr_pct, ctx.thresholds.max_atr_pct
                ),
            }
        } else {
            RuleOutcome::Pass
        }
    }
}
