//! Bollinger band proximity filter.
//!
//! A long entry within `band_proximity_pct` of the upper band (or already
//! above it), or a short entry that close to the lower band, is buying into
//! resistance / selling into support and gets discounted.

use crate::domain::PositionSide;
use crate::error::FilterEvaluationError;
use crate::math::pct_of;

use super::{FilterContext, FilterKind, RuleOutcome, SignalFilter};

#[derive(Debug, Clone, Copy, Default)]
pub struct BandProximityFilter;

impl SignalFilter for BandProximityFilter {
    fn kind(&self) -> FilterKind {
        FilterKind::BandProximity
    }

    fn evaluate(&self, ctx: &FilterContext<'_>) -> RuleOutcome {
        let Some(bands) = ctx
            .signal
            .indicators
            .bollinger
            .filter(|b| b.upper.is_finite() && b.lower.is_finite())
        else {
            return RuleOutcome::Skipped(FilterEvaluationError::MissingIndicator {
                filter: FilterKind::BandProximity.name(),
                indicator: "bollinger",
            });
        };

        let price = ctx.current_price;
        let limit = ctx.thresholds.band_proximity_pct;
        let (distance, band) = match ctx.signal.direction.side() {
            Some(PositionSide::Long) => (pct_of(bands.upper - price, price), "upper"),
            Some(PositionSide::Short) => (pct_of(price - bands.lower, price), "lower"),
            None => return RuleOutcome::Pass,
        };

        if distance < limit {
            RuleOutcome::Triggered {
                reduction: ctx.thresholds.band_reduction,
                reason: format!("price {distance:.2}% from {band} Bollinger band"),
            }
        } else {
            RuleOutcome::Pass
        }
    }
}
