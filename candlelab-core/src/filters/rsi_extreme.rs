//! RSI extreme filter: no chasing overbought longs or oversold shorts.

use crate::domain::PositionSide;
use crate::error::FilterEvaluationError;

use super::{FilterContext, FilterKind, RuleOutcome, SignalFilter};

#[derive(Debug, Clone, Copy, Default)]
pub struct RsiExtremeFilter;

impl SignalFilter for RsiExtremeFilter {
    fn kind(&self) -> FilterKind {
        FilterKind::RsiExtreme
    }

    fn evaluate(&self, ctx: &FilterContext<'_>) -> RuleOutcome {
        let Some(rsi) = ctx.signal.indicators.rsi.filter(|v| v.is_finite()) else {
            return RuleOutcome::Skipped(FilterEvaluationError::MissingIndicator {
                filter: FilterKind::RsiExtreme.name(),
                indicator: "rsi",
            });
        };

        let t = ctx.thresholds;
        let reason = match ctx.signal.direction.side() {
            Some(PositionSide::Long) if rsi > t.rsi_overbought => {
                format!("RSI {rsi:.1} overbought for LONG (> {:.0})", t.rsi_overbought)
            }
            Some(PositionSide::Short) if rsi < t.rsi_oversold => {
                format!("RSI {rsi:.1} oversold for SHORT (< {:.0})", t.rsi_oversold)
            }
            _ => return RuleOutcome::Pass,
        };

        RuleOutcome::Triggered {
            reduction: t.rsi_reduction,
            reason,
        }
    }
}
