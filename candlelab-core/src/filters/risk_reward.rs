//! Risk/reward filter: penalises configurations whose take-profit is not
//! sufficiently far relative to the stop-loss.

use super::{FilterContext, FilterKind, RuleOutcome, SignalFilter};

#[derive(Debug, Clone, Copy, Default)]
pub struct RiskRewardFilter;

impl SignalFilter for RiskRewardFilter {
    fn kind(&self) -> FilterKind {
        FilterKind::RiskReward
    }

    fn evaluate(&self, ctx: &FilterContext<'_>) -> RuleOutcome {
        let ratio = ctx.risk.risk_reward_ratio();
        if ratio < ctx.thresholds.min_risk_reward {
            RuleOutcome::Triggered {
                reduction: ctx.thresholds.risk_reward_reduction,
                reason: format!(
                    "risk/reward {:.2} below {:.2}",
                    ratio, ctx.thresholds.min_risk_reward
                ),
            }
        } else {
            RuleOutcome::Pass
        }
    }
}
