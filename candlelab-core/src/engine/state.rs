//! Simulation output: trade log, equity curve and run diagnostics.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::{ClosedTrade, EquityPoint};
use crate::filters::{FilterDecision, FilterKind};

/// Final state of one run. Read-only input to analytics.
///
/// Every position has been closed by the time this value exists, so the
/// cash balance equals the last equity point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationState {
    pub initial_balance: f64,
    pub cash_balance: f64,
    /// Append-only, in close order.
    pub closed_trades: Vec<ClosedTrade>,
    /// One point per processed tick.
    pub equity_curve: Vec<EquityPoint>,
    pub diagnostics: RunDiagnostics,
}

impl SimulationState {
    pub fn new(initial_balance: f64) -> Self {
        Self {
            initial_balance,
            cash_balance: initial_balance,
            closed_trades: Vec::new(),
            equity_curve: Vec::new(),
            diagnostics: RunDiagnostics::default(),
        }
    }

    pub fn final_balance(&self) -> f64 {
        self.cash_balance
    }

    pub fn total_trades(&self) -> usize {
        self.closed_trades.len()
    }
}

/// Counters explaining why a run traded the way it did.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunDiagnostics {
    pub ticks: usize,
    pub signals_seen: usize,
    /// Signals with a LONG or SHORT direction.
    pub directional_signals: usize,
    /// Directional signals that reached the filter pipeline (a slot was free).
    pub entries_evaluated: usize,
    pub entries_opened: usize,
    pub entries_blocked: usize,
    /// Times each optional filter triggered, keyed by filter name.
    pub filter_hits: BTreeMap<String, usize>,
    /// Filter evaluations skipped for a missing indicator.
    pub filters_skipped: usize,
    /// Ticks that ended with at least one open position.
    pub ticks_in_market: usize,
}

impl RunDiagnostics {
    pub(crate) fn record_decision(&mut self, decision: &FilterDecision) {
        self.entries_evaluated += 1;
        for kind in &decision.hits {
            *self.filter_hits.entry(kind.name().to_string()).or_insert(0) += 1;
        }
        self.filters_skipped += decision.skipped.len();
        if decision.allowed {
            self.entries_opened += 1;
        } else {
            self.entries_blocked += 1;
        }
    }

    pub fn hits_for(&self, kind: FilterKind) -> usize {
        self.filter_hits.get(kind.name()).copied().unwrap_or(0)
    }

    /// Fraction of ticks spent holding a position (0.0 with no ticks).
    pub fn exposure(&self) -> f64 {
        if self.ticks == 0 {
            return 0.0;
        }
        self.ticks_in_market as f64 / self.ticks as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_state_starts_at_initial_balance() {
        let state = SimulationState::new(1000.0);
        assert_eq!(state.final_balance(), 1000.0);
        assert_eq!(state.total_trades(), 0);
    }

    #[test]
    fn exposure_guards_zero_ticks() {
        let mut d = RunDiagnostics::default();
        assert_eq!(d.exposure(), 0.0);
        d.ticks = 4;
        d.ticks_in_market = 1;
        assert!((d.exposure() - 0.25).abs() < 1e-12);
    }

    #[test]
    fn record_decision_counts_hits() {
        let mut d = RunDiagnostics::default();
        let decision = FilterDecision {
            allowed: false,
            adjusted_strength: 50.0,
            original_strength: 80.0,
            total_reduction: 30.0,
            reasons: vec!["trend".into()],
            hits: vec![FilterKind::Trend],
            skipped: Vec::new(),
        };
        d.record_decision(&decision);
        d.record_decision(&decision);
        assert_eq!(d.hits_for(FilterKind::Trend), 2);
        assert_eq!(d.hits_for(FilterKind::Volatility), 0);
        assert_eq!(d.entries_blocked, 2);
        assert_eq!(d.entries_evaluated, 2);
    }
}
