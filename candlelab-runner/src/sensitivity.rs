//! Filter sensitivity analysis.
//!
//! Runs the same candles and signal source under several filter
//! configurations and reports each scenario's statistics next to the
//! baseline. Scenarios differ only in `FilterConfig`; risk, sizing and
//! warm-up come from the base config, so outcome differences are
//! attributable to the filters alone.
//!
//! Scenarios run in parallel on the rayon pool. Each run owns its own
//! simulation state, and results come back in scenario order.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use candlelab_core::config::{FilterConfig, SimConfig};
use candlelab_core::domain::Candle;
use candlelab_core::engine::{run, RunDiagnostics, SignalSource};
use candlelab_core::{FilterKind, PerformanceStats};

use crate::runner::RunError;

/// Return change (percentage points) beyond which a filter's removal counts.
pub const VERDICT_MARGIN: f64 = 0.5;

/// One filter configuration to test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub description: String,
    pub filters: FilterConfig,
    /// The single filter this scenario removes from the baseline, if any.
    pub removes: Option<FilterKind>,
}

/// Statistics of a scenario relative to the baseline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScenarioDelta {
    pub trades: i64,
    /// Percentage points.
    pub total_return: f64,
    /// Percentage points.
    pub win_rate: f64,
}

/// What removing a single filter did to the total return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterVerdict {
    /// Return rose by more than the margin without it.
    Limiting,
    /// Return fell by more than the margin without it.
    Useful,
    Negligible,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub name: String,
    pub description: String,
    pub stats: PerformanceStats,
    pub diagnostics: RunDiagnostics,
    pub delta: ScenarioDelta,
    pub verdict: Option<FilterVerdict>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityReport {
    /// Name of the first scenario, against which deltas are taken.
    pub baseline: String,
    pub results: Vec<ScenarioResult>,
}

impl SensitivityReport {
    /// Results sorted by total return, best first. Ties keep scenario order.
    pub fn ranked(&self) -> Vec<&ScenarioResult> {
        let mut sorted: Vec<&ScenarioResult> = self.results.iter().collect();
        sorted.sort_by(|a, b| {
            b.stats
                .total_return
                .partial_cmp(&a.stats.total_return)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        sorted
    }
}

/// The eight reference scenarios, derived from `base`'s thresholds and
/// minimum strength.
pub fn reference_scenarios(base: &FilterConfig) -> Vec<Scenario> {
    let all = base.clone().only(&FilterKind::ALL);

    let mut scenarios = vec![Scenario {
        name: "baseline".into(),
        description: "all filters enabled".into(),
        filters: all.clone(),
        removes: None,
    }];
    for &kind in FilterKind::ALL.iter() {
        scenarios.push(Scenario {
            name: format!("without_{}", kind.name()),
            description: format!("every filter except {}", kind.name()),
            filters: all.clone().without(kind),
            removes: Some(kind),
        });
    }
    scenarios.push(Scenario {
        name: "minimal".into(),
        description: "trend and volatility only".into(),
        filters: all.clone().only(&[FilterKind::Trend, FilterKind::Volatility]),
        removes: None,
    });
    scenarios.push(Scenario {
        name: "none".into(),
        description: "minimum strength only".into(),
        filters: all.none(),
        removes: None,
    });
    scenarios
}

/// Run every scenario over the same candles and source.
///
/// The first scenario is the baseline. An empty scenario list yields an
/// empty report.
pub fn run_sensitivity(
    candles: &[Candle],
    source: &dyn SignalSource,
    base: &SimConfig,
    scenarios: &[Scenario],
) -> Result<SensitivityReport, RunError> {
    info!(scenarios = scenarios.len(), candles = candles.len(), "sensitivity started");

    let runs: Vec<(PerformanceStats, RunDiagnostics)> = scenarios
        .par_iter()
        .map(|scenario| -> Result<(PerformanceStats, RunDiagnostics), RunError> {
            let config = SimConfig {
                filters: scenario.filters.clone(),
                ..base.clone()
            };
            let state = run(candles, source, &config)?;
            Ok((PerformanceStats::compute(&state), state.diagnostics))
        })
        .collect::<Result<Vec<_>, RunError>>()?;

    let Some((baseline_stats, _)) = runs.first() else {
        return Ok(SensitivityReport {
            baseline: String::new(),
            results: Vec::new(),
        });
    };
    let baseline_stats = baseline_stats.clone();

    let results: Vec<ScenarioResult> = scenarios
        .iter()
        .zip(runs)
        .map(|(scenario, (stats, diagnostics))| {
            let delta = delta(&baseline_stats, &stats);
            ScenarioResult {
                name: scenario.name.clone(),
                description: scenario.description.clone(),
                verdict: scenario.removes.map(|_| verdict(delta.total_return)),
                delta,
                stats,
                diagnostics,
            }
        })
        .collect();

    info!(scenarios = results.len(), "sensitivity finished");
    Ok(SensitivityReport {
        baseline: scenarios[0].name.clone(),
        results,
    })
}

fn delta(baseline: &PerformanceStats, stats: &PerformanceStats) -> ScenarioDelta {
    ScenarioDelta {
        trades: stats.total_trades as i64 - baseline.total_trades as i64,
        total_return: stats.total_return - baseline.total_return,
        win_rate: stats.win_rate - baseline.win_rate,
    }
}

fn verdict(return_delta: f64) -> FilterVerdict {
    if return_delta > VERDICT_MARGIN {
        FilterVerdict::Limiting
    } else if return_delta < -VERDICT_MARGIN {
        FilterVerdict::Useful
    } else {
        FilterVerdict::Negligible
    }
}
