//! Integration tests for filter sensitivity analysis.

use candlelab_core::domain::{Candle, Direction, Signal};
use candlelab_core::engine::run;
use candlelab_core::{FilterConfig, PerformanceStats, SimConfig};
use candlelab_runner::synthetic::{self, SyntheticConfig};
use candlelab_runner::{reference_scenarios, run_sensitivity, FilterVerdict, ReferenceSource};

fn candles() -> Vec<Candle> {
    synthetic::generate(&SyntheticConfig {
        seed: 5,
        candles: 1_200,
        volatility_pct: 1.0,
        ..SyntheticConfig::default()
    })
}

/// Alternates direction with the window's net move and attaches
/// indicators so every optional filter has something to look at.
fn busy_source(window: &[Candle]) -> Signal {
    let first = window[0].close;
    let last = window[window.len() - 1].close;
    let direction = if last >= first {
        Direction::Long
    } else {
        Direction::Short
    };
    Signal::new(direction, 85.0)
        .with_atr(last * 0.02)
        .with_rsi(if last >= first { 78.0 } else { 40.0 })
        .with_bollinger(last * 1.005, last * 0.97)
}

fn base_config() -> SimConfig {
    SimConfig {
        warmup_candles: 50,
        ..SimConfig::default()
    }
}

#[test]
fn results_come_back_in_scenario_order() {
    let candles = candles();
    let scenarios = reference_scenarios(&FilterConfig::default());
    let report = run_sensitivity(&candles, &busy_source, &base_config(), &scenarios).unwrap();

    assert_eq!(report.baseline, "baseline");
    let names: Vec<&str> = report.results.iter().map(|r| r.name.as_str()).collect();
    let expected: Vec<&str> = scenarios.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, expected);

    let baseline = &report.results[0];
    assert_eq!(baseline.delta.trades, 0);
    assert_eq!(baseline.delta.total_return, 0.0);
    assert!(baseline.verdict.is_none());
    assert!(report.results[1..6].iter().all(|r| r.verdict.is_some()));
    assert!(report.results[6..].iter().all(|r| r.verdict.is_none()));
}

#[test]
fn parallel_results_match_sequential_runs() {
    let candles = candles();
    let base = base_config();
    let scenarios = reference_scenarios(&base.filters);
    let report = run_sensitivity(&candles, &busy_source, &base, &scenarios).unwrap();

    for (scenario, result) in scenarios.iter().zip(&report.results) {
        let config = SimConfig {
            filters: scenario.filters.clone(),
            ..base.clone()
        };
        let state = run(&candles, &busy_source, &config).unwrap();
        assert_eq!(result.stats, PerformanceStats::compute(&state));
        assert_eq!(result.diagnostics, state.diagnostics);
    }
}

#[test]
fn disabled_filters_record_no_hits() {
    let candles = candles();
    let report = run_sensitivity(
        &candles,
        &busy_source,
        &base_config(),
        &reference_scenarios(&FilterConfig::default()),
    )
    .unwrap();

    let none = report.results.iter().find(|r| r.name == "none").unwrap();
    assert!(none.diagnostics.filter_hits.values().all(|&n| n == 0));
    assert_eq!(none.diagnostics.entries_blocked, 0);

    let baseline = &report.results[0];
    assert!(baseline.diagnostics.entries_blocked > 0);
}

#[test]
fn verdicts_follow_return_deltas() {
    let candles = candles();
    let report = run_sensitivity(
        &candles,
        &ReferenceSource::default(),
        &base_config(),
        &reference_scenarios(&FilterConfig::default()),
    )
    .unwrap();
    for r in &report.results {
        match r.verdict {
            Some(FilterVerdict::Limiting) => assert!(r.delta.total_return > 0.5),
            Some(FilterVerdict::Useful) => assert!(r.delta.total_return < -0.5),
            Some(FilterVerdict::Negligible) => assert!(r.delta.total_return.abs() <= 0.5),
            None => {}
        }
    }
    let ranked = report.ranked();
    assert_eq!(ranked.len(), report.results.len());
    assert!(ranked
        .windows(2)
        .all(|w| w[0].stats.total_return >= w[1].stats.total_return));
}

#[test]
fn empty_scenario_list_is_an_empty_report() {
    let report = run_sensitivity(&candles(), &busy_source, &base_config(), &[]).unwrap();
    assert!(report.results.is_empty());
}
