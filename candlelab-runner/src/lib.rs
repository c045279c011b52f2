//! CandleLab Runner: everything around a single engine run.
//!
//! This crate builds on `candlelab-core` to provide:
//! - TOML run files mapped onto `SimConfig`
//! - CSV candle loading and a seeded synthetic candle generator
//! - A reference indicator-based signal source
//! - Single-run orchestration with content fingerprints
//! - Filter sensitivity analysis over parallel scenarios
//! - Artifact export (JSON report, trades CSV, equity CSV)

pub mod data_loader;
pub mod export;
pub mod fingerprint;
pub mod run_file;
pub mod runner;
pub mod sensitivity;
pub mod signals;
pub mod synthetic;

pub use data_loader::{load_candles, parse_candles, LoadError, LoadedCandles};
pub use run_file::{DataSpec, RunFile, RunFileError};
pub use runner::{
    load_data, run_backtest, run_bounded, run_file_with_limit, run_from_file, RunError, RunReport,
};
pub use sensitivity::{
    reference_scenarios, run_sensitivity, FilterVerdict, Scenario, ScenarioResult,
    SensitivityReport,
};
pub use signals::{ReferenceConfig, ReferenceSource};
pub use synthetic::{SyntheticConfig, SyntheticError};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn run_report_is_send_sync() {
        assert_send::<RunReport>();
        assert_sync::<RunReport>();
    }

    #[test]
    fn sensitivity_types_are_send_sync() {
        assert_send::<Scenario>();
        assert_sync::<Scenario>();
        assert_send::<SensitivityReport>();
        assert_sync::<SensitivityReport>();
    }

    #[test]
    fn reference_source_is_send_sync() {
        assert_send::<ReferenceSource>();
        assert_sync::<ReferenceSource>();
    }

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<RunFile>();
        assert_sync::<RunFile>();
        assert_send::<SyntheticConfig>();
        assert_sync::<SyntheticConfig>();
    }

    #[test]
    fn errors_are_send_sync() {
        assert_send::<RunError>();
        assert_sync::<RunError>();
    }
}
