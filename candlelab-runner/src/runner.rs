//! Backtest runner: wires together data, signal source, engine and analytics.
//!
//! Entry points:
//! - `run_from_file()` / `run_file_with_limit()`: resolve the run file's
//!   data, build the reference source and run. Used by the CLI.
//! - `run_backtest()`: pre-loaded candles and any signal source, no I/O.
//! - `run_bounded()`: same, but stops after at most `max_ticks` ticks and
//!   force-closes at the last processed candle.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use candlelab_core::config::SimConfig;
use candlelab_core::domain::{Candle, ClosedTrade, EquityPoint};
use candlelab_core::engine::{RunDiagnostics, SignalSource, Simulation};
use candlelab_core::{EngineError, PerformanceStats};

use crate::data_loader::{dataset_hash, load_candles, LoadError, LoadedCandles};
use crate::fingerprint::{run_fingerprint, trade_log_hash};
use crate::run_file::{DataSpec, RunFile, RunFileError};
use crate::signals::{ReferenceConfig, ReferenceSource};
use crate::synthetic;

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("run file error: {0}")]
    RunFile(#[from] RunFileError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Current schema version for persisted reports.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of a single run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub fingerprint: String,
    pub trade_log_hash: String,
    pub dataset_hash: String,
    pub config: SimConfig,
    /// Reference-source parameters, when the run used it.
    pub signal: Option<ReferenceConfig>,
    pub stats: PerformanceStats,
    pub diagnostics: RunDiagnostics,
    pub candle_count: usize,
    /// Stopped early by `run_bounded`.
    pub truncated: bool,
    pub data_quality_warnings: Vec<String>,
    pub trades: Vec<ClosedTrade>,
    pub equity_curve: Vec<EquityPoint>,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl RunReport {
    /// First 12 hex chars of the fingerprint.
    pub fn short_id(&self) -> &str {
        let end = self.fingerprint.len().min(12);
        &self.fingerprint[..end]
    }
}

/// Load the run file's candles and run with the reference source.
pub fn run_from_file(file: &RunFile) -> Result<RunReport, RunError> {
    run_file_with_limit(file, None)
}

/// `run_from_file`, stopping after at most `max_ticks` ticks when set.
pub fn run_file_with_limit(file: &RunFile, max_ticks: Option<usize>) -> Result<RunReport, RunError> {
    let config = file.to_sim_config()?;
    let loaded = load_data(&file.data_spec()?)?;
    let source = ReferenceSource::new(file.signal.clone());
    let mut report = execute(
        &loaded.candles,
        &source,
        &config,
        max_ticks,
        Some(&file.signal),
    )?;
    report.data_quality_warnings = loaded.data_quality_warnings;
    Ok(report)
}

/// Resolve a data spec into candles.
pub fn load_data(spec: &DataSpec) -> Result<LoadedCandles, LoadError> {
    match spec {
        DataSpec::Csv(path) => load_candles(path),
        DataSpec::Synthetic(cfg) => {
            cfg.validate()?;
            let candles = synthetic::generate(cfg);
            if candles.is_empty() {
                return Err(LoadError::Empty);
            }
            Ok(LoadedCandles {
                dataset_hash: dataset_hash(&candles),
                candles,
                data_quality_warnings: Vec::new(),
            })
        }
    }
}

/// Run over pre-loaded candles.
pub fn run_backtest(
    candles: &[Candle],
    source: &dyn SignalSource,
    config: &SimConfig,
) -> Result<RunReport, RunError> {
    execute(candles, source, config, None, None)
}

/// Run at most `max_ticks` ticks.
pub fn run_bounded(
    candles: &[Candle],
    source: &dyn SignalSource,
    config: &SimConfig,
    max_ticks: usize,
) -> Result<RunReport, RunError> {
    execute(candles, source, config, Some(max_ticks), None)
}

fn execute(
    candles: &[Candle],
    source: &dyn SignalSource,
    config: &SimConfig,
    max_ticks: Option<usize>,
    signal: Option<&ReferenceConfig>,
) -> Result<RunReport, RunError> {
    let data_hash = dataset_hash(candles);
    let fingerprint = run_fingerprint(config, signal, &data_hash)?;

    let mut sim = Simulation::new(candles, config)?;
    info!(
        fingerprint = &fingerprint[..12],
        candles = candles.len(),
        max_ticks,
        "run started"
    );

    let mut ticks = 0usize;
    while max_ticks.map_or(true, |m| ticks < m) {
        if sim.step(source)?.is_none() {
            break;
        }
        ticks += 1;
    }
    let truncated = !sim.is_done();
    let state = sim.finish();
    let stats = PerformanceStats::compute(&state);

    info!(
        fingerprint = &fingerprint[..12],
        ticks,
        trades = stats.total_trades,
        total_return = stats.total_return,
        truncated,
        "run finished"
    );

    Ok(RunReport {
        schema_version: SCHEMA_VERSION,
        trade_log_hash: trade_log_hash(&state.closed_trades)?,
        fingerprint,
        dataset_hash: data_hash,
        config: config.clone(),
        signal: signal.cloned(),
        stats,
        diagnostics: state.diagnostics,
        candle_count: candles.len(),
        truncated,
        data_quality_warnings: Vec::new(),
        trades: state.closed_trades,
        equity_curve: state.equity_curve,
    })
}
