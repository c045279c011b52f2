//! CandleLab Core: deterministic candle-by-candle backtest engine.
//!
//! This crate contains the heart of the simulator:
//! - Domain types (candles, signals, positions, closed trades, equity points)
//! - Signal filter pipeline with individually toggleable rules
//! - Position lifecycle engine with a ratcheting trailing stop
//! - Backtest driver (stepwise tick loop over an injected signal source)
//! - Performance analytics over the finished trade log and equity curve
//!
//! No I/O happens here: candles and signals come in, plain data comes out.

pub mod analytics;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod filters;
pub mod lifecycle;
pub mod math;
pub mod serde_float;

pub use analytics::PerformanceStats;
pub use config::{FilterConfig, FilterDescriptor, FilterThresholds, RiskConfig, SimConfig};
pub use engine::{run, RunDiagnostics, SignalSource, Simulation, SimulationState};
pub use error::{ConfigError, EngineError, FilterEvaluationError};
pub use filters::{FilterDecision, FilterKind};
