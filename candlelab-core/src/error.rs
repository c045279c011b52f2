//! Error taxonomy for the engine.
//!
//! Structural failures (`EngineError`) abort a run before or between ticks.
//! `FilterEvaluationError` is never returned as `Err`: it is recorded on the
//! filter decision and the affected filter simply does not apply.

use serde::Serialize;
use thiserror::Error;

use crate::filters::FilterKind;

/// Errors that abort a simulation run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("insufficient data: need at least {required} candles, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),
}

/// Invalid configuration or input prices. Detected before the first tick.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{field} must be a positive finite percentage, got {value}")]
    NonPositivePercentage { field: &'static str, value: f64 },

    #[error("{field} must be a non-negative finite percentage, got {value}")]
    NegativePercentage { field: &'static str, value: f64 },

    #[error("trade_notional must be positive and finite, got {0}")]
    NonPositiveTradeNotional(f64),

    #[error("initial_balance must be non-negative and finite, got {0}")]
    InvalidInitialBalance(f64),

    #[error("min_signal_strength must be within 0..=100, got {0}")]
    StrengthOutOfRange(f64),

    #[error("warmup_candles must be at least 1")]
    ZeroWarmup,

    #[error("max_concurrent_positions must be at least 1")]
    ZeroMaxPositions,

    #[error("filter '{0}' is listed more than once")]
    DuplicateFilter(FilterKind),

    #[error("entry price must be positive and finite, got {0}")]
    NonPositiveEntryPrice(f64),

    #[error("candle {index} has a non-positive or non-finite price ({value})")]
    NonPositiveCandlePrice { index: usize, value: f64 },
}

/// A filter could not be evaluated for one tick.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub enum FilterEvaluationError {
    #[error("filter '{filter}' needs indicator '{indicator}' which the signal does not carry")]
    MissingIndicator {
        filter: &'static str,
        indicator: &'static str,
    },
}
