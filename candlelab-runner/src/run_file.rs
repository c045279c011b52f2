//! TOML run files.
//!
//! ```toml
//! [backtest]
//! initial_balance = 1000.0
//! trade_notional = 100.0
//! max_concurrent_positions = 1
//! warmup_candles = 150
//!
//! [risk]
//! stop_loss_pct = 2.0
//! take_profit_pct = 3.0
//!
//! [filters]
//! min_signal_strength = 70.0
//! disabled = ["rsi_extreme"]
//!
//! [data]
//! path = "candles.csv"
//! ```
//!
//! Every key is optional; missing keys take the engine defaults. Relative
//! data paths resolve against the run file's directory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use candlelab_core::config::{FilterThresholds, RiskConfig, SimConfig};
use candlelab_core::{ConfigError, FilterKind};

use crate::signals::ReferenceConfig;
use crate::synthetic::{SyntheticConfig, SyntheticError};

/// Errors from run-file loading.
#[derive(Debug, Error)]
pub enum RunFileError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse run file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid engine config: {0}")]
    Invalid(#[from] ConfigError),

    #[error("filter '{0}' is listed as both enabled and disabled")]
    ConflictingFilter(FilterKind),

    #[error("[data] sets both path and synthetic")]
    AmbiguousData,

    #[error("invalid [data.synthetic]: {0}")]
    Synthetic(#[from] SyntheticError),
}

/// A parsed run file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunFile {
    pub backtest: BacktestSection,
    pub risk: RiskConfig,
    pub filters: FiltersSection,
    pub data: DataSection,
    pub signal: ReferenceConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BacktestSection {
    pub initial_balance: f64,
    pub trade_notional: f64,
    pub max_concurrent_positions: usize,
    pub warmup_candles: usize,
}

impl Default for BacktestSection {
    fn default() -> Self {
        let d = SimConfig::default();
        Self {
            initial_balance: d.initial_balance,
            trade_notional: d.trade_notional,
            max_concurrent_positions: d.max_concurrent_positions,
            warmup_candles: d.warmup_candles,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FiltersSection {
    pub min_signal_strength: f64,
    /// When set, exactly these optional filters are enabled.
    pub enabled: Option<Vec<FilterKind>>,
    /// Applied after `enabled`.
    pub disabled: Vec<FilterKind>,
    pub thresholds: FilterThresholds,
}

impl Default for FiltersSection {
    fn default() -> Self {
        let d = SimConfig::default().filters;
        Self {
            min_signal_strength: d.min_signal_strength,
            enabled: None,
            disabled: Vec::new(),
            thresholds: d.thresholds,
        }
    }
}

/// Where candles come from. With neither key set the runner falls back
/// to default synthetic candles.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DataSection {
    pub path: Option<PathBuf>,
    pub synthetic: Option<SyntheticConfig>,
}

/// Resolved candle source.
#[derive(Debug, Clone, PartialEq)]
pub enum DataSpec {
    Csv(PathBuf),
    Synthetic(SyntheticConfig),
}

impl RunFile {
    /// Load from a TOML file on disk.
    pub fn from_file(path: &Path) -> Result<Self, RunFileError> {
        let content = std::fs::read_to_string(path).map_err(|source| RunFileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut file = Self::from_toml(&content)?;
        if let (Some(data), Some(base)) = (file.data.path.as_mut(), path.parent()) {
            if data.is_relative() {
                *data = base.join(&*data);
            }
        }
        Ok(file)
    }

    /// Parse from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, RunFileError> {
        Ok(toml::from_str(content)?)
    }

    /// Build and validate the engine configuration.
    pub fn to_sim_config(&self) -> Result<SimConfig, RunFileError> {
        let mut filters = SimConfig::default().filters;
        filters.min_signal_strength = self.filters.min_signal_strength;
        filters.thresholds = self.filters.thresholds.clone();

        if let Some(enabled) = &self.filters.enabled {
            if let Some(&kind) = enabled.iter().find(|k| self.filters.disabled.contains(k)) {
                return Err(RunFileError::ConflictingFilter(kind));
            }
            filters = filters.only(enabled);
        }
        for &kind in &self.filters.disabled {
            filters = filters.without(kind);
        }

        let config = SimConfig {
            risk: self.risk.clone(),
            filters,
            trade_notional: self.backtest.trade_notional,
            initial_balance: self.backtest.initial_balance,
            max_concurrent_positions: self.backtest.max_concurrent_positions,
            warmup_candles: self.backtest.warmup_candles,
        };
        config.validate()?;
        Ok(config)
    }

    /// Resolve the candle source.
    pub fn data_spec(&self) -> Result<DataSpec, RunFileError> {
        match (&self.data.path, &self.data.synthetic) {
            (Some(_), Some(_)) => Err(RunFileError::AmbiguousData),
            (Some(path), None) => Ok(DataSpec::Csv(path.clone())),
            (None, Some(syn)) => {
                syn.validate()?;
                Ok(DataSpec::Synthetic(syn.clone()))
            }
            (None, None) => Ok(DataSpec::Synthetic(SyntheticConfig::default())),
        }
    }
}
