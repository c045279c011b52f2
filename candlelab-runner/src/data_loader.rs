//! Candle loading for the runner.
//!
//! Reads an OHLCV CSV with the header
//! `timestamp,open,high,low,close,volume`. The timestamp column accepts
//! RFC 3339 strings or integer Unix epochs (milliseconds when the value is
//! larger than 10^11, seconds otherwise).
//!
//! Timestamps must be strictly ascending; the engine assumes no reordering.
//! Candles that fail the OHLC sanity check are kept and reported as
//! data-quality warnings.

use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use candlelab_core::domain::Candle;

use crate::synthetic::SyntheticError;

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("row {row}: {reason}")]
    MalformedRow { row: usize, reason: String },

    #[error("row {row}: timestamp {current} is not after the previous {previous}")]
    Unsorted {
        row: usize,
        previous: DateTime<Utc>,
        current: DateTime<Utc>,
    },

    #[error("no candles in input")]
    Empty,

    #[error(transparent)]
    Synthetic(#[from] SyntheticError),
}

/// Candles plus provenance.
#[derive(Debug, Clone)]
pub struct LoadedCandles {
    pub candles: Vec<Candle>,
    /// BLAKE3 over every timestamp and OHLCV value.
    pub dataset_hash: String,
    pub data_quality_warnings: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CandleRow {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: f64,
}

/// Load candles from a CSV file on disk.
pub fn load_candles(path: &Path) -> Result<LoadedCandles, LoadError> {
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let loaded = parse_candles(file)?;
    debug!(
        path = %path.display(),
        candles = loaded.candles.len(),
        "candles loaded"
    );
    Ok(loaded)
}

/// Parse candles from any CSV reader.
pub fn parse_candles<R: Read>(reader: R) -> Result<LoadedCandles, LoadError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut candles: Vec<Candle> = Vec::new();
    let mut warnings = Vec::new();

    for (i, record) in rdr.deserialize::<CandleRow>().enumerate() {
        // header is row 1
        let row = i + 2;
        let raw = record?;
        let timestamp = parse_timestamp(&raw.timestamp).ok_or_else(|| LoadError::MalformedRow {
            row,
            reason: format!("unrecognised timestamp '{}'", raw.timestamp),
        })?;
        if !(raw.volume.is_finite() && raw.volume >= 0.0) {
            return Err(LoadError::MalformedRow {
                row,
                reason: format!("volume must be non-negative, got {}", raw.volume),
            });
        }

        if let Some(prev) = candles.last() {
            if timestamp <= prev.timestamp {
                return Err(LoadError::Unsorted {
                    row,
                    previous: prev.timestamp,
                    current: timestamp,
                });
            }
        }

        let candle = Candle::new(timestamp, raw.open, raw.high, raw.low, raw.close, raw.volume);
        if !candle.is_sane() {
            warn!(row, timestamp = %timestamp, "candle failed OHLC sanity check");
            warnings.push(format!("row {row}: candle at {timestamp} failed OHLC sanity check"));
        }
        candles.push(candle);
    }

    if candles.is_empty() {
        return Err(LoadError::Empty);
    }

    let dataset_hash = dataset_hash(&candles);
    Ok(LoadedCandles {
        candles,
        dataset_hash,
        data_quality_warnings: warnings,
    })
}

/// Deterministic hash of a candle sequence.
pub fn dataset_hash(candles: &[Candle]) -> String {
    let mut hasher = blake3::Hasher::new();
    for c in candles {
        hasher.update(&c.timestamp.timestamp_millis().to_le_bytes());
        hasher.update(&c.open.to_le_bytes());
        hasher.update(&c.high.to_le_bytes());
        hasher.update(&c.low.to_le_bytes());
        hasher.update(&c.close.to_le_bytes());
        hasher.update(&c.volume.to_le_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    let n: i64 = raw.parse().ok()?;
    if n.abs() > 100_000_000_000 {
        Utc.timestamp_millis_opt(n).single()
    } else {
        Utc.timestamp_opt(n, 0).single()
    }
}
