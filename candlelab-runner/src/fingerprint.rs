//! Content hashes that identify a run.
//!
//! `run_fingerprint` covers everything that determines the outcome: the
//! engine config, the reference-source parameters (if any) and the candle
//! data. `trade_log_hash` covers the outcome itself. Two runs with equal
//! fingerprints must produce equal trade-log hashes.

use serde::Serialize;

use candlelab_core::config::SimConfig;
use candlelab_core::domain::ClosedTrade;

use crate::signals::ReferenceConfig;

#[derive(Serialize)]
struct FingerprintInput<'a> {
    config: &'a SimConfig,
    signal: Option<&'a ReferenceConfig>,
    dataset_hash: &'a str,
}

/// BLAKE3 over the canonical JSON of the run inputs.
pub fn run_fingerprint(
    config: &SimConfig,
    signal: Option<&ReferenceConfig>,
    dataset_hash: &str,
) -> Result<String, serde_json::Error> {
    let json = serde_json::to_string(&FingerprintInput {
        config,
        signal,
        dataset_hash,
    })?;
    Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
}

/// BLAKE3 over the serialized trade log.
pub fn trade_log_hash(trades: &[ClosedTrade]) -> Result<String, serde_json::Error> {
    let json = serde_json::to_string(trades)?;
    Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
}
