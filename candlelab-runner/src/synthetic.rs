//! Seeded synthetic candles for demos and tests.
//!
//! A plain random walk: each candle's close moves by a uniform draw in
//! `±volatility_pct` around `drift_pct`, with wicks drawn independently on
//! both sides. The same config always yields the same candles.

use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use candlelab_core::domain::Candle;

/// Parameters of the synthetic random walk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyntheticConfig {
    pub seed: u64,
    pub candles: usize,
    pub start_price: f64,
    pub interval_minutes: i64,
    /// Half-width of the per-candle close move, in percent.
    pub volatility_pct: f64,
    /// Mean per-candle close move, in percent.
    pub drift_pct: f64,
    /// Maximum wick length beyond the body, in percent.
    pub wick_pct: f64,
    pub start: DateTime<Utc>,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            candles: 2_000,
            start_price: 100.0,
            interval_minutes: 15,
            volatility_pct: 0.6,
            drift_pct: 0.0,
            wick_pct: 0.4,
            start: Utc.timestamp_opt(1_704_067_200, 0).single().unwrap_or_default(),
        }
    }
}

/// A synthetic config that cannot produce positive prices.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SyntheticError {
    #[error("synthetic start_price must be positive, got {0}")]
    NonPositiveStartPrice(f64),

    #[error("synthetic wick_pct must be within -100..100, got {0}")]
    WickOutOfRange(f64),

    #[error("synthetic {field} must be finite, got {value}")]
    NonFinite { field: &'static str, value: f64 },

    #[error("synthetic interval_minutes must be positive, got {0}")]
    NonPositiveInterval(i64),
}

impl SyntheticConfig {
    /// Reject parameters that would generate non-positive opens or lows.
    pub fn validate(&self) -> Result<(), SyntheticError> {
        for (field, value) in [
            ("start_price", self.start_price),
            ("volatility_pct", self.volatility_pct),
            ("drift_pct", self.drift_pct),
            ("wick_pct", self.wick_pct),
        ] {
            if !value.is_finite() {
                return Err(SyntheticError::NonFinite { field, value });
            }
        }
        if self.start_price <= 0.0 {
            return Err(SyntheticError::NonPositiveStartPrice(self.start_price));
        }
        // lows are min(open, close) * (1 - wick)
        if self.wick_pct.abs() >= 100.0 {
            return Err(SyntheticError::WickOutOfRange(self.wick_pct));
        }
        if self.interval_minutes <= 0 {
            return Err(SyntheticError::NonPositiveInterval(self.interval_minutes));
        }
        Ok(())
    }
}

/// Generate `config.candles` candles.
///
/// Call [`SyntheticConfig::validate`] first; an invalid config yields
/// candles the engine rejects.
pub fn generate(config: &SyntheticConfig) -> Vec<Candle> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut candles = Vec::with_capacity(config.candles);
    let mut price = config.start_price;
    let vol = config.volatility_pct.abs() / 100.0;
    let wick = config.wick_pct.abs() / 100.0;
    let drift = config.drift_pct / 100.0;

    for i in 0..config.candles {
        let step: f64 = if vol > 0.0 {
            rng.gen_range(-vol..vol)
        } else {
            0.0
        };
        let open = price;
        // floor keeps prices strictly positive on long losing streaks
        let close = (price * (1.0 + drift + step)).max(0.01);
        let up: f64 = if wick > 0.0 { rng.gen_range(0.0..wick) } else { 0.0 };
        let down: f64 = if wick > 0.0 { rng.gen_range(0.0..wick) } else { 0.0 };
        let high = open.max(close) * (1.0 + up);
        let low = open.min(close) * (1.0 - down);
        let volume = rng.gen_range(100.0..10_000.0);

        candles.push(Candle::new(
            config.start + Duration::minutes(config.interval_minutes * i as i64),
            open,
            high,
            low,
            close,
            volume,
        ));
        price = close;
    }

    candles
}
