//! Reference indicator-based signal source.
//!
//! Scores LONG and SHORT independently by adding fixed points per
//! condition, then emits whichever side clears `emit_threshold` first
//! (LONG wins a tie). Below the threshold the signal is NEUTRAL and carries
//! the larger of the two scores.
//!
//! | Side  | Condition                                         | Points |
//! |-------|---------------------------------------------------|--------|
//! | LONG  | RSI < 30 with bullish SMA trend                   | 40     |
//! | LONG  | RSI < 25                                          | 30     |
//! | both  | recent close dispersion > 1.5 × older dispersion  | 20     |
//! | LONG  | ATR/price < 0.7 × average dispersion/price        | 10     |
//! | LONG  | close < 98% of SMA(20)                            | 10     |
//! | SHORT | RSI > 70 with bearish SMA trend                   | 40     |
//! | SHORT | RSI > 75                                          | 30     |
//! | SHORT | close > 102% of SMA(20)                           | 10     |

use serde::{Deserialize, Serialize};

use candlelab_core::domain::{Candle, Direction, Signal};
use candlelab_core::engine::SignalSource;

use super::indicators::{atr, bollinger, rsi, sma, std_dev};

/// Minimum window for a non-neutral signal.
const MIN_WINDOW: usize = 20;

/// Parameters of the reference source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReferenceConfig {
    pub rsi_period: usize,
    pub atr_period: usize,
    pub bollinger_period: usize,
    pub bollinger_multiplier: f64,
    pub trend_short: usize,
    pub trend_long: usize,
    /// Score a side needs before the source emits it.
    pub emit_threshold: f64,
}

impl Default for ReferenceConfig {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            atr_period: 14,
            bollinger_period: 20,
            bollinger_multiplier: 2.0,
            trend_short: 10,
            trend_long: 20,
            emit_threshold: 50.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trend {
    Bullish,
    Bearish,
    Flat,
}

/// Stand-in for the external signal subsystem.
#[derive(Debug, Clone, Default)]
pub struct ReferenceSource {
    config: ReferenceConfig,
}

impl ReferenceSource {
    pub fn new(config: ReferenceConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ReferenceConfig {
        &self.config
    }

    fn trend(&self, closes: &[f64]) -> Trend {
        let (Some(short), Some(long)) = (
            sma(closes, self.config.trend_short),
            sma(closes, self.config.trend_long),
        ) else {
            return Trend::Flat;
        };
        if short > long * 1.01 {
            Trend::Bullish
        } else if short < long * 0.99 {
            Trend::Bearish
        } else {
            Trend::Flat
        }
    }

    /// Recent (last 5) over older (previous 15) close dispersion.
    fn activity_ratio(closes: &[f64]) -> f64 {
        if closes.len() < 20 {
            return 1.0;
        }
        let n = closes.len();
        let recent = std_dev(&closes[n - 5..]);
        let older = std_dev(&closes[n - 20..n - 5]);
        if older > 0.0 {
            recent / older
        } else {
            1.0
        }
    }
}

impl SignalSource for ReferenceSource {
    fn evaluate(&self, window: &[Candle]) -> Signal {
        if window.len() < MIN_WINDOW {
            return Signal::neutral();
        }
        let closes: Vec<f64> = window.iter().map(|c| c.close).collect();
        let price = closes[closes.len() - 1];

        let rsi_value = rsi(&closes, self.config.rsi_period);
        let atr_value = atr(window, self.config.atr_period);
        let bands = bollinger(
            &closes,
            self.config.bollinger_period,
            self.config.bollinger_multiplier,
        );
        let trend = self.trend(&closes);
        let activity = Self::activity_ratio(&closes);
        let avg_price = sma(&closes, 20).unwrap_or(price);

        let volatility = atr_value.map_or(0.02, |a| a / price);
        let tail = &closes[closes.len().saturating_sub(30)..];
        let avg_volatility = match std_dev(tail) / avg_price {
            v if v.is_finite() && v > 0.0 => v,
            _ => 0.02,
        };

        let mut long = 0.0_f64;
        let mut short = 0.0_f64;

        if let Some(r) = rsi_value {
            if r < 30.0 && trend == Trend::Bullish {
                long += 40.0;
            }
            if r < 25.0 {
                long += 30.0;
            }
            if r > 70.0 && trend == Trend::Bearish {
                short += 40.0;
            }
            if r > 75.0 {
                short += 30.0;
            }
        }
        if activity > 1.5 {
            long += 20.0;
            short += 20.0;
        }
        if volatility < avg_volatility * 0.7 {
            long += 10.0;
        }
        if price < avg_price * 0.98 {
            long += 10.0;
        }
        if price > avg_price * 1.02 {
            short += 10.0;
        }

        let (direction, strength) = if long >= self.config.emit_threshold {
            (Direction::Long, long)
        } else if short >= self.config.emit_threshold {
            (Direction::Short, short)
        } else {
            (Direction::Neutral, f64::max(long, short))
        };

        let mut signal = Signal::new(direction, strength.min(100.0));
        if let Some(a) = atr_value {
            signal = signal.with_atr(a);
        }
        if let Some(r) = rsi_value {
            signal = signal.with_rsi(r);
        }
        if let Some(b) = bands {
            signal = signal.with_bollinger(b.upper, b.lower);
        }
        signal.indicators.extra.insert("activity_ratio".into(), activity);
        signal
    }
}
