//! Signal: the opaque verdict handed to the engine by the signal source.
//!
//! The engine never computes or mutates a signal; it only reads the
//! direction, the 0..100 strength score, and the indicator readings the
//! filter pipeline needs.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::position::PositionSide;

/// Direction suggested by a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Long,
    Short,
    Neutral,
}

impl Direction {
    /// The position side this direction would open, `None` for neutral.
    pub fn side(self) -> Option<PositionSide> {
        match self {
            Direction::Long => Some(PositionSide::Long),
            Direction::Short => Some(PositionSide::Short),
            Direction::Neutral => None,
        }
    }
}

/// Upper/lower Bollinger band levels at evaluation time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BollingerBands {
    pub upper: f64,
    pub lower: f64,
}

/// Named indicator readings attached to a signal.
///
/// Every reading is optional: a filter whose indicator is absent does not
/// apply for that tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Indicators {
    #[serde(default)]
    pub atr: Option<f64>,
    #[serde(default)]
    pub rsi: Option<f64>,
    #[serde(default)]
    pub bollinger: Option<BollingerBands>,
    /// Any further readings the source wants to expose (not used by filters).
    #[serde(default)]
    pub extra: BTreeMap<String, f64>,
}

/// A signal for one candle window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub direction: Direction,
    /// Strength score in 0..=100.
    pub strength: f64,
    #[serde(default)]
    pub indicators: Indicators,
}

impl Signal {
    pub fn new(direction: Direction, strength: f64) -> Self {
        Self {
            direction,
            strength,
            indicators: Indicators::default(),
        }
    }

    pub fn neutral() -> Self {
        Self::new(Direction::Neutral, 0.0)
    }

    pub fn long(strength: f64) -> Self {
        Self::new(Direction::Long, strength)
    }

    pub fn short(strength: f64) -> Self {
        Self::new(Direction::Short, strength)
    }

    pub fn with_atr(mut self, atr: f64) -> Self {
        self.indicators.atr = Some(atr);
        self
    }

    pub fn with_rsi(mut self, rsi: f64) -> Self {
        self.indicators.rsi = Some(rsi);
        self
    }

    pub fn with_bollinger(mut self, upper: f64, lower: f64) -> Self {
        self.indicators.bollinger = Some(BollingerBands { upper, lower });
        self
    }

    pub fn is_neutral(&self) -> bool {
        self.direction == Direction::Neutral
    }
}
