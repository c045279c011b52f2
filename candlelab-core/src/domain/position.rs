//! Position: one open simulated trade and its protective levels.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::PositionId;
use crate::math::percent_change;

/// Which way a position is exposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PositionSide {
    Long,
    Short,
}

impl PositionSide {
    /// +1 for long, -1 for short.
    pub fn sign(self) -> f64 {
        match self {
            PositionSide::Long => 1.0,
            PositionSide::Short => -1.0,
        }
    }
}

/// Lifecycle state derived from the position's fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PositionState {
    /// Open, no trailing stop armed yet.
    OpenUnprotected,
    /// Open with an armed trailing stop.
    OpenTrailing,
    /// Terminal.
    Closed,
}

/// An open (or just-closed) simulated position.
///
/// `stop_loss` and `take_profit` are fixed at open time. `trailing_stop` is
/// `None` until the favorable move passes the activation threshold and from
/// then on only moves in the position's favor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub id: PositionId,
    pub side: PositionSide,
    pub entry_price: f64,
    /// Units held: trade notional / entry price.
    pub volume: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub trailing_stop: Option<f64>,
    /// Highest high seen since open (longs ratchet from this).
    pub high_water_mark: f64,
    /// Lowest low seen since open (shorts ratchet from this).
    pub low_water_mark: f64,
    pub opened_at: DateTime<Utc>,
    /// Candle index the position was opened on.
    pub entry_index: usize,
    /// Adjusted signal strength the entry was accepted with.
    pub signal_strength: f64,
    pub closed: bool,
}

impl Position {
    pub fn state(&self) -> PositionState {
        if self.closed {
            PositionState::Closed
        } else if self.trailing_stop.is_some() {
            PositionState::OpenTrailing
        } else {
            PositionState::OpenUnprotected
        }
    }

    pub fn is_open(&self) -> bool {
        !self.closed
    }

    pub fn is_long(&self) -> bool {
        self.side == PositionSide::Long
    }

    /// The favorable water-mark for this side.
    pub fn water_mark(&self) -> f64 {
        match self.side {
            PositionSide::Long => self.high_water_mark,
            PositionSide::Short => self.low_water_mark,
        }
    }

    /// Currency PnL if the position were closed at `price`.
    pub fn pnl_at(&self, price: f64) -> f64 {
        (price - self.entry_price) * self.volume * self.side.sign()
    }

    /// Percent return (percent units) if closed at `price`.
    pub fn pnl_pct_at(&self, price: f64) -> f64 {
        percent_change(self.entry_price, price) * self.side.sign()
    }
}
