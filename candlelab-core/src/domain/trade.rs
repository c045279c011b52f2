//! ClosedTrade: a position after its single close event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::position::Position;

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CloseReason {
    StopLoss,
    TakeProfit,
    TrailingStop,
    /// Still open when the candle sequence ended.
    ForcedEnd,
}

impl CloseReason {
    pub const ALL: [CloseReason; 4] = [
        CloseReason::StopLoss,
        CloseReason::TakeProfit,
        CloseReason::TrailingStop,
        CloseReason::ForcedEnd,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CloseReason::StopLoss => "STOP_LOSS",
            CloseReason::TakeProfit => "TAKE_PROFIT",
            CloseReason::TrailingStop => "TRAILING_STOP",
            CloseReason::ForcedEnd => "FORCED_END",
        }
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A completed trade: the position as it was at close plus the exit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosedTrade {
    #[serde(flatten)]
    pub position: Position,

    // ── Exit ──
    pub exit_price: f64,
    pub exit_time: DateTime<Utc>,
    pub exit_index: usize,

    // ── PnL ──
    pub pnl: f64,
    /// Percent units.
    pub pnl_percent: f64,

    pub close_reason: CloseReason,
}

impl ClosedTrade {
    pub fn candles_held(&self) -> usize {
        self.exit_index.saturating_sub(self.position.entry_index)
    }

    pub fn is_winner(&self) -> bool {
        self.pnl > 0.0
    }

    pub fn is_loser(&self) -> bool {
        self.pnl < 0.0
    }
}
