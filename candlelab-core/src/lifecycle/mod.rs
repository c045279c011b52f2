//! Position lifecycle engine.
//!
//! States: `OPEN_UNPROTECTED` → `OPEN_TRAILING` → `CLOSED`.
//!
//! Per tick, [`update`] runs in a fixed order:
//! 1. Update water-marks and, once the favorable move from entry exceeds the
//!    activation threshold, arm or ratchet the trailing stop.
//! 2. Trailing stop reached by the adverse extreme → `TRAILING_STOP`.
//! 3. Fixed stop-loss reached by the adverse extreme → `STOP_LOSS`.
//! 4. Take-profit reached by the favorable extreme → `TAKE_PROFIT`.
//!
//! At most one [`CloseEvent`] is produced per position per tick.

pub mod arena;
pub mod ratchet;

pub use arena::PositionArena;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::RiskConfig;
use crate::domain::{CloseReason, ClosedTrade, Position, PositionId, PositionSide};
use crate::error::ConfigError;
use crate::math::{offset_by_pct, percent_change};

/// A triggered exit for one position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CloseEvent {
    pub reason: CloseReason,
    pub price: f64,
    pub time: DateTime<Utc>,
}

/// Everything needed to open a position besides the risk parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OpenRequest {
    pub id: PositionId,
    pub side: PositionSide,
    pub entry_price: f64,
    pub opened_at: DateTime<Utc>,
    pub entry_index: usize,
    pub signal_strength: f64,
}

/// Open a position sized at `trade_notional / entry_price` with stop-loss and
/// take-profit fixed from the risk percentages.
///
/// Fails fast on a non-positive entry price or notional instead of
/// producing infinite/NaN levels.
pub fn open(
    request: OpenRequest,
    trade_notional: f64,
    risk: &RiskConfig,
) -> Result<Position, ConfigError> {
    let entry = request.entry_price;
    if !(entry.is_finite() && entry > 0.0) {
        return Err(ConfigError::NonPositiveEntryPrice(entry));
    }
    if !(trade_notional.is_finite() && trade_notional > 0.0) {
        return Err(ConfigError::NonPositiveTradeNotional(trade_notional));
    }
    risk.validate()?;

    let (stop_loss, take_profit) = match request.side {
        PositionSide::Long => (
            offset_by_pct(entry, -risk.stop_loss_pct),
            offset_by_pct(entry, risk.take_profit_pct),
        ),
        PositionSide::Short => (
            offset_by_pct(entry, risk.stop_loss_pct),
            offset_by_pct(entry, -risk.take_profit_pct),
        ),
    };

    Ok(Position {
        id: request.id,
        side: request.side,
        entry_price: entry,
        volume: trade_notional / entry,
        stop_loss,
        take_profit,
        trailing_stop: None,
        high_water_mark: entry,
        low_water_mark: entry,
        opened_at: request.opened_at,
        entry_index: request.entry_index,
        signal_strength: request.signal_strength,
        closed: false,
    })
}

/// Advance one open position by one candle.
///
/// Mutates water-marks and the trailing stop; returns the close event if
/// any exit level was reached. The caller turns the event into a trade
/// with [`close`]. Closed positions are left untouched.
pub fn update(
    position: &mut Position,
    candle_high: f64,
    candle_low: f64,
    now: DateTime<Utc>,
    risk: &RiskConfig,
) -> Option<CloseEvent> {
    if position.closed {
        return None;
    }

    // 1. water-marks + trailing stop
    position.high_water_mark = position.high_water_mark.max(candle_high);
    position.low_water_mark = position.low_water_mark.min(candle_low);

    if risk.trailing_enabled {
        let water_mark = position.water_mark();
        let favorable_move =
            percent_change(position.entry_price, water_mark) * position.side.sign();
        if favorable_move > risk.trailing_activation_pct {
            let proposed = ratchet::trail_level(position.side, water_mark, risk.trailing_stop_pct);
            position.trailing_stop = Some(ratchet::tighten(
                position.side,
                position.trailing_stop,
                proposed,
            ));
        }
    }

    let (adverse, favorable) = match position.side {
        PositionSide::Long => (candle_low, candle_high),
        PositionSide::Short => (candle_high, candle_low),
    };
    let reached_adverse = |level: f64| match position.side {
        PositionSide::Long => adverse <= level,
        PositionSide::Short => adverse >= level,
    };
    let reached_favorable = |level: f64| match position.side {
        PositionSide::Long => favorable >= level,
        PositionSide::Short => favorable <= level,
    };

    let hit = |reason, price| CloseEvent {
        reason,
        price,
        time: now,
    };

    // 2. trailing stop
    if let Some(trailing) = position.trailing_stop {
        if reached_adverse(trailing) {
            return Some(hit(CloseReason::TrailingStop, trailing));
        }
    }
    // 3. stop-loss
    if reached_adverse(position.stop_loss) {
        return Some(hit(CloseReason::StopLoss, position.stop_loss));
    }
    // 4. take-profit
    if reached_favorable(position.take_profit) {
        return Some(hit(CloseReason::TakeProfit, position.take_profit));
    }

    None
}

/// Apply a close event: marks the position closed and builds the trade.
pub fn close(position: &mut Position, event: &CloseEvent, exit_index: usize) -> ClosedTrade {
    position.closed = true;
    ClosedTrade {
        position: position.clone(),
        exit_price: event.price,
        exit_time: event.time,
        exit_index,
        pnl: position.pnl_at(event.price),
        pnl_percent: position.pnl_pct_at(event.price),
        close_reason: event.reason,
    }
}

/// Close at `price` with `FORCED_END`.
pub fn force_close(
    position: &mut Position,
    price: f64,
    time: DateTime<Utc>,
    exit_index: usize,
) -> ClosedTrade {
    let event = CloseEvent {
        reason: CloseReason::ForcedEnd,
        price,
        time,
    };
    close(position, &event, exit_index)
}
