//! Performance analytics: pure functions over a finished simulation.
//!
//! Every metric is a pure function: trade log and/or equity curve in,
//! scalar out. Percentages are in percent units. Empty inputs and zero
//! denominators are guarded explicitly and map to the documented sentinel
//! values, never to NaN.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::{CloseReason, ClosedTrade, EquityPoint};
use crate::engine::SimulationState;
use crate::math::pct_of;

/// A standard deviation within this many machine epsilons of the largest
/// return magnitude is rounding noise, treated as exactly zero.
const ZERO_STD_EPSILONS: f64 = 64.0;

/// Aggregate statistics for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceStats {
    pub initial_balance: f64,
    pub final_balance: f64,
    /// Percent of initial balance.
    pub total_return: f64,

    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    /// Percent of trades with positive PnL.
    pub win_rate: f64,

    pub gross_profit: f64,
    /// Positive magnitude.
    pub gross_loss: f64,
    /// `+inf` when there are profits and no losses; 0 when both are zero.
    #[serde(with = "crate::serde_float")]
    pub profit_factor: f64,
    pub avg_win: f64,
    /// Positive magnitude.
    pub avg_loss: f64,
    pub largest_win: f64,
    /// Positive magnitude.
    pub largest_loss: f64,

    /// Largest peak-to-trough decline in percent of the peak (>= 0).
    pub max_drawdown: f64,
    pub sharpe_ratio: f64,

    pub closure_reasons: BTreeMap<CloseReason, usize>,
    pub max_consecutive_wins: usize,
    pub max_consecutive_losses: usize,
    pub avg_candles_held: f64,
    /// Fraction of ticks with an open position.
    pub exposure: f64,
}

impl PerformanceStats {
    pub fn compute(state: &SimulationState) -> Self {
        let trades = &state.closed_trades;
        let initial = state.initial_balance;
        let final_balance = state.final_balance();

        Self {
            initial_balance: initial,
            final_balance,
            total_return: total_return(initial, final_balance),
            total_trades: trades.len(),
            winning_trades: trades.iter().filter(|t| t.is_winner()).count(),
            losing_trades: trades.iter().filter(|t| t.is_loser()).count(),
            win_rate: win_rate(trades),
            gross_profit: gross_profit(trades),
            gross_loss: gross_loss(trades),
            profit_factor: profit_factor(trades),
            avg_win: avg_win(trades),
            avg_loss: avg_loss(trades),
            largest_win: largest_win(trades),
            largest_loss: largest_loss(trades),
            max_drawdown: max_drawdown(initial, &state.equity_curve),
            sharpe_ratio: sharpe_ratio(trades),
            closure_reasons: closure_reasons(trades),
            max_consecutive_wins: max_consecutive(trades, ClosedTrade::is_winner),
            max_consecutive_losses: max_consecutive(trades, ClosedTrade::is_loser),
            avg_candles_held: avg_candles_held(trades),
            exposure: state.diagnostics.exposure(),
        }
    }

    pub fn closures(&self, reason: CloseReason) -> usize {
        self.closure_reasons.get(&reason).copied().unwrap_or(0)
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// `(final - initial) / initial * 100`, 0.0 for a zero initial balance.
pub fn total_return(initial_balance: f64, final_balance: f64) -> f64 {
    pct_of(final_balance - initial_balance, initial_balance)
}

/// Winning trades as a percentage of all trades.
pub fn win_rate(trades: &[ClosedTrade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let winners = trades.iter().filter(|t| t.is_winner()).count();
    winners as f64 / trades.len() as f64 * 100.0
}

pub fn gross_profit(trades: &[ClosedTrade]) -> f64 {
    trades.iter().filter(|t| t.is_winner()).map(|t| t.pnl).sum()
}

pub fn gross_loss(trades: &[ClosedTrade]) -> f64 {
    trades.iter().filter(|t| t.is_loser()).map(|t| -t.pnl).sum()
}

/// Gross profit / gross loss.
///
/// `+inf` with profits and no losses, 0.0 when both are zero. The two
/// cases are deliberately distinct: a flat run is not a perfect run.
pub fn profit_factor(trades: &[ClosedTrade]) -> f64 {
    let profit = gross_profit(trades);
    let loss = gross_loss(trades);
    if loss > 0.0 {
        profit / loss
    } else if profit > 0.0 {
        f64::INFINITY
    } else {
        0.0
    }
}

pub fn avg_win(trades: &[ClosedTrade]) -> f64 {
    let wins: Vec<f64> = trades.iter().filter(|t| t.is_winner()).map(|t| t.pnl).collect();
    mean(&wins)
}

/// Mean loss as a positive magnitude.
pub fn avg_loss(trades: &[ClosedTrade]) -> f64 {
    let losses: Vec<f64> = trades.iter().filter(|t| t.is_loser()).map(|t| -t.pnl).collect();
    mean(&losses)
}

pub fn largest_win(trades: &[ClosedTrade]) -> f64 {
    trades
        .iter()
        .filter(|t| t.is_winner())
        .map(|t| t.pnl)
        .fold(0.0, f64::max)
}

pub fn largest_loss(trades: &[ClosedTrade]) -> f64 {
    trades
        .iter()
        .filter(|t| t.is_loser())
        .map(|t| -t.pnl)
        .fold(0.0, f64::max)
}

/// Maximum drawdown in percent of the running peak.
///
/// The peak starts at the initial balance, so a run whose first equity
/// point is already below it registers that decline. Returns 0.0 for a
/// non-decreasing curve.
pub fn max_drawdown(initial_balance: f64, equity_curve: &[EquityPoint]) -> f64 {
    let mut peak = initial_balance;
    let mut max_dd = 0.0_f64;

    for point in equity_curve {
        if point.balance > peak {
            peak = point.balance;
        }
        if peak > 0.0 {
            let dd = (peak - point.balance) / peak * 100.0;
            if dd > max_dd {
                max_dd = dd;
            }
        }
    }
    max_dd
}

/// Mean per-trade percent return over its population standard deviation.
///
/// 0.0 with fewer than two trades or flat returns.
pub fn sharpe_ratio(trades: &[ClosedTrade]) -> f64 {
    if trades.len() < 2 {
        return 0.0;
    }
    let returns: Vec<f64> = trades.iter().map(|t| t.pnl_percent).collect();
    let std = population_std(&returns);
    let scale = returns.iter().fold(0.0_f64, |m, r| m.max(r.abs()));
    if std <= f64::EPSILON * ZERO_STD_EPSILONS * scale || !std.is_finite() {
        return 0.0;
    }
    mean(&returns) / std
}

pub fn closure_reasons(trades: &[ClosedTrade]) -> BTreeMap<CloseReason, usize> {
    let mut histogram = BTreeMap::new();
    for trade in trades {
        *histogram.entry(trade.close_reason).or_insert(0) += 1;
    }
    histogram
}

pub fn avg_candles_held(trades: &[ClosedTrade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    trades.iter().map(|t| t.candles_held()).sum::<usize>() as f64 / trades.len() as f64
}

// ─── Helpers ────────────────────────────────────────────────────────

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn population_std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

fn max_consecutive(trades: &[ClosedTrade], pred: fn(&ClosedTrade) -> bool) -> usize {
    let mut max_streak = 0;
    let mut current = 0;

    for trade in trades {
        if pred(trade) {
            current += 1;
            max_streak = max_streak.max(current);
        } else {
            current = 0;
        }
    }
    max_streak
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Position, PositionId, PositionSide};
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn trade(pnl: f64, reason: CloseReason) -> ClosedTrade {
        ClosedTrade {
            position: Position {
                id: PositionId(0),
                side: PositionSide::Long,
                entry_price: 100.0,
                volume: 1.0,
                stop_loss: 98.0,
                take_profit: 103.0,
                trailing_stop: None,
                high_water_mark: 100.0,
                low_water_mark: 100.0,
                opened_at: t0(),
                entry_index: 150,
                signal_strength: 80.0,
                closed: true,
            },
            exit_price: 100.0 + pnl,
            exit_time: t0() + Duration::hours(1),
            exit_index: 154,
            pnl,
            pnl_percent: pnl,
            close_reason: reason,
        }
    }

    fn curve(balances: &[f64]) -> Vec<EquityPoint> {
        balances
            .iter()
            .enumerate()
            .map(|(i, &balance)| EquityPoint {
                time: t0() + Duration::minutes(15 * i as i64),
                balance,
            })
            .collect()
    }

    #[test]
    fn profit_factor_sentinels() {
        assert_eq!(profit_factor(&[]), 0.0);
        assert_eq!(profit_factor(&[trade(0.0, CloseReason::ForcedEnd)]), 0.0);
        assert_eq!(
            profit_factor(&[trade(3.0, CloseReason::TakeProfit)]),
            f64::INFINITY
        );
        let mixed = [
            trade(3.0, CloseReason::TakeProfit),
            trade(-2.0, CloseReason::StopLoss),
        ];
        assert!((profit_factor(&mixed) - 1.5).abs() < 1e-12);
    }

    #[test]
    fn win_rate_in_percent() {
        let trades = [
            trade(3.0, CloseReason::TakeProfit),
            trade(-2.0, CloseReason::StopLoss),
            trade(0.0, CloseReason::ForcedEnd),
            trade(1.0, CloseReason::TrailingStop),
        ];
        assert!((win_rate(&trades) - 50.0).abs() < 1e-12);
        assert_eq!(win_rate(&[]), 0.0);
    }

    #[test]
    fn averages_and_extremes() {
        let trades = [
            trade(3.0, CloseReason::TakeProfit),
            trade(1.0, CloseReason::TrailingStop),
            trade(-2.0, CloseReason::StopLoss),
            trade(-4.0, CloseReason::StopLoss),
        ];
        assert!((avg_win(&trades) - 2.0).abs() < 1e-12);
        assert!((avg_loss(&trades) - 3.0).abs() < 1e-12);
        assert_eq!(largest_win(&trades), 3.0);
        assert_eq!(largest_loss(&trades), 4.0);
        assert_eq!(avg_win(&[]), 0.0);
        assert_eq!(avg_loss(&trades[..2]), 0.0);
    }

    #[test]
    fn drawdown_from_initial_peak() {
        assert_eq!(max_drawdown(1000.0, &curve(&[1000.0, 1010.0, 1020.0])), 0.0);
        let dd = max_drawdown(1000.0, &curve(&[1100.0, 990.0, 1050.0]));
        assert!((dd - 10.0).abs() < 1e-9);
        let below_start = max_drawdown(1000.0, &curve(&[950.0, 960.0]));
        assert!((below_start - 5.0).abs() < 1e-9);
        assert_eq!(max_drawdown(1000.0, &[]), 0.0);
    }

    #[test]
    fn sharpe_guards() {
        assert_eq!(sharpe_ratio(&[trade(3.0, CloseReason::TakeProfit)]), 0.0);
        let flat = [
            trade(1.0, CloseReason::TakeProfit),
            trade(1.0, CloseReason::TakeProfit),
        ];
        assert_eq!(sharpe_ratio(&flat), 0.0);
        let mixed = [
            trade(3.0, CloseReason::TakeProfit),
            trade(-1.0, CloseReason::StopLoss),
        ];
        // mean 1, population std 2
        assert!((sharpe_ratio(&mixed) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn sharpe_zero_std_is_relative_to_return_size() {
        // identical up to one rounding step: flat
        let noisy = [
            trade(0.1 + 0.2, CloseReason::TakeProfit),
            trade(0.3, CloseReason::TakeProfit),
            trade(0.3, CloseReason::TakeProfit),
        ];
        assert_eq!(sharpe_ratio(&noisy), 0.0);

        // tiny but genuinely spread returns keep their ratio
        let tiny = [
            trade(3e-13, CloseReason::TakeProfit),
            trade(-1e-13, CloseReason::StopLoss),
        ];
        assert!((sharpe_ratio(&tiny) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn streaks_break_on_flat_trades() {
        let trades = [
            trade(1.0, CloseReason::TakeProfit),
            trade(1.0, CloseReason::TakeProfit),
            trade(0.0, CloseReason::ForcedEnd),
            trade(1.0, CloseReason::TakeProfit),
            trade(-1.0, CloseReason::StopLoss),
            trade(-1.0, CloseReason::StopLoss),
            trade(-1.0, CloseReason::StopLoss),
        ];
        assert_eq!(max_consecutive(&trades, ClosedTrade::is_winner), 2);
        assert_eq!(max_consecutive(&trades, ClosedTrade::is_loser), 3);
    }

    #[test]
    fn histogram_and_compute() {
        let mut state = SimulationState::new(1000.0);
        state.closed_trades = vec![
            trade(3.0, CloseReason::TakeProfit),
            trade(-2.0, CloseReason::StopLoss),
            trade(3.0, CloseReason::TakeProfit),
        ];
        state.cash_balance = 1004.0;
        state.equity_curve = curve(&[1003.0, 1001.0, 1004.0]);

        let stats = PerformanceStats::compute(&state);
        assert_eq!(stats.total_trades, 3);
        assert_eq!(stats.closures(CloseReason::TakeProfit), 2);
        assert_eq!(stats.closures(CloseReason::StopLoss), 1);
        assert_eq!(stats.closures(CloseReason::TrailingStop), 0);
        assert!((stats.total_return - 0.4).abs() < 1e-9);
        assert!((stats.profit_factor - 3.0).abs() < 1e-12);
        assert!(stats.max_drawdown > 0.0);
        assert_eq!(stats.avg_candles_held, 4.0);
    }

    #[test]
    fn infinite_profit_factor_survives_json() {
        let mut state = SimulationState::new(1000.0);
        state.closed_trades = vec![trade(3.0, CloseReason::TakeProfit)];
        state.cash_balance = 1003.0;
        let stats = PerformanceStats::compute(&state);
        let json = serde_json::to_string(&stats).unwrap();
        assert!(json.contains(r#""profit_factor":"inf""#));
        let back: PerformanceStats = serde_json::from_str(&json).unwrap();
        assert!(back.profit_factor.is_infinite());
    }
}
