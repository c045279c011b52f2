//! Stepwise simulation driver.
//!
//! [`Simulation`] owns all mutable state of a run. [`Simulation::step`]
//! processes exactly one tick, so an external wrapper can stop between
//! ticks (never mid-tick) and still call [`Simulation::finish`].

use tracing::{debug, info};

use crate::config::SimConfig;
use crate::domain::{Candle, ClosedTrade, EquityPoint, Position, PositionId};
use crate::error::{ConfigError, EngineError};
use crate::filters::{self, FilterDecision};
use crate::lifecycle::{self, OpenRequest, PositionArena};

use super::source::SignalSource;
use super::state::SimulationState;

/// What happened during one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickOutcome {
    pub index: usize,
    /// Positions closed by the lifecycle engine this tick.
    pub closed: Vec<PositionId>,
    pub opened: Option<PositionId>,
    /// Present when the filter pipeline ran.
    pub decision: Option<FilterDecision>,
    pub equity: f64,
}

/// A run in progress.
#[derive(Debug)]
pub struct Simulation<'a> {
    candles: &'a [Candle],
    closes: Vec<f64>,
    config: &'a SimConfig,
    arena: PositionArena,
    state: SimulationState,
    next_index: usize,
}

impl<'a> Simulation<'a> {
    /// Validate inputs and position the driver on the first evaluable tick.
    ///
    /// Fails with `InsufficientData` if fewer than `warmup_candles + 1`
    /// candles are supplied, and with `Configuration` for an invalid config
    /// or a candle with a non-positive price. No state is produced on error.
    pub fn new(candles: &'a [Candle], config: &'a SimConfig) -> Result<Self, EngineError> {
        config.validate()?;

        let required = config.min_candles();
        if candles.len() < required {
            return Err(EngineError::InsufficientData {
                required,
                actual: candles.len(),
            });
        }

        for (index, c) in candles.iter().enumerate() {
            if let Some(&value) = [c.open, c.high, c.low, c.close]
                .iter()
                .find(|p| !(p.is_finite() && **p > 0.0))
            {
                return Err(ConfigError::NonPositiveCandlePrice { index, value }.into());
            }
        }

        Ok(Self {
            candles,
            closes: candles.iter().map(|c| c.close).collect(),
            config,
            arena: PositionArena::new(),
            state: SimulationState::new(config.initial_balance),
            next_index: config.warmup_candles,
        })
    }

    /// Index of the next tick to process.
    pub fn next_index(&self) -> usize {
        self.next_index
    }

    pub fn is_done(&self) -> bool {
        self.next_index >= self.candles.len()
    }

    pub fn cash_balance(&self) -> f64 {
        self.state.cash_balance
    }

    pub fn open_positions(&self) -> impl Iterator<Item = &Position> + '_ {
        self.arena.open_positions()
    }

    pub fn closed_trades(&self) -> &[ClosedTrade] {
        &self.state.closed_trades
    }

    pub fn equity_curve(&self) -> &[EquityPoint] {
        &self.state.equity_curve
    }

    /// Process one tick. Returns `Ok(None)` once every candle is consumed.
    pub fn step(&mut self, source: &dyn SignalSource) -> Result<Option<TickOutcome>, EngineError> {
        if self.is_done() {
            return Ok(None);
        }

        let i = self.next_index;
        let config = self.config;
        let candles = self.candles;
        let candle = &candles[i];

        // 1. lookback window ending at i
        let start = i + 1 - config.warmup_candles;
        let window = &candles[start..=i];
        let recent_closes = &self.closes[start..=i];

        // 2. lifecycle updates
        let mut closed = Vec::new();
        for id in self.arena.open_ids() {
            let Some(position) = self.arena.get_mut(id) else {
                continue;
            };
            if let Some(event) =
                lifecycle::update(position, candle.high, candle.low, candle.timestamp, &config.risk)
            {
                let trade = lifecycle::close(position, &event, i);
                debug!(
                    position = %id,
                    reason = %trade.close_reason,
                    exit = trade.exit_price,
                    pnl = trade.pnl,
                    "position closed"
                );
                self.arena.release(id);
                self.state.cash_balance += trade.pnl;
                self.state.closed_trades.push(trade);
                closed.push(id);
            }
        }

        // 3. one signal per tick
        let signal = source.evaluate(window);
        let diagnostics = &mut self.state.diagnostics;
        diagnostics.signals_seen += 1;

        // 4. entry
        let mut opened = None;
        let mut decision = None;
        if let Some(side) = signal.direction.side() {
            diagnostics.directional_signals += 1;

            if self.arena.open_count() < config.max_concurrent_positions {
                let verdict = filters::evaluate(&signal, recent_closes, candle.close, config);
                diagnostics.record_decision(&verdict);

                if verdict.allowed {
                    let position = lifecycle::open(
                        OpenRequest {
                            id: self.arena.next_id(),
                            side,
                            entry_price: candle.close,
                            opened_at: candle.timestamp,
                            entry_index: i,
                            signal_strength: verdict.adjusted_strength,
                        },
                        config.trade_notional,
                        &config.risk,
                    )?;
                    debug!(
                        position = %position.id,
                        side = ?side,
                        entry = position.entry_price,
                        strength = verdict.adjusted_strength,
                        "position opened"
                    );
                    opened = Some(self.arena.insert(position));
                } else {
                    debug!(
                        index = i,
                        strength = verdict.original_strength,
                        adjusted = verdict.adjusted_strength,
                        reasons = ?verdict.reasons,
                        "entry blocked"
                    );
                }
                decision = Some(verdict);
            }
        }

        // 5. equity
        let equity = self.state.cash_balance + self.arena.mark_to_market(candle.close);
        self.state.equity_curve.push(EquityPoint {
            time: candle.timestamp,
            balance: equity,
        });
        let diagnostics = &mut self.state.diagnostics;
        diagnostics.ticks += 1;
        if self.arena.open_count() > 0 {
            diagnostics.ticks_in_market += 1;
        }

        self.next_index += 1;
        Ok(Some(TickOutcome {
            index: i,
            closed,
            opened,
            decision,
            equity,
        }))
    }

    /// Force-close whatever is still open at the last processed candle and
    /// hand back the final state.
    pub fn finish(mut self) -> SimulationState {
        if self.next_index > self.config.warmup_candles {
            let last = self.next_index - 1;
            let candles = self.candles;
            let candle = &candles[last];
            for id in self.arena.open_ids() {
                let Some(position) = self.arena.get_mut(id) else {
                    continue;
                };
                let trade = lifecycle::force_close(position, candle.close, candle.timestamp, last);
                debug!(position = %id, exit = trade.exit_price, pnl = trade.pnl, "position force-closed");
                self.arena.release(id);
                self.state.cash_balance += trade.pnl;
                self.state.closed_trades.push(trade);
            }
        }
        self.state
    }
}

/// Run a complete simulation over `candles`.
pub fn run(
    candles: &[Candle],
    source: &dyn SignalSource,
    config: &SimConfig,
) -> Result<SimulationState, EngineError> {
    let mut sim = Simulation::new(candles, config)?;
    info!(
        candles = candles.len(),
        warmup = config.warmup_candles,
        "simulation started"
    );
    while sim.step(source)?.is_some() {}
    let state = sim.finish();
    info!(
        ticks = state.diagnostics.ticks,
        trades = state.closed_trades.len(),
        final_balance = state.cash_balance,
        "simulation finished"
    );
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CloseReason, Signal};
    use crate::engine::source::ConstantSource;
    use chrono::{Duration, TimeZone, Utc};

    fn candles(prices: &[(f64, f64, f64)]) -> Vec<Candle> {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        prices
            .iter()
            .enumerate()
            .map(|(i, &(high, low, close))| {
                Candle::new(t0 + Duration::minutes(15 * i as i64), close, high, low, close, 1.0)
            })
            .collect()
    }

    fn small_config() -> SimConfig {
        SimConfig {
            warmup_candles: 3,
            ..SimConfig::default()
        }
    }

    fn clean_long() -> Signal {
        Signal::long(80.0)
            .with_atr(1.0)
            .with_rsi(50.0)
            .with_bollinger(120.0, 80.0)
    }

    #[test]
    fn too_few_candles_is_insufficient_data() {
        let data = candles(&[(100.0, 100.0, 100.0); 3]);
        let err = Simulation::new(&data, &small_config()).unwrap_err();
        assert_eq!(
            err,
            EngineError::InsufficientData {
                required: 4,
                actual: 3
            }
        );
    }

    #[test]
    fn bad_candle_price_is_configuration_error() {
        let mut data = candles(&[(100.0, 100.0, 100.0); 5]);
        data[2].low = 0.0;
        let err = Simulation::new(&data, &small_config()).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Configuration(ConfigError::NonPositiveCandlePrice { index: 2, .. })
        ));
    }

    #[test]
    fn one_equity_point_per_tick() {
        let data = candles(&[(100.0, 100.0, 100.0); 10]);
        let state = run(&data, &ConstantSource(Signal::neutral()), &small_config()).unwrap();
        assert_eq!(state.equity_curve.len(), 7);
        assert_eq!(state.diagnostics.ticks, 7);
        assert_eq!(state.diagnostics.directional_signals, 0);
        assert!(state.closed_trades.is_empty());
    }

    #[test]
    fn window_ends_at_current_candle() {
        let data = candles(&[
            (100.0, 100.0, 100.0),
            (101.0, 101.0, 101.0),
            (102.0, 102.0, 102.0),
            (103.0, 103.0, 103.0),
            (104.0, 104.0, 104.0),
        ]);
        let cfg = small_config();
        let mut sim = Simulation::new(&data, &cfg).unwrap();
        let source = |w: &[Candle]| {
            assert_eq!(w.len(), 3);
            Signal::neutral().with_rsi(w[w.len() - 1].close)
        };
        let first = sim.step(&source).unwrap().unwrap();
        assert_eq!(first.index, 3);
        let second = sim.step(&source).unwrap().unwrap();
        assert_eq!(second.index, 4);
        assert!(sim.step(&source).unwrap().is_none());
    }

    #[test]
    fn stop_loss_then_reentry_on_same_tick() {
        // open at 100 on tick 3, tick 4 low hits the 98 stop, slot frees, re-open at 99
        let data = candles(&[
            (100.0, 100.0, 100.0),
            (100.0, 100.0, 100.0),
            (100.0, 100.0, 100.0),
            (100.0, 100.0, 100.0),
            (100.0, 97.5, 99.0),
        ]);
        let state = run(&data, &ConstantSource(clean_long()), &small_config()).unwrap();
        assert_eq!(state.closed_trades.len(), 2);
        let first = &state.closed_trades[0];
        assert_eq!(first.close_reason, CloseReason::StopLoss);
        assert!((first.exit_price - 98.0).abs() < 1e-9);
        assert!((first.pnl - (98.0 - 100.0)).abs() < 1e-9);
        let second = &state.closed_trades[1];
        assert_eq!(second.close_reason, CloseReason::ForcedEnd);
        assert_eq!(second.exit_price, 99.0);
        assert_eq!(second.position.id, PositionId(1));
        assert_eq!(state.diagnostics.entries_opened, 2);
    }

    #[test]
    fn forced_end_agrees_with_equity_curve() {
        let data = candles(&[
            (100.0, 100.0, 100.0),
            (100.0, 100.0, 100.0),
            (100.0, 100.0, 100.0),
            (100.0, 100.0, 100.0),
            (100.8, 100.0, 100.5),
            (100.9, 100.2, 100.7),
        ]);
        let state = run(&data, &ConstantSource(clean_long()), &small_config()).unwrap();
        assert_eq!(state.closed_trades.len(), 1);
        let trade = &state.closed_trades[0];
        assert_eq!(trade.close_reason, CloseReason::ForcedEnd);
        assert_eq!(trade.exit_time, data[5].timestamp);
        let last = state.equity_curve.last().unwrap();
        assert!((last.balance - state.final_balance()).abs() < 1e-9);
    }

    #[test]
    fn capacity_blocks_second_entry() {
        let data = candles(&[(100.0, 100.0, 100.0); 8]);
        let state = run(&data, &ConstantSource(clean_long()), &small_config()).unwrap();
        assert_eq!(state.diagnostics.entries_opened, 1);
        assert_eq!(state.diagnostics.entries_evaluated, 1);
        assert_eq!(state.diagnostics.directional_signals, 5);
        assert_eq!(state.diagnostics.ticks_in_market, 5);
    }

    #[test]
    fn finish_after_partial_run_closes_at_last_processed_candle() {
        let data = candles(&[
            (100.0, 100.0, 100.0),
            (100.0, 100.0, 100.0),
            (100.0, 100.0, 100.0),
            (100.0, 100.0, 100.0),
            (100.5, 100.0, 100.4),
            (110.0, 90.0, 95.0),
        ]);
        let cfg = small_config();
        let mut sim = Simulation::new(&data, &cfg).unwrap();
        let source = ConstantSource(clean_long());
        sim.step(&source).unwrap();
        sim.step(&source).unwrap();
        let state = sim.finish();
        assert_eq!(state.equity_curve.len(), 2);
        assert_eq!(state.closed_trades.len(), 1);
        assert_eq!(state.closed_trades[0].exit_price, 100.4);
        assert_eq!(state.closed_trades[0].exit_index, 4);
    }
}
