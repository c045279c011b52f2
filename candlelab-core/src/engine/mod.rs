//! Backtest driver: the candle-by-candle tick loop.
//!
//! Each tick at candle index `i` (starting at `warmup_candles`):
//!
//! 1. Build the lookback window ending at `i`
//! 2. Update every open position through the lifecycle engine; closes are
//!    booked into the trade log and the cash balance
//! 3. Ask the signal source for exactly one signal
//! 4. If there is a free slot and the signal is directional, run the filter
//!    pipeline and open a position when allowed
//! 5. Append one equity point (cash + mark-to-market at the candle close)
//!
//! After the last tick every position still open is closed at the final
//! processed close with `FORCED_END`.

pub mod simulation;
pub mod source;
pub mod state;

pub use simulation::{run, Simulation, TickOutcome};
pub use source::{ConstantSource, SignalSource};
pub use state::{RunDiagnostics, SimulationState};
