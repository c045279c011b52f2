//! Domain types for the candlelab engine.

pub mod candle;
pub mod equity;
pub mod ids;
pub mod position;
pub mod signal;
pub mod trade;

pub use candle::Candle;
pub use equity::EquityPoint;
pub use ids::PositionId;
pub use position::{Position, PositionSide, PositionState};
pub use signal::{BollingerBands, Direction, Indicators, Signal};
pub use trade::{CloseReason, ClosedTrade};
