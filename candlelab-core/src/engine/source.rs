//! Signal source seam.
//!
//! How a signal is computed is outside the engine. Anything that can turn a
//! candle window into a [`Signal`] plugs in here, including plain closures.

use crate::domain::{Candle, Signal};

/// Produces one signal per lookback window.
///
/// The window is ordered oldest first; its last candle is the current tick.
pub trait SignalSource: Send + Sync {
    fn evaluate(&self, window: &[Candle]) -> Signal;
}

impl<F> SignalSource for F
where
    F: Fn(&[Candle]) -> Signal + Send + Sync,
{
    fn evaluate(&self, window: &[Candle]) -> Signal {
        self(window)
    }
}

/// Returns the same signal on every tick.
#[derive(Debug, Clone)]
pub struct ConstantSource(pub Signal);

impl SignalSource for ConstantSource {
    fn evaluate(&self, _window: &[Candle]) -> Signal {
        self.0.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Direction;

    #[test]
    fn closures_are_sources() {
        let source = |window: &[Candle]| Signal::long(window.len() as f64);
        assert_eq!(source.evaluate(&[]).strength, 0.0);
    }

    #[test]
    fn constant_source_repeats() {
        let source = ConstantSource(Signal::short(90.0));
        assert_eq!(source.evaluate(&[]).direction, Direction::Short);
        assert_eq!(source.evaluate(&[]).direction, Direction::Short);
    }
}
