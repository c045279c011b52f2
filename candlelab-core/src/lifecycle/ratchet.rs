//! Ratchet invariant for the trailing stop.
//!
//! **Core rule:** a trailing stop may tighten, never loosen.
//!
//! - Long positions: the stop can only rise (max of current and proposed)
//! - Short positions: the stop can only fall (min of current and proposed)

use crate::domain::PositionSide;
use crate::math::offset_by_pct;

/// Apply the ratchet to a proposed trailing-stop level.
///
/// Returns the level to store. With no current level the proposal is taken
/// as-is (first arming).
///
/// # Example
/// ```
/// use candlelab_core::domain::PositionSide;
/// use candlelab_core::lifecycle::ratchet::tighten;
///
/// // Tightening: 95 -> 100 (allowed)
/// assert_eq!(tighten(PositionSide::Long, Some(95.0), 100.0), 100.0);
///
/// // Loosening: 100 -> 90 (blocked, stays at 100)
/// assert_eq!(tighten(PositionSide::Long, Some(100.0), 90.0), 100.0);
/// ```
pub fn tighten(side: PositionSide, current: Option<f64>, proposed: f64) -> f64 {
    match current {
        None => proposed,
        Some(current) => match side {
            PositionSide::Long => current.max(proposed),
            PositionSide::Short => current.min(proposed),
        },
    }
}

/// Trailing level `pct` percent behind `water_mark` on the adverse side.
pub fn trail_level(side: PositionSide, water_mark: f64, pct: f64) -> f64 {
    match side {
        PositionSide::Long => offset_by_pct(water_mark, -pct),
        PositionSide::Short => offset_by_pct(water_mark, pct),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_tightening_allowed() {
        assert_eq!(tighten(PositionSide::Long, Some(95.0), 100.0), 100.0);
    }

    #[test]
    fn long_loosening_blocked() {
        assert_eq!(tighten(PositionSide::Long, Some(100.0), 90.0), 100.0);
    }

    #[test]
    fn short_tightening_allowed() {
        assert_eq!(tighten(PositionSide::Short, Some(105.0), 100.0), 100.0);
    }

    #[test]
    fn short_loosening_blocked() {
        assert_eq!(tighten(PositionSide::Short, Some(100.0), 110.0), 100.0);
    }

    #[test]
    fn first_level_initializes() {
        assert_eq!(tighten(PositionSide::Short, None, 101.5), 101.5);
    }

    #[test]
    fn trail_levels() {
        assert!((trail_level(PositionSide::Long, 105.0, 1.5) - 103.425).abs() < 1e-9);
        assert!((trail_level(PositionSide::Short, 95.0, 1.5) - 96.425).abs() < 1e-9);
    }
}
