//! Percentage helpers shared by the filter pipeline, the lifecycle engine
//! and analytics.
//!
//! All percentages are in percent units (2.0 means 2%). Every helper that
//! divides returns 0.0 for a zero or non-finite base instead of leaking
//! NaN/∞ into callers.

/// Percent change from `from` to `to`: `(to - from) / from * 100`.
///
/// Returns 0.0 when `from` is zero or either input is non-finite.
pub fn percent_change(from: f64, to: f64) -> f64 {
    if from == 0.0 || !from.is_finite() || !to.is_finite() {
        return 0.0;
    }
    (to - from) / from * 100.0
}

/// `part` expressed as a percentage of `whole`.
///
/// Returns 0.0 when `whole` is zero or either input is non-finite.
pub fn pct_of(part: f64, whole: f64) -> f64 {
    if whole == 0.0 || !whole.is_finite() || !part.is_finite() {
        return 0.0;
    }
    part / whole * 100.0
}

/// Clamp `value` into `[lo, hi]`. NaN maps to `lo`.
pub fn clamp(value: f64, lo: f64, hi: f64) -> f64 {
    if value.is_nan() {
        return lo;
    }
    value.max(lo).min(hi)
}

/// Move `price` by `pct` percent: `price * (1 + pct/100)`.
///
/// Negative `pct` moves the price down.
pub fn offset_by_pct(price: f64, pct: f64) -> f64 {
    price * (1.0 + pct / 100.0)
}
