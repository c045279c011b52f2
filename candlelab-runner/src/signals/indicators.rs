//! Window indicators for the reference signal source.
//!
//! Each function takes the whole window and returns the value at its last
//! element, or `None` when the window is too short or contains NaN.
//! Smoothing follows Wilder (alpha = 1/period) for both RSI and ATR.

use candlelab_core::domain::{BollingerBands, Candle};

/// True Range series.
/// TR[0] = high[0] - low[0] (no previous close).
/// TR[t] = max(high[t]-low[t], |high[t]-close[t-1]|, |low[t]-close[t-1]|).
pub fn true_range(candles: &[Candle]) -> Vec<f64> {
    let mut tr = Vec::with_capacity(candles.len());
    for (i, c) in candles.iter().enumerate() {
        let value = match i.checked_sub(1).map(|p| candles[p].close) {
            None => c.high - c.low,
            Some(pc) => (c.high - c.low)
                .max((c.high - pc).abs())
                .max((c.low - pc).abs()),
        };
        tr.push(value);
    }
    tr
}

/// Wilder smoothing: seed with the mean of the first `period` values, then
/// `prev + (x - prev) / period`. Returns the final smoothed value.
pub fn wilder_smooth(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period || values.iter().any(|v| v.is_nan()) {
        return None;
    }
    let mut smoothed = values[..period].iter().sum::<f64>() / period as f64;
    let alpha = 1.0 / period as f64;
    for &v in &values[period..] {
        smoothed = alpha * v + (1.0 - alpha) * smoothed;
    }
    Some(smoothed)
}

/// Average True Range. Needs `period + 1` candles so every smoothed range
/// has a previous close.
pub fn atr(candles: &[Candle], period: usize) -> Option<f64> {
    if candles.len() < period + 1 {
        return None;
    }
    let tr = true_range(candles);
    wilder_smooth(&tr[1..], period)
}

/// Relative Strength Index over closes.
/// avg_loss == 0 → 100; avg_gain == 0 → 0; no movement → 50.
pub fn rsi(closes: &[f64], period: usize) -> Option<f64> {
    if period == 0 || closes.len() < period + 1 {
        return None;
    }
    let changes: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();
    let gains: Vec<f64> = changes.iter().map(|c| c.max(0.0)).collect();
    let losses: Vec<f64> = changes.iter().map(|c| (-c).max(0.0)).collect();
    let avg_gain = wilder_smooth(&gains, period)?;
    let avg_loss = wilder_smooth(&losses, period)?;
    Some(compute_rsi(avg_gain, avg_loss))
}

fn compute_rsi(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 && avg_gain == 0.0 {
        50.0
    } else if avg_loss == 0.0 {
        100.0
    } else if avg_gain == 0.0 {
        0.0
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}

/// Simple moving average of the last `period` values.
pub fn sma(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }
    let tail = &values[values.len() - period..];
    Some(tail.iter().sum::<f64>() / period as f64)
}

/// Population standard deviation.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Bollinger bands: SMA(period) ± multiplier × population stddev.
pub fn bollinger(closes: &[f64], period: usize, multiplier: f64) -> Option<BollingerBands> {
    let middle = sma(closes, period)?;
    let sd = std_dev(&closes[closes.len() - period..]);
    Some(BollingerBands {
        upper: middle + multiplier * sd,
        lower: middle - multiplier * sd,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
        assert!(
            (actual - expected).abs() < epsilon,
            "actual={actual}, expected={expected}"
        );
    }

    fn make_candles(data: &[(f64, f64, f64)]) -> Vec<Candle> {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        data.iter()
            .enumerate()
            .map(|(i, &(h, l, c))| {
                Candle::new(t0 + Duration::minutes(15 * i as i64), c, h, l, c, 1.0)
            })
            .collect()
    }

    #[test]
    fn true_range_gap_up() {
        let candles = make_candles(&[(101.0, 99.0, 100.0), (106.0, 104.0, 105.0)]);
        let tr = true_range(&candles);
        assert_approx(tr[0], 2.0, 1e-12);
        // |106 - 100| dominates 106 - 104
        assert_approx(tr[1], 6.0, 1e-12);
    }

    #[test]
    fn atr_period_3() {
        let candles = make_candles(&[
            (11.0, 9.0, 10.0),
            (12.0, 10.0, 11.0), // TR 2
            (13.0, 10.0, 12.0), // TR 3
            (12.0, 11.0, 11.5), // TR 1
            (14.0, 11.0, 13.0), // TR 3
        ]);
        // seed = (2 + 3 + 1) / 3 = 2, then 2 + (3 - 2) / 3
        assert_approx(atr(&candles, 3).unwrap(), 2.0 + 1.0 / 3.0, 1e-12);
    }

    #[test]
    fn atr_needs_period_plus_one() {
        let candles = make_candles(&[(11.0, 9.0, 10.0); 3]);
        assert!(atr(&candles, 3).is_none());
    }

    #[test]
    fn rsi_all_gains_is_100() {
        assert_approx(rsi(&[100.0, 101.0, 102.0, 103.0, 104.0], 3).unwrap(), 100.0, 1e-12);
    }

    #[test]
    fn rsi_all_losses_is_0() {
        assert_approx(rsi(&[105.0, 104.0, 103.0, 102.0], 3).unwrap(), 0.0, 1e-12);
    }

    #[test]
    fn rsi_flat_is_50() {
        assert_approx(rsi(&[100.0; 20], 14).unwrap(), 50.0, 1e-12);
    }

    #[test]
    fn rsi_mixed() {
        // changes +0.34, -0.25, -0.48: avg_gain 0.34/3, avg_loss 0.73/3
        let value = rsi(&[44.0, 44.34, 44.09, 43.61], 3).unwrap();
        assert_approx(value, 100.0 - 100.0 / (1.0 + 0.34 / 0.73), 1e-9);
    }

    #[test]
    fn rsi_short_window_is_none() {
        assert!(rsi(&[1.0, 2.0], 14).is_none());
    }

    #[test]
    fn bollinger_constant_price_has_zero_width() {
        let bands = bollinger(&[50.0; 25], 20, 2.0).unwrap();
        assert_eq!(bands.upper, 50.0);
        assert_eq!(bands.lower, 50.0);
    }

    #[test]
    fn bollinger_symmetric_around_sma() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + (i % 4) as f64).collect();
        let bands = bollinger(&closes, 20, 2.0).unwrap();
        let mid = sma(&closes, 20).unwrap();
        assert_approx(bands.upper - mid, mid - bands.lower, 1e-9);
        assert!(bands.upper > mid);
    }
}
