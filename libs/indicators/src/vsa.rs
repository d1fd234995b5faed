//! Range/volume regression deviation (volume-spread anomaly score)
//!
//! Normalizes each candle's high-low range by ATR and its volume by the
//! rolling volume median, regresses range on volume over a short trailing
//! window and scores the evaluated candle by how far its actual normalized
//! range sits from the regression's prediction.

use crate::stats::{linregress, median};

/// Average true range over `period`, Wilder-smoothed.
///
/// True range is `max(high - low, |high - prev_close|, |low - prev_close|)`
/// (plain `high - low` for the first candle). Smoothing is the RMA
/// recursion with `alpha = 1 / period`, seeded with the first true range.
/// The first `period - 1` indices carry no value.
pub fn atr(highs: &[f64], lows: &[f64], closes: &[f64], period: usize) -> Vec<Option<f64>> {
    debug_assert!(period > 0);
    debug_assert_eq!(highs.len(), lows.len());
    debug_assert_eq!(highs.len(), closes.len());
    let n = highs.len();
    if n == 0 {
        return Vec::new();
    }

    let alpha = 1.0 / period as f64;
    let mut out = Vec::with_capacity(n);
    let mut smoothed = highs[0] - lows[0];
    out.push(if period == 1 { Some(smoothed) } else { None });

    for i in 1..n {
        let prev_close = closes[i - 1];
        let tr = (highs[i] - lows[i])
            .max((highs[i] - prev_close).abs())
            .max((lows[i] - prev_close).abs());
        smoothed = alpha * tr + (1.0 - alpha) * smoothed;
        out.push(if i + 1 >= period { Some(smoothed) } else { None });
    }
    out
}

/// Rolling median over a trailing `window`. `None` before `window - 1`.
pub fn rolling_median(xs: &[f64], window: usize) -> Vec<Option<f64>> {
    debug_assert!(window > 0);
    xs.iter()
        .enumerate()
        .map(|(i, _)| {
            if i + 1 < window {
                None
            } else {
                median(&xs[i + 1 - window..=i])
            }
        })
        .collect()
}

/// Regression-based range deviation with lookback `L`.
///
/// For each index `i >= 2L`: over the `L` candles ending at `i` (inclusive),
/// fit `norm_range ~ norm_volume` where `norm_range = (high - low) / ATR(L)`
/// and `norm_volume = volume / median(volume, L)`, then score index `i` as
/// actual minus predicted normalized range.
///
/// A fitted slope <= 0 or correlation below 0.2 marks the regression
/// unreliable and forces the deviation to exactly 0 instead of trusting the
/// prediction. Indices below `2L`, and windows containing undefined or
/// non-finite normalized values, have no value.
pub fn range_deviation(
    highs: &[f64],
    lows: &[f64],
    closes: &[f64],
    volumes: &[f64],
    lookback: usize,
) -> Vec<Option<f64>> {
    let n = highs.len();
    let atr = atr(highs, lows, closes, lookback);
    let vol_med = rolling_median(volumes, lookback);

    let norm_range: Vec<Option<f64>> = (0..n)
        .map(|i| match atr[i] {
            Some(a) if a != 0.0 => {
                let v = (highs[i] - lows[i]) / a;
                v.is_finite().then_some(v)
            }
            _ => None,
        })
        .collect();
    let norm_volume: Vec<Option<f64>> = (0..n)
        .map(|i| match vol_med[i] {
            Some(m) if m != 0.0 => {
                let v = volumes[i] / m;
                v.is_finite().then_some(v)
            }
            _ => None,
        })
        .collect();

    let mut out = vec![None; n];
    for i in lookback * 2..n {
        let window = (i + 1 - lookback)..=i;
        let mut xs = Vec::with_capacity(lookback);
        let mut ys = Vec::with_capacity(lookback);
        let mut complete = true;
        for j in window {
            match (norm_volume[j], norm_range[j]) {
                (Some(x), Some(y)) => {
                    xs.push(x);
                    ys.push(y);
                }
                _ => {
                    complete = false;
                    break;
                }
            }
        }
        if !complete {
            continue;
        }

        let Some(fit) = linregress(&xs, &ys) else {
            continue;
        };
        if fit.slope <= 0.0 || fit.r < 0.2 {
            out[i] = Some(0.0);
            continue;
        }

        // Index i is the last element of the completed window.
        let (x_i, y_i) = (xs[xs.len() - 1], ys[ys.len() - 1]);
        out[i] = Some(y_i - (fit.intercept + fit.slope * x_i));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const L: usize = 14;

    #[test]
    fn atr_masks_warmup_and_tracks_constant_range() {
        let n = 20;
        let highs = vec![102.0; n];
        let lows = vec![98.0; n];
        let closes = vec![100.0; n];
        let out = atr(&highs, &lows, &closes, L);
        assert!(out[..L - 1].iter().all(|v| v.is_none()));
        // Constant TR of 4: the recursion stays at 4.
        assert!((out[L - 1].unwrap() - 4.0).abs() < 1e-12);
        assert!((out[n - 1].unwrap() - 4.0).abs() < 1e-12);
    }

    #[test]
    fn rolling_median_window_edges() {
        let xs = [5.0, 1.0, 3.0, 2.0];
        let out = rolling_median(&xs, 3);
        assert_eq!(out, vec![None, None, Some(3.0), Some(2.0)]);
    }

    /// Candles where normalized range follows normalized volume perfectly
    /// except for one outlier at the end.
    fn correlated_candles(n: usize) -> (Vec<f64>, Vec<f64>, Vec<f64>, Vec<f64>) {
        let mut highs = Vec::new();
        let mut lows = Vec::new();
        let mut closes = Vec::new();
        let mut volumes = Vec::new();
        for i in 0..n {
            // Volume wiggles; range wiggles with it.
            let v = 100.0 + (i % 5) as f64 * 10.0;
            let r = 2.0 + (i % 5) as f64 * 0.5;
            volumes.push(v);
            highs.push(100.0 + r);
            lows.push(100.0);
            closes.push(100.0 + r / 2.0);
        }
        (highs, lows, closes, volumes)
    }

    #[test]
    fn no_value_before_twice_the_lookback() {
        let (h, l, c, v) = correlated_candles(50);
        let out = range_deviation(&h, &l, &c, &v, L);
        assert!(out[..2 * L].iter().all(|x| x.is_none()));
        assert!(out[2 * L].is_some());
    }

    #[test]
    fn unreliable_regression_forces_exact_zero() {
        // Range moves opposite to volume, so every window fits a strictly
        // negative slope and the gate zeroes the deviation.
        let n = 50;
        let mut highs = Vec::new();
        let mut lows = Vec::new();
        let mut closes = Vec::new();
        let mut volumes = Vec::new();
        for i in 0..n {
            let step = (i % 5) as f64;
            let r = 4.0 - step * 0.5;
            volumes.push(100.0 + step * 10.0);
            highs.push(100.0 + r);
            lows.push(100.0);
            closes.push(100.0 + r / 2.0);
        }
        let out = range_deviation(&highs, &lows, &closes, &volumes, L);
        for v in out[2 * L..].iter().flatten() {
            assert_eq!(*v, 0.0);
        }
        assert!(out[2 * L..].iter().any(|v| v.is_some()));
    }

    #[test]
    fn outlier_range_scores_nonzero_deviation() {
        let (mut h, l, c, v) = correlated_candles(50);
        // Last candle: range far above what its volume predicts.
        let last = h.len() - 1;
        h[last] += 10.0;
        let out = range_deviation(&h, &l, &c, &v, L);
        let dev = out[last].unwrap();
        assert!(dev > 0.5, "expected a large positive deviation, got {dev}");
    }
}
