//! Stochastic-momentum oscillator (SMI-style), double-smoothed

use crate::ema::ema;

/// SMI-style oscillator signal line.
///
/// Construction: the midpoint-relative position of the close inside the
/// candle's high/low range, `close - (high + low) / 2`, double-smoothed with
/// EMA(`fast`) then EMA(`slow`); normalized by half the equally
/// double-smoothed high/low range; the ratio is smoothed once more with
/// EMA(`signal`) to produce the signal line. Bounded roughly in [-1, 1].
///
/// Indices where the double-smoothed range is still zero (no price movement
/// seen yet) have no value. Once the smoothed range turns positive it stays
/// positive, so the output is a `None` prefix followed by defined values.
pub fn smi_signal(
    highs: &[f64],
    lows: &[f64],
    closes: &[f64],
    fast: usize,
    slow: usize,
    signal: usize,
) -> Vec<Option<f64>> {
    debug_assert_eq!(highs.len(), lows.len());
    debug_assert_eq!(highs.len(), closes.len());
    let n = closes.len();

    let midpoint_distance: Vec<f64> = (0..n)
        .map(|i| closes[i] - (highs[i] + lows[i]) / 2.0)
        .collect();
    let range: Vec<f64> = (0..n).map(|i| highs[i] - lows[i]).collect();

    let smoothed_distance = ema(&ema(&midpoint_distance, fast), slow);
    let smoothed_range = ema(&ema(&range, fast), slow);

    let ratio: Vec<Option<f64>> = smoothed_distance
        .iter()
        .zip(&smoothed_range)
        .map(|(&d, &r)| if r == 0.0 { None } else { Some(d / (0.5 * r)) })
        .collect();

    // EMA over the defined suffix, preserving the None prefix alignment.
    let defined_from = match ratio.iter().position(|v| v.is_some()) {
        Some(i) => i,
        None => return vec![None; n],
    };
    let suffix: Vec<f64> = ratio[defined_from..].iter().filter_map(|v| *v).collect();
    let smoothed = ema(&suffix, signal);

    let mut out = vec![None; defined_from];
    out.extend(smoothed.into_iter().map(Some));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_prices_have_no_value() {
        let highs = [10.0; 30];
        let lows = [10.0; 30];
        let closes = [10.0; 30];
        let out = smi_signal(&highs, &lows, &closes, 5, 20, 5);
        assert!(out.iter().all(|v| v.is_none()));
    }

    #[test]
    fn close_at_high_saturates_towards_one() {
        // Close pinned to the high of every candle: midpoint distance is
        // half the range, so the ratio is exactly 1 at every index.
        let n = 60;
        let highs = vec![102.0; n];
        let lows = vec![98.0; n];
        let closes = vec![102.0; n];
        let out = smi_signal(&highs, &lows, &closes, 5, 20, 5);
        let last = out.last().unwrap().unwrap();
        assert!((last - 1.0).abs() < 1e-9);
    }

    #[test]
    fn centered_close_stays_near_zero() {
        let n = 60;
        let highs = vec![101.0; n];
        let lows = vec![99.0; n];
        let closes = vec![100.0; n];
        let out = smi_signal(&highs, &lows, &closes, 5, 20, 5);
        let last = out.last().unwrap().unwrap();
        assert!(last.abs() < 1e-9);
    }

    #[test]
    fn output_is_aligned_with_input() {
        let highs = [10.0, 11.0, 12.0];
        let lows = [9.0, 9.5, 10.0];
        let closes = [9.5, 10.5, 11.5];
        let out = smi_signal(&highs, &lows, &closes, 5, 20, 5);
        assert_eq!(out.len(), 3);
        assert!(out[0].is_some());
    }
}
