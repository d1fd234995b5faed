//! Taker-flow delta normalization

use crate::stats::{mean, sample_std};

/// Z-scored taker-flow delta over the whole series.
///
/// `delta[i] = taker_buy[i] - (volume[i] - taker_buy[i])`, normalized as
/// `(delta - mean(delta)) / stddev(delta)` with the sample standard
/// deviation (ddof = 1). When the deviation is zero (constant delta) the
/// z-score is undefined and every index carries `None`.
pub fn normalized_delta(volumes: &[f64], taker_buy: &[f64]) -> Vec<Option<f64>> {
    debug_assert_eq!(volumes.len(), taker_buy.len());
    let n = volumes.len();

    let deltas: Vec<f64> = (0..n)
        .map(|i| taker_buy[i] - (volumes[i] - taker_buy[i]))
        .collect();

    let std = match sample_std(&deltas) {
        Some(s) if s != 0.0 => s,
        _ => return vec![None; n],
    };
    let m = mean(&deltas);

    deltas.into_iter().map(|d| Some((d - m) / std)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balanced_flow_centers_at_zero() {
        // Buy side exactly half the volume everywhere except the ends.
        let volumes = [100.0, 100.0, 100.0, 100.0];
        let taker_buy = [40.0, 50.0, 50.0, 60.0];
        let out = normalized_delta(&volumes, &taker_buy);
        assert_eq!(out[1], Some(0.0));
        assert_eq!(out[2], Some(0.0));
        // Symmetric tails.
        assert!((out[0].unwrap() + out[3].unwrap()).abs() < 1e-12);
    }

    #[test]
    fn constant_delta_is_undefined() {
        let volumes = [100.0, 200.0, 300.0];
        let taker_buy = [50.0, 100.0, 150.0];
        let out = normalized_delta(&volumes, &taker_buy);
        assert_eq!(out, vec![None, None, None]);
    }

    #[test]
    fn one_sided_flow_scores_high() {
        let mut volumes = vec![100.0; 30];
        let mut taker_buy = vec![50.0; 30];
        volumes.push(100.0);
        taker_buy.push(100.0); // all taker buys on the last candle
        let out = normalized_delta(&volumes, &taker_buy);
        assert!(out.last().unwrap().unwrap() > 2.8);
    }
}
