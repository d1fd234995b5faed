//! Exponential moving averages and the fast/slow volume oscillator

/// Recursive EMA with smoothing factor `alpha = 2 / (span + 1)`.
///
/// Seeded with the first raw value and not bias-adjusted:
/// `ema[0] = x[0]`, `ema[i] = alpha * x[i] + (1 - alpha) * ema[i-1]`.
/// Defined at every index of the input, and deterministic: identical input
/// always produces identical output.
pub fn ema(xs: &[f64], span: usize) -> Vec<f64> {
    debug_assert!(span > 0);
    let alpha = 2.0 / (span as f64 + 1.0);

    let mut out = Vec::with_capacity(xs.len());
    let mut prev = match xs.first() {
        Some(&x) => x,
        None => return out,
    };
    out.push(prev);

    for &x in &xs[1..] {
        prev = alpha * x + (1.0 - alpha) * prev;
        out.push(prev);
    }
    out
}

/// Relative divergence between a fast (span 5) and slow (span 10) volume
/// EMA: `(EMA_5 - EMA_10) / EMA_10 * 100`.
///
/// `None` where the slow EMA is zero (all-zero volume history).
pub fn volume_oscillator(volumes: &[f64]) -> Vec<Option<f64>> {
    let fast = ema(volumes, 5);
    let slow = ema(volumes, 10);

    fast.iter()
        .zip(&slow)
        .map(|(&f, &s)| {
            if s == 0.0 {
                None
            } else {
                Some((f - s) / s * 100.0)
            }
        })
        .collect()
}
