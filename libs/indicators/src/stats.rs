//! Small statistics helpers shared by the indicator modules

/// Ordinary least squares fit of `y ~ x`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    /// Pearson correlation coefficient.
    pub r: f64,
}

pub(crate) fn mean(xs: &[f64]) -> f64 {
    xs.iter().sum::<f64>() / xs.len() as f64
}

/// Sample standard deviation (ddof = 1). `None` for fewer than 2 points.
pub(crate) fn sample_std(xs: &[f64]) -> Option<f64> {
    if xs.len() < 2 {
        return None;
    }
    let m = mean(xs);
    let ss: f64 = xs.iter().map(|&x| (x - m) * (x - m)).sum();
    Some((ss / (xs.len() - 1) as f64).sqrt())
}

/// Median of a window. Averages the two middle elements for even lengths.
pub(crate) fn median(xs: &[f64]) -> Option<f64> {
    if xs.is_empty() {
        return None;
    }
    let mut sorted = xs.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Least-squares regression of `ys` on `xs`.
///
/// `None` when the fit is undefined: fewer than 2 points or zero variance
/// in `xs`. A constant `ys` column fits with `r = 0` (treated downstream as
/// an unreliable regression).
pub(crate) fn linregress(xs: &[f64], ys: &[f64]) -> Option<LinearFit> {
    debug_assert_eq!(xs.len(), ys.len());
    let n = xs.len();
    if n < 2 {
        return None;
    }

    let mx = mean(xs);
    let my = mean(ys);

    let mut sxx = 0.0;
    let mut syy = 0.0;
    let mut sxy = 0.0;
    for i in 0..n {
        let dx = xs[i] - mx;
        let dy = ys[i] - my;
        sxx += dx * dx;
        syy += dy * dy;
        sxy += dx * dy;
    }

    if sxx == 0.0 {
        return None;
    }

    let slope = sxy / sxx;
    let intercept = my - slope * mx;
    let r = if syy == 0.0 { 0.0 } else { sxy / (sxx * syy).sqrt() };

    Some(LinearFit {
        slope,
        intercept,
        r,
    })
}
