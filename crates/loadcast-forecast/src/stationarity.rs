//! Differencing and KPSS level-stationarity testing.

/// 5% critical value of the KPSS level-stationarity statistic.
pub const KPSS_CRITICAL_5PCT: f64 = 0.463;

/// First difference: `x[t] - x[t-1]`.
pub fn difference(x: &[f64]) -> Vec<f64> {
    x.windows(2).map(|w| w[1] - w[0]).collect()
}

/// KPSS statistic for level stationarity, with Newey–West long-run
/// variance and lag truncation `⌊3√n / 13⌋`.
///
/// Returns `None` when the long-run variance is zero (a constant series),
/// which callers treat as stationary.
pub fn kpss_statistic(x: &[f64]) -> Option<f64> {
    let n = x.len();
    if n < 2 {
        return None;
    }
    let nf = n as f64;
    let mean = x.iter().sum::<f64>() / nf;
    let resid: Vec<f64> = x.iter().map(|v| v - mean).collect();

    let mut partial = 0.0;
    let eta = resid
        .iter()
        .map(|e| {
            partial += e;
            partial * partial
        })
        .sum::<f64>()
        / (nf * nf);

    let lags = ((3.0 * nf.sqrt()) / 13.0).floor() as usize;
    let mut long_run = resid.iter().map(|e| e * e).sum::<f64>() / nf;
    for s in 1..=lags.min(n - 1) {
        let weight = 1.0 - s as f64 / (lags as f64 + 1.0);
        let autocov: f64 = (s..n).map(|t| resid[t] * resid[t - s]).sum::<f64>() / nf;
        long_run += 2.0 * weight * autocov;
    }

    if long_run <= f64::EPSILON * (1.0 + mean.abs()) {
        return None;
    }
    Some(eta / long_run)
}

pub fn is_level_stationary(x: &[f64]) -> bool {
    kpss_statistic(x).is_none_or(|stat| stat < KPSS_CRITICAL_5PCT)
}

/// Smallest `d ≤ max_d` after which the series passes the KPSS test.
pub fn select_differencing(x: &[f64], max_d: usize) -> usize {
    let mut current = x.to_vec();
    let mut d = 0;
    while d < max_d && current.len() > 3 && !is_level_stationary(&current) {
        current = difference(&current);
        d += 1;
    }
    d
}
