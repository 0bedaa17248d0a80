//! ARIMA(p, d, q) fitting by conditional sum of squares, plus the bounded
//! auto-order search.
//!
//! Fitting pipeline for one order:
//!
//! 1. Difference the series `d` times, remembering the last value of every
//!    level so predictions can be integrated back.
//! 2. Seed AR/MA coefficients with Hannan–Rissanen regressions.
//! 3. Refine (mean, AR, MA) with Nelder–Mead on the conditional sum of
//!    squares; parameters outside the stationary/invertible region score +∞.
//! 4. Score with AIC = n·ln σ² + 2(k + 1).

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::FitError;
use crate::ols::least_squares;
use crate::optimize::NelderMead;
use crate::stationarity::{difference, select_differencing};

/// Lower bound on the innovation variance so perfectly fitted series keep
/// a finite AIC.
const SIGMA2_FLOOR: f64 = 1e-10;

/// Partial autocorrelations within this distance of ±1 count as a unit root.
const UNIT_ROOT_MARGIN: f64 = 1e-4;

/// Model order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArimaOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
}

impl ArimaOrder {
    pub fn new(p: usize, d: usize, q: usize) -> Self {
        Self { p, d, q }
    }
}

impl fmt::Display for ArimaOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ARIMA({},{},{})", self.p, self.d, self.q)
    }
}

/// A fitted model, ready to forecast.
#[derive(Debug, Clone)]
pub struct ArimaModel {
    order: ArimaOrder,
    /// Mean (d = 0) or drift (d = 1) of the differenced series.
    constant: Option<f64>,
    ar: Vec<f64>,
    ma: Vec<f64>,
    sigma2: f64,
    aic: f64,
    /// The series after `d` differences.
    diffed: Vec<f64>,
    /// In-sample one-step residuals on the differenced scale.
    residuals: Vec<f64>,
    /// Last value of each differencing level, level 0 first.
    tails: Vec<f64>,
}

impl ArimaModel {
    /// Fit a single order to `y`.
    pub fn fit(y: &[f64], order: ArimaOrder) -> Result<Self, FitError> {
        Self::fit_conditioned(y, order, order.p)
    }

    /// Fit with the residual sum starting at `max(p, condition_on)`, so
    /// candidates with different `p` are scored on the same observations.
    pub(crate) fn fit_conditioned(
        y: &[f64],
        order: ArimaOrder,
        condition_on: usize,
    ) -> Result<Self, FitError> {
        check_series(y)?;

        let (diffed, tails) = difference_n(y, order.d);
        let has_constant = order.d < 2;
        let k = order.p + order.q + usize::from(has_constant);
        let start = order.p.max(condition_on);
        if diffed.len() < start + k + 3 {
            return Err(FitError::TooShort);
        }

        let mu0 = if has_constant { mean(&diffed) } else { 0.0 };
        let centered: Vec<f64> = diffed.iter().map(|v| v - mu0).collect();
        let (ar0, ma0) = hannan_rissanen(&centered, order.p, order.q)
            .ok()
            .filter(|(ar, ma)| admissible(ar, ma))
            .unwrap_or_else(|| (vec![0.0; order.p], vec![0.0; order.q]));

        let mut theta0 = Vec::with_capacity(k);
        if has_constant {
            theta0.push(mu0);
        }
        theta0.extend_from_slice(&ar0);
        theta0.extend_from_slice(&ma0);

        let objective = |theta: &[f64]| {
            let (mu, ar, ma) = split_params(theta, has_constant, order.p);
            if !admissible(ar, ma) {
                return f64::INFINITY;
            }
            conditional_ss(&diffed, mu, ar, ma, start).0
        };
        let (theta, best) = NelderMead::default().minimize(objective, &theta0);
        if !best.is_finite() {
            return Err(FitError::NonFinite);
        }

        let (mu, ar, ma) = split_params(&theta, has_constant, order.p);
        let (css, residuals) = conditional_ss(&diffed, mu, ar, ma, start);
        let n_eff = (diffed.len() - start) as f64;
        let sigma2 = (css / n_eff).max(SIGMA2_FLOOR);
        let aic = n_eff * sigma2.ln() + 2.0 * (k as f64 + 1.0);
        if !aic.is_finite() {
            return Err(FitError::NonFinite);
        }

        let model = Self {
            order,
            constant: has_constant.then_some(mu),
            ar: ar.to_vec(),
            ma: ma.to_vec(),
            sigma2,
            aic,
            diffed,
            residuals,
            tails,
        };
        debug!(order = %model.order, aic, sigma2, "model fitted");
        Ok(model)
    }

    pub fn order(&self) -> ArimaOrder {
        self.order
    }

    pub fn constant(&self) -> Option<f64> {
        self.constant
    }

    pub fn ar(&self) -> &[f64] {
        &self.ar
    }

    pub fn ma(&self) -> &[f64] {
        &self.ma
    }

    pub fn sigma2(&self) -> f64 {
        self.sigma2
    }

    pub fn aic(&self) -> f64 {
        self.aic
    }

    /// Point predictions for the next `steps` periods on the undifferenced scale.
    /// Future shocks are taken as zero.
    pub fn forecast(&self, steps: usize) -> Result<Vec<f64>, FitError> {
        let mu = self.constant.unwrap_or(0.0);
        let n = self.diffed.len();
        let mut z: Vec<f64> = self.diffed.iter().map(|v| v - mu).collect();
        let mut e = self.residuals.clone();

        for _ in 0..steps {
            let t = z.len();
            let ar_part: f64 = self
                .ar
                .iter()
                .enumerate()
                .filter(|(i, _)| t > *i)
                .map(|(i, phi)| phi * z[t - 1 - i])
                .sum();
            let ma_part: f64 = self
                .ma
                .iter()
                .enumerate()
                .filter(|(j, _)| t > *j)
                .map(|(j, theta)| theta * e[t - 1 - j])
                .sum();
            z.push(ar_part + ma_part);
            e.push(0.0);
        }

        let mut level: Vec<f64> = z[n..].iter().map(|v| v + mu).collect();
        for &tail in self.tails.iter().rev() {
            let mut acc = tail;
            level = level
                .into_iter()
                .map(|v| {
                    acc += v;
                    acc
                })
                .collect();
        }

        if level.iter().all(|v| v.is_finite()) {
            Ok(level)
        } else {
            Err(FitError::NonFinite)
        }
    }
}

/// Bounds of the automatic order search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArimaSearch {
    pub max_p: usize,
    pub max_q: usize,
    /// Upper bound on `p + q`.
    pub max_order: usize,
    pub max_d: usize,
}

impl Default for ArimaSearch {
    fn default() -> Self {
        Self {
            max_p: 3,
            max_q: 3,
            max_order: 5,
            max_d: 2,
        }
    }
}

impl ArimaSearch {
    /// Every `(p, d, q)` the search will try for a given `d`.
    pub fn candidates(&self, d: usize) -> impl Iterator<Item = ArimaOrder> + '_ {
        (0..=self.max_p).flat_map(move |p| {
            (0..=self.max_q)
                .filter(move |q| p + q <= self.max_order)
                .map(move |q| ArimaOrder::new(p, d, q))
        })
    }

    /// Choose `d` by KPSS, then fit all candidate `(p, q)` and keep the
    /// lowest AIC.
    pub fn fit(&self, y: &[f64]) -> Result<ArimaModel, FitError> {
        check_series(y)?;
        let d = select_differencing(y, self.max_d);

        let mut best: Option<ArimaModel> = None;
        for order in self.candidates(d) {
            match ArimaModel::fit_conditioned(y, order, self.max_p) {
                Ok(model) => {
                    if best.as_ref().is_none_or(|b| model.aic < b.aic) {
                        best = Some(model);
                    }
                }
                Err(e) => debug!(%order, error = %e, "candidate rejected"),
            }
        }

        let best = best.ok_or(FitError::NoCandidate)?;
        debug!(order = %best.order, aic = best.aic, "order selected");
        Ok(best)
    }
}

fn check_series(y: &[f64]) -> Result<(), FitError> {
    if y.len() < 2 {
        return Err(FitError::TooShort);
    }
    if y.iter().any(|v| !v.is_finite()) {
        return Err(FitError::NonFinite);
    }
    let (lo, hi) = y
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if hi - lo <= 1e-9 * hi.abs().max(lo.abs()).max(1.0) {
        return Err(FitError::ConstantSeries);
    }
    Ok(())
}

fn mean(x: &[f64]) -> f64 {
    x.iter().sum::<f64>() / x.len() as f64
}

/// Difference `d` times, returning the result and the last value of each
/// level before differencing.
fn difference_n(y: &[f64], d: usize) -> (Vec<f64>, Vec<f64>) {
    let mut current = y.to_vec();
    let mut tails = Vec::with_capacity(d);
    for _ in 0..d {
        if let Some(&last) = current.last() {
            tails.push(last);
        }
        current = difference(&current);
    }
    (current, tails)
}

fn split_params(theta: &[f64], has_constant: bool, p: usize) -> (f64, &[f64], &[f64]) {
    let (mu, rest) = if has_constant {
        (theta[0], &theta[1..])
    } else {
        (0.0, theta)
    };
    let (ar, ma) = rest.split_at(p);
    (mu, ar, ma)
}

/// Conditional sum of squares: residuals before `p` are zero; squared
/// residuals are summed from `start`.
fn conditional_ss(w: &[f64], mu: f64, ar: &[f64], ma: &[f64], start: usize) -> (f64, Vec<f64>) {
    let n = w.len();
    let z: Vec<f64> = w.iter().map(|v| v - mu).collect();
    let mut e = vec![0.0; n];
    let mut css = 0.0;

    for t in ar.len()..n {
        let mut pred = 0.0;
        for (i, phi) in ar.iter().enumerate() {
            pred += phi * z[t - 1 - i];
        }
        for (j, theta) in ma.iter().enumerate() {
            if t > j {
                pred += theta * e[t - 1 - j];
            }
        }
        e[t] = z[t] - pred;
        if t >= start {
            css += e[t] * e[t];
        }
    }

    (css, e)
}

/// Hannan–Rissanen initial estimates on a zero-mean series: a long AR fit
/// supplies residual proxies, then z is regressed on its own lags and the
/// lagged residuals.
fn hannan_rissanen(z: &[f64], p: usize, q: usize) -> Result<(Vec<f64>, Vec<f64>), FitError> {
    if p == 0 && q == 0 {
        return Ok((Vec::new(), Vec::new()));
    }
    if q == 0 {
        return Ok((fit_ar(z, p)?, Vec::new()));
    }

    let n = z.len();
    let m = (p.max(q) + 2).min(n / 3);
    if m == 0 {
        return Err(FitError::TooShort);
    }
    let long_ar = fit_ar(z, m)?;

    let mut resid = vec![0.0; n];
    for t in m..n {
        let pred: f64 = long_ar.iter().enumerate().map(|(i, phi)| phi * z[t - 1 - i]).sum();
        resid[t] = z[t] - pred;
    }

    let first = (m + q).max(p);
    if n <= first {
        return Err(FitError::TooShort);
    }
    let rows: Vec<Vec<f64>> = (first..n)
        .map(|t| {
            (1..=p)
                .map(|i| z[t - i])
                .chain((1..=q).map(|j| resid[t - j]))
                .collect()
        })
        .collect();
    let targets: Vec<f64> = z[first..].to_vec();

    let mut coeffs = least_squares(&rows, &targets)?;
    let ma = coeffs.split_off(p);
    Ok((coeffs, ma))
}

/// Least-squares AR(m) coefficients on a zero-mean series.
fn fit_ar(z: &[f64], m: usize) -> Result<Vec<f64>, FitError> {
    if m == 0 {
        return Ok(Vec::new());
    }
    if z.len() <= m {
        return Err(FitError::TooShort);
    }
    let rows: Vec<Vec<f64>> = (m..z.len())
        .map(|t| (1..=m).map(|i| z[t - i]).collect())
        .collect();
    least_squares(&rows, &z[m..])
}

fn admissible(ar: &[f64], ma: &[f64]) -> bool {
    let neg_ma: Vec<f64> = ma.iter().map(|v| -v).collect();
    is_stationary(ar) && is_stationary(&neg_ma)
}

/// Whether `1 - Σ φᵢ zⁱ` has all roots outside the unit circle, checked by
/// stepping the coefficients down to partial autocorrelations.
fn is_stationary(coeffs: &[f64]) -> bool {
    let mut a = coeffs.to_vec();
    while let Some(&r) = a.last() {
        if !r.is_finite() || r.abs() >= 1.0 - UNIT_ROOT_MARGIN {
            return false;
        }
        let k = a.len();
        let denom = 1.0 - r * r;
        a = (0..k - 1).map(|j| (a[j] + r * a[k - 2 - j]) / denom).collect();
    }
    true
}
