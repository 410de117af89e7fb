//! Small descriptive-statistics helpers shared by the analyzers.
//!
//! Every helper is deterministic for a given input order and returns
//! `None` (or a documented default) instead of NaN on degenerate input.

use serde::{Deserialize, Serialize};

/// Arithmetic mean, `None` for an empty slice.
///
/// # Examples
///
/// ```
/// use gitvitals_metrics::stats::mean;
///
/// assert_eq!(mean(&[1.0, 2.0, 6.0]), Some(3.0));
/// assert_eq!(mean(&[]), None);
/// ```
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Median, `None` for an empty slice.
pub fn median(values: &[f64]) -> Option<f64> {
    percentile(values, 0.5)
}

/// Percentile `p` in `[0, 1]` by linear interpolation on rank `p·(n−1)`.
///
/// # Examples
///
/// ```
/// use gitvitals_metrics::stats::percentile;
///
/// let days = [1.0, 2.0, 3.0, 4.0, 100.0];
/// assert_eq!(percentile(&days, 0.5), Some(3.0));
/// assert_eq!(percentile(&days, 0.75), Some(4.0));
/// assert_eq!(percentile(&days, 0.0), Some(1.0));
/// ```
pub fn percentile(values: &[f64], p: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let rank = p.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let fraction = rank - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

/// Sample standard deviation (n−1 denominator); 0 for fewer than two values.
pub fn sample_std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let Some(m) = mean(values) else {
        return 0.0;
    };
    let sum_sq: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    (sum_sq / (values.len() - 1) as f64).sqrt()
}

/// Gini coefficient of non-negative weights, clamped to `[0, 1]`.
///
/// `G = (2·Σ i·w_i) / (n·Σw) − (n+1)/n` over weights sorted ascending with
/// 1-based `i`. One value or a zero sum gives 0.
///
/// # Examples
///
/// ```
/// use gitvitals_metrics::stats::gini;
///
/// assert_eq!(gini(&[5.0]), 0.0);
/// assert!((gini(&[1.0, 9.0]) - 0.4).abs() < 1e-12);
/// assert!(gini(&[3.0, 3.0, 3.0]).abs() < 1e-12);
/// ```
pub fn gini(weights: &[f64]) -> f64 {
    let n = weights.len();
    let total: f64 = weights.iter().sum();
    if n <= 1 || total <= 0.0 {
        return 0.0;
    }
    let mut sorted = weights.to_vec();
    sorted.sort_by(f64::total_cmp);

    let weighted: f64 = sorted
        .iter()
        .enumerate()
        .map(|(i, w)| (i + 1) as f64 * w)
        .sum();
    let n = n as f64;
    let g = (2.0 * weighted) / (n * total) - (n + 1.0) / n;
    g.clamp(0.0, 1.0)
}

/// Min-max normalize into `[0, 1]`; a constant series maps to all zeros.
///
/// # Examples
///
/// ```
/// use gitvitals_metrics::stats::min_max_normalize;
///
/// assert_eq!(min_max_normalize(&[2.0, 4.0, 6.0]), vec![0.0, 0.5, 1.0]);
/// assert_eq!(min_max_normalize(&[7.0, 7.0]), vec![0.0, 0.0]);
/// ```
pub fn min_max_normalize(values: &[f64]) -> Vec<f64> {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    if range.is_nan() || range <= 0.0 || range.is_infinite() {
        return vec![0.0; values.len()];
    }
    values.iter().map(|v| (v - min) / range).collect()
}

/// Ordinary least squares fit of `y` against `x = 0, 1, …, n−1`.
///
/// # Examples
///
/// ```
/// use gitvitals_metrics::stats::linear_regression;
///
/// let fit = linear_regression(&[1.0, 3.0, 5.0, 7.0]).unwrap();
/// assert!((fit.slope - 2.0).abs() < 1e-12);
/// assert!((fit.r_squared - 1.0).abs() < 1e-12);
/// assert!(fit.t_statistic.is_none()); // exact fit, zero standard error
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Regression {
    /// Change in `y` per step of `x`.
    pub slope: f64,
    /// Fitted `y` at `x = 0`.
    pub intercept: f64,
    /// Coefficient of determination; 0 when `y` is constant.
    pub r_squared: f64,
    /// Standard error of the slope with n−2 degrees of freedom.
    pub std_error: f64,
    /// `slope / std_error`, absent when the standard error is zero.
    pub t_statistic: Option<f64>,
}

impl Regression {
    /// Predicted `y` at `x`.
    pub fn predict(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }

    /// Whether residuals are (numerically) zero.
    pub fn is_exact(&self) -> bool {
        self.std_error <= f64::EPSILON
    }
}

/// Fit a line through `ys`; `None` for fewer than three points.
pub fn linear_regression(ys: &[f64]) -> Option<Regression> {
    let n = ys.len();
    if n < 3 {
        return None;
    }
    let nf = n as f64;
    let x_mean = (nf - 1.0) / 2.0;
    let y_mean = ys.iter().sum::<f64>() / nf;

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    let mut syy = 0.0;
    for (i, y) in ys.iter().enumerate() {
        let dx = i as f64 - x_mean;
        let dy = y - y_mean;
        sxx += dx * dx;
        sxy += dx * dy;
        syy += dy * dy;
    }

    let slope = sxy / sxx;
    let intercept = y_mean - slope * x_mean;

    let sse: f64 = ys
        .iter()
        .enumerate()
        .map(|(i, y)| (y - (intercept + slope * i as f64)).powi(2))
        .sum();
    let r_squared = if syy > 0.0 {
        (1.0 - sse / syy).clamp(0.0, 1.0)
    } else {
        0.0
    };
    // residual noise below this is float error
    let sse = if sse <= syy * 1e-18 { 0.0 } else { sse };
    let std_error = (sse / (nf - 2.0)).sqrt() / sxx.sqrt();
    let t_statistic = if std_error > 0.0 {
        Some(slope / std_error)
    } else {
        None
    };

    Some(Regression {
        slope,
        intercept,
        r_squared,
        std_error,
        t_statistic,
    })
}
