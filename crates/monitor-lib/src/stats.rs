//! Statistical primitives for time-series analysis
//!
//! Pure functions with no shared state: moving averages, dispersion,
//! exponential smoothing, least-squares regression and a heuristic
//! confidence score. Callers own ordering; these functions only see values.

use crate::error::{MonitorError, Result};

/// Arithmetic mean, 0 for an empty slice
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Trailing moving average with the same length as the input
///
/// Indices before the first full window are back-filled with the first
/// computable average so the output stays aligned index-for-index with
/// `values`. When `values` is shorter than `window` the input is returned
/// unchanged.
pub fn moving_average(values: &[f64], window: usize) -> Vec<f64> {
    if window == 0 || values.len() < window {
        return values.to_vec();
    }

    let mut averages = Vec::with_capacity(values.len());
    let mut sum: f64 = values[..window].iter().sum();
    let first = sum / window as f64;

    averages.resize(window - 1, first);
    averages.push(first);

    for i in window..values.len() {
        sum += values[i] - values[i - window];
        averages.push(sum / window as f64);
    }

    averages
}

/// Population standard deviation; 0 for fewer than two values
pub fn standard_deviation(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean(values);
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Single exponential smoothing
///
/// `alpha` is clamped to [0, 1] and weights the newest observation. The
/// first output equals the first input.
pub fn exponential_smoothing(values: &[f64], alpha: f64) -> Vec<f64> {
    let alpha = alpha.clamp(0.0, 1.0);
    let mut smoothed = Vec::with_capacity(values.len());

    let mut iter = values.iter();
    let Some(&first) = iter.next() else {
        return smoothed;
    };
    smoothed.push(first);

    let mut previous = first;
    for &actual in iter {
        previous = alpha * actual + (1.0 - alpha) * previous;
        smoothed.push(previous);
    }

    smoothed
}

/// Ordinary least-squares fit `y = slope * x + intercept`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Regression {
    pub slope: f64,
    pub intercept: f64,
}

impl Regression {
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }

    /// Coefficient of determination of this fit over the given points
    ///
    /// Returns 0 when `ys` has no variance.
    pub fn r_squared(&self, xs: &[f64], ys: &[f64]) -> f64 {
        let mean_y = mean(ys);
        let mut ss_res = 0.0;
        let mut ss_tot = 0.0;

        for (x, y) in xs.iter().zip(ys) {
            ss_res += (y - self.predict(*x)).powi(2);
            ss_tot += (y - mean_y).powi(2);
        }

        if ss_tot.abs() < f64::EPSILON {
            return 0.0;
        }
        1.0 - ss_res / ss_tot
    }
}

/// Fit a line through `(xs[i], ys[i])`
///
/// Fails with `InvalidInput` on empty or mismatched sequences and on
/// non-finite values. Points with no spread in `x` give a flat line through
/// the mean of `y`.
pub fn linear_regression(xs: &[f64], ys: &[f64]) -> Result<Regression> {
    if xs.len() != ys.len() {
        return Err(MonitorError::invalid(format!(
            "regression inputs differ in length: {} xs vs {} ys",
            xs.len(),
            ys.len()
        )));
    }
    if xs.is_empty() {
        return Err(MonitorError::invalid("regression requires at least one point"));
    }
    ensure_finite(xs, "regression xs")?;
    ensure_finite(ys, "regression ys")?;

    let mean_x = mean(xs);
    let mean_y = mean(ys);

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        sxy += dx * (y - mean_y);
        sxx += dx * dx;
    }

    if sxx.abs() < f64::EPSILON {
        return Ok(Regression {
            slope: 0.0,
            intercept: mean_y,
        });
    }

    let slope = sxy / sxx;
    Ok(Regression {
        slope,
        intercept: mean_y - slope * mean_x,
    })
}

/// Heuristic confidence score in [0, 100]
///
/// `clamp(100 - 10 * error, 0, 100) * min(1, log10(samples) / 2)`. Lower
/// error and more samples both raise the score. This is a ranking aid, not a
/// statistical confidence interval.
pub fn confidence_level(prediction_error: f64, sample_count: usize) -> f64 {
    if sample_count == 0 || !prediction_error.is_finite() {
        return 0.0;
    }
    let error_score = (100.0 - 10.0 * prediction_error.abs()).clamp(0.0, 100.0);
    let sample_factor = ((sample_count as f64).log10() / 2.0).clamp(0.0, 1.0);
    (error_score * sample_factor).clamp(0.0, 100.0)
}

/// Reject NaN and infinities with a descriptive `InvalidInput`
pub fn ensure_finite(values: &[f64], what: &str) -> Result<()> {
    match values.iter().position(|v| !v.is_finite()) {
        Some(idx) => Err(MonitorError::invalid(format!(
            "{} contains a non-finite value at index {}",
            what, idx
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_moving_average_preserves_length() {
        let values: Vec<f64> = (1..=12).map(|v| v as f64).collect();
        for window in 1..=values.len() {
            assert_eq!(moving_average(&values, window).len(), values.len());
        }
    }

    #[test]
    fn test_moving_average_backfills_leading_indices() {
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let averages = moving_average(&values, 3);
        assert_eq!(averages, vec![2.0, 2.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_moving_average_short_input_unchanged() {
        let values = vec![4.0, 8.0];
        assert_eq!(moving_average(&values, 5), values);
    }

    #[test]
    fn test_standard_deviation_degenerate_inputs() {
        assert_eq!(standard_deviation(&[]), 0.0);
        assert_eq!(standard_deviation(&[42.0]), 0.0);
        assert_eq!(standard_deviation(&[-3.5]), 0.0);
    }

    #[test]
    fn test_standard_deviation_population() {
        let values = vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((standard_deviation(&values) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_exponential_smoothing_alpha_one_is_identity() {
        let values = vec![3.0, 9.0, 1.0, 7.5];
        assert_eq!(exponential_smoothing(&values, 1.0), values);
    }

    #[test]
    fn test_exponential_smoothing_empty() {
        assert!(exponential_smoothing(&[], 0.3).is_empty());
    }

    #[test]
    fn test_exponential_smoothing_clamps_alpha() {
        let values = vec![10.0, 20.0];
        assert_eq!(exponential_smoothing(&values, 4.0), values);
        assert_eq!(exponential_smoothing(&values, -1.0), vec![10.0, 10.0]);
    }

    #[test]
    fn test_exponential_smoothing_weights_newest() {
        let smoothed = exponential_smoothing(&[100.0, 200.0], 0.3);
        assert!((smoothed[1] - 130.0).abs() < 1e-9);
    }

    #[test]
    fn test_linear_regression_exact_line() {
        let xs: Vec<f64> = (0..10).map(|x| x as f64).collect();
        let ys: Vec<f64> = xs.iter().map(|x| 2.0 * x + 3.0).collect();

        let fit = linear_regression(&xs, &ys).unwrap();
        assert!((fit.slope - 2.0).abs() < 1e-9);
        assert!((fit.intercept - 3.0).abs() < 1e-9);

        let residual: f64 = xs
            .iter()
            .zip(&ys)
            .map(|(x, y)| (y - fit.predict(*x)).abs())
            .sum();
        assert!(residual < 1e-9);
        assert!((fit.r_squared(&xs, &ys) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_linear_regression_rejects_bad_input() {
        assert!(matches!(
            linear_regression(&[1.0, 2.0], &[1.0]),
            Err(MonitorError::InvalidInput(_))
        ));
        assert!(matches!(
            linear_regression(&[], &[]),
            Err(MonitorError::InvalidInput(_))
        ));
        assert!(matches!(
            linear_regression(&[1.0, f64::NAN], &[1.0, 2.0]),
            Err(MonitorError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_linear_regression_vertical_spread_is_flat() {
        let fit = linear_regression(&[5.0, 5.0, 5.0], &[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(fit.slope, 0.0);
        assert!((fit.intercept - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_confidence_level_bounds() {
        assert_eq!(confidence_level(0.0, 100), 100.0);
        assert_eq!(confidence_level(0.0, 1), 0.0);
        assert_eq!(confidence_level(0.0, 0), 0.0);
        assert_eq!(confidence_level(50.0, 1000), 0.0);
        assert_eq!(confidence_level(f64::INFINITY, 1000), 0.0);
    }

    #[test]
    fn test_confidence_level_grows_with_samples() {
        let few = confidence_level(1.0, 5);
        let many = confidence_level(1.0, 50);
        assert!(few < many);
        assert!((confidence_level(1.0, 10) - 45.0).abs() < 1e-9);
    }
}
