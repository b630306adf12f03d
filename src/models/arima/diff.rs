//! Differencing utilities for ARIMA models.

use crate::validation::stationarity::{adf_test, AdfRegression};

/// Apply `d` rounds of first differencing.
pub fn difference(series: &[f64], d: usize) -> Vec<f64> {
    let mut result = series.to_vec();
    for _ in 0..d {
        if result.len() <= 1 {
            return Vec::new();
        }
        result = result.windows(2).map(|w| w[1] - w[0]).collect();
    }
    result
}

/// Last value of the series at each differencing level `0..d`.
///
/// These are the anchors [`integrate`] needs to undo `d` differences.
pub fn anchors(series: &[f64], d: usize) -> Vec<f64> {
    (0..d)
        .filter_map(|k| difference(series, k).last().copied())
        .collect()
}

/// Undo `d` differences of a forecast path, given the anchors of the history.
pub fn integrate(forecasts: &[f64], anchors: &[f64]) -> Vec<f64> {
    let mut result = forecasts.to_vec();
    for &anchor in anchors.iter().rev() {
        let mut level = anchor;
        for value in result.iter_mut() {
            level += *value;
            *value = level;
        }
    }
    result
}

/// Differencing order chosen by repeated ADF tests.
///
/// Differences until the test rejects a unit root at `significance`, the
/// series becomes too short to test, or `max_d` is reached.
pub fn ndiffs(series: &[f64], max_d: usize, significance: f64) -> usize {
    let mut current = series.to_vec();
    let mut d = 0;
    while d < max_d {
        match adf_test(&current, AdfRegression::Constant, None) {
            Ok(result) if !result.rejects_unit_root(significance) => {
                current = difference(&current, 1);
                d += 1;
            }
            _ => break,
        }
    }
    d
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn difference_orders() {
        let series = [1.0, 4.0, 9.0, 16.0, 25.0];
        assert_eq!(difference(&series, 0), series.to_vec());
        assert_eq!(difference(&series, 1), vec![3.0, 5.0, 7.0, 9.0]);
        assert_eq!(difference(&series, 2), vec![2.0, 2.0, 2.0]);
        assert!(difference(&[1.0], 2).is_empty());
    }

    #[test]
    fn integrate_inverts_difference() {
        let series = [3.0, 5.0, 4.0, 8.0, 13.0, 12.0, 20.0];
        for d in 0..=2 {
            let history = &series[..5];
            let future_diffs = &difference(&series, d)[5 - d..];
            let restored = integrate(future_diffs, &anchors(history, d));
            for (a, b) in restored.iter().zip(&series[5..]) {
                assert_relative_eq!(a, b, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn ndiffs_of_linear_growth_in_levels() {
        // Random-walk-like path: one difference leaves white noise.
        let mut state = 17u64;
        let mut level = 10.0;
        let series: Vec<f64> = (0..120)
            .map(|_| {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                level += ((state >> 33) as f64 / (1u64 << 31) as f64) - 0.5;
                level
            })
            .collect();

        let d = ndiffs(&series, 2, 0.05);
        assert!(d >= 1);
        assert_eq!(ndiffs(&series, 0, 0.05), 0);
    }
}
