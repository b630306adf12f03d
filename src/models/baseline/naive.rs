//! Naive forecasting model.
//!
//! The naive method forecasts the last observed value for all future periods.

use crate::core::{ForecastResult, TimeSeries};
use crate::error::{ForecastError, Result};
use crate::models::traits::{check_request, FittedModel, Forecaster};
use crate::utils::stats::{interval_z, rms};

/// Naive forecaster that repeats the last value.
#[derive(Debug, Clone, Copy, Default)]
pub struct Naive;

impl Naive {
    pub fn new() -> Self {
        Self
    }

    /// Fit on `train`, which needs at least two observations.
    pub fn fit_series(&self, train: &TimeSeries) -> Result<FittedNaive> {
        let values = train.values();
        let (last_value, last_period) = match (train.last_value(), train.last_period()) {
            (Some(v), Some(p)) if values.len() >= 2 => (v, p),
            _ => {
                return Err(ForecastError::model_fit(
                    "Naive",
                    values.len(),
                    "at least 2 observations are required",
                ))
            }
        };

        // Residuals are first differences (y[t] - y[t-1])
        let residuals: Vec<f64> = values.windows(2).map(|w| w[1] - w[0]).collect();
        let sigma = rms(&residuals);

        Ok(FittedNaive {
            last_value,
            last_period,
            sigma,
            residuals,
            n: values.len(),
        })
    }
}

impl Forecaster for Naive {
    fn fit(&self, train: &TimeSeries) -> Result<Box<dyn FittedModel>> {
        Ok(Box::new(self.fit_series(train)?))
    }

    fn name(&self) -> &str {
        "Naive"
    }
}

/// Fitted naive model.
#[derive(Debug, Clone, PartialEq)]
pub struct FittedNaive {
    last_value: f64,
    last_period: i32,
    sigma: f64,
    residuals: Vec<f64>,
    n: usize,
}

impl FittedNaive {
    pub fn last_value(&self) -> f64 {
        self.last_value
    }

    /// Root mean square of the first differences.
    pub fn sigma(&self) -> f64 {
        self.sigma
    }
}

impl FittedModel for FittedNaive {
    fn forecast_with_level(&self, horizon: usize, level: f64) -> Result<ForecastResult> {
        check_request(horizon, level, self.n)?;
        let z = interval_z(level);

        let point = vec![self.last_value; horizon];
        // Interval widens with sqrt(horizon)
        let (lower, upper) = (1..=horizon)
            .map(|h| {
                let half = z * self.sigma * (h as f64).sqrt();
                (self.last_value - half, self.last_value + half)
            })
            .unzip();

        ForecastResult::new(
            self.description(),
            level,
            self.last_period + 1,
            point,
            lower,
            upper,
        )
    }

    fn description(&self) -> String {
        "Naive".to_string()
    }

    fn residuals(&self) -> &[f64] {
        &self.residuals
    }

    fn n_params(&self) -> usize {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn series(values: Vec<f64>) -> TimeSeries {
        TimeSeries::from_start(2010, values).unwrap()
    }

    #[test]
    fn naive_repeats_last_value() {
        let train = series(vec![
            100.0, 102.0, 99.0, 105.0, 110.0, 108.0, 115.0, 120.0, 118.0, 125.0,
        ]);
        let fc = Naive::new().fit_series(&train).unwrap().forecast(3).unwrap();

        assert_eq!(fc.point_estimates(), vec![125.0, 125.0, 125.0]);
        assert_eq!(fc.periods(), vec![2020, 2021, 2022]);
        let width = |h: usize| fc.points()[h].upper - fc.points()[h].lower;
        assert!(width(0) < width(2));
    }

    #[test]
    fn naive_residuals_are_first_differences() {
        let fitted = Naive::new()
            .fit_series(&series(vec![1.0, 3.0, 6.0, 10.0, 15.0]))
            .unwrap();

        assert_eq!(fitted.residuals(), &[2.0, 3.0, 4.0, 5.0]);
        assert_relative_eq!(fitted.sigma(), (54.0f64 / 4.0).sqrt());
    }

    #[test]
    fn naive_intervals_widen_with_sqrt_horizon() {
        let fitted = Naive::new()
            .fit_series(&series(vec![10.0, 12.0, 10.0, 12.0, 10.0]))
            .unwrap();
        let fc = fitted.forecast_with_level(4, 0.95).unwrap();

        let z = interval_z(0.95);
        for (i, p) in fc.points().iter().enumerate() {
            let half = z * 2.0 * ((i + 1) as f64).sqrt();
            assert_relative_eq!(p.upper - p.point, half, epsilon = 1e-9);
            assert_relative_eq!(p.point - p.lower, half, epsilon = 1e-9);
        }
    }

    #[test]
    fn naive_needs_two_observations() {
        let result = Naive::new().fit_series(&series(vec![5.0]));
        assert!(matches!(result, Err(ForecastError::ModelFit { len: 1, .. })));
    }

    #[test]
    fn naive_rejects_zero_horizon() {
        let fitted = Naive::new().fit_series(&series(vec![1.0, 2.0])).unwrap();
        assert!(matches!(
            fitted.forecast(0),
            Err(ForecastError::InvalidHorizon { horizon: 0, len: 2 })
        ));
    }

    #[test]
    fn naive_constant_series_has_degenerate_interval() {
        let fc = Naive::new()
            .fit_series(&series(vec![7.0, 7.0, 7.0]))
            .unwrap()
            .forecast(2)
            .unwrap();
        assert_eq!(fc.lower(), vec![7.0, 7.0]);
        assert_eq!(fc.upper(), vec![7.0, 7.0]);
    }
}
