//! Accuracy metrics for forecast evaluation.

use crate::core::{ForecastResult, TimeSeries};
use crate::error::{ForecastError, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Accuracy metric used to rank models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// Root mean squared error
    #[default]
    #[serde(alias = "RMSE")]
    Rmse,
    /// Mean absolute error
    #[serde(alias = "MAE")]
    Mae,
    /// Mean absolute percentage error
    #[serde(alias = "MAPE")]
    Mape,
}

impl Metric {
    /// Tie-break priority order.
    pub const PRIORITY: [Metric; 3] = [Metric::Rmse, Metric::Mae, Metric::Mape];
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Metric::Rmse => "RMSE",
            Metric::Mae => "MAE",
            Metric::Mape => "MAPE",
        })
    }
}

impl FromStr for Metric {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rmse" => Ok(Metric::Rmse),
            "mae" => Ok(Metric::Mae),
            "mape" => Ok(Metric::Mape),
            other => Err(ForecastError::InvalidParameter(format!(
                "unknown metric '{}', expected RMSE, MAE or MAPE",
                other
            ))),
        }
    }
}

/// Accuracy of one model's forecast against held-out actuals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AccuracyReport {
    /// Root Mean Squared Error
    pub rmse: f64,
    /// Mean Absolute Error
    pub mae: f64,
    /// Mean Absolute Percentage Error, in percent
    pub mape: f64,
}

impl AccuracyReport {
    pub fn get(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Rmse => self.rmse,
            Metric::Mae => self.mae,
            Metric::Mape => self.mape,
        }
    }
}

/// Score `forecast` against `actual`.
///
/// # Errors
/// - `PeriodMismatch` when the periods are not identical
/// - `DivisionByZero` when an actual value is zero (MAPE undefined)
///
/// # Example
///
/// ```
/// use natality_forecast::core::{ForecastResult, TimeSeries};
/// use natality_forecast::evaluation::evaluate;
///
/// let actual = TimeSeries::from_start(2020, vec![100.0, 200.0]).unwrap();
/// let forecast = ForecastResult::new(
///     "demo", 0.95, 2020,
///     vec![110.0, 190.0], vec![90.0, 170.0], vec![130.0, 210.0],
/// ).unwrap();
///
/// let report = evaluate(&forecast, &actual).unwrap();
/// assert_eq!(report.mae, 10.0);
/// assert!((report.mape - 7.5).abs() < 1e-9);
/// ```
pub fn evaluate(forecast: &ForecastResult, actual: &TimeSeries) -> Result<AccuracyReport> {
    let forecast_periods = forecast.periods();
    if forecast_periods != actual.periods() {
        return Err(ForecastError::PeriodMismatch {
            forecast: forecast_periods,
            actual: actual.periods().to_vec(),
        });
    }
    if actual.is_empty() {
        return Err(ForecastError::InsufficientData {
            operation: "evaluation",
            needed: 1,
            got: 0,
        });
    }
    if let Some((period, _)) = actual.iter().find(|&(_, y)| y == 0.0) {
        return Err(ForecastError::DivisionByZero { period });
    }

    let predicted = forecast.point_estimates();
    let actual = actual.values();
    Ok(AccuracyReport {
        rmse: rmse(actual, &predicted),
        mae: mae(actual, &predicted),
        mape: mape(actual, &predicted),
    })
}

/// Calculate MAE between two slices.
pub fn mae(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.len() != predicted.len() || actual.is_empty() {
        return f64::NAN;
    }
    actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).abs())
        .sum::<f64>()
        / actual.len() as f64
}

/// Calculate RMSE between two slices.
pub fn rmse(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.len() != predicted.len() || actual.is_empty() {
        return f64::NAN;
    }
    let mse = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).powi(2))
        .sum::<f64>()
        / actual.len() as f64;
    mse.sqrt()
}

/// Calculate MAPE in percent. Infinite when an actual value is zero.
pub fn mape(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.len() != predicted.len() || actual.is_empty() {
        return f64::NAN;
    }
    let sum: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| ((a - p) / a).abs())
        .sum();
    100.0 * sum / actual.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn forecast(first: i32, point: Vec<f64>) -> ForecastResult {
        let lower = point.iter().map(|p| p - 1.0).collect();
        let upper = point.iter().map(|p| p + 1.0).collect();
        ForecastResult::new("test", 0.95, first, point, lower, upper).unwrap()
    }

    #[test]
    fn metric_values() {
        let actual = TimeSeries::from_start(2010, vec![100.0, 200.0, 400.0]).unwrap();
        let report = evaluate(&forecast(2010, vec![110.0, 180.0, 400.0]), &actual).unwrap();

        assert_relative_eq!(report.mae, 10.0, epsilon = 1e-12);
        assert_relative_eq!(report.rmse, (500.0f64 / 3.0).sqrt(), epsilon = 1e-12);
        assert_relative_eq!(report.mape, 100.0 * 0.2 / 3.0, epsilon = 1e-12);
        assert_eq!(report.get(Metric::Mae), report.mae);
    }

    #[test]
    fn perfect_forecast_scores_zero() {
        let actual = TimeSeries::from_start(2010, vec![5.0, 6.0]).unwrap();
        let report = evaluate(&forecast(2010, vec![5.0, 6.0]), &actual).unwrap();
        assert_eq!(report.rmse, 0.0);
        assert_eq!(report.mape, 0.0);
    }

    #[test]
    fn zero_actual_is_division_by_zero() {
        let actual = TimeSeries::from_start(2010, vec![5.0, 0.0, 6.0]).unwrap();
        let err = evaluate(&forecast(2010, vec![5.0, 1.0, 6.0]), &actual).unwrap_err();
        assert_eq!(err, ForecastError::DivisionByZero { period: 2011 });
    }

    #[test]
    fn period_mismatch() {
        let actual = TimeSeries::from_start(2010, vec![5.0, 6.0]).unwrap();
        let err = evaluate(&forecast(2011, vec![5.0, 6.0]), &actual).unwrap_err();
        assert!(matches!(err, ForecastError::PeriodMismatch { .. }));

        let err = evaluate(&forecast(2010, vec![5.0]), &actual).unwrap_err();
        assert!(matches!(err, ForecastError::PeriodMismatch { .. }));
    }

    #[test]
    fn metric_parsing_and_display() {
        assert_eq!("RMSE".parse::<Metric>().unwrap(), Metric::Rmse);
        assert_eq!(" mape ".parse::<Metric>().unwrap(), Metric::Mape);
        assert!("smape".parse::<Metric>().is_err());
        assert_eq!(Metric::Mae.to_string(), "MAE");
        assert_eq!(Metric::default(), Metric::Rmse);
    }

    #[test]
    fn slice_helpers_reject_mismatched_lengths() {
        assert!(mae(&[1.0], &[1.0, 2.0]).is_nan());
        assert!(rmse(&[], &[]).is_nan());
    }
}
