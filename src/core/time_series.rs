//! Year-indexed time series and the train/test split.

use crate::error::{ForecastError, Result};
use serde::Serialize;

/// An annual series: contiguous integer periods with finite values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeries {
    periods: Vec<i32>,
    values: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

impl TimeSeries {
    /// Create a series from explicit periods and values.
    ///
    /// Periods must increase by exactly one and every value must be finite.
    pub fn new(periods: Vec<i32>, values: Vec<f64>) -> Result<Self> {
        if periods.len() != values.len() {
            return Err(ForecastError::Data(format!(
                "{} periods but {} values",
                periods.len(),
                values.len()
            )));
        }

        for w in periods.windows(2) {
            if w[1] != w[0] + 1 {
                return Err(ForecastError::Data(format!(
                    "periods must increase by one: {} followed by {}",
                    w[0], w[1]
                )));
            }
        }

        if let Some((i, v)) = values.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(ForecastError::Data(format!(
                "non-finite value {} in period {}",
                v, periods[i]
            )));
        }

        Ok(Self {
            periods,
            values,
            name: None,
        })
    }

    /// Create a series whose first observation is in `start`.
    pub fn from_start(start: i32, values: Vec<f64>) -> Result<Self> {
        let periods = (0..values.len()).map(|i| start + i as i32).collect();
        Self::new(periods, values)
    }

    /// Attach a display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn periods(&self) -> &[i32] {
        &self.periods
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn first_period(&self) -> Option<i32> {
        self.periods.first().copied()
    }

    pub fn last_period(&self) -> Option<i32> {
        self.periods.last().copied()
    }

    pub fn last_value(&self) -> Option<f64> {
        self.values.last().copied()
    }

    /// Iterate over `(period, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (i32, f64)> + '_ {
        self.periods.iter().copied().zip(self.values.iter().copied())
    }

    /// Contiguous sub-series `[start, end)` by position.
    pub fn slice(&self, start: usize, end: usize) -> TimeSeries {
        let end = end.min(self.len());
        let start = start.min(end);
        TimeSeries {
            periods: self.periods[start..end].to_vec(),
            values: self.values[start..end].to_vec(),
            name: self.name.clone(),
        }
    }

    /// Observations with period strictly before `year`.
    pub fn before(&self, year: i32) -> TimeSeries {
        let cut = self.periods.partition_point(|&p| p < year);
        self.slice(0, cut)
    }

    /// Observations with period `year` or later.
    pub fn from_period(&self, year: i32) -> TimeSeries {
        let cut = self.periods.partition_point(|&p| p < year);
        self.slice(cut, self.len())
    }
}

/// A series partitioned into a training prefix and a held-out tail.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Split {
    pub train: TimeSeries,
    pub test: TimeSeries,
}

/// Hold out the final `horizon` observations as the test set.
pub fn split(series: &TimeSeries, horizon: usize) -> Result<Split> {
    let n = series.len();
    if horizon == 0 || n <= horizon {
        return Err(ForecastError::InvalidHorizon { horizon, len: n });
    }

    let cut = n - horizon;
    Ok(Split {
        train: series.slice(0, cut),
        test: series.slice(cut, n),
    })
}
