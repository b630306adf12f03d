//! Error types for the natality-forecast pipeline.

use std::fmt;
use thiserror::Error;

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, ForecastError>;

/// Pipeline stage in which an error surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Load,
    Stationarity,
    Split,
    Fit,
    Evaluate,
    Refit,
    Hypothesis,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Load => "load",
            Stage::Stationarity => "stationarity",
            Stage::Split => "split",
            Stage::Fit => "fit",
            Stage::Evaluate => "evaluate",
            Stage::Refit => "refit",
            Stage::Hypothesis => "hypothesis",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while loading, analysing or forecasting a series.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ForecastError {
    /// Malformed or missing input data.
    #[error("data error: {0}")]
    Data(String),

    /// Series too short for the requested operation.
    #[error("insufficient data for {operation}: need at least {needed}, got {got}")]
    InsufficientData {
        operation: &'static str,
        needed: usize,
        got: usize,
    },

    /// Horizon is zero or not shorter than the series.
    #[error("invalid horizon {horizon} for series of length {len}")]
    InvalidHorizon { horizon: usize, len: usize },

    /// Model could not be fitted (too little data, optimizer failure, no valid order).
    #[error("{model} failed to fit on {len} observations: {reason}")]
    ModelFit {
        model: String,
        len: usize,
        reason: String,
    },

    /// No candidate order satisfied stationarity and invertibility.
    #[error("{model}: no candidate on {len} observations is stationary and invertible")]
    NonInvertibleModel { model: String, len: usize },

    /// Forecast periods differ from the periods of the actual values.
    #[error("forecast periods {forecast:?} do not match actual periods {actual:?}")]
    PeriodMismatch { forecast: Vec<i32>, actual: Vec<i32> },

    /// MAPE is undefined because an actual value is zero.
    #[error("percentage error undefined: actual value is zero in period {period}")]
    DivisionByZero { period: i32 },

    /// Invalid parameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Numerical problem during computation.
    #[error("computation error: {0}")]
    Computation(String),

    /// Filesystem or reader failure.
    #[error("i/o error: {0}")]
    Io(String),

    /// An error annotated with the stage and input shape that produced it.
    #[error("{stage} stage failed (series length {len}, horizon {horizon}): {source}")]
    Stage {
        stage: Stage,
        len: usize,
        horizon: usize,
        #[source]
        source: Box<ForecastError>,
    },
}

impl ForecastError {
    /// Attach the failing stage and the input shape.
    pub fn at_stage(self, stage: Stage, len: usize, horizon: usize) -> Self {
        ForecastError::Stage {
            stage,
            len,
            horizon,
            source: Box::new(self),
        }
    }

    /// Innermost error, unwrapping stage annotations.
    pub fn root(&self) -> &ForecastError {
        match self {
            ForecastError::Stage { source, .. } => source.root(),
            other => other,
        }
    }

    pub(crate) fn model_fit(model: impl Into<String>, len: usize, reason: impl Into<String>) -> Self {
        ForecastError::ModelFit {
            model: model.into(),
            len,
            reason: reason.into(),
        }
    }
}

impl From<std::io::Error> for ForecastError {
    fn from(err: std::io::Error) -> Self {
        ForecastError::Io(err.to_string())
    }
}

impl From<csv::Error> for ForecastError {
    fn from(err: csv::Error) -> Self {
        ForecastError::Data(format!("malformed CSV: {err}"))
    }
}
