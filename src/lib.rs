//! # natality-forecast
//!
//! Backtested forecasting of an annual births series.
//!
//! The crate tests the series for stationarity, fits naive, exponential
//! smoothing and ARIMA models on a training window, scores them on the
//! held-out tail, refits the winner on the full series and runs a Welch
//! t-test on a fertility-rate covariate.
//!
//! ```
//! use natality_forecast::prelude::*;
//! use natality_forecast::models::baseline::Naive;
//!
//! let births = TimeSeries::from_start(2000, (0..26).map(|i| 100.0 + i as f64).collect()).unwrap();
//! let parts = split(&births, 3).unwrap();
//!
//! let fitted = Naive::new().fit(&parts.train).unwrap();
//! let forecast = fitted.forecast(3).unwrap();
//! assert_eq!(forecast.point_estimates(), vec![122.0, 122.0, 122.0]);
//!
//! let accuracy = evaluate(&forecast, &parts.test).unwrap();
//! assert_eq!(accuracy.mae, 2.0);
//! ```

#![allow(clippy::upper_case_acronyms)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::needless_range_loop)]

pub mod config;
pub mod core;
pub mod data;
pub mod error;
pub mod evaluation;
pub mod models;
pub mod pipeline;
pub mod report;
pub mod utils;
pub mod validation;

pub use error::{ForecastError, Result};

pub mod prelude {
    pub use crate::config::PipelineConfig;
    pub use crate::core::{split, ForecastResult, Split, TimeSeries};
    pub use crate::error::{ForecastError, Result};
    pub use crate::evaluation::{compare, evaluate, AccuracyReport, Metric};
    pub use crate::models::{FittedModel, Forecaster};
    pub use crate::pipeline::{Pipeline, PipelineReport};
}
