//! Forecasting models.
//!
//! Every model implements [`Forecaster`]; fitting returns a boxed
//! [`FittedModel`] that forecasts without access to the training data.

mod traits;

pub mod arima;
pub mod baseline;
pub mod exponential;

pub use traits::{
    BoxedForecaster, CandidateScore, FittedModel, Forecaster, ModelRegistry, ModelSpec,
    DEFAULT_LEVEL,
};
