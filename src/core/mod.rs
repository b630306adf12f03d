//! Core data structures for year-indexed forecasting.

mod forecast;
mod time_series;

pub use forecast::{ForecastPoint, ForecastResult};
pub use time_series::{split, Split, TimeSeries};
