//! Forecast accuracy evaluation and model ranking.

mod comparison;
mod metrics;

pub use comparison::{compare, ComparisonTable, ModelFailure, RankedModel, Ranking};
pub use metrics::{evaluate, mae, mape, rmse, AccuracyReport, Metric};
