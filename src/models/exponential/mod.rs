//! Exponential smoothing models.
//!
//! - ETS (Error-Trend) state-space models without seasonality
//! - AutoETS (automatic model selection by AICc)

mod auto_ets;
mod ets;

pub use auto_ets::{AutoETS, AutoETSConfig};
pub use ets::{ETSSpec, ErrorType, FittedETS, TrendType, ETS, MIN_OBSERVATIONS};
