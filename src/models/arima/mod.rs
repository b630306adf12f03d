//! ARIMA (Autoregressive Integrated Moving Average) models.
//!
//! This module provides:
//! - ARIMA models with a fixed (p, d, q) order, fitted by conditional sum of squares
//! - AutoARIMA for automatic order selection by AICc
//! - Differencing and polynomial stability helpers

mod auto_arima;
pub mod diff;
mod model;
pub mod stability;

pub use auto_arima::{AutoARIMA, AutoARIMAConfig};
pub use diff::{difference, integrate, ndiffs};
pub use model::{ARIMASpec, FittedARIMA, ARIMA};
pub use stability::{is_invertible, is_stationary};
