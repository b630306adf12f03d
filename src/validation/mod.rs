//! Statistical diagnostics: stationarity, residual checks and hypothesis tests.
//!
//! # Example
//!
//! ```
//! use natality_forecast::validation::{welch_t_test, adf_test, AdfRegression};
//!
//! let before = [1.8, 1.9, 1.7];
//! let after = [1.6, 1.5, 1.55];
//! let t = welch_t_test(&before, &after).unwrap();
//! assert!(t.statistic > 0.0);
//!
//! let series = [1.0, 1.2, 0.9, 1.1, 1.0, 0.95, 1.05, 1.0, 1.1, 0.9];
//! let adf = adf_test(&series, AdfRegression::Constant, None).unwrap();
//! assert!((0.0..=1.0).contains(&adf.p_value));
//! ```

pub mod hypothesis;
pub mod stationarity;

pub use hypothesis::{split_by_year, welch_t_test, welch_t_test_with, Alternative, TTestResult};
pub use residual_tests::{ljung_box, LjungBoxResult};
pub use stationarity::{
    acf, adf_test, analyze, apply_differencing, default_nlags, difference, pacf, undifference,
    AdfRegression, AdfResult, CriticalValues, DifferencedAnalysis, DifferencingPolicy,
    StationarityReport,
};
