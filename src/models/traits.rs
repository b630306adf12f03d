//! Forecaster traits shared by every model, and the model registry.

use crate::config::PipelineConfig;
use crate::core::{ForecastResult, TimeSeries};
use crate::error::{ForecastError, Result};
use crate::models::arima::AutoARIMA;
use crate::models::baseline::Naive;
use crate::models::exponential::AutoETS;
use rayon::prelude::*;
use serde::Serialize;
use std::fmt;

/// Interval coverage used by [`FittedModel::forecast`].
pub const DEFAULT_LEVEL: f64 = 0.95;

/// A model that can be fitted to a training series.
///
/// This trait is object-safe and can be used with `Box<dyn Forecaster>`.
/// Fitting never mutates the forecaster; it returns a separate fitted state.
pub trait Forecaster: Send + Sync {
    /// Fit the model to `train`.
    fn fit(&self, train: &TimeSeries) -> Result<Box<dyn FittedModel>>;

    /// Identifier used in comparison tables.
    fn name(&self) -> &str;
}

/// Fitted model state able to forecast any horizon without the training data.
pub trait FittedModel: Send + Sync + fmt::Debug {
    /// Forecast `horizon` periods with central intervals of coverage `level`.
    fn forecast_with_level(&self, horizon: usize, level: f64) -> Result<ForecastResult>;

    /// Forecast `horizon` periods with 95% intervals.
    fn forecast(&self, horizon: usize) -> Result<ForecastResult> {
        self.forecast_with_level(horizon, DEFAULT_LEVEL)
    }

    /// Human-readable description, e.g. `ETS(A,Ad,N)`.
    fn description(&self) -> String;

    /// In-sample one-step residuals.
    fn residuals(&self) -> &[f64];

    /// Corrected Akaike information criterion, when the model has a likelihood.
    fn aicc(&self) -> Option<f64> {
        None
    }

    /// Number of estimated parameters.
    fn n_params(&self) -> usize;
}

/// Type alias for boxed forecaster trait objects.
///
/// # Example
///
/// ```
/// use natality_forecast::models::{BoxedForecaster, Forecaster};
/// use natality_forecast::models::baseline::Naive;
///
/// let model: BoxedForecaster = Box::new(Naive::new());
/// assert_eq!(model.name(), "Naive");
/// ```
pub type BoxedForecaster = Box<dyn Forecaster>;

/// Validate a forecast request against a model trained on `len` observations.
pub(crate) fn check_request(horizon: usize, level: f64, len: usize) -> Result<()> {
    if horizon == 0 {
        return Err(ForecastError::InvalidHorizon { horizon, len });
    }
    if !(level > 0.0 && level < 1.0) {
        return Err(ForecastError::InvalidParameter(format!(
            "interval level must lie in (0, 1), got {}",
            level
        )));
    }
    Ok(())
}

/// AICc from a log-likelihood with `k` parameters on `n` observations.
///
/// `None` when `n - k - 1 <= 0`, where the correction is undefined.
pub(crate) fn aicc(log_likelihood: f64, k: usize, n: usize) -> Option<f64> {
    if n <= k + 1 {
        return None;
    }
    let k = k as f64;
    let aic = -2.0 * log_likelihood + 2.0 * k;
    Some(aic + 2.0 * k * (k + 1.0) / (n as f64 - k - 1.0))
}

/// One scored candidate from an order search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateScore {
    /// Candidate description, e.g. `ARIMA(1,1,0)`.
    pub label: String,
    /// AICc, when the candidate was fitted.
    pub aicc: Option<f64>,
    /// Why the candidate was rejected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejected: Option<String>,
}

/// Index of the smallest finite score; ties go to the earliest candidate.
pub(crate) fn argmin_first(scores: impl IntoIterator<Item = Option<f64>>) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, score) in scores.into_iter().enumerate() {
        if let Some(s) = score.filter(|s| s.is_finite()) {
            if best.map_or(true, |(_, b)| s < b) {
                best = Some((i, s));
            }
        }
    }
    best.map(|(i, _)| i)
}

/// Fit every candidate, in parallel when requested. Output order matches input order.
pub(crate) fn fit_candidates<C, R, F>(candidates: &[C], parallel: bool, fit: F) -> Vec<R>
where
    C: Sync,
    R: Send,
    F: Fn(&C) -> R + Sync + Send,
{
    if parallel {
        candidates.par_iter().map(&fit).collect()
    } else {
        candidates.iter().map(&fit).collect()
    }
}

/// Named factory for a forecaster.
///
/// # Example
///
/// ```
/// use natality_forecast::models::{ModelSpec, BoxedForecaster};
/// use natality_forecast::models::baseline::Naive;
///
/// let spec = ModelSpec::new("Naive", || Box::new(Naive::new()));
/// assert_eq!(spec.create().name(), "Naive");
/// ```
pub struct ModelSpec {
    /// Display name of the model
    pub name: &'static str,
    factory: Box<dyn Fn() -> BoxedForecaster + Send + Sync>,
}

impl ModelSpec {
    pub fn new<F>(name: &'static str, factory: F) -> Self
    where
        F: Fn() -> BoxedForecaster + Send + Sync + 'static,
    {
        Self {
            name,
            factory: Box::new(factory),
        }
    }

    /// Create a new model instance.
    pub fn create(&self) -> BoxedForecaster {
        (self.factory)()
    }
}

impl fmt::Debug for ModelSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelSpec").field("name", &self.name).finish()
    }
}

/// Ordered collection of model specifications compared by the pipeline.
///
/// # Example
///
/// ```
/// use natality_forecast::models::{ModelRegistry, ModelSpec};
/// use natality_forecast::models::baseline::Naive;
///
/// let mut registry = ModelRegistry::new();
/// registry.register(ModelSpec::new("Naive", || Box::new(Naive::new())));
///
/// for spec in registry.iter() {
///     assert_eq!(spec.create().name(), spec.name);
/// }
/// ```
#[derive(Debug, Default)]
pub struct ModelRegistry {
    models: Vec<ModelSpec>,
}

impl ModelRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self { models: Vec::new() }
    }

    /// Naive, ETS and ARIMA configured from `config`, in that order.
    pub fn standard(config: &PipelineConfig) -> Self {
        let mut registry = Self::new();
        registry.register(ModelSpec::new("Naive", || Box::new(Naive::new())));

        let ets = config.ets.clone();
        let parallel = config.parallel;
        registry.register(ModelSpec::new("ETS", move || {
            Box::new(
                AutoETS::new()
                    .with_multiplicative_error(ets.allow_multiplicative_error)
                    .with_damped(ets.allow_damped)
                    .with_parallel(parallel),
            )
        }));

        let arima = config.arima.clone();
        let significance = config.significance_threshold;
        registry.register(ModelSpec::new("ARIMA", move || {
            Box::new(
                AutoARIMA::new()
                    .with_max_orders(arima.max_p, arima.max_d, arima.max_q)
                    .with_log_transform(arima.log_transform)
                    .with_significance(significance)
                    .with_parallel(parallel),
            )
        }));

        registry
    }

    /// Register a model specification.
    pub fn register(&mut self, spec: ModelSpec) {
        self.models.push(spec);
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Look up a specification by name.
    pub fn get(&self, name: &str) -> Option<&ModelSpec> {
        self.models.iter().find(|spec| spec.name == name)
    }

    /// Iterate over model specifications.
    pub fn iter(&self) -> impl Iterator<Item = &ModelSpec> {
        self.models.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn standard_registry_order() {
        let registry = ModelRegistry::standard(&PipelineConfig::default());
        let names: Vec<&str> = registry.iter().map(|s| s.name).collect();

        assert_eq!(names, vec!["Naive", "ETS", "ARIMA"]);
        for spec in registry.iter() {
            assert_eq!(spec.create().name(), spec.name);
        }
        assert!(registry.get("ETS").is_some());
        assert!(registry.get("Theta").is_none());
    }

    #[test]
    fn boxed_forecaster_fit_and_forecast() {
        let model: BoxedForecaster = Box::new(Naive::new());
        let train = TimeSeries::from_start(2000, vec![1.0, 2.0, 4.0, 3.0, 5.0]).unwrap();

        let fitted = model.fit(&train).unwrap();
        let fc = fitted.forecast(3).unwrap();

        assert_eq!(fc.horizon(), 3);
        assert_eq!(fc.periods(), vec![2005, 2006, 2007]);
        assert_relative_eq!(fc.level(), DEFAULT_LEVEL);
    }

    #[test]
    fn request_validation() {
        assert!(matches!(
            check_request(0, 0.95, 10),
            Err(ForecastError::InvalidHorizon { horizon: 0, len: 10 })
        ));
        assert!(matches!(
            check_request(3, 1.0, 10),
            Err(ForecastError::InvalidParameter(_))
        ));
        assert!(check_request(1, 0.8, 10).is_ok());
    }

    #[test]
    fn aicc_correction() {
        // AIC = 2k - 2LL = 6 + 20 = 26; correction 2*3*4/(10-4) = 4
        assert_relative_eq!(aicc(-10.0, 3, 10).unwrap(), 30.0);
        assert!(aicc(-10.0, 3, 4).is_none());
    }

    #[test]
    fn argmin_prefers_earliest_tie() {
        assert_eq!(argmin_first(vec![Some(3.0), Some(1.0), Some(1.0)]), Some(1));
        assert_eq!(argmin_first(vec![None, Some(f64::NAN), Some(2.0)]), Some(2));
        assert_eq!(argmin_first(vec![None, None]), None);
    }

    #[test]
    fn parallel_fit_preserves_order() {
        let candidates: Vec<usize> = (0..50).collect();
        let serial = fit_candidates(&candidates, false, |c| c * c);
        let parallel = fit_candidates(&candidates, true, |c| c * c);
        assert_eq!(serial, parallel);
    }
}
