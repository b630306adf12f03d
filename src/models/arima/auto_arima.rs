//! Automatic ARIMA order selection.
//!
//! The differencing order comes from repeated ADF tests on the working
//! series; every `(p, q)` pair up to the configured maxima is then fitted
//! with that `d` and the model with the smallest AICc wins. All candidates
//! are conditioned on the first `max_p` differenced values, so their
//! likelihoods cover the same observations.

use crate::core::TimeSeries;
use crate::error::{ForecastError, Result};
use crate::models::arima::diff::ndiffs;
use crate::models::arima::model::{
    default_optimizer, fit_working, working_scale, ARIMASpec, FittedARIMA,
};
use crate::models::traits::{argmin_first, fit_candidates, CandidateScore, FittedModel, Forecaster};
use tracing::debug;

/// Configuration for AutoARIMA.
#[derive(Debug, Clone)]
pub struct AutoARIMAConfig {
    /// Maximum AR order to consider.
    pub max_p: usize,
    /// Maximum differencing order.
    pub max_d: usize,
    /// Maximum MA order to consider.
    pub max_q: usize,
    /// Fit on `ln(y)` and map forecasts back with `exp`.
    pub log_transform: bool,
    /// ADF significance used to choose `d`.
    pub significance: f64,
    /// Fit candidates on the rayon pool.
    pub parallel: bool,
}

impl Default for AutoARIMAConfig {
    fn default() -> Self {
        Self {
            max_p: 5,
            max_d: 2,
            max_q: 5,
            log_transform: true,
            significance: 0.05,
            parallel: true,
        }
    }
}

/// Automatic ARIMA model selection.
#[derive(Debug, Clone, Default)]
pub struct AutoARIMA {
    config: AutoARIMAConfig,
}

impl AutoARIMA {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: AutoARIMAConfig) -> Self {
        Self { config }
    }

    /// Set maximum orders.
    pub fn with_max_orders(mut self, max_p: usize, max_d: usize, max_q: usize) -> Self {
        self.config.max_p = max_p;
        self.config.max_d = max_d;
        self.config.max_q = max_q;
        self
    }

    pub fn with_log_transform(mut self, log_transform: bool) -> Self {
        self.config.log_transform = log_transform;
        self
    }

    pub fn with_significance(mut self, significance: f64) -> Self {
        self.config.significance = significance;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.config.parallel = parallel;
        self
    }

    pub fn config(&self) -> &AutoARIMAConfig {
        &self.config
    }

    /// Candidate orders for differencing order `d`, `p` varying slowest.
    pub fn candidates(&self, d: usize) -> Vec<ARIMASpec> {
        (0..=self.config.max_p)
            .flat_map(|p| (0..=self.config.max_q).map(move |q| ARIMASpec::new(p, d, q)))
            .collect()
    }

    /// Choose `d`, fit every candidate and return the minimum-AICc model.
    pub fn fit_series(&self, train: &TimeSeries) -> Result<FittedARIMA> {
        let n = train.len();
        let last_period = train
            .last_period()
            .ok_or_else(|| ForecastError::model_fit("ARIMA", 0, "empty series"))?;
        let working = working_scale(train.values(), self.config.log_transform)?;

        let d = ndiffs(&working, self.config.max_d, self.config.significance);
        debug!(d, log = self.config.log_transform, "ARIMA differencing order");

        let specs = self.candidates(d);
        let optimizer = default_optimizer();
        let condition = self.config.max_p;
        let fits = fit_candidates(&specs, self.config.parallel, |&spec| {
            fit_working(
                spec,
                &working,
                self.config.log_transform,
                last_period,
                &optimizer,
                condition,
            )
        });

        let scores: Vec<CandidateScore> = specs
            .iter()
            .zip(&fits)
            .map(|(spec, fit)| match fit {
                Ok(model) => CandidateScore {
                    label: spec.label(),
                    aicc: model.aicc(),
                    rejected: None,
                },
                Err(e) => CandidateScore {
                    label: spec.label(),
                    aicc: None,
                    rejected: Some(e.to_string()),
                },
            })
            .collect();
        for score in &scores {
            debug!(candidate = %score.label, aicc = ?score.aicc, rejected = ?score.rejected, "ARIMA candidate");
        }

        let best = argmin_first(scores.iter().map(|s| s.aicc))
            .ok_or_else(|| selection_error(&fits, n))?;

        let mut model = fits
            .into_iter()
            .nth(best)
            .and_then(|f| f.ok())
            .ok_or_else(|| ForecastError::model_fit("ARIMA", n, "selected candidate vanished"))?;
        model.candidates = scores;
        Ok(model)
    }
}

/// Error reported when no candidate produced a usable fit.
///
/// Non-invertibility dominates: it is the only failure that more data would
/// not cure.
fn selection_error(fits: &[Result<FittedARIMA>], n: usize) -> ForecastError {
    if fits
        .iter()
        .any(|f| matches!(f, Err(ForecastError::NonInvertibleModel { .. })))
    {
        return ForecastError::NonInvertibleModel {
            model: "ARIMA".to_string(),
            len: n,
        };
    }
    let reason = fits
        .iter()
        .find_map(|f| f.as_ref().err().map(|e| e.to_string()))
        .unwrap_or_else(|| "no candidate order".to_string());
    ForecastError::model_fit("ARIMA", n, reason)
}

impl Forecaster for AutoARIMA {
    fn fit(&self, train: &TimeSeries) -> Result<Box<dyn FittedModel>> {
        Ok(Box::new(self.fit_series(train)?))
    }

    fn name(&self) -> &str {
        "ARIMA"
    }
}
