//! Automatic ETS model selection.
//!
//! AutoETS fits every admissible error/trend combination and keeps the one
//! with the smallest AICc.

use crate::core::TimeSeries;
use crate::error::{ForecastError, Result};
use crate::models::exponential::ets::{ETSSpec, ErrorType, FittedETS, TrendType, ETS};
use crate::models::traits::{argmin_first, fit_candidates, CandidateScore, FittedModel, Forecaster};
use tracing::debug;

/// Configuration for AutoETS.
#[derive(Debug, Clone)]
pub struct AutoETSConfig {
    /// Allow multiplicative errors (only used on strictly positive data).
    pub allow_multiplicative_error: bool,
    /// Allow damped trend.
    pub allow_damped: bool,
    /// Fit candidates on the rayon pool.
    pub parallel: bool,
}

impl Default for AutoETSConfig {
    fn default() -> Self {
        Self {
            allow_multiplicative_error: true,
            allow_damped: true,
            parallel: true,
        }
    }
}

/// Automatic ETS model selection.
#[derive(Debug, Clone, Default)]
pub struct AutoETS {
    config: AutoETSConfig,
}

impl AutoETS {
    /// Create a new AutoETS with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: AutoETSConfig) -> Self {
        Self { config }
    }

    pub fn with_multiplicative_error(mut self, allow: bool) -> Self {
        self.config.allow_multiplicative_error = allow;
        self
    }

    pub fn with_damped(mut self, allow: bool) -> Self {
        self.config.allow_damped = allow;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.config.parallel = parallel;
        self
    }

    /// Candidate specifications for `values`, in a fixed order.
    pub fn candidates(&self, values: &[f64]) -> Vec<ETSSpec> {
        let mut errors = vec![ErrorType::Additive];
        if self.config.allow_multiplicative_error && values.iter().all(|&y| y > 0.0) {
            errors.push(ErrorType::Multiplicative);
        }

        let mut trends = vec![TrendType::None, TrendType::Additive];
        if self.config.allow_damped {
            trends.push(TrendType::AdditiveDamped);
        }

        errors
            .iter()
            .flat_map(|&error| trends.iter().map(move |&trend| ETSSpec::new(error, trend)))
            .collect()
    }

    /// Fit all candidates on `train` and return the minimum-AICc model.
    ///
    /// The returned model carries the score of every candidate. Candidates
    /// too large for the series are skipped.
    pub fn fit_series(&self, train: &TimeSeries) -> Result<FittedETS> {
        let n = train.len();
        let specs = self.candidates(train.values());

        let fits = fit_candidates(&specs, self.config.parallel, |&spec| {
            ETS::new(spec).fit_series(train)
        });

        let scores: Vec<CandidateScore> = specs
            .iter()
            .zip(&fits)
            .map(|(spec, fit)| match fit {
                Ok(model) => CandidateScore {
                    label: spec.short_name(),
                    aicc: model.aicc(),
                    rejected: None,
                },
                Err(e) => CandidateScore {
                    label: spec.short_name(),
                    aicc: None,
                    rejected: Some(e.to_string()),
                },
            })
            .collect();
        for score in &scores {
            debug!(candidate = %score.label, aicc = ?score.aicc, rejected = ?score.rejected, "ETS candidate");
        }

        let best = argmin_first(scores.iter().map(|s| s.aicc)).ok_or_else(|| {
            let reason = fits
                .iter()
                .find_map(|f| f.as_ref().err().map(|e| e.to_string()))
                .unwrap_or_else(|| "no candidate specification".to_string());
            ForecastError::model_fit("ETS", n, reason)
        })?;

        let mut model = fits
            .into_iter()
            .nth(best)
            .and_then(|f| f.ok())
            .ok_or_else(|| ForecastError::model_fit("ETS", n, "selected candidate vanished"))?;
        model.candidates = scores;
        Ok(model)
    }
}

impl Forecaster for AutoETS {
    fn fit(&self, train: &TimeSeries) -> Result<Box<dyn FittedModel>> {
        Ok(Box::new(self.fit_series(train)?))
    }

    fn name(&self) -> &str {
        "ETS"
    }
}
