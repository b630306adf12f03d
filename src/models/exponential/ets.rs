//! ETS (Error-Trend) state-space forecasting model for annual data.
//!
//! Supports additive or multiplicative errors with no, additive or damped
//! additive trend. Seasonality is not modelled: annual series carry none.

use crate::core::{ForecastResult, TimeSeries};
use crate::error::{ForecastError, Result};
use crate::models::traits::{aicc, check_request, CandidateScore, FittedModel, Forecaster};
use crate::utils::ols::ols_fit;
use crate::utils::optimization::{nelder_mead, NelderMeadConfig};
use crate::utils::stats::interval_z;
use serde::Serialize;
use std::fmt;

/// Smallest training series an ETS model accepts.
pub const MIN_OBSERVATIONS: usize = 5;

const SMOOTHING_BOUNDS: (f64, f64) = (0.0001, 0.9999);
const DAMPING_BOUNDS: (f64, f64) = (0.8, 0.98);

/// Error component type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum ErrorType {
    /// Additive errors
    #[default]
    Additive,
    /// Multiplicative errors
    Multiplicative,
}

/// Trend component type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum TrendType {
    /// No trend
    #[default]
    None,
    /// Additive trend
    Additive,
    /// Additive damped trend
    AdditiveDamped,
}

/// ETS model specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ETSSpec {
    pub error: ErrorType,
    pub trend: TrendType,
}

impl ETSSpec {
    pub fn new(error: ErrorType, trend: TrendType) -> Self {
        Self { error, trend }
    }

    /// ETS(A,N,N) - Simple exponential smoothing with additive errors.
    pub fn ann() -> Self {
        Self::new(ErrorType::Additive, TrendType::None)
    }

    /// ETS(A,A,N) - Holt's linear method with additive errors.
    pub fn aan() -> Self {
        Self::new(ErrorType::Additive, TrendType::Additive)
    }

    /// ETS(A,Ad,N) - Damped trend with additive errors.
    pub fn aadn() -> Self {
        Self::new(ErrorType::Additive, TrendType::AdditiveDamped)
    }

    /// ETS(M,N,N) - Simple exponential smoothing with multiplicative errors.
    pub fn mnn() -> Self {
        Self::new(ErrorType::Multiplicative, TrendType::None)
    }

    /// ETS(M,A,N)
    pub fn man() -> Self {
        Self::new(ErrorType::Multiplicative, TrendType::Additive)
    }

    /// ETS(M,Ad,N)
    pub fn madn() -> Self {
        Self::new(ErrorType::Multiplicative, TrendType::AdditiveDamped)
    }

    /// Get a short name for this specification.
    pub fn short_name(&self) -> String {
        let e = match self.error {
            ErrorType::Additive => "A",
            ErrorType::Multiplicative => "M",
        };
        let t = match self.trend {
            TrendType::None => "N",
            TrendType::Additive => "A",
            TrendType::AdditiveDamped => "Ad",
        };
        format!("ETS({},{},N)", e, t)
    }

    pub fn has_trend(&self) -> bool {
        !matches!(self.trend, TrendType::None)
    }

    pub fn is_damped(&self) -> bool {
        matches!(self.trend, TrendType::AdditiveDamped)
    }

    /// Estimated parameters: smoothing, damping, initial states and σ².
    pub fn n_params(&self) -> usize {
        let smoothing = 1 + usize::from(self.has_trend()) + usize::from(self.is_damped());
        let states = 1 + usize::from(self.has_trend());
        smoothing + states + 1
    }
}

impl fmt::Display for ETSSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.short_name())
    }
}

/// Smoothing parameters and initial states.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Params {
    alpha: f64,
    beta: f64,
    phi: f64,
    level0: f64,
    trend0: f64,
}

impl Params {
    /// Unpack an optimiser vector laid out as `[α, (β), (φ), ℓ0, (b0)]`.
    fn unpack(spec: ETSSpec, p: &[f64]) -> Self {
        let mut it = p.iter().copied();
        let mut next = || it.next().unwrap_or(0.0);
        let alpha = next();
        let beta = if spec.has_trend() { next() } else { 0.0 };
        let phi = match spec.trend {
            TrendType::None => 0.0,
            TrendType::Additive => 1.0,
            TrendType::AdditiveDamped => next(),
        };
        let level0 = next();
        let trend0 = if spec.has_trend() { next() } else { 0.0 };
        Self {
            alpha,
            beta,
            phi,
            level0,
            trend0,
        }
    }
}

/// Result of running the recursions over a series.
struct Filtered {
    fitted: Vec<f64>,
    sse: f64,
    sum_log_forecast: f64,
    level: f64,
    trend: f64,
}

/// Run the smoothing recursions. `None` when a multiplicative model meets a
/// non-positive one-step forecast.
fn filter(spec: ETSSpec, params: &Params, values: &[f64]) -> Option<Filtered> {
    let Params {
        alpha,
        beta,
        phi,
        level0,
        trend0,
    } = *params;
    let mut level = level0;
    let mut trend = trend0;
    let mut fitted = Vec::with_capacity(values.len());
    let mut sse = 0.0;
    let mut sum_log_forecast = 0.0;

    for &y in values {
        let forecast = level + phi * trend;
        let error = y - forecast;

        match spec.error {
            ErrorType::Additive => sse += error * error,
            ErrorType::Multiplicative => {
                if forecast <= 1e-10 {
                    return None;
                }
                let relative = error / forecast;
                sse += relative * relative;
                sum_log_forecast += forecast.ln();
            }
        }
        fitted.push(forecast);

        let level_prev = level;
        level = alpha * y + (1.0 - alpha) * (level_prev + phi * trend);
        trend = beta * (level - level_prev) + (1.0 - beta) * phi * trend;
    }

    Some(Filtered {
        fitted,
        sse,
        sum_log_forecast,
        level,
        trend,
    })
}

/// Gaussian log-likelihood concentrated over σ².
fn log_likelihood(spec: ETSSpec, filtered: &Filtered, n: usize, sigma2_floor: f64) -> (f64, f64) {
    let n_f = n as f64;
    let sigma2 = (filtered.sse / n_f).max(sigma2_floor);
    let mut ll = -0.5 * n_f * ((2.0 * std::f64::consts::PI * sigma2).ln() + 1.0);
    if spec.error == ErrorType::Multiplicative {
        ll -= filtered.sum_log_forecast;
    }
    (ll, sigma2)
}

/// ETS model with a fixed specification; parameters are estimated on fit.
#[derive(Debug, Clone)]
pub struct ETS {
    spec: ETSSpec,
    optimizer: NelderMeadConfig,
}

impl ETS {
    /// Create a new ETS model with the given specification.
    pub fn new(spec: ETSSpec) -> Self {
        Self {
            spec,
            optimizer: NelderMeadConfig {
                max_iter: 2000,
                tolerance: 1e-9,
                restarts: 2,
                ..Default::default()
            },
        }
    }

    pub fn spec(&self) -> ETSSpec {
        self.spec
    }

    /// Estimate parameters by maximum likelihood.
    ///
    /// # Errors
    /// `ModelFit` with fewer than [`MIN_OBSERVATIONS`] values, when the AICc
    /// correction is undefined for this many parameters, when a
    /// multiplicative model meets non-positive data, or when no finite
    /// likelihood is found.
    pub fn fit_series(&self, train: &TimeSeries) -> Result<FittedETS> {
        let spec = self.spec;
        let label = spec.short_name();
        let values = train.values();
        let n = values.len();

        if n < MIN_OBSERVATIONS {
            return Err(ForecastError::model_fit(
                label,
                n,
                format!("at least {} observations are required", MIN_OBSERVATIONS),
            ));
        }
        let k = spec.n_params();
        if n <= k + 1 {
            return Err(ForecastError::model_fit(
                label,
                n,
                format!("{} parameters leave no degrees of freedom", k),
            ));
        }
        if spec.error == ErrorType::Multiplicative && values.iter().any(|&y| y <= 0.0) {
            return Err(ForecastError::model_fit(
                label,
                n,
                "multiplicative errors need strictly positive data",
            ));
        }
        let last_period = train
            .last_period()
            .ok_or_else(|| ForecastError::model_fit(spec.short_name(), n, "empty series"))?;

        let mean_sq = values.iter().map(|y| y * y).sum::<f64>() / n as f64;
        let sigma2_floor = match spec.error {
            ErrorType::Additive => 1e-12 * mean_sq.max(1e-12),
            ErrorType::Multiplicative => 1e-12,
        };

        let (initial, bounds) = self.starting_point(values)?;
        let objective = |p: &[f64]| {
            let params = Params::unpack(spec, p);
            match filter(spec, &params, values) {
                Some(f) => -log_likelihood(spec, &f, n, sigma2_floor).0,
                None => f64::INFINITY,
            }
        };
        let result = nelder_mead(objective, &initial, Some(&bounds), self.optimizer.clone());
        if !result.optimal_value.is_finite() {
            return Err(ForecastError::model_fit(
                label,
                n,
                "likelihood optimisation found no finite optimum",
            ));
        }

        let params = Params::unpack(spec, &result.optimal_point);
        let filtered = filter(spec, &params, values).ok_or_else(|| {
            ForecastError::model_fit(spec.short_name(), n, "non-positive one-step forecast")
        })?;
        let (ll, sigma2) = log_likelihood(spec, &filtered, n, sigma2_floor);
        let aicc = aicc(ll, k, n).ok_or_else(|| {
            ForecastError::model_fit(spec.short_name(), n, "AICc undefined")
        })?;

        let residuals = values
            .iter()
            .zip(&filtered.fitted)
            .map(|(y, f)| y - f)
            .collect();

        Ok(FittedETS {
            spec,
            alpha: params.alpha,
            beta: spec.has_trend().then_some(params.beta),
            phi: spec.is_damped().then_some(params.phi),
            level: filtered.level,
            trend: filtered.trend,
            sigma2,
            fitted: filtered.fitted,
            residuals,
            log_likelihood: ll,
            aicc,
            n,
            last_period,
            candidates: Vec::new(),
        })
    }

    /// Initial optimiser vector and box bounds.
    ///
    /// Trend models start from a least-squares line through the first ten
    /// observations; level-only models start from the first observation.
    fn starting_point(&self, values: &[f64]) -> Result<(Vec<f64>, Vec<(f64, f64)>)> {
        let spec = self.spec;
        let free = (f64::NEG_INFINITY, f64::INFINITY);
        let mut initial = vec![0.3];
        let mut bounds = vec![SMOOTHING_BOUNDS];

        if spec.has_trend() {
            initial.push(0.1);
            bounds.push(SMOOTHING_BOUNDS);
        }
        if spec.is_damped() {
            initial.push(0.95);
            bounds.push(DAMPING_BOUNDS);
        }

        if spec.has_trend() {
            let m = values.len().min(10);
            let rows: Vec<Vec<f64>> = (1..=m).map(|t| vec![1.0, t as f64]).collect();
            let line = ols_fit(&values[..m], &rows)?;
            initial.push(line.coefficients[0]);
            initial.push(line.coefficients[1]);
            bounds.push(free);
            bounds.push(free);
        } else {
            initial.push(values[0]);
            bounds.push(free);
        }

        Ok((initial, bounds))
    }
}

impl Forecaster for ETS {
    fn fit(&self, train: &TimeSeries) -> Result<Box<dyn FittedModel>> {
        Ok(Box::new(self.fit_series(train)?))
    }

    fn name(&self) -> &str {
        "ETS"
    }
}

/// Fitted ETS model.
#[derive(Debug, Clone)]
pub struct FittedETS {
    spec: ETSSpec,
    alpha: f64,
    beta: Option<f64>,
    phi: Option<f64>,
    /// Final level state.
    level: f64,
    /// Final trend state.
    trend: f64,
    sigma2: f64,
    fitted: Vec<f64>,
    residuals: Vec<f64>,
    log_likelihood: f64,
    aicc: f64,
    n: usize,
    last_period: i32,
    pub(crate) candidates: Vec<CandidateScore>,
}

impl FittedETS {
    pub fn spec(&self) -> ETSSpec {
        self.spec
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn beta(&self) -> Option<f64> {
        self.beta
    }

    pub fn phi(&self) -> Option<f64> {
        self.phi
    }

    /// Innovation variance (relative for multiplicative errors).
    pub fn sigma2(&self) -> f64 {
        self.sigma2
    }

    pub fn log_likelihood(&self) -> f64 {
        self.log_likelihood
    }

    pub fn fitted_values(&self) -> &[f64] {
        &self.fitted
    }

    /// Scored candidates when produced by [`AutoETS`](super::AutoETS).
    pub fn candidates(&self) -> &[CandidateScore] {
        &self.candidates
    }

    /// Damping multiplier applied to the trend `h` steps ahead: `Σ_{j=1..h} φ^j`.
    fn trend_multiplier(&self, h: usize) -> f64 {
        match self.spec.trend {
            TrendType::None => 0.0,
            TrendType::Additive => h as f64,
            TrendType::AdditiveDamped => {
                let phi = self.phi.unwrap_or(1.0);
                (1..=h).map(|j| phi.powi(j as i32)).sum()
            }
        }
    }
}

impl FittedModel for FittedETS {
    fn forecast_with_level(&self, horizon: usize, level: f64) -> Result<ForecastResult> {
        check_request(horizon, level, self.n)?;
        let z = interval_z(level);
        let beta = self.beta.unwrap_or(0.0);

        let mut point = Vec::with_capacity(horizon);
        let mut lower = Vec::with_capacity(horizon);
        let mut upper = Vec::with_capacity(horizon);
        let mut sum_c2 = 0.0;

        for h in 1..=horizon {
            let y_hat = self.level + self.trend_multiplier(h) * self.trend;
            // Σ_{j<h} c_j² with c_j = α(1 + β φ_j)
            if h > 1 {
                let c = self.alpha * (1.0 + beta * self.trend_multiplier(h - 1));
                sum_c2 += c * c;
            }
            let mut variance = self.sigma2 * (1.0 + sum_c2);
            if self.spec.error == ErrorType::Multiplicative {
                variance *= y_hat * y_hat;
            }
            let half = z * variance.sqrt();

            point.push(y_hat);
            lower.push(y_hat - half);
            upper.push(y_hat + half);
        }

        ForecastResult::new(
            self.description(),
            level,
            self.last_period + 1,
            point,
            lower,
            upper,
        )
    }

    fn description(&self) -> String {
        self.spec.short_name()
    }

    fn residuals(&self) -> &[f64] {
        &self.residuals
    }

    fn aicc(&self) -> Option<f64> {
        Some(self.aicc)
    }

    fn n_params(&self) -> usize {
        self.spec.n_params()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn trending(n: usize) -> TimeSeries {
        let values = (0..n)
            .map(|t| 700.0 + 8.0 * t as f64 + 15.0 * ((t * 7 % 5) as f64 - 2.0))
            .collect();
        TimeSeries::from_start(1960, values).unwrap()
    }

    #[test]
    fn spec_names_and_parameter_counts() {
        assert_eq!(ETSSpec::ann().short_name(), "ETS(A,N,N)");
        assert_eq!(ETSSpec::madn().short_name(), "ETS(M,Ad,N)");
        assert_eq!(ETSSpec::ann().n_params(), 3);
        assert_eq!(ETSSpec::aan().n_params(), 5);
        assert_eq!(ETSSpec::aadn().n_params(), 6);
    }

    #[test]
    fn unpack_follows_layout() {
        let p = Params::unpack(ETSSpec::aadn(), &[0.5, 0.2, 0.9, 100.0, 3.0]);
        assert_eq!(
            p,
            Params {
                alpha: 0.5,
                beta: 0.2,
                phi: 0.9,
                level0: 100.0,
                trend0: 3.0
            }
        );
        let p = Params::unpack(ETSSpec::ann(), &[0.5, 100.0]);
        assert_eq!(p.phi, 0.0);
        assert_eq!(p.level0, 100.0);
    }

    #[test]
    fn parameters_stay_in_bounds() {
        let fitted = ETS::new(ETSSpec::aadn()).fit_series(&trending(40)).unwrap();

        assert!((0.0001..=0.9999).contains(&fitted.alpha()));
        assert!((0.0001..=0.9999).contains(&fitted.beta().unwrap()));
        assert!((0.8..=0.98).contains(&fitted.phi().unwrap()));
        assert!(fitted.aicc().unwrap().is_finite());
    }

    #[test]
    fn holt_forecast_follows_trend() {
        let fitted = ETS::new(ETSSpec::aan()).fit_series(&trending(40)).unwrap();
        let fc = fitted.forecast(5).unwrap();

        let points = fc.point_estimates();
        for w in points.windows(2) {
            assert!(w[1] > w[0]);
        }
        assert_eq!(fc.periods()[0], 2000);
        assert_eq!(fitted.residuals().len(), 40);
    }

    #[test]
    fn interval_width_grows() {
        let fitted = ETS::new(ETSSpec::ann()).fit_series(&trending(30)).unwrap();
        let fc = fitted.forecast_with_level(6, 0.9).unwrap();

        let widths: Vec<f64> = fc.points().iter().map(|p| p.upper - p.lower).collect();
        for w in widths.windows(2) {
            assert!(w[1] >= w[0]);
        }
        for p in fc.points() {
            assert!(p.lower < p.point && p.point < p.upper);
        }
    }

    #[test]
    fn simple_smoothing_forecast_is_flat() {
        let fitted = ETS::new(ETSSpec::ann()).fit_series(&trending(25)).unwrap();
        let points = fitted.forecast(4).unwrap().point_estimates();
        for p in &points {
            assert_relative_eq!(*p, points[0]);
        }
    }

    #[test]
    fn multiplicative_rejects_non_positive_data() {
        let train = TimeSeries::from_start(2000, vec![3.0, -1.0, 2.0, 4.0, 5.0, 6.0, 7.0]).unwrap();
        assert!(matches!(
            ETS::new(ETSSpec::mnn()).fit_series(&train),
            Err(ForecastError::ModelFit { .. })
        ));
    }

    #[test]
    fn too_short_series_fails() {
        let train = TimeSeries::from_start(2000, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        assert!(matches!(
            ETS::new(ETSSpec::ann()).fit_series(&train),
            Err(ForecastError::ModelFit { len: 4, .. })
        ));

        // Five points are enough for A,N,N but not for a damped trend.
        let train = TimeSeries::from_start(2000, vec![1.0, 2.0, 3.5, 4.0, 5.5]).unwrap();
        assert!(ETS::new(ETSSpec::ann()).fit_series(&train).is_ok());
        assert!(ETS::new(ETSSpec::aadn()).fit_series(&train).is_err());
    }

    #[test]
    fn constant_series_fits() {
        let train = TimeSeries::from_start(2000, vec![50.0; 12]).unwrap();
        let fc = ETS::new(ETSSpec::ann())
            .fit_series(&train)
            .unwrap()
            .forecast(2)
            .unwrap();
        assert_relative_eq!(fc.point_estimates()[0], 50.0, epsilon = 1e-3);
    }
}
