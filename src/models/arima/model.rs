//! ARIMA(p,d,q) model estimated by conditional sum of squares.
//!
//! The model is fitted on a working scale, which is `ln(y)` when the log
//! transform is enabled. Forecasts and interval bounds are mapped back
//! through `exp` one by one.

use crate::core::{ForecastResult, TimeSeries};
use crate::error::{ForecastError, Result};
use crate::models::arima::diff::{anchors, difference, integrate};
use crate::models::arima::stability::{is_invertible, is_stationary};
use crate::models::traits::{aicc, check_request, CandidateScore, FittedModel, Forecaster};
use crate::utils::optimization::{nelder_mead, NelderMeadConfig};
use crate::utils::stats::{interval_z, mean};
use serde::Serialize;
use std::fmt;

const COEFFICIENT_BOUNDS: (f64, f64) = (-0.99, 0.99);

/// ARIMA model specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ARIMASpec {
    /// AR order
    pub p: usize,
    /// Differencing order
    pub d: usize,
    /// MA order
    pub q: usize,
    /// Include a mean (d = 0) or drift (d = 1) term.
    pub constant: bool,
}

impl ARIMASpec {
    /// Specification with a constant whenever `d <= 1`.
    pub fn new(p: usize, d: usize, q: usize) -> Self {
        Self {
            p,
            d,
            q,
            constant: d <= 1,
        }
    }

    pub fn with_constant(mut self, constant: bool) -> Self {
        self.constant = constant;
        self
    }

    /// Coefficients, constant and innovation variance.
    pub fn n_params(&self) -> usize {
        self.p + self.q + usize::from(self.constant) + 1
    }

    pub fn label(&self) -> String {
        format!("ARIMA({},{},{})", self.p, self.d, self.q)
    }
}

impl fmt::Display for ARIMASpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// ARIMA model with a fixed order.
#[derive(Debug, Clone)]
pub struct ARIMA {
    spec: ARIMASpec,
    log_transform: bool,
    optimizer: NelderMeadConfig,
}

impl ARIMA {
    /// ARIMA(p,d,q) on the log scale, with a constant when `d <= 1`.
    pub fn new(p: usize, d: usize, q: usize) -> Self {
        Self::with_spec(ARIMASpec::new(p, d, q))
    }

    pub fn with_spec(spec: ARIMASpec) -> Self {
        Self {
            spec,
            log_transform: true,
            optimizer: default_optimizer(),
        }
    }

    pub fn with_log_transform(mut self, log_transform: bool) -> Self {
        self.log_transform = log_transform;
        self
    }

    pub fn spec(&self) -> ARIMASpec {
        self.spec
    }

    /// Estimate the model on `train`.
    ///
    /// # Errors
    /// `ModelFit` on non-positive data under the log transform or when the
    /// series is too short for the order; `NonInvertibleModel` when the
    /// estimate is non-stationary or non-invertible.
    pub fn fit_series(&self, train: &TimeSeries) -> Result<FittedARIMA> {
        let working = working_scale(train.values(), self.log_transform)?;
        let last_period = train
            .last_period()
            .ok_or_else(|| ForecastError::model_fit(self.spec.label(), 0, "empty series"))?;
        fit_working(
            self.spec,
            &working,
            self.log_transform,
            last_period,
            &self.optimizer,
            0,
        )
    }
}

impl Forecaster for ARIMA {
    fn fit(&self, train: &TimeSeries) -> Result<Box<dyn FittedModel>> {
        Ok(Box::new(self.fit_series(train)?))
    }

    fn name(&self) -> &str {
        "ARIMA"
    }
}

pub(crate) fn default_optimizer() -> NelderMeadConfig {
    NelderMeadConfig {
        max_iter: 3000,
        tolerance: 1e-9,
        restarts: 1,
        ..Default::default()
    }
}

/// Map values onto the working scale.
pub(crate) fn working_scale(values: &[f64], log_transform: bool) -> Result<Vec<f64>> {
    if !log_transform {
        return Ok(values.to_vec());
    }
    if values.iter().any(|&y| y <= 0.0) {
        return Err(ForecastError::model_fit(
            "ARIMA",
            values.len(),
            "log transform needs strictly positive data",
        ));
    }
    Ok(values.iter().map(|y| y.ln()).collect())
}

/// Conditional residuals of an ARMA model for the differenced series `w`.
///
/// Residuals before index `start` are zero and condition the recursion.
/// `start` must be at least the AR order.
fn conditional_residuals(w: &[f64], ar: &[f64], ma: &[f64], mu: f64, start: usize) -> Vec<f64> {
    let n = w.len();
    let mut residuals = vec![0.0; n];

    for t in start.max(ar.len())..n {
        let mut pred = mu;

        // AR component
        for (i, phi) in ar.iter().enumerate() {
            pred += phi * (w[t - 1 - i] - mu);
        }

        // MA component
        for (i, theta) in ma.iter().enumerate() {
            if let Some(lag) = t.checked_sub(1 + i) {
                pred += theta * residuals[lag];
            }
        }

        residuals[t] = w[t] - pred;
    }

    residuals
}

/// Split an optimiser vector laid out as `[φ.., θ.., (μ)]`.
fn unpack(spec: ARIMASpec, params: &[f64]) -> (&[f64], &[f64], f64) {
    let (ar, rest) = params.split_at(spec.p);
    let (ma, rest) = rest.split_at(spec.q);
    let mu = if spec.constant { rest[0] } else { 0.0 };
    (ar, ma, mu)
}

/// Fit `spec` on an already transformed series.
///
/// The sum of squares and the likelihood run over the differenced series
/// from index `max(condition, p)`. Candidates compared by AICc must share
/// one `condition`, at least their largest AR order, so that every score
/// covers the same observations.
pub(crate) fn fit_working(
    spec: ARIMASpec,
    working: &[f64],
    log_transform: bool,
    last_period: i32,
    optimizer: &NelderMeadConfig,
    condition: usize,
) -> Result<FittedARIMA> {
    let n = working.len();
    let label = spec.label();
    if n <= spec.p + spec.d + spec.q {
        return Err(ForecastError::model_fit(
            label,
            n,
            "series is too short for the requested order",
        ));
    }

    let w = difference(working, spec.d);
    let start = condition.max(spec.p);
    let n_eff = w.len().saturating_sub(start);
    let k = spec.n_params();
    if n_eff <= k + 1 {
        return Err(ForecastError::model_fit(
            label,
            n,
            format!("{} effective observations for {} parameters", n_eff, k),
        ));
    }

    let mut initial = vec![0.0; spec.p + spec.q];
    let mut bounds = vec![COEFFICIENT_BOUNDS; spec.p + spec.q];
    if spec.constant {
        initial.push(mean(&w[start..]));
        bounds.push((f64::NEG_INFINITY, f64::INFINITY));
    }

    let objective = |params: &[f64]| {
        let (ar, ma, mu) = unpack(spec, params);
        let css: f64 = conditional_residuals(&w, ar, ma, mu, start)
            .iter()
            .map(|e| e * e)
            .sum();
        0.5 * n_eff as f64 * css.max(f64::MIN_POSITIVE).ln()
    };

    let params = if initial.is_empty() {
        Vec::new()
    } else {
        let result = nelder_mead(objective, &initial, Some(&bounds), optimizer.clone());
        if !result.optimal_value.is_finite() {
            return Err(ForecastError::model_fit(
                label,
                n,
                "conditional sum of squares did not converge",
            ));
        }
        result.optimal_point
    };

    let (ar, ma, mu) = unpack(spec, &params);
    if !is_stationary(ar) || !is_invertible(ma) {
        return Err(ForecastError::NonInvertibleModel { model: label, len: n });
    }

    let residuals = conditional_residuals(&w, ar, ma, mu, start);
    let css: f64 = residuals[start..].iter().map(|e| e * e).sum();
    let sigma2 = css / n_eff as f64;
    let log_likelihood = if sigma2 > 0.0 {
        -0.5 * n_eff as f64 * ((2.0 * std::f64::consts::PI * sigma2).ln() + 1.0)
    } else {
        f64::INFINITY
    };
    let aicc = aicc(log_likelihood, k, n_eff)
        .filter(|a| a.is_finite())
        .ok_or_else(|| ForecastError::model_fit(spec.label(), n, "AICc undefined"))?;

    Ok(FittedARIMA {
        spec,
        ar: ar.to_vec(),
        ma: ma.to_vec(),
        intercept: mu,
        sigma2,
        log_likelihood,
        aicc,
        w_tail: w[w.len() - spec.p..].to_vec(),
        resid_tail: residuals[residuals.len() - spec.q..].to_vec(),
        anchors: anchors(working, spec.d),
        residuals: residuals[start..].to_vec(),
        log_transform,
        n,
        last_period,
        candidates: Vec::new(),
    })
}

/// ψ-weights `ψ_0..ψ_{horizon-1}` of `θ(B) / (φ(B)(1-B)^d)`.
fn psi_weights(ar: &[f64], ma: &[f64], d: usize, horizon: usize) -> Vec<f64> {
    // Coefficients of φ(B)(1-B)^d as a polynomial in B.
    let mut poly = vec![1.0];
    poly.extend(ar.iter().map(|phi| -phi));
    for _ in 0..d {
        let mut next = vec![0.0; poly.len() + 1];
        for (i, c) in poly.iter().enumerate() {
            next[i] += c;
            next[i + 1] -= c;
        }
        poly = next;
    }
    let phi_star: Vec<f64> = poly[1..].iter().map(|c| -c).collect();

    let mut psi = vec![0.0; horizon];
    if horizon > 0 {
        psi[0] = 1.0;
    }
    for j in 1..horizon {
        let mut value = ma.get(j - 1).copied().unwrap_or(0.0);
        for (i, phi) in phi_star.iter().enumerate().take(j) {
            value += phi * psi[j - 1 - i];
        }
        psi[j] = value;
    }
    psi
}

/// Fitted ARIMA model.
#[derive(Debug, Clone)]
pub struct FittedARIMA {
    spec: ARIMASpec,
    ar: Vec<f64>,
    ma: Vec<f64>,
    intercept: f64,
    sigma2: f64,
    log_likelihood: f64,
    aicc: f64,
    /// Last `p` values of the differenced working series.
    w_tail: Vec<f64>,
    /// Last `q` conditional residuals.
    resid_tail: Vec<f64>,
    /// Last working value at each differencing level.
    anchors: Vec<f64>,
    residuals: Vec<f64>,
    log_transform: bool,
    n: usize,
    last_period: i32,
    pub(crate) candidates: Vec<CandidateScore>,
}

impl FittedARIMA {
    pub fn spec(&self) -> ARIMASpec {
        self.spec
    }

    pub fn ar_coefficients(&self) -> &[f64] {
        &self.ar
    }

    pub fn ma_coefficients(&self) -> &[f64] {
        &self.ma
    }

    /// Mean of the differenced working series (zero without a constant).
    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    /// Innovation variance on the working scale.
    pub fn sigma2(&self) -> f64 {
        self.sigma2
    }

    pub fn log_likelihood(&self) -> f64 {
        self.log_likelihood
    }

    pub fn is_log_transformed(&self) -> bool {
        self.log_transform
    }

    /// Scored candidates when produced by [`AutoARIMA`](super::AutoARIMA).
    pub fn candidates(&self) -> &[CandidateScore] {
        &self.candidates
    }

    /// Point forecasts of the differenced working series.
    fn forecast_differenced(&self, horizon: usize) -> Vec<f64> {
        let mu = self.intercept;
        let mut w = self.w_tail.clone();
        let mut e = self.resid_tail.clone();
        let mut out = Vec::with_capacity(horizon);

        for _ in 0..horizon {
            let mut pred = mu;
            for (i, phi) in self.ar.iter().enumerate() {
                pred += phi * (w[w.len() - 1 - i] - mu);
            }
            for (i, theta) in self.ma.iter().enumerate() {
                pred += theta * e[e.len() - 1 - i];
            }
            w.push(pred);
            e.push(0.0);
            out.push(pred);
        }
        out
    }
}

impl FittedModel for FittedARIMA {
    fn forecast_with_level(&self, horizon: usize, level: f64) -> Result<ForecastResult> {
        check_request(horizon, level, self.n)?;
        let z = interval_z(level);

        let point = integrate(&self.forecast_differenced(horizon), &self.anchors);
        let psi = psi_weights(&self.ar, &self.ma, self.spec.d, horizon);

        let mut cumulative = 0.0;
        let mut lower = Vec::with_capacity(horizon);
        let mut upper = Vec::with_capacity(horizon);
        for (y_hat, weight) in point.iter().zip(&psi) {
            cumulative += weight * weight;
            let half = z * (self.sigma2 * cumulative).sqrt();
            lower.push(y_hat - half);
            upper.push(y_hat + half);
        }

        let result = ForecastResult::new(
            self.description(),
            level,
            self.last_period + 1,
            point,
            lower,
            upper,
        )?;

        Ok(if self.log_transform {
            result.map_values(f64::exp)
        } else {
            result
        })
    }

    fn description(&self) -> String {
        let constant = match (self.spec.constant, self.spec.d) {
            (false, _) => "",
            (true, 0) => " with non-zero mean",
            (true, 1) => " with drift",
            (true, _) => " with constant",
        };
        let scale = if self.log_transform { " [log]" } else { "" };
        format!("{}{}{}", self.spec.label(), constant, scale)
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
