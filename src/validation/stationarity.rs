//! Stationarity diagnostics for annual series.
//!
//! Provides sample autocorrelations, the augmented Dickey-Fuller unit-root
//! test and differencing helpers.

use crate::core::TimeSeries;
use crate::error::{ForecastError, Result};
use crate::utils::ols::{ols_fit, OLSResult};
use crate::utils::stats::{autocorrelation, normal_cdf};
use serde::{Deserialize, Serialize};

/// Deterministic terms of the ADF regression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdfRegression {
    /// Intercept only.
    #[default]
    Constant,
    /// Intercept and linear time trend.
    ConstantTrend,
}

impl AdfRegression {
    fn ntrend(self) -> usize {
        match self {
            AdfRegression::Constant => 1,
            AdfRegression::ConstantTrend => 2,
        }
    }
}

/// Critical values at common significance levels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct CriticalValues {
    /// Critical value at 1% significance
    pub cv_1pct: f64,
    /// Critical value at 5% significance
    pub cv_5pct: f64,
    /// Critical value at 10% significance
    pub cv_10pct: f64,
}

/// Result of an augmented Dickey-Fuller test.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdfResult {
    /// t-ratio of the lagged level coefficient.
    pub statistic: f64,
    /// MacKinnon approximate p-value.
    pub p_value: f64,
    /// Number of lagged differences in the final regression.
    pub lags: usize,
    /// Observations used by the final regression.
    pub nobs: usize,
    pub regression: AdfRegression,
    pub critical_values: CriticalValues,
}

impl AdfResult {
    /// Whether the unit-root null is rejected at `significance`.
    pub fn rejects_unit_root(&self, significance: f64) -> bool {
        self.p_value < significance
    }
}

/// Smallest series accepted by [`adf_test`].
pub fn adf_min_length(regression: AdfRegression) -> usize {
    3 + regression.ntrend()
}

/// Augmented Dickey-Fuller test for a unit root.
///
/// Fits `Δy_t = α [+ βt] + γ y_{t-1} + Σ δ_i Δy_{t-i}` by OLS and reports the
/// t-ratio of `γ`. When `max_lag` is `None` the lag count is chosen by AIC
/// from `0..=min(12 (n/100)^¼, n/2 - ntrend - 1)`, with every candidate fitted
/// on the same sample; the chosen lag is then refitted on all usable rows.
///
/// # Errors
/// `InsufficientData` below [`adf_min_length`] observations, `Computation`
/// when the regression is singular (e.g. a constant series).
pub fn adf_test(
    values: &[f64],
    regression: AdfRegression,
    max_lag: Option<usize>,
) -> Result<AdfResult> {
    let n = values.len();
    let needed = adf_min_length(regression);
    if n < needed {
        return Err(ForecastError::InsufficientData {
            operation: "ADF test",
            needed,
            got: n,
        });
    }

    let ntrend = regression.ntrend();
    let schwert = (12.0 * (n as f64 / 100.0).powf(0.25)).floor() as usize;
    let feasible = (n / 2).saturating_sub(ntrend + 1);
    let maxlag = max_lag
        .unwrap_or_else(|| schwert.min(feasible))
        .min(largest_fittable_lag(n, ntrend));

    let diff: Vec<f64> = values.windows(2).map(|w| w[1] - w[0]).collect();

    let lags = if max_lag.is_some() {
        maxlag
    } else {
        select_lag(values, &diff, regression, maxlag)?
    };

    let fit = adf_regression(values, &diff, regression, lags, lags)?;
    let statistic = fit.t_value(0);
    if !statistic.is_finite() {
        return Err(ForecastError::Computation(
            "ADF statistic is not finite; the series may be constant".into(),
        ));
    }

    Ok(AdfResult {
        statistic,
        p_value: mackinnon_p_value(statistic, regression),
        lags,
        nobs: fit.nobs,
        regression,
        critical_values: mackinnon_critical_values(regression, fit.nobs),
    })
}

/// Largest lag that still leaves one residual degree of freedom.
fn largest_fittable_lag(n: usize, ntrend: usize) -> usize {
    // nobs = n - 1 - lag must exceed ntrend + 1 + lag regressors.
    (n.saturating_sub(ntrend + 3)) / 2
}

/// Choose the lag count minimising AIC on the sample usable by `maxlag`.
fn select_lag(
    values: &[f64],
    diff: &[f64],
    regression: AdfRegression,
    maxlag: usize,
) -> Result<usize> {
    let mut best: Option<(usize, f64)> = None;
    for lag in 0..=maxlag {
        let aic = match adf_regression(values, diff, regression, lag, maxlag) {
            Ok(fit) => fit.aic(),
            Err(ForecastError::Computation(_)) => continue,
            Err(e) => return Err(e),
        };
        if !aic.is_finite() {
            continue;
        }
        if best.map_or(true, |(_, b)| aic < b) {
            best = Some((lag, aic));
        }
    }
    best.map(|(lag, _)| lag).ok_or_else(|| {
        ForecastError::Computation("ADF regression is singular for every lag".into())
    })
}

/// Regress `Δy_t` on `[y_{t-1}, Δy_{t-1..t-lag}, 1, (t)]`, dropping the
/// first `skip` differences so that different lags share a sample.
fn adf_regression(
    values: &[f64],
    diff: &[f64],
    regression: AdfRegression,
    lag: usize,
    skip: usize,
) -> Result<OLSResult> {
    let mut y = Vec::with_capacity(diff.len().saturating_sub(skip));
    let mut rows = Vec::with_capacity(y.capacity());

    for t in skip..diff.len() {
        let mut row = Vec::with_capacity(lag + 3);
        row.push(values[t]);
        row.extend((1..=lag).map(|i| diff[t - i]));
        row.push(1.0);
        if regression == AdfRegression::ConstantTrend {
            row.push((t - skip + 1) as f64);
        }
        rows.push(row);
        y.push(diff[t]);
    }

    ols_fit(&y, &rows)
}

/// MacKinnon (1994) approximate asymptotic p-value for a single series.
fn mackinnon_p_value(statistic: f64, regression: AdfRegression) -> f64 {
    let (tau_max, tau_min, tau_star, small, large): (f64, f64, f64, &[f64], &[f64]) =
        match regression {
            AdfRegression::Constant => (
                2.74,
                -18.83,
                -1.61,
                &[2.1659, 1.4412, 0.038269],
                &[1.7339, 0.93202, -0.12745, -0.010368],
            ),
            AdfRegression::ConstantTrend => (
                0.7,
                -16.18,
                -2.89,
                &[3.2512, 1.6047, 0.049588],
                &[2.5261, 0.61654, -0.37956, -0.060285],
            ),
        };

    if statistic > tau_max {
        return 1.0;
    }
    if statistic < tau_min {
        return 0.0;
    }
    let coef = if statistic <= tau_star { small } else { large };
    normal_cdf(polyval(coef, statistic))
}

/// MacKinnon (2010) finite-sample critical values.
fn mackinnon_critical_values(regression: AdfRegression, nobs: usize) -> CriticalValues {
    let table: [[f64; 4]; 3] = match regression {
        AdfRegression::Constant => [
            [-3.43035, -6.5393, -16.786, -79.433],
            [-2.86154, -2.8903, -4.234, -40.040],
            [-2.56677, -1.5384, -2.809, 0.0],
        ],
        AdfRegression::ConstantTrend => [
            [-3.95877, -9.0531, -28.428, -134.155],
            [-3.41049, -4.3904, -9.036, -45.374],
            [-3.12705, -2.5856, -3.925, -22.380],
        ],
    };
    let inv = 1.0 / nobs as f64;
    let at = |c: &[f64; 4]| polyval(c, inv);
    CriticalValues {
        cv_1pct: at(&table[0]),
        cv_5pct: at(&table[1]),
        cv_10pct: at(&table[2]),
    }
}

/// `c[0] + c[1] x + c[2] x^2 + ...`
fn polyval(coef: &[f64], x: f64) -> f64 {
    coef.iter().rev().fold(0.0, |acc, c| acc * x + c)
}

/// Default number of lags for correlograms: `min(10 log10 n, n - 1)`.
pub fn default_nlags(n: usize) -> usize {
    if n < 2 {
        return 0;
    }
    ((10.0 * (n as f64).log10()).floor() as usize).min(n - 1)
}

/// Sample autocorrelations for lags `0..=nlags`. Index 0 is always 1.
pub fn acf(values: &[f64], nlags: usize) -> Vec<f64> {
    let nlags = nlags.min(values.len().saturating_sub(1));
    let mut out = Vec::with_capacity(nlags + 1);
    out.push(1.0);
    out.extend((1..=nlags).map(|k| autocorrelation(values, k)));
    out
}

/// Sample partial autocorrelations for lags `0..=nlags` via Durbin-Levinson.
///
/// Index 0 is 1. Lags past a numerically singular step are reported as 0.
pub fn pacf(values: &[f64], nlags: usize) -> Vec<f64> {
    let r = acf(values, nlags);
    let nlags = r.len() - 1;

    let mut out = vec![0.0; nlags + 1];
    out[0] = 1.0;
    if nlags == 0 {
        return out;
    }

    let mut phi = vec![r[1]];
    out[1] = r[1];
    let mut err = 1.0 - r[1] * r[1];

    for k in 2..=nlags {
        if err.abs() < 1e-12 {
            break;
        }
        let num = r[k] - (1..k).map(|j| phi[j - 1] * r[k - j]).sum::<f64>();
        let kk = num / err;
        let prev = phi.clone();
        for j in 1..k {
            phi[j - 1] = prev[j - 1] - kk * prev[k - j - 1];
        }
        phi.push(kk);
        err *= 1.0 - kk * kk;
        out[k] = kk;
    }

    out
}

/// Correlograms and unit-root test for one series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationarityReport {
    /// Length of the analysed series.
    pub n: usize,
    pub acf: Vec<f64>,
    pub pacf: Vec<f64>,
    /// Approximate 95% white-noise band `1.96 / sqrt(n)`.
    pub confidence_band: f64,
    pub adf_statistic: f64,
    pub adf_pvalue: f64,
    pub adf_lags: usize,
    pub critical_values: CriticalValues,
    pub significance: f64,
    pub is_stationary: bool,
}

/// Compute correlograms and the constant-only ADF test for `series`.
///
/// `is_stationary` holds when the ADF p-value is below `significance`.
pub fn analyze(series: &TimeSeries, significance: f64) -> Result<StationarityReport> {
    if !(significance > 0.0 && significance < 1.0) {
        return Err(ForecastError::InvalidParameter(format!(
            "significance must lie in (0, 1), got {}",
            significance
        )));
    }

    let values = series.values();
    let n = values.len();
    let adf = adf_test(values, AdfRegression::Constant, None)?;
    let nlags = default_nlags(n);

    Ok(StationarityReport {
        n,
        acf: acf(values, nlags),
        pacf: pacf(values, nlags),
        confidence_band: 1.96 / (n as f64).sqrt(),
        adf_statistic: adf.statistic,
        adf_pvalue: adf.p_value,
        adf_lags: adf.lags,
        critical_values: adf.critical_values,
        significance,
        is_stationary: adf.rejects_unit_root(significance),
    })
}

/// Order-`order` differences. The first period moves forward by `order`.
///
/// # Errors
/// `InvalidParameter` for order 0, `InsufficientData` when fewer than three
/// values would remain.
pub fn difference(series: &TimeSeries, order: usize) -> Result<TimeSeries> {
    if order == 0 {
        return Err(ForecastError::InvalidParameter(
            "differencing order must be at least 1".into(),
        ));
    }
    let n = series.len();
    if n <= order + 2 {
        return Err(ForecastError::InsufficientData {
            operation: "differencing",
            needed: order + 3,
            got: n,
        });
    }

    let mut values = series.values().to_vec();
    for _ in 0..order {
        values = values.windows(2).map(|w| w[1] - w[0]).collect();
    }

    let start = series.periods()[order];
    let out = TimeSeries::from_start(start, values)?;
    Ok(match series.name() {
        Some(name) => out.with_name(name),
        None => out,
    })
}

/// Invert first differencing: cumulative sums of `diffs` starting from `seed`.
///
/// The result starts one period before `diffs` and has one more value.
pub fn undifference(seed: f64, diffs: &TimeSeries) -> Result<TimeSeries> {
    let first = diffs.first_period().ok_or(ForecastError::InsufficientData {
        operation: "undifferencing",
        needed: 1,
        got: 0,
    })?;

    let mut values = Vec::with_capacity(diffs.len() + 1);
    values.push(seed);
    let mut level = seed;
    for &d in diffs.values() {
        level += d;
        values.push(level);
    }
    TimeSeries::from_start(first - 1, values)
}

/// How the analyser differences a non-stationary series before re-testing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DifferencingPolicy {
    /// Difference once and re-test, whatever the outcome.
    #[default]
    Single,
    /// Difference repeatedly until the ADF test rejects a unit root.
    UntilStationary { max_order: usize },
}

/// A differenced series together with its re-test.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DifferencedAnalysis {
    pub order: usize,
    pub series: TimeSeries,
    pub report: StationarityReport,
}

/// Apply `policy` to a series whose analysis is `original`.
///
/// Returns `None` when `policy` is [`DifferencingPolicy::UntilStationary`]
/// and the series is already stationary. Under `Single` the series is
/// differenced once even if it tested stationary, so the re-test is always
/// reported.
pub fn apply_differencing(
    series: &TimeSeries,
    original: &StationarityReport,
    policy: DifferencingPolicy,
    significance: f64,
) -> Result<Option<DifferencedAnalysis>> {
    match policy {
        DifferencingPolicy::Single => {
            let diffed = difference(series, 1)?;
            let report = analyze(&diffed, significance)?;
            Ok(Some(DifferencedAnalysis {
                order: 1,
                series: diffed,
                report,
            }))
        }
        DifferencingPolicy::UntilStationary { max_order } => {
            if max_order == 0 {
                return Err(ForecastError::InvalidParameter(
                    "max_order must be at least 1".into(),
                ));
            }
            if original.is_stationary {
                return Ok(None);
            }
            let mut current = series.clone();
            let mut result = None;
            for order in 1..=max_order {
                current = difference(&current, 1)?;
                let report = analyze(&current, significance)?;
                let done = report.is_stationary;
                result = Some(DifferencedAnalysis {
                    order,
                    series: current.clone(),
                    report,
                });
                if done {
                    break;
                }
            }
            Ok(result)
        }
    }
}
