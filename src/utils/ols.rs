//! Ordinary least squares with coefficient standard errors.
//!
//! Used by the ADF unit-root regression and by the trend initialisation of
//! exponential smoothing.

use crate::error::{ForecastError, Result};

/// Fitted OLS regression.
#[derive(Debug, Clone)]
pub struct OLSResult {
    /// One coefficient per design-matrix column.
    pub coefficients: Vec<f64>,
    /// Standard error of each coefficient.
    pub std_errors: Vec<f64>,
    /// Residual sum of squares.
    pub rss: f64,
    /// Number of observations.
    pub nobs: usize,
}

impl OLSResult {
    /// Residual degrees of freedom.
    pub fn df_resid(&self) -> usize {
        self.nobs.saturating_sub(self.coefficients.len())
    }

    /// Gaussian log-likelihood at the ML variance `rss / nobs`.
    pub fn log_likelihood(&self) -> f64 {
        let n = self.nobs as f64;
        -0.5 * n * ((2.0 * std::f64::consts::PI).ln() + (self.rss / n).ln() + 1.0)
    }

    /// Akaike information criterion.
    pub fn aic(&self) -> f64 {
        -2.0 * self.log_likelihood() + 2.0 * self.coefficients.len() as f64
    }

    /// t-ratio of coefficient `i`.
    pub fn t_value(&self, i: usize) -> f64 {
        self.coefficients[i] / self.std_errors[i]
    }
}

/// Fit `y = X b` by least squares. `rows[i]` is the regressor row of observation `i`.
///
/// Columns are rescaled to unit RMS before solving the normal equations so
/// that levels of order 1e6 and a constant column can share a system.
pub fn ols_fit(y: &[f64], rows: &[Vec<f64>]) -> Result<OLSResult> {
    let n = y.len();
    if rows.len() != n {
        return Err(ForecastError::InvalidParameter(format!(
            "design matrix has {} rows for {} observations",
            rows.len(),
            n
        )));
    }
    let k = rows.first().map(|r| r.len()).unwrap_or(0);
    if k == 0 || n <= k {
        return Err(ForecastError::InsufficientData {
            operation: "least squares",
            needed: k + 1,
            got: n,
        });
    }
    if rows.iter().any(|r| r.len() != k) {
        return Err(ForecastError::InvalidParameter(
            "design matrix rows differ in length".into(),
        ));
    }

    let scale: Vec<f64> = (0..k)
        .map(|j| {
            let s = (rows.iter().map(|r| r[j] * r[j]).sum::<f64>() / n as f64).sqrt();
            if s > 0.0 {
                s
            } else {
                1.0
            }
        })
        .collect();

    let mut xtx = vec![vec![0.0; k]; k];
    let mut xty = vec![0.0; k];
    for (row, &yi) in rows.iter().zip(y) {
        for i in 0..k {
            let xi = row[i] / scale[i];
            xty[i] += xi * yi;
            for j in 0..=i {
                xtx[i][j] += xi * row[j] / scale[j];
            }
        }
    }
    for i in 0..k {
        for j in 0..i {
            xtx[j][i] = xtx[i][j];
        }
    }

    let chol = cholesky(&xtx).ok_or_else(|| {
        ForecastError::Computation("singular design matrix in least squares".into())
    })?;
    let beta_scaled = cholesky_solve(&chol, &xty);

    let coefficients: Vec<f64> = beta_scaled.iter().zip(&scale).map(|(b, s)| b / s).collect();

    let rss: f64 = rows
        .iter()
        .zip(y)
        .map(|(row, yi)| {
            let fitted: f64 = row.iter().zip(&coefficients).map(|(x, b)| x * b).sum();
            (yi - fitted).powi(2)
        })
        .sum();

    let sigma2 = rss / (n - k) as f64;
    let std_errors = (0..k)
        .map(|j| {
            let mut e = vec![0.0; k];
            e[j] = 1.0;
            let inv_col = cholesky_solve(&chol, &e);
            (sigma2 * inv_col[j]).sqrt() / scale[j]
        })
        .collect();

    Ok(OLSResult {
        coefficients,
        std_errors,
        rss,
        nobs: n,
    })
}

/// Lower-triangular Cholesky factor of a symmetric positive definite matrix.
fn cholesky(a: &[Vec<f64>]) -> Option<Vec<Vec<f64>>> {
    let n = a.len();
    let mut l = vec![vec![0.0; n]; n];

    for i in 0..n {
        for j in 0..=i {
            let sum = a[i][j] - (0..j).map(|m| l[i][m] * l[j][m]).sum::<f64>();
            if i == j {
                if sum <= 1e-12 * a[i][i].abs().max(1.0) {
                    return None;
                }
                l[i][j] = sum.sqrt();
            } else {
                l[i][j] = sum / l[j][j];
            }
        }
    }
    Some(l)
}

/// Solve `L L' x = b`.
fn cholesky_solve(l: &[Vec<f64>], b: &[f64]) -> Vec<f64> {
    let n = b.len();
    let mut z = vec![0.0; n];
    for i in 0..n {
        let sum = b[i] - (0..i).map(|j| l[i][j] * z[j]).sum::<f64>();
        z[i] = sum / l[i][i];
    }
    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let sum = z[i] - ((i + 1)..n).map(|j| l[j][i] * x[j]).sum::<f64>();
        x[i] = sum / l[i][i];
    }
    x
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn recovers_exact_linear_relation() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let y: Vec<f64> = x.iter().map(|v| 2.0 + 3.0 * v).collect();
        let rows: Vec<Vec<f64>> = x.iter().map(|&v| vec![1.0, v]).collect();

        let fit = ols_fit(&y, &rows).unwrap();

        assert_relative_eq!(fit.coefficients[0], 2.0, epsilon = 1e-8);
        assert_relative_eq!(fit.coefficients[1], 3.0, epsilon = 1e-8);
        assert!(fit.rss < 1e-12);
        assert_eq!(fit.df_resid(), 4);
    }

    #[test]
    fn standard_error_matches_closed_form() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [1.1, 1.9, 3.2, 3.8, 5.1];
        let rows: Vec<Vec<f64>> = x.iter().map(|&v| vec![1.0, v]).collect();

        let fit = ols_fit(&y, &rows).unwrap();

        let x_mean = 3.0;
        let sxx: f64 = x.iter().map(|v| (v - x_mean).powi(2)).sum();
        let se_slope = (fit.rss / 3.0 / sxx).sqrt();
        assert_relative_eq!(fit.std_errors[1], se_slope, epsilon = 1e-10);
        assert_relative_eq!(fit.t_value(1), fit.coefficients[1] / se_slope, epsilon = 1e-8);
    }

    #[test]
    fn handles_badly_scaled_columns() {
        let level: Vec<f64> = (0..30).map(|i| 650_000.0 + 1_000.0 * (i as f64 * 0.7).sin()).collect();
        let y: Vec<f64> = level.iter().enumerate().map(|(i, l)| 5.0 - 1e-5 * l + 1e-4 * (i % 3) as f64).collect();
        let rows: Vec<Vec<f64>> = level.iter().map(|&l| vec![1.0, l]).collect();

        let fit = ols_fit(&y, &rows).unwrap();
        assert_relative_eq!(fit.coefficients[1], -1e-5, epsilon = 1e-6);
    }

    #[test]
    fn collinear_columns_are_singular() {
        let rows: Vec<Vec<f64>> = (0..5).map(|i| vec![i as f64, 2.0 * i as f64]).collect();
        let y = [0.0, 1.0, 2.0, 3.0, 4.0];
        assert!(matches!(ols_fit(&y, &rows), Err(ForecastError::Computation(_))));
    }

    #[test]
    fn too_few_observations() {
        let rows = vec![vec![1.0, 1.0], vec![1.0, 2.0]];
        assert!(matches!(
            ols_fit(&[1.0, 2.0], &rows),
            Err(ForecastError::InsufficientData { .. })
        ));
    }
}
