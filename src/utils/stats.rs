//! Statistical utility functions.

use statrs::distribution::{ContinuousCDF, Normal, StudentsT};

/// Quantile function of the standard normal distribution.
///
/// # Example
/// ```
/// use natality_forecast::utils::quantile_normal;
///
/// let z = quantile_normal(0.975);
/// assert!((z - 1.959964).abs() < 1e-5);
/// ```
pub fn quantile_normal(p: f64) -> f64 {
    if p <= 0.0 {
        return f64::NEG_INFINITY;
    }
    if p >= 1.0 {
        return f64::INFINITY;
    }
    standard_normal().inverse_cdf(p)
}

/// CDF of the standard normal distribution.
pub fn normal_cdf(x: f64) -> f64 {
    standard_normal().cdf(x)
}

/// CDF of Student's t distribution with `df` degrees of freedom.
///
/// Returns NaN when `df` is not positive.
pub fn student_t_cdf(x: f64, df: f64) -> f64 {
    match StudentsT::new(0.0, 1.0, df) {
        Ok(dist) => dist.cdf(x),
        Err(_) => f64::NAN,
    }
}

fn standard_normal() -> Normal {
    // Parameters are constant and valid.
    Normal::new(0.0, 1.0).unwrap_or_else(|_| unreachable!("standard normal parameters"))
}

/// Two-sided normal critical value for a central interval of coverage `level`.
pub fn interval_z(level: f64) -> f64 {
    quantile_normal(0.5 + level / 2.0)
}

/// Calculate the mean of a slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Calculate the variance of a slice (sample variance with n-1 denominator).
pub fn variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    let m = mean(values);
    let sum_sq: f64 = values.iter().map(|x| (x - m).powi(2)).sum();
    sum_sq / (values.len() - 1) as f64
}

/// Calculate the standard deviation of a slice.
pub fn std_dev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

/// Root mean square of a slice.
pub fn rms(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    (values.iter().map(|x| x * x).sum::<f64>() / values.len() as f64).sqrt()
}

/// Sample autocorrelation at a given lag.
pub fn autocorrelation(values: &[f64], lag: usize) -> f64 {
    if values.len() <= lag {
        return f64::NAN;
    }
    let m = mean(values);

    let denominator: f64 = values.iter().map(|x| (x - m).powi(2)).sum();
    if denominator == 0.0 {
        return 0.0;
    }

    let numerator: f64 = values
        .iter()
        .skip(lag)
        .zip(values.iter())
        .map(|(a, b)| (a - m) * (b - m))
        .sum();
    numerator / denominator
}
