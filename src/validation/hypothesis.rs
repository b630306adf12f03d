//! Two-sample location tests.

use crate::core::TimeSeries;
use crate::error::{ForecastError, Result};
use crate::utils::stats::{mean, student_t_cdf, variance};
use serde::{Deserialize, Serialize};

/// Alternative hypothesis for the difference `mean_a - mean_b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alternative {
    #[default]
    TwoSided,
    /// `mean_a < mean_b`
    Less,
    /// `mean_a > mean_b`
    Greater,
}

/// Outcome of Welch's unequal-variance t-test.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TTestResult {
    pub statistic: f64,
    pub p_value: f64,
    /// Welch-Satterthwaite degrees of freedom.
    pub df: f64,
    pub mean_a: f64,
    pub mean_b: f64,
    pub n_a: usize,
    pub n_b: usize,
    pub alternative: Alternative,
}

impl TTestResult {
    pub fn is_significant(&self, significance: f64) -> bool {
        self.p_value < significance
    }
}

/// Two-sided Welch t-test of equal means.
pub fn welch_t_test(a: &[f64], b: &[f64]) -> Result<TTestResult> {
    welch_t_test_with(a, b, Alternative::TwoSided)
}

/// Welch t-test against the given alternative.
///
/// # Errors
/// `InsufficientData` when either sample has fewer than two values,
/// `Computation` when both samples have zero variance.
pub fn welch_t_test_with(a: &[f64], b: &[f64], alternative: Alternative) -> Result<TTestResult> {
    for sample in [a, b] {
        if sample.len() < 2 {
            return Err(ForecastError::InsufficientData {
                operation: "Welch t-test",
                needed: 2,
                got: sample.len(),
            });
        }
    }

    let (n_a, n_b) = (a.len() as f64, b.len() as f64);
    let (mean_a, mean_b) = (mean(a), mean(b));
    let se_a = variance(a) / n_a;
    let se_b = variance(b) / n_b;
    let se2 = se_a + se_b;
    if se2 <= 0.0 {
        return Err(ForecastError::Computation(
            "both samples have zero variance".into(),
        ));
    }

    let statistic = (mean_a - mean_b) / se2.sqrt();
    let df = se2 * se2 / (se_a * se_a / (n_a - 1.0) + se_b * se_b / (n_b - 1.0));

    let cdf = student_t_cdf(statistic, df);
    let p_value = match alternative {
        Alternative::TwoSided => 2.0 * (1.0 - student_t_cdf(statistic.abs(), df)),
        Alternative::Less => cdf,
        Alternative::Greater => 1.0 - cdf,
    }
    .clamp(0.0, 1.0);

    Ok(TTestResult {
        statistic,
        p_value,
        df,
        mean_a,
        mean_b,
        n_a: a.len(),
        n_b: b.len(),
        alternative,
    })
}

/// Partition `series` into periods before `year` and from `year` onwards.
pub fn split_by_year(series: &TimeSeries, year: i32) -> (TimeSeries, TimeSeries) {
    (series.before(year), series.from_period(year))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn welch_known_example() {
        let a = [1.8, 1.9, 1.7];
        let b = [1.6, 1.5, 1.55];
        let r = welch_t_test(&a, &b).unwrap();

        assert!(r.statistic > 0.0);
        assert_relative_eq!(r.statistic, 0.25 / (0.0125f64 / 3.0).sqrt(), epsilon = 1e-9);
        assert!((0.0..=1.0).contains(&r.p_value));
        assert!(r.df > 2.0 && r.df < 4.0);
        assert_relative_eq!(r.mean_a, 1.8, epsilon = 1e-12);
        assert_relative_eq!(r.mean_b, 1.55, epsilon = 1e-12);
    }

    #[test]
    fn one_sided_p_values_are_complementary() {
        let a = [2.1, 2.4, 1.9, 2.2, 2.0];
        let b = [1.7, 1.8, 1.6, 1.9];
        let less = welch_t_test_with(&a, &b, Alternative::Less).unwrap();
        let greater = welch_t_test_with(&a, &b, Alternative::Greater).unwrap();
        let two = welch_t_test(&a, &b).unwrap();

        assert_relative_eq!(less.p_value + greater.p_value, 1.0, epsilon = 1e-12);
        assert_relative_eq!(two.p_value, 2.0 * greater.p_value, epsilon = 1e-12);
        assert!(greater.is_significant(0.05));
    }

    #[test]
    fn identical_means_give_unit_p_value() {
        let r = welch_t_test(&[1.0, 2.0, 3.0], &[2.0, 1.0, 3.0]).unwrap();
        assert_relative_eq!(r.statistic, 0.0);
        assert_relative_eq!(r.p_value, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn small_samples_are_rejected() {
        assert!(matches!(
            welch_t_test(&[1.0], &[1.0, 2.0]),
            Err(ForecastError::InsufficientData { got: 1, .. })
        ));
    }

    #[test]
    fn zero_variance_in_both_samples_is_an_error() {
        assert!(matches!(
            welch_t_test(&[2.0, 2.0, 2.0], &[1.0, 1.0]),
            Err(ForecastError::Computation(_))
        ));
        // One constant sample is fine.
        assert!(welch_t_test(&[2.0, 2.0, 2.0], &[1.0, 1.5]).is_ok());
    }

    #[test]
    fn split_by_year_partitions_at_boundary() {
        let series = TimeSeries::from_start(1995, vec![1.7, 1.7, 1.7, 1.7, 1.7, 1.6, 1.6, 1.6]).unwrap();
        let (before, after) = split_by_year(&series, 2000);

        assert_eq!(before.periods(), &[1995, 1996, 1997, 1998, 1999]);
        assert_eq!(after.first_period(), Some(2000));
        assert_eq!(before.len() + after.len(), series.len());

        let (all, none) = split_by_year(&series, 2100);
        assert_eq!(all.len(), 8);
        assert!(none.is_empty());
    }
}
