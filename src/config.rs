//! Pipeline configuration.
//!
//! Values come from [`PipelineConfig::default`], optionally overlaid by a TOML
//! file in which every field may be omitted. The binary applies command-line
//! flags on top.

use crate::error::{ForecastError, Result};
use crate::evaluation::Metric;
use crate::validation::DifferencingPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Order limits and scale for the ARIMA search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArimaSettings {
    pub max_p: usize,
    pub max_d: usize,
    pub max_q: usize,
    /// Fit on `ln(y)`.
    pub log_transform: bool,
}

impl Default for ArimaSettings {
    fn default() -> Self {
        Self {
            max_p: 5,
            max_d: 2,
            max_q: 5,
            log_transform: true,
        }
    }
}

/// Candidate families for the ETS search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EtsSettings {
    pub allow_multiplicative_error: bool,
    pub allow_damped: bool,
}

impl Default for EtsSettings {
    fn default() -> Self {
        Self {
            allow_multiplicative_error: true,
            allow_damped: true,
        }
    }
}

/// CSV header names, matched case-insensitively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnNames {
    pub year: String,
    pub births: String,
    pub fertility: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            year: "year".to_string(),
            births: "births".to_string(),
            fertility: "fertility_rate".to_string(),
        }
    }
}

/// Settings for one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Held-out tail length and final forecast length.
    pub horizon: usize,
    /// Significance level for ADF decisions.
    pub significance_threshold: f64,
    /// First year of the "after" sample in the fertility test.
    pub split_year: i32,
    /// Ranking metric.
    pub metric: Metric,
    /// Prediction interval coverage.
    pub interval_level: f64,
    pub differencing: DifferencingPolicy,
    pub arima: ArimaSettings,
    pub ets: EtsSettings,
    /// Fit ETS and ARIMA candidates on the rayon pool.
    pub parallel: bool,
    pub columns: ColumnNames,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            horizon: 10,
            significance_threshold: 0.05,
            split_year: 2000,
            metric: Metric::Rmse,
            interval_level: 0.95,
            differencing: DifferencingPolicy::Single,
            arima: ArimaSettings::default(),
            ets: EtsSettings::default(),
            parallel: true,
            columns: ColumnNames::default(),
        }
    }
}

impl PipelineConfig {
    /// Parse a TOML document. Missing keys keep their defaults.
    ///
    /// # Example
    ///
    /// ```
    /// use natality_forecast::config::PipelineConfig;
    /// use natality_forecast::evaluation::Metric;
    ///
    /// let config = PipelineConfig::from_toml_str("horizon = 5\nmetric = \"mae\"").unwrap();
    /// assert_eq!(config.horizon, 5);
    /// assert_eq!(config.metric, Metric::Mae);
    /// assert_eq!(config.split_year, 2000);
    /// ```
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s).map_err(|e| {
            ForecastError::InvalidParameter(format!("invalid configuration: {}", e.message()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ForecastError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&text)
    }

    /// Reject values no run could use.
    pub fn validate(&self) -> Result<()> {
        if self.horizon == 0 {
            return Err(ForecastError::InvalidParameter(
                "horizon must be at least 1".to_string(),
            ));
        }
        if !(self.significance_threshold > 0.0 && self.significance_threshold < 1.0) {
            return Err(ForecastError::InvalidParameter(format!(
                "significance_threshold must lie in (0, 1), got {}",
                self.significance_threshold
            )));
        }
        if !(self.interval_level > 0.0 && self.interval_level < 1.0) {
            return Err(ForecastError::InvalidParameter(format!(
                "interval_level must lie in (0, 1), got {}",
                self.interval_level
            )));
        }
        if let DifferencingPolicy::UntilStationary { max_order: 0 } = self.differencing {
            return Err(ForecastError::InvalidParameter(
                "differencing max_order must be at least 1".to_string(),
            ));
        }
        let columns = [&self.columns.year, &self.columns.births, &self.columns.fertility];
        if columns.iter().any(|c| c.trim().is_empty()) {
            return Err(ForecastError::InvalidParameter(
                "column names must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
