//! End-to-end forecasting run.
//!
//! ```text
//! births ──► stationarity ──► split ──► fit/forecast/evaluate (per model)
//!                                            │
//!                                            ▼
//!                                  rank ──► refit best ──► final forecast
//! fertility ──► Welch t-test (before/after split year)
//! ```
//!
//! Each stage consumes immutable values and returns new ones. A model that
//! fails during the backtest is recorded and skipped, as is a differenced
//! stationarity re-test that cannot be computed; any other failure ends the
//! run with the stage and input shape attached.

use crate::config::PipelineConfig;
use crate::core::{split, ForecastResult, TimeSeries};
use crate::data::Dataset;
use crate::error::{ForecastError, Result, Stage};
use crate::evaluation::{compare, evaluate, AccuracyReport, ComparisonTable, Metric, Ranking};
use crate::models::{FittedModel, ModelRegistry, ModelSpec};
use crate::validation::{
    analyze, apply_differencing, ljung_box, split_by_year, welch_t_test, DifferencedAnalysis,
    DifferencingPolicy, LjungBoxResult, StationarityReport, TTestResult,
};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Periods covered by the training and test windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SplitSummary {
    pub train_start: i32,
    pub train_end: i32,
    pub test_start: i32,
    pub test_end: i32,
}

/// One model's held-out forecast and its accuracy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Backtest {
    /// Registry id, e.g. `ETS`.
    pub model: String,
    /// Fitted description, e.g. `ETS(A,Ad,N)`.
    pub description: String,
    pub forecast: ForecastResult,
    pub accuracy: AccuracyReport,
}

/// The best model refitted on the full series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinalForecast {
    pub model: String,
    pub description: String,
    pub forecast: ForecastResult,
    /// Ljung-Box test on the refit residuals, when the residuals allow one.
    pub residual_diagnostics: Option<LjungBoxResult>,
}

/// Fertility rate before versus after the split year.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HypothesisSummary {
    pub split_year: i32,
    pub n_before: usize,
    pub n_after: usize,
    pub test: TTestResult,
    /// Whether the test rejects equal means at the configured significance.
    pub significant: bool,
}

/// Everything a run produces.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineReport {
    pub config: PipelineConfig,
    pub stationarity: StationarityReport,
    pub differenced: Option<DifferencedAnalysis>,
    pub split: SplitSummary,
    pub backtests: Vec<Backtest>,
    pub comparison: ComparisonTable,
    pub ranking: Ranking,
    pub final_forecast: FinalForecast,
    pub hypothesis: HypothesisSummary,
}

/// Configured forecasting pipeline.
pub struct Pipeline {
    config: PipelineConfig,
    registry: ModelRegistry,
}

impl Pipeline {
    /// Pipeline with the standard Naive, ETS and ARIMA models.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let registry = ModelRegistry::standard(&config);
        Ok(Self { config, registry })
    }

    /// Replace the competing models.
    pub fn with_registry(mut self, registry: ModelRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Run every stage on `dataset`.
    ///
    /// # Errors
    /// Stage-annotated errors from stationarity, split, refit and hypothesis
    /// stages; `ModelFit` when no model survives the backtest.
    pub fn run(&self, dataset: &Dataset) -> Result<PipelineReport> {
        let births = &dataset.births;
        let horizon = self.config.horizon;
        let n = births.len();
        info!(observations = n, horizon, "starting pipeline");

        let (stationarity, differenced) = self
            .stationarity(births)
            .map_err(|e| e.at_stage(Stage::Stationarity, n, horizon))?;

        let parts = split(births, horizon).map_err(|e| e.at_stage(Stage::Split, n, horizon))?;
        let split_summary = summarize_split(&parts.train, &parts.test)
            .ok_or_else(|| ForecastError::InvalidHorizon { horizon, len: n }.at_stage(Stage::Split, n, horizon))?;
        info!(
            train = parts.train.len(),
            test = parts.test.len(),
            "split {}-{} / {}-{}",
            split_summary.train_start,
            split_summary.train_end,
            split_summary.test_start,
            split_summary.test_end
        );

        let mut table = ComparisonTable::new();
        let mut backtests = Vec::new();
        for spec in self.registry.iter() {
            match self.backtest(spec, &parts.train, &parts.test) {
                Ok(backtest) => {
                    info!(
                        model = spec.name,
                        fitted = %backtest.description,
                        rmse = backtest.accuracy.rmse,
                        mae = backtest.accuracy.mae,
                        mape = backtest.accuracy.mape,
                        "backtest complete"
                    );
                    table.insert(spec.name, backtest.accuracy);
                    backtests.push(backtest);
                }
                Err(e) => {
                    warn!(model = spec.name, error = %e, "model skipped");
                    table.record_failure(spec.name, &e);
                }
            }
        }

        if table.is_empty() {
            let reasons: Vec<String> = table
                .failures()
                .iter()
                .map(|f| format!("{}: {}", f.model, f.error))
                .collect();
            return Err(ForecastError::model_fit(
                "all models",
                parts.train.len(),
                if reasons.is_empty() {
                    "no models registered".to_string()
                } else {
                    reasons.join("; ")
                },
            ));
        }

        let ranking = compare(&table, self.config.metric);
        let final_forecast = self
            .refit_best(&ranking, births)
            .map_err(|e| e.at_stage(Stage::Refit, n, horizon))?;

        let hypothesis = self
            .hypothesis(&dataset.fertility)
            .map_err(|e| e.at_stage(Stage::Hypothesis, dataset.fertility.len(), horizon))?;

        Ok(PipelineReport {
            config: self.config.clone(),
            stationarity,
            differenced,
            split: split_summary,
            backtests,
            comparison: table,
            ranking,
            final_forecast,
            hypothesis,
        })
    }

    fn stationarity(
        &self,
        births: &TimeSeries,
    ) -> Result<(StationarityReport, Option<DifferencedAnalysis>)> {
        let significance = self.config.significance_threshold;
        let report = analyze(births, significance)?;
        info!(
            adf = report.adf_statistic,
            p_value = report.adf_pvalue,
            stationary = report.is_stationary,
            "stationarity of levels"
        );

        let differenced =
            retest_differenced(births, &report, self.config.differencing, significance);
        Ok((report, differenced))
    }

    fn backtest(&self, spec: &ModelSpec, train: &TimeSeries, test: &TimeSeries) -> Result<Backtest> {
        let fitted = spec.create().fit(train)?;
        debug!(model = spec.name, fitted = %fitted.description(), aicc = ?fitted.aicc(), "fitted on training window");
        let forecast = fitted.forecast_with_level(test.len(), self.config.interval_level)?;
        let accuracy = evaluate(&forecast, test)?;
        Ok(Backtest {
            model: spec.name.to_string(),
            description: fitted.description(),
            forecast,
            accuracy,
        })
    }

    fn refit_best(&self, ranking: &Ranking, births: &TimeSeries) -> Result<FinalForecast> {
        let best = ranking
            .best()
            .ok_or_else(|| ForecastError::Computation("ranking is empty".to_string()))?;
        let spec = self.registry.get(&best.model).ok_or_else(|| {
            ForecastError::Computation(format!("model '{}' is not registered", best.model))
        })?;
        info!(
            model = spec.name,
            metric = %ranking.metric(),
            score = best.report.get(ranking.metric()),
            "refitting best model on full series"
        );

        let fitted = spec.create().fit(births)?;
        let forecast = fitted.forecast_with_level(self.config.horizon, self.config.interval_level)?;
        let residual_diagnostics = residual_check(fitted.as_ref());

        Ok(FinalForecast {
            model: spec.name.to_string(),
            description: fitted.description(),
            forecast,
            residual_diagnostics,
        })
    }

    fn hypothesis(&self, fertility: &TimeSeries) -> Result<HypothesisSummary> {
        let split_year = self.config.split_year;
        let (before, after) = split_by_year(fertility, split_year);
        let test = welch_t_test(before.values(), after.values())?;
        let significant = test.is_significant(self.config.significance_threshold);
        info!(
            split_year,
            t = test.statistic,
            p_value = test.p_value,
            significant,
            "fertility rate before/after"
        );

        Ok(HypothesisSummary {
            split_year,
            n_before: before.len(),
            n_after: after.len(),
            test,
            significant,
        })
    }
}

/// Re-test the differenced series. A failed re-test is logged and dropped,
/// since only the levels analysis is required by later stages.
fn retest_differenced(
    births: &TimeSeries,
    levels: &StationarityReport,
    policy: DifferencingPolicy,
    significance: f64,
) -> Option<DifferencedAnalysis> {
    match apply_differencing(births, levels, policy, significance) {
        Ok(Some(diff)) => {
            info!(
                order = diff.order,
                p_value = diff.report.adf_pvalue,
                stationary = diff.report.is_stationary,
                "stationarity after differencing"
            );
            Some(diff)
        }
        Ok(None) => None,
        Err(e) => {
            warn!(error = %e, "differenced stationarity re-test skipped");
            None
        }
    }
}

fn summarize_split(train: &TimeSeries, test: &TimeSeries) -> Option<SplitSummary> {
    Some(SplitSummary {
        train_start: train.first_period()?,
        train_end: train.last_period()?,
        test_start: test.first_period()?,
        test_end: test.last_period()?,
    })
}

/// Ljung-Box on the residuals, excluding the variance from the fitted count.
fn residual_check(fitted: &dyn FittedModel) -> Option<LjungBoxResult> {
    let fitdf = fitted.n_params().saturating_sub(1);
    match ljung_box(fitted.residuals(), None, fitdf) {
        Ok(result) => {
            if !result.is_white_noise(0.05) {
                warn!(
                    q = result.statistic,
                    p_value = result.p_value,
                    "residual autocorrelation in final model"
                );
            }
            Some(result)
        }
        Err(e) => {
            debug!(error = %e, "residual diagnostics skipped");
            None
        }
    }
}

/// Convenience wrapper: configure, then run.
pub fn run(config: PipelineConfig, dataset: &Dataset) -> Result<PipelineReport> {
    Pipeline::new(config)?.run(dataset)
}

impl PipelineReport {
    /// Winning model id.
    pub fn best_model(&self) -> &str {
        &self.final_forecast.model
    }

    pub fn metric(&self) -> Metric {
        self.ranking.metric()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ForecastResult;
    use crate::evaluation::Metric;
    use crate::models::baseline::Naive;
    use crate::models::{Forecaster, ModelSpec};

    fn dataset() -> Dataset {
        let mut state = 5u64;
        let births = (0..50)
            .map(|t| {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                let e = ((state >> 33) as f64 / (1u64 << 31) as f64) - 0.5;
                650_000.0 + 1_500.0 * t as f64 + 20_000.0 * e
            })
            .collect();
        let fertility = (0..50)
            .map(|t| if t < 25 { 1.8 + 0.01 * (t % 3) as f64 } else { 1.6 + 0.01 * (t % 4) as f64 })
            .collect();
        Dataset {
            births: TimeSeries::from_start(1975, births).unwrap(),
            fertility: TimeSeries::from_start(1975, fertility).unwrap(),
        }
    }

    fn fast_config() -> PipelineConfig {
        let mut config = PipelineConfig::default();
        config.arima.max_p = 1;
        config.arima.max_q = 1;
        config
    }

    /// Forecaster that always fails to fit.
    struct Broken;

    impl Forecaster for Broken {
        fn fit(&self, train: &TimeSeries) -> Result<Box<dyn FittedModel>> {
            Err(ForecastError::model_fit("Broken", train.len(), "always fails"))
        }

        fn name(&self) -> &str {
            "Broken"
        }
    }

    #[test]
    fn full_run_produces_every_output() {
        let report = Pipeline::new(fast_config()).unwrap().run(&dataset()).unwrap();

        assert_eq!(report.split.test_start, 2015);
        assert_eq!(report.split.test_end, 2024);
        assert_eq!(report.comparison.len() + report.comparison.failures().len(), 3);
        assert_eq!(report.ranking.len(), report.comparison.len());
        assert_eq!(report.best_model(), report.ranking.model_ids()[0]);

        let fc = &report.final_forecast.forecast;
        assert_eq!(fc.horizon(), 10);
        assert_eq!(fc.periods()[0], 2025);

        assert_eq!(report.hypothesis.n_before, 25);
        assert!(report.hypothesis.test.statistic > 0.0);
        assert!(report.differenced.is_some());
    }

    #[test]
    fn failing_model_is_recorded_and_skipped() {
        let mut registry = ModelRegistry::new();
        registry.register(ModelSpec::new("Broken", || Box::new(Broken)));
        registry.register(ModelSpec::new("Naive", || Box::new(Naive::new())));

        let report = Pipeline::new(fast_config())
            .unwrap()
            .with_registry(registry)
            .run(&dataset())
            .unwrap();

        assert_eq!(report.comparison.failures().len(), 1);
        assert_eq!(report.comparison.failures()[0].model, "Broken");
        assert_eq!(report.best_model(), "Naive");
        let naive: &ForecastResult = &report.backtests[0].forecast;
        assert!(naive.point_estimates().iter().all(|&p| p == naive.point_estimates()[0]));
    }

    #[test]
    fn all_models_failing_is_a_fit_error() {
        let mut registry = ModelRegistry::new();
        registry.register(ModelSpec::new("Broken", || Box::new(Broken)));

        let err = Pipeline::new(fast_config())
            .unwrap()
            .with_registry(registry)
            .run(&dataset())
            .unwrap_err();
        assert!(matches!(err, ForecastError::ModelFit { ref model, .. } if model == "all models"));
    }

    #[test]
    fn horizon_too_long_is_a_split_error() {
        let mut config = fast_config();
        config.horizon = 50;
        let err = Pipeline::new(config).unwrap().run(&dataset()).unwrap_err();

        assert!(matches!(err, ForecastError::Stage { stage: Stage::Split, len: 50, horizon: 50, .. }));
        assert!(matches!(err.root(), ForecastError::InvalidHorizon { .. }));
    }

    #[test]
    fn hypothesis_needs_two_observations_per_side() {
        let mut config = fast_config();
        config.split_year = 1976;
        let err = Pipeline::new(config).unwrap().run(&dataset()).unwrap_err();
        assert!(matches!(err, ForecastError::Stage { stage: Stage::Hypothesis, .. }));
    }

    #[test]
    fn metric_choice_drives_ranking() {
        let mut config = fast_config();
        config.metric = Metric::Mae;
        let report = run(config, &dataset()).unwrap();
        assert_eq!(report.metric(), Metric::Mae);
    }

    fn straight_line(n: usize) -> TimeSeries {
        TimeSeries::from_start(1980, (0..n).map(|t| 600_000.0 + 1_000.0 * t as f64).collect())
            .unwrap()
    }

    #[test]
    fn failed_differenced_retest_is_dropped() {
        let linear = straight_line(40);
        let noisy = dataset().births;
        let levels = analyze(&noisy, 0.05).unwrap();

        // First differences of a straight line are constant, so their ADF regression is singular.
        assert!(apply_differencing(&linear, &levels, DifferencingPolicy::Single, 0.05).is_err());
        assert!(retest_differenced(&linear, &levels, DifferencingPolicy::Single, 0.05).is_none());
        assert!(retest_differenced(&noisy, &levels, DifferencingPolicy::Single, 0.05).is_some());
    }

    #[test]
    fn straight_line_births_still_forecast() {
        let births = straight_line(40);
        let fertility = (0..40)
            .map(|t| {
                let base = if t < 20 { 1.9 } else { 1.7 };
                base - 0.01 * (t % 7) as f64
            })
            .collect();
        let fertility = TimeSeries::from_start(1980, fertility).unwrap();
        let mut registry = ModelRegistry::new();
        registry.register(ModelSpec::new("Naive", || Box::new(Naive::new())));

        let report = Pipeline::new(fast_config())
            .unwrap()
            .with_registry(registry)
            .run(&Dataset { births, fertility })
            .unwrap();

        assert!(report.differenced.is_none());
        assert_eq!(report.best_model(), "Naive");
        assert_eq!(report.final_forecast.forecast.point_estimates()[0], 639_000.0);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = PipelineConfig::default();
        config.horizon = 0;
        assert!(Pipeline::new(config).is_err());
    }
}
