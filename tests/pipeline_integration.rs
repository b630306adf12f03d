//! End-to-end tests: CSV on disk through to the rendered report.

use natality_forecast::config::{ColumnNames, PipelineConfig};
use natality_forecast::data::load_csv;
use natality_forecast::error::{ForecastError, Stage};
use natality_forecast::evaluation::Metric;
use natality_forecast::pipeline::Pipeline;
use natality_forecast::report;
use natality_forecast::validation::DifferencingPolicy;
use std::io::Write;
use tempfile::NamedTempFile;

/// Deterministic births-like table in the layout of a published spreadsheet.
///
/// Births fall then recover, with quoted thousands separators and two
/// leading years without a births figure. Fertility steps down after 2000.
fn write_births_csv() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "Year,Births,Fertility_Rate").unwrap();

    let mut state = 11u64;
    for year in 1958..=2022 {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        let e = ((state >> 33) as f64 / (1u64 << 31) as f64) - 0.5;
        let t = (year - 1958) as f64;
        let births = 780_000.0 - 4_000.0 * t + 90.0 * t * t + 12_000.0 * e;
        let fertility = if year < 2000 { 1.85 + 0.05 * e } else { 1.70 + 0.05 * e };

        if year < 1960 {
            writeln!(file, "{year},..,{fertility:.3}").unwrap();
        } else {
            let whole = births.round() as u64;
            writeln!(
                file,
                "{year},\"{},{:03}\",{fertility:.3}",
                whole / 1000,
                whole % 1000
            )
            .unwrap();
        }
    }
    file
}

fn fast_config() -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.arima.max_p = 2;
    config.arima.max_q = 2;
    config
}

#[test]
fn loads_cleans_and_forecasts() {
    let file = write_births_csv();
    let dataset = load_csv(file.path(), &ColumnNames::default()).unwrap();

    assert_eq!(dataset.births.first_period(), Some(1960));
    assert_eq!(dataset.births.last_period(), Some(2022));
    assert_eq!(dataset.fertility.first_period(), Some(1958));

    let report = Pipeline::new(fast_config()).unwrap().run(&dataset).unwrap();

    assert_eq!(report.split.test_start, 2013);
    assert_eq!(report.split.test_end, 2022);
    assert!(!report.ranking.is_empty());
    for backtest in &report.backtests {
        assert_eq!(backtest.forecast.periods(), (2013..=2022).collect::<Vec<_>>());
    }

    let final_forecast = &report.final_forecast.forecast;
    assert_eq!(final_forecast.periods()[0], 2023);
    assert_eq!(final_forecast.horizon(), 10);
    for p in final_forecast.points() {
        assert!(p.lower <= p.point && p.point <= p.upper);
    }

    assert_eq!(report.hypothesis.split_year, 2000);
    assert_eq!(report.hypothesis.n_before, 42);
    assert!(report.hypothesis.test.statistic > 0.0);
    assert!(report.hypothesis.significant);
}

#[test]
fn text_and_json_reports() {
    let file = write_births_csv();
    let dataset = load_csv(file.path(), &ColumnNames::default()).unwrap();
    let mut config = fast_config();
    config.metric = Metric::Mape;
    config.differencing = DifferencingPolicy::UntilStationary { max_order: 2 };
    let report = Pipeline::new(config).unwrap().run(&dataset).unwrap();

    let text = report::render_text(&report);
    assert!(text.contains("Ranked by MAPE"));
    assert!(text.contains("Welch t ="));
    assert!(text.contains(&report.final_forecast.description));

    let out = NamedTempFile::new().unwrap();
    report::write_json(&report, out.path()).unwrap();
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(out.path()).unwrap()).unwrap();

    assert_eq!(json["config"]["metric"], "mape");
    assert_eq!(json["final_forecast"]["model"], report.best_model());
    assert_eq!(json["final_forecast"]["forecast"]["points"].as_array().unwrap().len(), 10);
    assert!(json["stationarity"]["adf_pvalue"].is_number());
}

#[test]
fn config_file_drives_the_run() {
    let mut toml = NamedTempFile::new().unwrap();
    writeln!(
        toml,
        "horizon = 5\nsplit_year = 1990\nparallel = false\n\n[arima]\nmax_p = 1\nmax_q = 1\nlog_transform = false"
    )
    .unwrap();
    let config = PipelineConfig::from_file(toml.path()).unwrap();

    let file = write_births_csv();
    let dataset = load_csv(file.path(), &config.columns).unwrap();
    let report = Pipeline::new(config).unwrap().run(&dataset).unwrap();

    assert_eq!(report.final_forecast.forecast.horizon(), 5);
    assert_eq!(report.hypothesis.split_year, 1990);
    assert_eq!(report.split.test_start, 2018);
}

#[test]
fn short_series_fails_at_split_stage() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "year,births,fertility_rate").unwrap();
    for (i, year) in (2010..2018).enumerate() {
        let births = 700_000 + 1_000 * i + (i * i * 37) % 500;
        writeln!(file, "{year},{births},1.{}", 5 + i % 3).unwrap();
    }

    let dataset = load_csv(file.path(), &ColumnNames::default()).unwrap();
    let err = Pipeline::new(PipelineConfig::default())
        .unwrap()
        .run(&dataset)
        .unwrap_err();

    assert!(matches!(
        err,
        ForecastError::Stage { stage: Stage::Split, len: 8, horizon: 10, .. }
    ));
}

#[test]
fn malformed_input_aborts_before_modelling() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "year,births,fertility_rate\n2000,1000,1.6\n2000,1001,1.6").unwrap();
    assert!(matches!(
        load_csv(file.path(), &ColumnNames::default()),
        Err(ForecastError::Data(_))
    ));

    assert!(matches!(
        load_csv("/nonexistent/births.csv", &ColumnNames::default()),
        Err(ForecastError::Io(_))
    ));
}
