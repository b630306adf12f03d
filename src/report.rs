//! Plain-text and JSON rendering of a [`PipelineReport`].

use crate::core::ForecastResult;
use crate::error::{ForecastError, Result};
use crate::evaluation::{ComparisonTable, Ranking};
use crate::pipeline::{HypothesisSummary, PipelineReport};
use crate::validation::StationarityReport;
use std::fmt::Write as _;
use std::path::Path;

/// Stationarity diagnostics for levels and, when present, differences.
pub fn stationarity_summary(report: &PipelineReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Stationarity (ADF, constant)");
    write_adf_line(&mut out, "levels", &report.stationarity);
    if let Some(diff) = &report.differenced {
        write_adf_line(&mut out, &format!("diff order {}", diff.order), &diff.report);
    }
    let cv = &report.stationarity.critical_values;
    let _ = writeln!(
        out,
        "  critical values: 1% {:.3}  5% {:.3}  10% {:.3}",
        cv.cv_1pct, cv.cv_5pct, cv.cv_10pct
    );
    out
}

fn write_adf_line(out: &mut String, label: &str, report: &StationarityReport) {
    let _ = writeln!(
        out,
        "  {:<14} stat {:>8.3}  p {:>6.4}  lags {:>2}  {}",
        label,
        report.adf_statistic,
        report.adf_pvalue,
        report.adf_lags,
        if report.is_stationary {
            "stationary"
        } else {
            "unit root not rejected"
        }
    );
}

/// Accuracy table in ranking order, followed by any failed models.
pub fn comparison_table(table: &ComparisonTable, ranking: &Ranking) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<4} {:<10} {:>14} {:>14} {:>10}",
        "Rank", "Model", "RMSE", "MAE", "MAPE %"
    );
    for entry in ranking.entries() {
        let _ = writeln!(
            out,
            "{:<4} {:<10} {:>14.2} {:>14.2} {:>10.3}",
            entry.rank, entry.model, entry.report.rmse, entry.report.mae, entry.report.mape
        );
    }
    for failure in table.failures() {
        let _ = writeln!(out, "  -  {:<10} failed: {}", failure.model, failure.error);
    }
    let _ = writeln!(out, "Ranked by {}", ranking.metric());
    out
}

/// Forecast rows with interval bounds.
pub fn forecast_table(forecast: &ForecastResult) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} ({:.0}% interval)",
        forecast.model(),
        forecast.level() * 100.0
    );
    let _ = writeln!(out, "{:<6} {:>14} {:>14} {:>14}", "Year", "Forecast", "Lower", "Upper");
    for p in forecast.points() {
        let _ = writeln!(
            out,
            "{:<6} {:>14.1} {:>14.1} {:>14.1}",
            p.period, p.point, p.lower, p.upper
        );
    }
    out
}

pub fn hypothesis_summary(summary: &HypothesisSummary) -> String {
    let t = &summary.test;
    format!(
        "Fertility rate before {year} (n={nb}, mean {ma:.3}) vs from {year} (n={na}, mean {mb:.3})\n  \
         Welch t = {stat:.3}, df = {df:.1}, p = {p:.4}{flag}\n",
        year = summary.split_year,
        nb = summary.n_before,
        na = summary.n_after,
        ma = t.mean_a,
        mb = t.mean_b,
        stat = t.statistic,
        df = t.df,
        p = t.p_value,
        flag = if summary.significant { " (significant)" } else { "" },
    )
}

/// All text sections of a report.
pub fn render_text(report: &PipelineReport) -> String {
    let mut out = String::new();
    out.push_str(&stationarity_summary(report));
    out.push('\n');
    out.push_str(&comparison_table(&report.comparison, &report.ranking));
    out.push('\n');
    out.push_str(&forecast_table(&report.final_forecast.forecast));
    if let Some(lb) = &report.final_forecast.residual_diagnostics {
        let _ = writeln!(
            out,
            "Ljung-Box on residuals: Q = {:.3}, lags {}, p = {:.4}",
            lb.statistic, lb.lags, lb.p_value
        );
    }
    out.push('\n');
    out.push_str(&hypothesis_summary(&report.hypothesis));
    out
}

pub fn to_json(report: &PipelineReport) -> Result<String> {
    serde_json::to_string_pretty(report)
        .map_err(|e| ForecastError::Computation(format!("failed to serialise report: {e}")))
}

/// Write the report as pretty JSON.
pub fn write_json(report: &PipelineReport, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let json = to_json(report)?;
    std::fs::write(path, json)
        .map_err(|e| ForecastError::Io(format!("failed to write '{}': {e}", path.display())))
}
