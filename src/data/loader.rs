//! CSV ingest and cleaning.
//!
//! Turns a spreadsheet export with a year column, a births column and a
//! fertility-rate column into two contiguous year-indexed series. Published
//! tables pad numbers with thousands separators and mark unavailable cells
//! with placeholders such as `..` or `:`; both are handled here so the rest
//! of the crate only sees clean values.

use crate::config::ColumnNames;
use crate::core::TimeSeries;
use crate::error::{ForecastError, Result};
use chrono::{Datelike, NaiveDate};
use csv::StringRecord;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Cell contents treated as missing.
const MISSING_MARKERS: [&str; 6] = ["", "-", "..", ":", "na", "n/a"];

/// The two series a pipeline run consumes.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub births: TimeSeries,
    pub fertility: TimeSeries,
}

/// Load a dataset from a CSV file.
pub fn load_csv(path: impl AsRef<Path>, columns: &ColumnNames) -> Result<Dataset> {
    let path = path.as_ref();
    let file = File::open(path)
        .map_err(|e| ForecastError::Io(format!("failed to open '{}': {e}", path.display())))?;
    read_dataset(file, columns)
}

/// Load a dataset from any CSV reader.
///
/// # Example
///
/// ```
/// use natality_forecast::config::ColumnNames;
/// use natality_forecast::data::read_dataset;
///
/// let csv = "Year,Births,Fertility_Rate\n2001,\"669,123\",1.63\n2002,\"668,777\",1.64\n";
/// let data = read_dataset(csv.as_bytes(), &ColumnNames::default()).unwrap();
/// assert_eq!(data.births.values(), &[669_123.0, 668_777.0]);
/// assert_eq!(data.fertility.first_period(), Some(2001));
/// ```
pub fn read_dataset<R: Read>(reader: R, columns: &ColumnNames) -> Result<Dataset> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader.headers()?.clone();
    let year_idx = find_column(&headers, &columns.year)?;
    let births_idx = find_column(&headers, &columns.births)?;
    let fertility_idx = find_column(&headers, &columns.fertility)?;

    let mut rows: Vec<(i32, Option<f64>, Option<f64>)> = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        // Header is line 1.
        let line = idx + 2;
        let record = record?;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }

        let cell = |i: usize| record.get(i).unwrap_or("");
        let year = parse_year(cell(year_idx))
            .map_err(|e| ForecastError::Data(format!("line {line}: {e}")))?;
        let births = parse_number(cell(births_idx))
            .map_err(|e| ForecastError::Data(format!("line {line}: {e}")))?;
        let fertility = parse_number(cell(fertility_idx))
            .map_err(|e| ForecastError::Data(format!("line {line}: {e}")))?;
        rows.push((year, births, fertility));
    }

    rows.sort_by_key(|&(year, _, _)| year);
    if let Some(w) = rows.windows(2).find(|w| w[0].0 == w[1].0) {
        return Err(ForecastError::Data(format!("duplicate year {}", w[0].0)));
    }
    debug!(rows = rows.len(), "read CSV rows");

    let births = clean_column(
        rows.iter().map(|&(year, births, _)| (year, births)),
        &columns.births,
    )?;
    let fertility = clean_column(
        rows.iter().map(|&(year, _, fertility)| (year, fertility)),
        &columns.fertility,
    )?;

    Ok(Dataset { births, fertility })
}

fn find_column(headers: &StringRecord, name: &str) -> Result<usize> {
    let wanted = normalise_header(name);
    headers
        .iter()
        .position(|h| normalise_header(h) == wanted)
        .ok_or_else(|| {
            let available: Vec<&str> = headers.iter().collect();
            ForecastError::Data(format!(
                "missing column '{}' (available: {})",
                name,
                available.join(", ")
            ))
        })
}

fn normalise_header(header: &str) -> String {
    header
        .trim()
        .trim_start_matches('\u{feff}')
        .trim_matches('"')
        .to_lowercase()
}

fn strip_cell(cell: &str) -> &str {
    cell.trim().trim_matches('"').trim()
}

fn is_missing(cell: &str) -> bool {
    let lowered = cell.to_ascii_lowercase();
    MISSING_MARKERS.contains(&lowered.as_str())
}

/// Parse a year cell: `2001`, `2001.0` or an ISO date such as `2001-07-01`.
pub fn parse_year(cell: &str) -> std::result::Result<i32, String> {
    let cell = strip_cell(cell);
    if is_missing(cell) {
        return Err("missing year".to_string());
    }
    if let Ok(year) = cell.parse::<i32>() {
        return Ok(year);
    }
    if let Ok(value) = cell.parse::<f64>() {
        if value.fract() == 0.0 && value.abs() < i32::MAX as f64 {
            return Ok(value as i32);
        }
    }
    for format in ["%Y-%m-%d", "%d/%m/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(cell, format) {
            return Ok(date.year());
        }
    }
    Err(format!("invalid year '{cell}'"))
}

/// Parse a numeric cell, stripping quotes, spaces and thousands separators.
///
/// Returns `Ok(None)` for missing markers.
pub fn parse_number(cell: &str) -> std::result::Result<Option<f64>, String> {
    let cell = strip_cell(cell);
    if is_missing(cell) {
        return Ok(None);
    }
    let cleaned: String = cell
        .chars()
        .filter(|c| !matches!(c, ',' | ' ' | '\u{a0}' | '_'))
        .collect();
    match cleaned.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(Some(v)),
        _ => Err(format!("invalid number '{cell}'")),
    }
}

/// Drop leading and trailing missing cells, then require a complete run of years.
fn clean_column(
    cells: impl Iterator<Item = (i32, Option<f64>)>,
    column: &str,
) -> Result<TimeSeries> {
    let cells: Vec<(i32, Option<f64>)> = cells.collect();
    let first = cells.iter().position(|(_, v)| v.is_some());
    let last = cells.iter().rposition(|(_, v)| v.is_some());
    let (first, last) = match (first, last) {
        (Some(first), Some(last)) => (first, last),
        _ => {
            return Err(ForecastError::Data(format!(
                "column '{column}' has no values"
            )))
        }
    };
    if first > 0 {
        debug!(column, dropped = first, "dropped leading rows with missing values");
    }

    let mut periods = Vec::with_capacity(last - first + 1);
    let mut values = Vec::with_capacity(last - first + 1);
    for &(year, value) in &cells[first..=last] {
        let value = value.ok_or_else(|| {
            ForecastError::Data(format!("column '{column}' is missing a value for {year}"))
        })?;
        periods.push(year);
        values.push(value);
    }

    TimeSeries::new(periods, values)
        .map_err(|e| ForecastError::Data(format!("column '{column}': {}", strip_prefix(&e))))
        .map(|series| series.with_name(column))
}

fn strip_prefix(err: &ForecastError) -> String {
    match err {
        ForecastError::Data(msg) => msg.clone(),
        other => other.to_string(),
    }
}
