//! # natality-forecast
//!
//! Command-line front end: load a births/fertility CSV, run the pipeline and
//! print the comparison table, the final forecast and the fertility test.

use anyhow::{Context, Result};
use clap::Parser;
use natality_forecast::config::PipelineConfig;
use natality_forecast::data::load_csv;
use natality_forecast::evaluation::Metric;
use natality_forecast::pipeline::Pipeline;
use natality_forecast::report;
use natality_forecast::validation::DifferencingPolicy;
use std::path::PathBuf;
use tracing_subscriber::prelude::*;

#[derive(Parser, Debug)]
#[command(name = "natality-forecast", version)]
#[command(about = "Backtest naive, ETS and ARIMA forecasts of annual births", long_about = None)]
struct Cli {
    /// CSV file with year, births and fertility-rate columns
    input: PathBuf,

    /// TOML configuration file; flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Held-out periods and final forecast length
    #[arg(long)]
    horizon: Option<usize>,

    /// Significance level for stationarity and hypothesis decisions
    #[arg(long)]
    significance: Option<f64>,

    /// First year of the "after" fertility sample
    #[arg(long)]
    split_year: Option<i32>,

    /// Metric used to rank models
    #[arg(short, long, value_enum, ignore_case = true)]
    metric: Option<Metric>,

    /// Prediction interval coverage, e.g. 0.8
    #[arg(long)]
    level: Option<f64>,

    /// Keep differencing until stationary, up to this order
    #[arg(long, value_name = "MAX_ORDER")]
    until_stationary: Option<usize>,

    /// Fit ARIMA on the original scale instead of logs
    #[arg(long)]
    no_log: bool,

    /// Fit model candidates on one thread
    #[arg(long)]
    serial: bool,

    /// Write the full report as JSON
    #[arg(long, value_name = "PATH")]
    json: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn resolve_config(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_file(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => PipelineConfig::default(),
        };

        if let Some(horizon) = self.horizon {
            config.horizon = horizon;
        }
        if let Some(significance) = self.significance {
            config.significance_threshold = significance;
        }
        if let Some(year) = self.split_year {
            config.split_year = year;
        }
        if let Some(metric) = self.metric {
            config.metric = metric;
        }
        if let Some(level) = self.level {
            config.interval_level = level;
        }
        if let Some(max_order) = self.until_stationary {
            config.differencing = DifferencingPolicy::UntilStationary { max_order };
        }
        if self.no_log {
            config.arima.log_transform = false;
        }
        if self.serial {
            config.parallel = false;
        }

        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "natality_forecast=info",
        1 => "natality_forecast=debug",
        _ => "natality_forecast=trace",
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = cli.resolve_config()?;
    let dataset = load_csv(&cli.input, &config.columns)
        .with_context(|| format!("loading {}", cli.input.display()))?;
    tracing::info!(
        births = dataset.births.len(),
        fertility = dataset.fertility.len(),
        "loaded {}",
        cli.input.display()
    );

    let report = Pipeline::new(config)?.run(&dataset).context("pipeline failed")?;
    print!("{}", report::render_text(&report));

    if let Some(path) = &cli.json {
        report::write_json(&report, path)
            .with_context(|| format!("writing report to {}", path.display()))?;
        tracing::info!("report written to {}", path.display());
    }

    Ok(())
}
