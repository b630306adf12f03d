//! Forecast result structure holding point predictions and intervals.

use crate::error::{ForecastError, Result};
use serde::Serialize;

/// One forecast step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ForecastPoint {
    pub period: i32,
    pub point: f64,
    pub lower: f64,
    pub upper: f64,
}

/// Point forecasts with prediction intervals for consecutive periods.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastResult {
    model: String,
    level: f64,
    points: Vec<ForecastPoint>,
}

impl ForecastResult {
    /// Build a forecast whose first step falls in `first_period`.
    pub fn new(
        model: impl Into<String>,
        level: f64,
        first_period: i32,
        point: Vec<f64>,
        lower: Vec<f64>,
        upper: Vec<f64>,
    ) -> Result<Self> {
        if point.len() != lower.len() || point.len() != upper.len() {
            return Err(ForecastError::Computation(format!(
                "interval lengths differ: point {}, lower {}, upper {}",
                point.len(),
                lower.len(),
                upper.len()
            )));
        }

        let points = point
            .into_iter()
            .zip(lower)
            .zip(upper)
            .enumerate()
            .map(|(i, ((point, lower), upper))| ForecastPoint {
                period: first_period + i as i32,
                point,
                lower,
                upper,
            })
            .collect();

        Ok(Self {
            model: model.into(),
            level,
            points,
        })
    }

    /// Model description that produced the forecast.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Nominal coverage of the intervals.
    pub fn level(&self) -> f64 {
        self.level
    }

    pub fn horizon(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[ForecastPoint] {
        &self.points
    }

    pub fn periods(&self) -> Vec<i32> {
        self.points.iter().map(|p| p.period).collect()
    }

    pub fn point_estimates(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.point).collect()
    }

    pub fn lower(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.lower).collect()
    }

    pub fn upper(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.upper).collect()
    }

    /// Map every point and bound through `f` independently.
    ///
    /// Used to undo a monotone transform such as `ln`: each bound is mapped on
    /// its own so quantiles stay quantiles.
    pub fn map_values<F>(self, f: F) -> Self
    where
        F: Fn(f64) -> f64,
    {
        let points = self
            .points
            .into_iter()
            .map(|p| ForecastPoint {
                period: p.period,
                point: f(p.point),
                lower: f(p.lower),
                upper: f(p.upper),
            })
            .collect();
        Self {
            model: self.model,
            level: self.level,
            points,
        }
    }
}
