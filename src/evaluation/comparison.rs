//! Model comparison table and ranking.

use crate::evaluation::metrics::{AccuracyReport, Metric};
use serde::Serialize;
use std::cmp::Ordering;

/// A model that failed to produce a scored forecast.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelFailure {
    pub model: String,
    pub error: String,
}

/// Accuracy of every evaluated model, in insertion order, plus the failures.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ComparisonTable {
    entries: Vec<(String, AccuracyReport)>,
    failures: Vec<ModelFailure>,
}

impl ComparisonTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a scored model. Re-inserting an id replaces its report in place.
    pub fn insert(&mut self, model: impl Into<String>, report: AccuracyReport) {
        let model = model.into();
        match self.entries.iter_mut().find(|(id, _)| *id == model) {
            Some(entry) => entry.1 = report,
            None => self.entries.push((model, report)),
        }
    }

    /// Record a model that failed to fit, forecast or evaluate.
    pub fn record_failure(&mut self, model: impl Into<String>, error: impl ToString) {
        self.failures.push(ModelFailure {
            model: model.into(),
            error: error.to_string(),
        });
    }

    pub fn get(&self, model: &str) -> Option<&AccuracyReport> {
        self.entries
            .iter()
            .find(|(id, _)| id == model)
            .map(|(_, report)| report)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AccuracyReport)> {
        self.entries.iter().map(|(id, report)| (id.as_str(), report))
    }

    /// Number of scored models.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn failures(&self) -> &[ModelFailure] {
        &self.failures
    }
}

/// One row of a [`Ranking`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedModel {
    /// 1-based position.
    pub rank: usize,
    pub model: String,
    pub report: AccuracyReport,
}

/// Models ordered from best to worst by a metric.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ranking {
    metric: Metric,
    entries: Vec<RankedModel>,
}

impl Ranking {
    pub fn metric(&self) -> Metric {
        self.metric
    }

    /// Best model, if any model was scored.
    pub fn best(&self) -> Option<&RankedModel> {
        self.entries.first()
    }

    pub fn entries(&self) -> &[RankedModel] {
        &self.entries
    }

    /// Model ids from best to worst.
    pub fn model_ids(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.model.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Rank the models in `table` ascending by `metric`.
///
/// Ties fall through RMSE, MAE and MAPE in that order, then the model id.
///
/// # Example
///
/// ```
/// use natality_forecast::evaluation::{compare, AccuracyReport, ComparisonTable, Metric};
///
/// let mut table = ComparisonTable::new();
/// for (id, rmse) in [("Naive", 50.0), ("ETS", 30.0), ("ARIMA", 40.0)] {
///     table.insert(id, AccuracyReport { rmse, mae: rmse, mape: 1.0 });
/// }
///
/// let ranking = compare(&table, Metric::Rmse);
/// assert_eq!(ranking.model_ids(), ["ETS", "ARIMA", "Naive"]);
/// ```
pub fn compare(table: &ComparisonTable, metric: Metric) -> Ranking {
    let mut rows: Vec<(&str, &AccuracyReport)> = table.iter().collect();
    rows.sort_by(|(id_a, a), (id_b, b)| {
        std::iter::once(metric)
            .chain(Metric::PRIORITY)
            .map(|m| a.get(m).total_cmp(&b.get(m)))
            .find(|ordering| *ordering != Ordering::Equal)
            .unwrap_or_else(|| id_a.cmp(id_b))
    });

    let entries = rows
        .into_iter()
        .enumerate()
        .map(|(i, (model, report))| RankedModel {
            rank: i + 1,
            model: model.to_string(),
            report: *report,
        })
        .collect();

    Ranking { metric, entries }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(rmse: f64, mae: f64, mape: f64) -> AccuracyReport {
        AccuracyReport { rmse, mae, mape }
    }

    #[test]
    fn ranks_ascending_by_metric() {
        let mut table = ComparisonTable::new();
        table.insert("Naive", report(50.0, 10.0, 3.0));
        table.insert("ETS", report(30.0, 20.0, 1.0));
        table.insert("ARIMA", report(40.0, 5.0, 2.0));

        assert_eq!(compare(&table, Metric::Rmse).model_ids(), ["ETS", "ARIMA", "Naive"]);
        assert_eq!(compare(&table, Metric::Mae).model_ids(), ["ARIMA", "Naive", "ETS"]);
        assert_eq!(compare(&table, Metric::Mape).model_ids(), ["ETS", "ARIMA", "Naive"]);

        let ranking = compare(&table, Metric::Rmse);
        assert_eq!(ranking.best().map(|b| b.rank), Some(1));
        assert_eq!(ranking.metric(), Metric::Rmse);
    }

    #[test]
    fn ties_use_priority_then_id() {
        let mut table = ComparisonTable::new();
        table.insert("b", report(10.0, 4.0, 1.0));
        table.insert("a", report(10.0, 4.0, 1.0));
        table.insert("c", report(10.0, 3.0, 9.0));
        table.insert("d", report(9.0, 8.0, 1.0));

        // MAPE ties between a, b, d; RMSE breaks d out, MAE breaks nothing, id decides a < b.
        assert_eq!(compare(&table, Metric::Mape).model_ids(), ["d", "a", "b", "c"]);
        assert_eq!(compare(&table, Metric::Rmse).model_ids(), ["d", "c", "a", "b"]);
    }

    #[test]
    fn table_keeps_insertion_order_and_failures() {
        let mut table = ComparisonTable::new();
        table.insert("Naive", report(1.0, 1.0, 1.0));
        table.insert("ETS", report(2.0, 2.0, 2.0));
        table.insert("Naive", report(3.0, 3.0, 3.0));
        table.record_failure("ARIMA", "no order");

        let ids: Vec<&str> = table.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, ["Naive", "ETS"]);
        assert_eq!(table.get("Naive").map(|r| r.rmse), Some(3.0));
        assert_eq!(table.failures()[0].model, "ARIMA");
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn empty_table_has_no_best() {
        let ranking = compare(&ComparisonTable::new(), Metric::Rmse);
        assert!(ranking.is_empty());
        assert!(ranking.best().is_none());
    }
}
