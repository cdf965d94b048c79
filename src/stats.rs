//! Per-group descriptive statistics for one metric column.

use std::collections::BTreeMap;

use log::debug;
use serde::Serialize;

use crate::data::model::{ColumnKind, Table, Value};
use crate::error::AggregateError;

/// Grouping column used when the caller does not name one.
pub const DEFAULT_GROUP_COLUMN: &str = "Group";

/// Four-number summary of one metric within one group.
///
/// A group whose metric values are all missing gets `NaN` everywhere and a
/// `count` of zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Summary {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub median: f64,
    /// Number of present values the statistics were computed over.
    #[serde(skip)]
    pub count: usize,
}

impl Summary {
    /// Summarise a slice of values, ignoring NaN.
    pub fn from_values(values: &[f64]) -> Self {
        let mut present: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
        if present.is_empty() {
            return Summary {
                mean: f64::NAN,
                min: f64::NAN,
                max: f64::NAN,
                median: f64::NAN,
                count: 0,
            };
        }

        present.sort_by(f64::total_cmp);
        Summary {
            mean: mean(&present),
            min: present[0],
            max: present[present.len() - 1],
            median: median_sorted(&present),
            count: present.len(),
        }
    }
}

/// Group key → summary, ordered by key.
pub type GroupSummary = BTreeMap<Value, Summary>;

/// Computes the arithmetic mean of a slice of values. Returns NaN for empty input.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Median of already sorted values; even counts average the middle pair.
fn median_sorted(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return f64::NAN;
    }
    if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    }
}

/// Quantile `q` in `[0, 1]` of sorted values, linearly interpolating
/// between the closest ranks. NaN for empty input.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

/// Summarise `metric` per distinct value of `group_column`.
///
/// Fails when either column is absent, when the metric is not numeric, or
/// when the table has no rows. Rows with a missing metric value are skipped;
/// rows with a missing group key belong to no group.
pub fn aggregate(
    table: &Table,
    metric: &str,
    group_column: &str,
) -> Result<GroupSummary, AggregateError> {
    let values = table.column(metric).ok_or_else(|| AggregateError::UnknownColumn {
        column: metric.to_string(),
    })?;
    let groups = table
        .column(group_column)
        .ok_or_else(|| AggregateError::UnknownColumn {
            column: group_column.to_string(),
        })?;

    if table.is_empty() {
        return Err(AggregateError::EmptyInput);
    }
    if matches!(values.kind(), ColumnKind::Text | ColumnKind::Bool) {
        return Err(AggregateError::NonNumeric {
            column: metric.to_string(),
        });
    }

    let mut partitions: BTreeMap<Value, Vec<f64>> = BTreeMap::new();
    for (key, value) in groups.group_keys().into_iter().zip(&values.values) {
        if key.is_missing() {
            continue;
        }
        let series = partitions.entry(key).or_default();
        if let Some(v) = value.as_f64().filter(|v| !v.is_nan()) {
            series.push(v);
        }
    }

    let summary: GroupSummary = partitions
        .into_iter()
        .map(|(key, series)| (key, Summary::from_values(&series)))
        .collect();

    debug!("aggregated '{metric}' over {} groups", summary.len());
    Ok(summary)
}

/// [`aggregate`] grouped by [`DEFAULT_GROUP_COLUMN`].
pub fn aggregate_default(table: &Table, metric: &str) -> Result<GroupSummary, AggregateError> {
    aggregate(table, metric, DEFAULT_GROUP_COLUMN)
}

/// Run [`aggregate`] once per metric. Stops at the first failure.
pub fn aggregate_all<S: AsRef<str>>(
    table: &Table,
    metrics: &[S],
    group_column: &str,
) -> Result<BTreeMap<String, GroupSummary>, AggregateError> {
    metrics
        .iter()
        .map(|m| {
            let m = m.as_ref();
            aggregate(table, m, group_column).map(|s| (m.to_string(), s))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::filter::filter_rows;
    use crate::data::model::Column;
    use std::collections::BTreeSet;

    fn cohort() -> Table {
        Table::new(vec![
            Column::new(
                "Group",
                vec!["A".into(), "B".into(), "A".into(), "B".into(), "A".into(), "B".into()],
            ),
            Column::new(
                "eTIV",
                [1400, 1500, 1450, 1550, 1425, 1525].into_iter().map(Value::Integer).collect(),
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_aggregate_two_groups() {
        let summary = aggregate_default(&cohort(), "eTIV").unwrap();

        let a = summary[&Value::from("A")];
        assert_eq!(a.mean, 1425.0);
        assert_eq!(a.min, 1400.0);
        assert_eq!(a.max, 1450.0);
        assert_eq!(a.median, 1425.0);

        let b = summary[&Value::from("B")];
        assert_eq!(b.mean, 1525.0);
        assert_eq!(b.min, 1500.0);
        assert_eq!(b.max, 1550.0);
        assert_eq!(b.median, 1525.0);
    }

    #[test]
    fn test_keys_are_sorted() {
        let table = Table::new(vec![
            Column::new("Group", vec!["Nondemented".into(), "Converted".into(), "Demented".into()]),
            Column::new("ASF", vec![1.0.into(), 2.0.into(), 3.0.into()]),
        ])
        .unwrap();
        let keys: Vec<String> = aggregate_default(&table, "ASF")
            .unwrap()
            .keys()
            .map(ToString::to_string)
            .collect();
        assert_eq!(keys, vec!["Converted", "Demented", "Nondemented"]);
    }

    #[test]
    fn test_even_count_median_interpolates() {
        let s = Summary::from_values(&[4.0, 1.0, 3.0, 2.0]);
        assert_eq!(s.median, 2.5);
        assert_eq!(s.count, 4);
    }

    #[test]
    fn test_quantile_interpolates() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile_sorted(&sorted, 0.0), 1.0);
        assert_eq!(quantile_sorted(&sorted, 0.5), 2.5);
        assert_eq!(quantile_sorted(&sorted, 0.25), 1.75);
        assert_eq!(quantile_sorted(&sorted, 1.0), 4.0);
        assert!(quantile_sorted(&[], 0.5).is_nan());
    }

    #[test]
    fn test_single_group_input() {
        let only_a = filter_rows(&cohort(), "Group", &BTreeSet::from(["A".into()])).unwrap();
        let summary = aggregate_default(&only_a, "eTIV").unwrap();
        assert_eq!(summary.len(), 1);
        assert!(summary.contains_key(&Value::from("A")));
    }

    #[test]
    fn test_empty_input_is_an_error() {
        let empty = cohort().take_rows(&[]);
        assert_eq!(aggregate_default(&empty, "eTIV").unwrap_err(), AggregateError::EmptyInput);
    }

    #[test]
    fn test_unknown_metric() {
        let err = aggregate_default(&cohort(), "NotAColumn").unwrap_err();
        assert_eq!(
            err,
            AggregateError::UnknownColumn {
                column: "NotAColumn".into()
            }
        );
    }

    #[test]
    fn test_unknown_group_column() {
        let err = aggregate(&cohort(), "eTIV", "Cohort").unwrap_err();
        assert!(matches!(err, AggregateError::UnknownColumn { column } if column == "Cohort"));
    }

    #[test]
    fn test_text_metric_rejected() {
        let err = aggregate_default(&cohort(), "Group").unwrap_err();
        assert!(matches!(err, AggregateError::NonNumeric { .. }));
    }

    #[test]
    fn test_missing_metric_value_is_skipped() {
        let mut table = cohort();
        table.column_mut("eTIV").unwrap().values[0] = Value::Null;

        let a = aggregate_default(&table, "eTIV").unwrap()[&Value::from("A")];
        assert_eq!(a.count, 2);
        assert_eq!(a.mean, 1437.5);
        assert_eq!(a.median, 1437.5);
        assert_eq!(a.min, 1425.0);
    }

    #[test]
    fn test_all_missing_group_yields_nan() {
        let table = Table::new(vec![
            Column::new("Group", vec!["A".into(), "B".into()]),
            Column::new("nWBV", vec![Value::Null, 0.7.into()]),
        ])
        .unwrap();

        let summary = aggregate_default(&table, "nWBV").unwrap();
        let a = summary[&Value::from("A")];
        assert!(a.mean.is_nan() && a.min.is_nan() && a.max.is_nan() && a.median.is_nan());
        assert_eq!(summary[&Value::from("B")].mean, 0.7);
    }

    #[test]
    fn test_aggregate_is_idempotent() {
        let table = cohort();
        assert_eq!(
            aggregate_default(&table, "eTIV").unwrap(),
            aggregate_default(&table, "eTIV").unwrap()
        );
    }

    #[test]
    fn test_aggregate_all_per_metric() {
        let all = aggregate_all(&cohort(), &["eTIV"], DEFAULT_GROUP_COLUMN).unwrap();
        assert_eq!(all.len(), 1);
        assert!(aggregate_all(&cohort(), &["eTIV", "ASF"], DEFAULT_GROUP_COLUMN).is_err());
    }

    #[test]
    fn test_mixed_numeric_group_keys_merge() {
        let table = Table::new(vec![
            Column::new("CDR", vec![0i64.into(), 0.5.into(), 0.0.into()]),
            Column::new("eTIV", vec![1400i64.into(), 1500i64.into(), 1450i64.into()]),
        ])
        .unwrap();

        let summary = aggregate(&table, "eTIV", "CDR").unwrap();
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[&Value::Float(0.0)].count, 2);
        assert_eq!(summary[&Value::Float(0.0)].mean, 1425.0);
    }
}
