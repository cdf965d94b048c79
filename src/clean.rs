//! Required-column validation and missing-value handling.

use std::collections::BTreeSet;

use log::debug;

use crate::data::model::{Table, Value};
use crate::error::SchemaError;
use crate::stats::mean;

/// Columns the pipeline cannot run without.
pub const DEFAULT_REQUIRED_COLUMNS: [&str; 4] = ["Group", "eTIV", "nWBV", "ASF"];

/// Validate and clean `table` against `required_columns`.
///
/// 1. Every required column must exist, otherwise all absent names are
///    reported at once and nothing else happens.
/// 2. Rows with a missing value in any required column are dropped.
/// 3. Remaining gaps in numeric required columns are filled with the mean
///    of that column's present values.
/// 4. The result holds exactly `required_columns`, in that order.
pub fn clean<S: AsRef<str>>(table: &Table, required_columns: &[S]) -> Result<Table, SchemaError> {
    if required_columns.is_empty() {
        return Err(SchemaError::NoRequiredColumns);
    }

    let mut missing: Vec<String> = Vec::new();
    for name in required_columns.iter().map(|n| n.as_ref()) {
        if !table.has_column(name) && !missing.iter().any(|m| m == name) {
            missing.push(name.to_string());
        }
    }
    if !missing.is_empty() {
        return Err(SchemaError::MissingColumns { missing });
    }

    let mut seen = BTreeSet::new();
    if let Some(dup) = required_columns.iter().map(|n| n.as_ref()).find(|n| !seen.insert(*n)) {
        return Err(SchemaError::DuplicateRequired(dup.to_string()));
    }

    let required: Vec<_> = required_columns
        .iter()
        .filter_map(|name| table.column(name.as_ref()))
        .collect();

    let keep: Vec<usize> = (0..table.num_rows())
        .filter(|&row| required.iter().all(|col| !col.values[row].is_missing()))
        .collect();
    debug!(
        "dropped {} of {} rows with missing required values",
        table.num_rows() - keep.len(),
        table.num_rows()
    );

    let mut cleaned = table.select(required_columns)?.take_rows(&keep);

    for name in required_columns {
        impute_mean(&mut cleaned, name.as_ref());
    }

    Ok(cleaned)
}

/// Replace missing cells of a numeric column with the mean of its present
/// values. Non-numeric and all-missing columns are left untouched.
fn impute_mean(table: &mut Table, name: &str) {
    let Some(col) = table.column_mut(name) else {
        return;
    };
    if !col.kind().is_numeric() {
        return;
    }

    let present = col.present_f64();
    if present.is_empty() || present.len() == col.len() {
        return;
    }
    let mean = mean(&present);

    let mut filled = 0usize;
    for v in col.values.iter_mut().filter(|v| v.is_missing()) {
        *v = Value::Float(mean);
        filled += 1;
    }
    debug!("imputed {filled} values in '{name}' with mean {mean}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{Column, ColumnKind};

    fn with_gaps() -> Table {
        Table::new(vec![
            Column::new("Group", vec!["A".into(), "B".into(), "A".into(), "B".into()]),
            Column::new("eTIV", vec![1400.0.into(), Value::Float(f64::NAN), 1600.0.into(), 1500.0.into()]),
            Column::new("nWBV", vec![0.7.into(), 0.75.into(), Value::Null, 0.72.into()]),
            Column::new("ASF", vec![0.9.into(), 0.85.into(), 0.88.into(), Value::Null]),
        ])
        .unwrap()
    }

    #[test]
    fn test_missing_columns_all_reported() {
        let table = Table::new(vec![
            Column::new("Group", vec!["A".into(), "B".into()]),
            Column::new("eTIV", vec![1400i64.into(), 1500i64.into()]),
        ])
        .unwrap();

        let err = clean(&table, &DEFAULT_REQUIRED_COLUMNS).unwrap_err();
        assert_eq!(
            err,
            SchemaError::MissingColumns {
                missing: vec!["nWBV".into(), "ASF".into()]
            }
        );
        assert!(err.to_string().starts_with("Missing required columns"));
    }

    #[test]
    fn test_empty_required_list() {
        let required: [&str; 0] = [];
        assert_eq!(clean(&with_gaps(), &required).unwrap_err(), SchemaError::NoRequiredColumns);
    }

    #[test]
    fn test_duplicate_required_column() {
        let err = clean(&with_gaps(), &["Group", "eTIV", "Group"]).unwrap_err();
        assert_eq!(err, SchemaError::DuplicateRequired("Group".into()));
    }

    #[test]
    fn test_missing_check_runs_before_duplicate_check() {
        let err = clean(&with_gaps(), &["X", "Group", "X"]).unwrap_err();
        assert_eq!(err, SchemaError::MissingColumns { missing: vec!["X".into()] });
    }

    #[test]
    fn test_surviving_rows_keep_input_order() {
        let table = Table::new(vec![
            Column::new("Group", vec!["C".into(), "A".into(), "B".into(), "A".into(), "B".into()]),
            Column::new(
                "eTIV",
                vec![1500i64.into(), Value::Null, 1400i64.into(), 1450i64.into(), 1600i64.into()],
            ),
            Column::new("nWBV", vec![0.7.into(), 0.71.into(), 0.72.into(), Value::Null, 0.74.into()]),
            Column::new("ASF", vec![0.9.into(), 0.91.into(), 0.92.into(), 0.93.into(), 0.94.into()]),
        ])
        .unwrap();

        // Rows 1 and 3 are dropped.
        let cleaned = clean(&table, &DEFAULT_REQUIRED_COLUMNS).unwrap();
        assert_eq!(
            cleaned.column("Group").unwrap().values,
            vec![Value::from("C"), "B".into(), "B".into()]
        );
        assert_eq!(
            cleaned.column("eTIV").unwrap().values,
            vec![Value::Integer(1500), Value::Integer(1400), Value::Integer(1600)]
        );
        assert_eq!(cleaned.column("ASF").unwrap().values, vec![Value::Float(0.9), 0.92.into(), 0.94.into()]);
    }

    #[test]
    fn test_no_missing_values_after_clean() {
        let cleaned = clean(&with_gaps(), &DEFAULT_REQUIRED_COLUMNS).unwrap();
        for col in cleaned.columns() {
            assert_eq!(col.missing_count(), 0, "column {}", col.name);
        }
        // Rows 1, 2 and 3 each miss a required value.
        assert_eq!(cleaned.num_rows(), 1);
    }

    #[test]
    fn test_extra_columns_dropped_and_order_follows_required() {
        let table = Table::new(vec![
            Column::new("extra_col", vec![1i64.into(), 2i64.into()]),
            Column::new("ASF", vec![0.9.into(), 0.85.into()]),
            Column::new("nWBV", vec![0.7.into(), 0.75.into()]),
            Column::new("eTIV", vec![1400i64.into(), 1500i64.into()]),
            Column::new("Group", vec!["A".into(), "B".into()]),
        ])
        .unwrap();

        let cleaned = clean(&table, &DEFAULT_REQUIRED_COLUMNS).unwrap();
        assert_eq!(cleaned.column_names(), DEFAULT_REQUIRED_COLUMNS.to_vec());
    }

    #[test]
    fn test_clean_input_is_projection() {
        let table = Table::new(vec![
            Column::new("Group", vec!["B".into(), "A".into()]),
            Column::new("eTIV", vec![1500i64.into(), 1400i64.into()]),
            Column::new("nWBV", vec![0.75.into(), 0.7.into()]),
            Column::new("ASF", vec![0.85.into(), 0.9.into()]),
            Column::new("Age", vec![Value::Null, 80i64.into()]),
        ])
        .unwrap();

        let cleaned = clean(&table, &DEFAULT_REQUIRED_COLUMNS).unwrap();
        assert_eq!(cleaned, table.select(&DEFAULT_REQUIRED_COLUMNS).unwrap());
    }

    #[test]
    fn test_missing_outside_required_does_not_drop_rows() {
        let table = Table::new(vec![
            Column::new("Group", vec!["A".into(), "B".into()]),
            Column::new("eTIV", vec![1400i64.into(), 1500i64.into()]),
            Column::new("SES", vec![Value::Null, Value::Null]),
        ])
        .unwrap();

        let cleaned = clean(&table, &["Group", "eTIV"]).unwrap();
        assert_eq!(cleaned.num_rows(), 2);
    }

    #[test]
    fn test_impute_mean_fills_gaps() {
        let mut table = Table::new(vec![
            Column::new("eTIV", vec![1400i64.into(), Value::Null, 1600i64.into()]),
            Column::new("Group", vec!["A".into(), Value::Null, "B".into()]),
        ])
        .unwrap();

        impute_mean(&mut table, "eTIV");
        impute_mean(&mut table, "Group");

        let etiv = table.column("eTIV").unwrap();
        assert_eq!(etiv.values[1], Value::Float(1500.0));
        assert_eq!(etiv.kind(), ColumnKind::Float);
        // Text columns are never imputed.
        assert_eq!(table.column("Group").unwrap().values[1], Value::Null);
    }

    #[test]
    fn test_impute_all_missing_column_untouched() {
        let mut table = Table::new(vec![Column::new("x", vec![Value::Null, Value::Null])]).unwrap();
        impute_mean(&mut table, "x");
        assert_eq!(table.column("x").unwrap().missing_count(), 2);
    }
}
