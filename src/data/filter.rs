use std::collections::{BTreeMap, BTreeSet};

use super::model::{Table, Value};
use crate::error::TableError;

// ---------------------------------------------------------------------------
// Row filter: keep rows whose value in one column is selected
// ---------------------------------------------------------------------------

/// Return indices of rows whose value in `column` is in `selected`.
///
/// An empty selection matches nothing. Missing cells only match when
/// `Value::Null` is selected.
pub fn filtered_indices(
    table: &Table,
    column: &str,
    selected: &BTreeSet<Value>,
) -> Result<Vec<usize>, TableError> {
    let col = table
        .column(column)
        .ok_or_else(|| TableError::UnknownColumn(column.to_string()))?;

    Ok(col
        .values
        .iter()
        .enumerate()
        .filter(|(_, v)| {
            if v.is_missing() {
                selected.contains(&Value::Null)
            } else {
                selected.contains(*v)
            }
        })
        .map(|(i, _)| i)
        .collect())
}

/// Rows of `table` passing [`filtered_indices`], in their original order.
pub fn filter_rows(
    table: &Table,
    column: &str,
    selected: &BTreeSet<Value>,
) -> Result<Table, TableError> {
    let indices = filtered_indices(table, column, selected)?;
    Ok(table.take_rows(&indices))
}

/// Split a table into one sub-table per distinct key of `column` (see
/// [`Column::group_keys`](super::model::Column::group_keys)), sorted by key.
/// Rows with a missing key are left out.
pub fn partition_by(table: &Table, column: &str) -> Result<Vec<(Value, Table)>, TableError> {
    let col = table
        .column(column)
        .ok_or_else(|| TableError::UnknownColumn(column.to_string()))?;

    let mut rows: BTreeMap<Value, Vec<usize>> = BTreeMap::new();
    for (i, key) in col.group_keys().into_iter().enumerate() {
        if !key.is_missing() {
            rows.entry(key).or_default().push(i);
        }
    }

    Ok(rows
        .into_iter()
        .map(|(key, indices)| (key, table.take_rows(&indices)))
        .collect())
}
