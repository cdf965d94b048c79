use thiserror::Error;

/// Structural problems building or projecting a [`Table`](crate::data::model::Table).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TableError {
    #[error("duplicate column: {0}")]
    DuplicateColumn(String),

    #[error("column '{column}' has {found} rows, expected {expected}")]
    RaggedColumn {
        column: String,
        expected: usize,
        found: usize,
    },

    #[error("row {row} has {found} values, expected {expected}")]
    RecordWidth {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("column not found: {0}")]
    UnknownColumn(String),
}

/// Raised by the cleaner before any row is touched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("Missing required columns: {}", .missing.join(", "))]
    MissingColumns { missing: Vec<String> },

    #[error("required column listed twice: {0}")]
    DuplicateRequired(String),

    #[error("required column list is empty")]
    NoRequiredColumns,

    #[error(transparent)]
    Table(#[from] TableError),
}

/// Raised by the aggregator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AggregateError {
    #[error("column not found: {column}")]
    UnknownColumn { column: String },

    #[error("column '{column}' is not numeric")]
    NonNumeric { column: String },

    #[error("cannot aggregate empty input")]
    EmptyInput,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_error_lists_every_column() {
        let err = SchemaError::MissingColumns {
            missing: vec!["nWBV".into(), "ASF".into()],
        };
        assert_eq!(err.to_string(), "Missing required columns: nWBV, ASF");
    }

    #[test]
    fn test_aggregate_error_messages() {
        assert_eq!(AggregateError::EmptyInput.to_string(), "cannot aggregate empty input");
        let err = AggregateError::UnknownColumn { column: "x".into() };
        assert_eq!(err.to_string(), "column not found: x");
    }
}
