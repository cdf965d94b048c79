/// Data layer: core types, loading, and filtering.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → Table
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  Table    │  ordered Columns of dynamically typed Values
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  select rows by group value → sub-tables
///   └──────────┘
/// ```

pub mod filter;
pub mod loader;
pub mod model;
