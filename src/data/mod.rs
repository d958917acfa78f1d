/// Data layer: core types, loading, filtering and export.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet / URL
///        │
///        ▼
///   ┌──────────┐   ┌──────────┐
///   │  loader   │──│  schema   │  declared columns, required check, typing
///   └──────────┘   └──────────┘
///        │  (cache: content digest → Arc<Table>)
///        ▼
///   ┌──────────┐
///   │  Table    │  Vec<Record>, column kinds, unique values
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  FilterSelection → sub-table
///   └──────────┘
///        │
///        ▼
///     export     filtered table → CSV
/// ```

pub mod cache;
pub mod export;
pub mod filter;
pub mod loader;
pub mod model;
pub mod schema;
