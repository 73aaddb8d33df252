/// Data layer: core types, loading, selection and filtering.
///
/// Architecture:
/// ```text
///  six .csv / .parquet sources
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse files → ForecastTables
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  cache    │  load once, share the Arc
///   └──────────┘
///        │
///        ▼
///   ┌───────────┐
///   │ selection │  stores → dates of a store → families at (store, date)
///   └───────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  (store, date, family ∈ selected) → row indices
///   └──────────┘
/// ```

pub mod cache;
pub mod filter;
pub mod loader;
pub mod model;
pub mod selection;
