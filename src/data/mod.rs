/// Data layer: loading, column classification, reporting and export.
///
/// Architecture:
/// ```text
///  .csv / .xlsx / .parquet / .json
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → Dataset (one Arrow RecordBatch)
///   └──────────┘
///        │
///        ├──────────► columns  textual / numeric split (derived, never stored)
///        ▼
///   ┌──────────┐
///   │  report   │  group by one column → aggregate → sort descending
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  export   │  report → .csv / .xlsx
///   └──────────┘
/// ```

pub mod columns;
pub mod export;
pub mod loader;
pub mod model;
pub mod report;
