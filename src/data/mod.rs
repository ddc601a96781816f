/// Data layer: cell types, parsed sheets, and workbook sources.
///
/// Architecture:
/// ```text
///  .xlsx / .xls / .ods / .json
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  SpreadsheetSource: sheet names, sheet → DataFrame
///   └──────────┘
///        │
///        ▼
///   ┌──────────────┐
///   │  DataFrame    │  header + Vec<Vec<CellValue>>
///   └──────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ pipeline  │  replicate / metadata rows → result table
///   └──────────┘
/// ```

pub mod loader;
pub mod model;
