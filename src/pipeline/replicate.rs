use std::collections::BTreeMap;

use log::{debug, error, info};

use crate::data::loader::SpreadsheetSource;
use crate::data::model::{DataFrame, ReplicateRow, ReplicateTable};
use crate::error::PipelineError;
use crate::pipeline::convert::standard_curve_convert;

// ---------------------------------------------------------------------------
// Column names
// ---------------------------------------------------------------------------

/// Column holding the well identifier.
pub const WELL_COLUMN: &str = "Well";
/// Column holding the threshold cycle.
pub const CQ_COLUMN: &str = "Cq";
/// Derived copy-number column appended to every replicate sheet.
pub const TOTAL_COPIES_COLUMN: &str = "total_copies";
/// Provenance column appended to every replicate sheet.
pub const SHEET_COLUMN: &str = "sheet";

// ---------------------------------------------------------------------------
// Plate shape
// ---------------------------------------------------------------------------

/// Expected `(rows, columns)` of a replicate sheet, header excluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlateLayout {
    pub rows: usize,
    pub columns: usize,
}

/// 96-well plate export with 8 data columns.
pub const STANDARD_PLATE: PlateLayout = PlateLayout {
    rows: 96,
    columns: 8,
};

impl Default for PlateLayout {
    fn default() -> Self {
        STANDARD_PLATE
    }
}

/// A replicate sheet whose dimensions did not match the plate layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeViolation {
    pub sheet: String,
    pub workbook: String,
    pub expected: PlateLayout,
    pub found: (usize, usize),
}

impl ShapeViolation {
    pub fn into_error(self) -> PipelineError {
        PipelineError::UnexpectedSheetShape {
            sheet: self.sheet,
            workbook: self.workbook,
            expected_rows: self.expected.rows,
            expected_columns: self.expected.columns,
            rows: self.found.0,
            columns: self.found.1,
        }
    }
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Result of aggregating replicate sheets.
///
/// When `shape_violation` is set, aggregation stopped at that sheet and `table`
/// holds only the sheets processed before it.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplicateAggregation {
    pub table: ReplicateTable,
    pub shape_violation: Option<ShapeViolation>,
}

/// Parse, validate, convert and concatenate every replicate sheet in order.
///
/// The first sheet with an unexpected shape stops aggregation; sheets after it
/// are never read. Fails with [`PipelineError::NoReplicateData`] when no sheet
/// was aggregated.
pub fn aggregate_replicates(
    source: &mut dyn SpreadsheetSource,
    sheets: &[String],
    layout: PlateLayout,
) -> Result<ReplicateAggregation, PipelineError> {
    let workbook = source.name().to_string();
    let mut table = ReplicateTable::default();
    let mut shape_violation = None;

    for sheet in sheets {
        let frame = source
            .parse(sheet)
            .map_err(|e| PipelineError::Workbook {
                workbook: workbook.clone(),
                source: e,
            })?;

        let found = frame.shape();
        if found != (layout.rows, layout.columns) {
            error!(
                "Excel sheet {sheet} in {workbook} was an unexpected shape: expected {}x{}, found {}x{}",
                layout.rows, layout.columns, found.0, found.1
            );
            shape_violation = Some(ShapeViolation {
                sheet: sheet.clone(),
                workbook: workbook.clone(),
                expected: layout,
                found,
            });
            break;
        }

        let kept = frame.without_placeholder_columns();
        let rows = convert_replicate_sheet(&kept, sheet, &workbook)?;
        debug!("Sheet {sheet}: {} wells, columns {:?}", rows.len(), kept.columns);
        append_sheet(&mut table, &kept, sheet, rows);
    }

    if table.sheets.is_empty() {
        return Err(PipelineError::NoReplicateData { workbook });
    }

    info!(
        "Aggregated {} replicate rows from {} sheet(s) of {workbook}",
        table.rows.len(),
        table.sheets.len()
    );
    Ok(ReplicateAggregation {
        table,
        shape_violation,
    })
}

/// Convert one already-validated replicate sheet into rows tagged with `sheet`.
/// Placeholder columns are expected to be gone already.
pub fn convert_replicate_sheet(
    frame: &DataFrame,
    sheet: &str,
    workbook: &str,
) -> Result<Vec<ReplicateRow>, PipelineError> {
    let missing = |column: &str| PipelineError::MissingColumn {
        sheet: sheet.to_string(),
        workbook: workbook.to_string(),
        column: column.to_string(),
    };
    let well_idx = frame.column_index(WELL_COLUMN).ok_or_else(|| missing(WELL_COLUMN))?;
    let cq_idx = frame.column_index(CQ_COLUMN).ok_or_else(|| missing(CQ_COLUMN))?;

    let rows = frame
        .rows
        .iter()
        .map(|cells| {
            let cq = cells[cq_idx].as_f64();
            ReplicateRow {
                well: cells[well_idx].clone(),
                cq,
                sheet: sheet.to_string(),
                total_copies: standard_curve_convert(sheet, cq),
                fields: frame
                    .columns
                    .iter()
                    .cloned()
                    .zip(cells.iter().cloned())
                    .collect::<BTreeMap<_, _>>(),
            }
        })
        .collect();
    Ok(rows)
}

/// Each sheet contributes its columns followed by the two derived ones; names
/// already in the table keep their first position.
fn append_sheet(
    table: &mut ReplicateTable,
    frame: &DataFrame,
    sheet: &str,
    mut rows: Vec<ReplicateRow>,
) {
    let derived = [TOTAL_COPIES_COLUMN, SHEET_COLUMN];
    for column in frame.columns.iter().map(String::as_str).chain(derived) {
        if !table.columns.iter().any(|c| c == column) {
            table.columns.push(column.to_string());
        }
    }
    table.rows.append(&mut rows);
    table.sheets.push(sheet.to_string());
}
