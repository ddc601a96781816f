use std::path::PathBuf;

use thiserror::Error;

// ---------------------------------------------------------------------------
// Pipeline errors
// ---------------------------------------------------------------------------

/// Fatal conditions of a pipeline run. Per-row NA results are not errors.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(
        "Excel sheet {sheet} in {workbook} was an unexpected shape: \
         expected {expected_rows}x{expected_columns}, found {rows}x{columns}"
    )]
    UnexpectedSheetShape {
        sheet: String,
        workbook: String,
        expected_rows: usize,
        expected_columns: usize,
        rows: usize,
        columns: usize,
    },

    #[error("unexpected number of sheets with \"sample\" in name in {workbook}: {} ({})", .candidates.len(), .candidates.join(", "))]
    AmbiguousMetadataSheet {
        workbook: String,
        candidates: Vec<String>,
    },

    #[error("no sheet with \"sample\" in name found in {workbook}")]
    NoMetadataSheet { workbook: String },

    #[error("sample sheet {sheet} in {workbook} has unexpected leading columns: {found:?}")]
    UnexpectedColumns {
        sheet: String,
        workbook: String,
        found: Vec<String>,
    },

    #[error("no replicate sheet in {workbook} produced valid data")]
    NoReplicateData { workbook: String },

    #[error("sheet {sheet} in {workbook} has no '{column}' column")]
    MissingColumn {
        sheet: String,
        workbook: String,
        column: String,
    },

    #[error("failed to read workbook {workbook}")]
    Workbook {
        workbook: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to write report {}", .path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
}
