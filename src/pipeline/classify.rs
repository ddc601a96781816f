use log::warn;

use crate::error::PipelineError;

// ---------------------------------------------------------------------------
// Sheet name markers
// ---------------------------------------------------------------------------

/// Substring marking a replicate measurement sheet.
pub const REPLICATE_MARKER: &str = "rep";
/// Substring marking the sample-metadata sheet.
pub const METADATA_MARKER: &str = "sample";

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Sheets partitioned by role.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetClassification {
    pub replicate_sheets: Vec<String>,
    /// Every sheet that matched the metadata marker, in workbook order.
    pub metadata_candidates: Vec<String>,
}

impl SheetClassification {
    pub fn is_ambiguous(&self) -> bool {
        self.metadata_candidates.len() > 1
    }

    /// The anomaly as an error value, for callers that refuse to fall back.
    pub fn ambiguity(&self, workbook: &str) -> Option<PipelineError> {
        self.is_ambiguous()
            .then(|| PipelineError::AmbiguousMetadataSheet {
                workbook: workbook.to_string(),
                candidates: self.metadata_candidates.clone(),
            })
    }

    /// The sheet to read metadata from: the first candidate.
    pub fn metadata_sheet(&self, workbook: &str) -> Result<&str, PipelineError> {
        self.metadata_candidates
            .first()
            .map(String::as_str)
            .ok_or_else(|| PipelineError::NoMetadataSheet {
                workbook: workbook.to_string(),
            })
    }
}

/// Partition `sheets` into replicate sheets and metadata candidates.
///
/// A sheet may match both markers and then plays both roles. Missing or
/// ambiguous metadata is reported when the metadata sheet is resolved.
pub fn classify_sheets(workbook: &str, sheets: &[String]) -> SheetClassification {
    let replicate_sheets: Vec<String> = sheets
        .iter()
        .filter(|s| s.contains(REPLICATE_MARKER))
        .cloned()
        .collect();
    let metadata_candidates: Vec<String> = sheets
        .iter()
        .filter(|s| s.contains(METADATA_MARKER))
        .cloned()
        .collect();

    if let [first, _, ..] = metadata_candidates.as_slice() {
        warn!(
            "{} sheets with \"{METADATA_MARKER}\" in name in {workbook} ({}); attempting to run with {first}",
            metadata_candidates.len(),
            metadata_candidates.join(", ")
        );
    }

    SheetClassification {
        replicate_sheets,
        metadata_candidates,
    }
}
