//! Replicate sheets + sample sheet → result table.
//!
//! ```text
//!   workbook ──► classify ──► replicate sheets ──► aggregate ──┐
//!                   │                               (convert)   │
//!                   └──────► sample sheet ──► metadata ─────────┤
//!                                                               ▼
//!                                                   left join on well
//!                                                               │
//!                                                               ▼
//!                                                  sewage_conc ──► sink
//! ```

pub mod classify;
pub mod convert;
pub mod merge;
pub mod metadata;
pub mod quality;
pub mod replicate;

use std::fmt;
use std::path::PathBuf;

use log::{info, warn};

use crate::data::loader::SpreadsheetSource;
use crate::error::PipelineError;
use crate::report::ResultSink;

use classify::classify_sheets;
use merge::{ResultTable, left_join, with_sewage_conc};
use metadata::extract_metadata;
use quality::{QualityWarning, check_replicates};
use replicate::{PlateLayout, ShapeViolation, aggregate_replicates};

// ---------------------------------------------------------------------------
// Options and warnings
// ---------------------------------------------------------------------------

/// Knobs for a run. The defaults reproduce the fixed lab workflow.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineOptions {
    pub layout: PlateLayout,
    /// Refuse to pick a sample sheet when several match.
    pub strict_metadata_sheet: bool,
    /// Keep the sheets aggregated before a shape violation instead of aborting.
    pub allow_partial_replicates: bool,
}

/// A non-fatal anomaly surfaced alongside the result.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineWarning {
    AmbiguousMetadataSheet { chosen: String, candidates: Vec<String> },
    TruncatedReplicates(ShapeViolation),
    Quality(QualityWarning),
}

impl fmt::Display for PipelineWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineWarning::AmbiguousMetadataSheet { chosen, candidates } => write!(
                f,
                "{} sample sheets ({}), used {chosen}",
                candidates.len(),
                candidates.join(", ")
            ),
            PipelineWarning::TruncatedReplicates(v) => write!(
                f,
                "stopped at sheet {} ({}x{}), later replicate sheets were not processed",
                v.sheet, v.found.0, v.found.1
            ),
            PipelineWarning::Quality(q) => write!(f, "{q}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Orchestration
// ---------------------------------------------------------------------------

/// Result table plus everything worth telling the operator about it.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutcome {
    pub table: ResultTable,
    pub warnings: Vec<PipelineWarning>,
}

/// Run every in-memory stage over one workbook.
pub fn process_workbook(
    source: &mut dyn SpreadsheetSource,
    options: &PipelineOptions,
) -> Result<PipelineOutcome, PipelineError> {
    let workbook = source.name().to_string();
    let mut warnings = Vec::new();

    let classification = classify_sheets(&workbook, &source.sheet_names());

    let aggregation = aggregate_replicates(
        source,
        &classification.replicate_sheets,
        options.layout,
    )?;
    if let Some(violation) = aggregation.shape_violation {
        if !options.allow_partial_replicates {
            return Err(violation.into_error());
        }
        warn!(
            "continuing with {} replicate sheet(s) aggregated before {}",
            aggregation.table.sheets.len(),
            violation.sheet
        );
        warnings.push(PipelineWarning::TruncatedReplicates(violation));
    }
    warnings.extend(
        check_replicates(&aggregation.table)
            .into_iter()
            .map(PipelineWarning::Quality),
    );

    let metadata_sheet = classification.metadata_sheet(&workbook)?;
    if let Some(err) = classification.ambiguity(&workbook) {
        if options.strict_metadata_sheet {
            return Err(err);
        }
        warnings.push(PipelineWarning::AmbiguousMetadataSheet {
            chosen: metadata_sheet.to_string(),
            candidates: classification.metadata_candidates.clone(),
        });
    }
    let metadata = extract_metadata(source, metadata_sheet)?;
    let table = with_sewage_conc(left_join(aggregation.table, &metadata));
    info!("Merged {} result rows for {workbook}", table.len());

    Ok(PipelineOutcome { table, warnings })
}

/// What a completed run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub report_path: PathBuf,
    pub rows: usize,
    pub warnings: Vec<PipelineWarning>,
}

/// Process `source` and hand the result table to `sink`. Nothing is persisted
/// when any stage fails.
pub fn run(
    source: &mut dyn SpreadsheetSource,
    sink: &mut dyn ResultSink,
    options: &PipelineOptions,
) -> Result<RunSummary, PipelineError> {
    let outcome = process_workbook(source, options)?;
    let report_path = sink.persist(&outcome.table, source.name())?;
    info!(
        "Wrote {} rows to {} ({} warning(s))",
        outcome.table.len(),
        report_path.display(),
        outcome.warnings.len()
    );
    Ok(RunSummary {
        report_path,
        rows: outcome.table.len(),
        warnings: outcome.warnings,
    })
}
