use log::info;

use crate::data::loader::SpreadsheetSource;
use crate::data::model::{DataFrame, MetadataField, MetadataRow, MetadataTable};
use crate::error::PipelineError;
use crate::pipeline::convert::DilutionFactors;

// ---------------------------------------------------------------------------
// Sample sheet extraction
// ---------------------------------------------------------------------------

/// Headers expected (case-insensitively, in any order) as the first four
/// columns of the sample sheet.
pub const EXPECTED_METADATA_COLUMNS: [(&str, MetadataField); 4] = [
    ("Well", MetadataField::Well),
    ("Sample ID", MetadataField::SampleId),
    ("Dilution factor SARS-CoV-2", MetadataField::DilutionTarget),
    ("Dilution factor PMMV", MetadataField::DilutionFecal),
];

/// Read the sample sheet and keep its four expected columns.
pub fn extract_metadata(
    source: &mut dyn SpreadsheetSource,
    sheet: &str,
) -> Result<MetadataTable, PipelineError> {
    let workbook = source.name().to_string();
    let frame = source
        .parse(sheet)
        .map_err(|e| PipelineError::Workbook {
            workbook: workbook.clone(),
            source: e,
        })?;
    let table = metadata_from_frame(&frame, sheet, &workbook)?;
    info!("Read {} sample rows from {sheet}", table.rows.len());
    Ok(table)
}

/// Validate the leading headers of `frame` and build the metadata table.
///
/// Only exact (case-insensitive) header text is accepted; near-miss spellings
/// are rejected rather than repaired.
pub fn metadata_from_frame(
    frame: &DataFrame,
    sheet: &str,
    workbook: &str,
) -> Result<MetadataTable, PipelineError> {
    let leading: Vec<String> = frame.columns.iter().take(4).cloned().collect();

    let mut columns: Vec<(String, MetadataField)> = Vec::with_capacity(4);
    for header in &leading {
        let role = EXPECTED_METADATA_COLUMNS
            .iter()
            .find(|(expected, _)| expected.eq_ignore_ascii_case(header))
            .map(|(_, role)| *role);
        match role {
            Some(role) if !columns.iter().any(|(_, r)| *r == role) => {
                columns.push((header.clone(), role));
            }
            _ => break,
        }
    }
    if columns.len() != EXPECTED_METADATA_COLUMNS.len() {
        return Err(PipelineError::UnexpectedColumns {
            sheet: sheet.to_string(),
            workbook: workbook.to_string(),
            found: leading,
        });
    }

    let position = |role: MetadataField| {
        columns
            .iter()
            .position(|(_, r)| *r == role)
            .unwrap_or_default()
    };
    let (well, sample_id, target, fecal) = (
        position(MetadataField::Well),
        position(MetadataField::SampleId),
        position(MetadataField::DilutionTarget),
        position(MetadataField::DilutionFecal),
    );

    let rows = frame
        .rows
        .iter()
        .map(|cells| MetadataRow {
            well: cells[well].clone(),
            sample_id: cells[sample_id].clone(),
            dilution_target: cells[target].clone(),
            dilution_fecal: cells[fecal].clone(),
        })
        .collect();

    Ok(MetadataTable { columns, rows })
}

// ---------------------------------------------------------------------------
// Dilution factors
// ---------------------------------------------------------------------------

impl MetadataRow {
    /// Numeric dilution factors; anything non-numeric reads as missing.
    pub fn dilution_factors(&self) -> DilutionFactors {
        DilutionFactors {
            target_pathogen: self.dilution_target.as_f64(),
            fecal_indicator: self.dilution_fecal.as_f64(),
        }
    }
}
