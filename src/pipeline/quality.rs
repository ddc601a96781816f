use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use log::warn;

use crate::data::model::{CellValue, ReplicateTable};

/// Replicate runs expected per assay. Other counts may be intentional.
pub const EXPECTED_REPLICATES: usize = 3;

// ---------------------------------------------------------------------------
// Assay families
// ---------------------------------------------------------------------------

/// Assay family of a replicate sheet, using the standard-curve precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AssayFamily {
    N1,
    N2,
    Pmmv,
}

impl AssayFamily {
    pub fn from_sheet(sheet: &str) -> Option<Self> {
        if sheet.contains("N1") {
            Some(AssayFamily::N1)
        } else if sheet.contains("PMMV") {
            Some(AssayFamily::Pmmv)
        } else if sheet.contains("N2") {
            Some(AssayFamily::N2)
        } else {
            None
        }
    }
}

impl fmt::Display for AssayFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssayFamily::N1 => write!(f, "N1"),
            AssayFamily::N2 => write!(f, "N2"),
            AssayFamily::Pmmv => write!(f, "PMMV"),
        }
    }
}

// ---------------------------------------------------------------------------
// Warnings
// ---------------------------------------------------------------------------

/// Non-fatal findings about the replicate data.
#[derive(Debug, Clone, PartialEq)]
pub enum QualityWarning {
    /// An assay does not have the usual number of replicate sheets.
    ReplicateCount { family: AssayFamily, sheets: usize },
    /// A well detected on some replicate sheets of an assay but not on others.
    InconsistentDetection {
        family: AssayFamily,
        well: CellValue,
        detected_on: Vec<String>,
        missing_on: Vec<String>,
    },
    /// A replicate sheet whose name matches no assay; all its derived values are NA.
    UnknownAssay { sheet: String },
}

impl fmt::Display for QualityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QualityWarning::ReplicateCount { family, sheets } => write!(
                f,
                "{family} has {sheets} replicate sheet(s), expected {EXPECTED_REPLICATES}"
            ),
            QualityWarning::InconsistentDetection {
                family,
                well,
                detected_on,
                missing_on,
            } => write!(
                f,
                "{family} well {well} detected on [{}] but not on [{}]",
                detected_on.join(", "),
                missing_on.join(", ")
            ),
            QualityWarning::UnknownAssay { sheet } => {
                write!(f, "replicate sheet {sheet} matches no assay (N1, N2, PMMV)")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Checks
// ---------------------------------------------------------------------------

/// Check replicate counts and detection consistency per assay family.
pub fn check_replicates(table: &ReplicateTable) -> Vec<QualityWarning> {
    let mut warnings = Vec::new();
    let mut families: BTreeMap<AssayFamily, Vec<&String>> = BTreeMap::new();
    for sheet in &table.sheets {
        match AssayFamily::from_sheet(sheet) {
            Some(family) => families.entry(family).or_default().push(sheet),
            None => warnings.push(QualityWarning::UnknownAssay {
                sheet: sheet.clone(),
            }),
        }
    }

    for (family, sheets) in &families {
        if sheets.len() != EXPECTED_REPLICATES {
            warnings.push(QualityWarning::ReplicateCount {
                family: *family,
                sheets: sheets.len(),
            });
        }

        // well -> sheets on which it has a Cq
        let mut detected: BTreeMap<&CellValue, BTreeSet<&str>> = BTreeMap::new();
        for row in table.rows.iter().filter(|r| sheets.contains(&&r.sheet)) {
            let entry = detected.entry(&row.well).or_default();
            if row.cq.is_some() {
                entry.insert(row.sheet.as_str());
            }
        }
        for (well, on) in detected {
            if on.is_empty() || on.len() == sheets.len() {
                continue;
            }
            warnings.push(QualityWarning::InconsistentDetection {
                family: *family,
                well: well.clone(),
                detected_on: sheets
                    .iter()
                    .filter(|s| on.contains(s.as_str()))
                    .map(|s| s.to_string())
                    .collect(),
                missing_on: sheets
                    .iter()
                    .filter(|s| !on.contains(s.as_str()))
                    .map(|s| s.to_string())
                    .collect(),
            });
        }
    }

    for w in &warnings {
        warn!("{w}");
    }
    warnings
}
