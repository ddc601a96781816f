use std::collections::BTreeMap;

use crate::data::model::{
    CellValue, MetadataField, MetadataRow, MetadataTable, ReplicateRow, ReplicateTable, format_float,
};
use crate::pipeline::convert::{DilutionFactors, sewage_conc_convert};
pub use crate::pipeline::replicate::{SHEET_COLUMN, TOTAL_COPIES_COLUMN};

pub const SEWAGE_CONC_COLUMN: &str = "sewage_conc";

// ---------------------------------------------------------------------------
// Result rows and columns
// ---------------------------------------------------------------------------

/// A replicate row joined with its well's sample context.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedRow {
    pub replicate: ReplicateRow,
    /// `None` when no metadata row shares the well.
    pub metadata: Option<MetadataRow>,
    pub sewage_conc: Option<f64>,
}

impl MergedRow {
    pub fn dilution_factors(&self) -> DilutionFactors {
        self.metadata
            .as_ref()
            .map(MetadataRow::dilution_factors)
            .unwrap_or_default()
    }
}

/// A column of the result table and where its values come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultColumn {
    Replicate(String),
    TotalCopies,
    Sheet,
    Metadata(MetadataField),
    SewageConc,
}

/// Final report rows plus their column layout.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultTable {
    /// Output header names paired with their source, in output order.
    pub columns: Vec<(String, ResultColumn)>,
    pub rows: Vec<MergedRow>,
}

impl ResultTable {
    pub fn header(&self) -> Vec<String> {
        self.columns.iter().map(|(name, _)| name.clone()).collect()
    }

    /// CSV fields for one row, in header order.
    pub fn record(&self, row: &MergedRow) -> Vec<String> {
        self.columns
            .iter()
            .map(|(_, column)| match column {
                ResultColumn::Replicate(name) => row
                    .replicate
                    .fields
                    .get(name)
                    .map(CellValue::to_csv_field)
                    .unwrap_or_default(),
                ResultColumn::TotalCopies => format_float(row.replicate.total_copies),
                ResultColumn::Sheet => row.replicate.sheet.clone(),
                ResultColumn::Metadata(field) => row
                    .metadata
                    .as_ref()
                    .map(|m| m.get(*field).to_csv_field())
                    .unwrap_or_default(),
                ResultColumn::SewageConc => format_float(row.sewage_conc),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Join
// ---------------------------------------------------------------------------

/// Left join on well: every replicate row is kept in order, unmatched rows get
/// no metadata, and a well listed twice in the metadata yields two rows.
///
/// Non-key column names present on both sides get `_x` / `_y` suffixes.
/// `sewage_conc` is left empty; see [`with_sewage_conc`].
pub fn left_join(replicates: ReplicateTable, metadata: &MetadataTable) -> ResultTable {
    let mut by_well: BTreeMap<&CellValue, Vec<&MetadataRow>> = BTreeMap::new();
    for row in &metadata.rows {
        by_well.entry(&row.well).or_default().push(row);
    }

    let right: Vec<(&String, MetadataField)> = metadata
        .columns
        .iter()
        .filter(|(_, field)| *field != MetadataField::Well)
        .map(|(name, field)| (name, *field))
        .collect();

    let mut left: Vec<(String, ResultColumn)> = replicates
        .columns
        .iter()
        .map(|c| {
            let column = match c.as_str() {
                TOTAL_COPIES_COLUMN => ResultColumn::TotalCopies,
                SHEET_COLUMN => ResultColumn::Sheet,
                _ => ResultColumn::Replicate(c.clone()),
            };
            (c.clone(), column)
        })
        .collect();
    for (name, column) in [
        (TOTAL_COPIES_COLUMN, ResultColumn::TotalCopies),
        (SHEET_COLUMN, ResultColumn::Sheet),
    ] {
        if !left.iter().any(|(_, c)| *c == column) {
            left.push((name.to_string(), column));
        }
    }

    let clashes = |name: &str| right.iter().any(|(r, _)| r.as_str() == name);
    let mut columns: Vec<(String, ResultColumn)> = left
        .iter()
        .map(|(name, col)| {
            if clashes(name) {
                (format!("{name}_x"), col.clone())
            } else {
                (name.clone(), col.clone())
            }
        })
        .collect();
    for (name, field) in &right {
        let name = if left.iter().any(|(l, _)| l == *name) {
            format!("{name}_y")
        } else {
            name.to_string()
        };
        columns.push((name, ResultColumn::Metadata(*field)));
    }
    columns.push((SEWAGE_CONC_COLUMN.to_string(), ResultColumn::SewageConc));

    let mut rows = Vec::with_capacity(replicates.rows.len());
    for replicate in replicates.rows {
        match by_well.get(&replicate.well) {
            Some(matches) => {
                for m in matches {
                    rows.push(MergedRow {
                        replicate: replicate.clone(),
                        metadata: Some((*m).clone()),
                        sewage_conc: None,
                    });
                }
            }
            None => rows.push(MergedRow {
                replicate,
                metadata: None,
                sewage_conc: None,
            }),
        }
    }

    ResultTable { columns, rows }
}

/// Derive `sewage_conc` for every row.
pub fn with_sewage_conc(table: ResultTable) -> ResultTable {
    let rows = table
        .rows
        .into_iter()
        .map(|row| {
            let sewage_conc = sewage_conc_convert(
                &row.replicate.sheet,
                row.replicate.total_copies,
                row.dilution_factors(),
            );
            MergedRow { sewage_conc, ..row }
        })
        .collect();
    ResultTable {
        columns: table.columns,
        rows,
    }
}
