use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// CellValue – a single spreadsheet cell
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value mirroring common Pandas dtypes.
/// Wells are joined through a `BTreeMap` downstream so `CellValue` must be `Ord`.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    /// ISO-8601 date string kept as text for simplicity.
    Date(String),
    Null,
}

// -- Manual Eq/Ord so we can key maps by CellValue --

impl Eq for CellValue {}

impl PartialOrd for CellValue {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CellValue {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use CellValue::*;
        fn discriminant(v: &CellValue) -> u8 {
            match v {
                Null => 0,
                Bool(_) => 1,
                Integer(_) => 2,
                Float(_) => 3,
                String(_) => 4,
                Date(_) => 5,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Null, Null) => std::cmp::Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (String(a), String(b)) | (Date(a), Date(b)) => a.cmp(b),
            _ => std::cmp::Ordering::Equal,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::String(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v:.4}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Date(d) => write!(f, "{d}"),
            CellValue::Null => write!(f, "<null>"),
        }
    }
}

/// Strings Pandas reads as NaN by default (`read_excel` / `read_csv` `na_values`).
pub const NA_STRINGS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND",
    "1.#QNAN", "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

impl CellValue {
    /// Build a string cell, mapping Pandas NA markers to [`CellValue::Null`].
    pub fn text(s: &str) -> Self {
        if NA_STRINGS.contains(&s) {
            CellValue::Null
        } else {
            CellValue::String(s.to_string())
        }
    }

    /// Numeric interpretation; strings (e.g. "Undetermined") are not numbers.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Float(v) if !v.is_nan() => Some(*v),
            CellValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Render for a CSV field the way `DataFrame.to_csv` does: NA is empty,
    /// floats keep full precision.
    pub fn to_csv_field(&self) -> String {
        match self {
            CellValue::String(s) | CellValue::Date(s) => s.clone(),
            CellValue::Integer(i) => i.to_string(),
            CellValue::Float(v) => format_float(Some(*v)),
            CellValue::Bool(true) => "True".to_string(),
            CellValue::Bool(false) => "False".to_string(),
            CellValue::Null => String::new(),
        }
    }
}

/// CSV rendering of a derived numeric value; `None` and NaN are written empty.
///
/// Shortest round-trip digits, switching to exponent form (`1.25e-06`,
/// `1e+16`) below 1e-4 and from 1e16 up, as Python's float repr does.
pub fn format_float(v: Option<f64>) -> String {
    match v {
        None => String::new(),
        Some(v) if v.is_nan() => String::new(),
        Some(v) if !v.is_finite() => format!("{v}"),
        Some(v) if v != 0.0 && (v.abs() < 1e-4 || v.abs() >= 1e16) => exponent_form(v),
        Some(v) if v == v.trunc() => format!("{v:.1}"),
        Some(v) => format!("{v}"),
    }
}

/// `{:e}` output with a signed, two-digit exponent.
fn exponent_form(v: f64) -> String {
    let raw = format!("{v:e}");
    match raw.split_once('e').map(|(m, e)| (m, e.parse::<i32>())) {
        Some((mantissa, Ok(exp))) => {
            let sign = if exp < 0 { '-' } else { '+' };
            format!("{mantissa}e{sign}{:02}", exp.abs())
        }
        _ => raw,
    }
}

// ---------------------------------------------------------------------------
// DataFrame – one parsed sheet
// ---------------------------------------------------------------------------

/// A parsed sheet: ordered header plus row-major cells.
/// Every row has exactly `columns.len()` cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataFrame {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

/// Whether a header names a structural placeholder rather than a data column.
pub fn is_placeholder_column(name: &str) -> bool {
    name.contains("Unnamed")
}

impl DataFrame {
    /// Build a frame from a header row and data rows.
    ///
    /// Headers are normalised like Pandas: blank → `Unnamed: <i>`, repeated
    /// names → `<name>.<n>`. Rows are padded with nulls (or truncated) to the
    /// header width.
    pub fn from_grid(header: Vec<CellValue>, rows: Vec<Vec<CellValue>>) -> Self {
        let width = header.len();
        // Next suffix to try per emitted name; a generated `<name>.<n>` that is
        // itself taken keeps counting from its own entry.
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        let columns = header
            .into_iter()
            .enumerate()
            .map(|(i, cell)| {
                let mut name = match cell {
                    CellValue::Null => format!("Unnamed: {i}"),
                    CellValue::String(s) if s.trim().is_empty() => format!("Unnamed: {i}"),
                    CellValue::Float(v) if v == v.trunc() => format!("{v:.0}"),
                    other => other.to_csv_field(),
                };
                let mut count = counts.get(&name).copied().unwrap_or(0);
                while count > 0 {
                    counts.insert(name.clone(), count + 1);
                    name = format!("{name}.{count}");
                    count = counts.get(&name).copied().unwrap_or(0);
                }
                counts.insert(name.clone(), count + 1);
                name
            })
            .collect();

        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, CellValue::Null);
                row
            })
            .collect();

        DataFrame { columns, rows }
    }

    /// `(rows, columns)`, header excluded.
    pub fn shape(&self) -> (usize, usize) {
        (self.rows.len(), self.columns.len())
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Keep only the given column positions, in the given order.
    pub fn select(&self, indices: &[usize]) -> DataFrame {
        DataFrame {
            columns: indices.iter().map(|&i| self.columns[i].clone()).collect(),
            rows: self
                .rows
                .iter()
                .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
                .collect(),
        }
    }

    /// Drop every placeholder column, keeping real data columns in order.
    pub fn without_placeholder_columns(&self) -> DataFrame {
        let keep: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| !is_placeholder_column(c))
            .map(|(i, _)| i)
            .collect();
        self.select(&keep)
    }
}

// ---------------------------------------------------------------------------
// Domain rows
// ---------------------------------------------------------------------------

/// One well's measurement from a replicate sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplicateRow {
    pub well: CellValue,
    /// Threshold cycle; `None` for a non-detect.
    pub cq: Option<f64>,
    /// Originating sheet name.
    pub sheet: String,
    pub total_copies: Option<f64>,
    /// Every kept column of the source row (including `Well` and `Cq`).
    pub fields: BTreeMap<String, CellValue>,
}

/// All replicate sheets concatenated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplicateTable {
    /// Union of kept source columns in first-seen order.
    pub columns: Vec<String>,
    pub rows: Vec<ReplicateRow>,
    /// Sheets that contributed rows, in processing order.
    pub sheets: Vec<String>,
}

/// Role of one of the four metadata columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MetadataField {
    Well,
    SampleId,
    DilutionTarget,
    DilutionFecal,
}

/// One well's sample context.
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataRow {
    pub well: CellValue,
    pub sample_id: CellValue,
    /// Dilution factor for the target-pathogen assays (N1/N2), raw cell.
    pub dilution_target: CellValue,
    /// Dilution factor for the fecal-indicator assay (PMMV), raw cell.
    pub dilution_fecal: CellValue,
}

impl MetadataRow {
    pub fn get(&self, field: MetadataField) -> &CellValue {
        match field {
            MetadataField::Well => &self.well,
            MetadataField::SampleId => &self.sample_id,
            MetadataField::DilutionTarget => &self.dilution_target,
            MetadataField::DilutionFecal => &self.dilution_fecal,
        }
    }
}

/// The metadata sheet restricted to its four expected columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataTable {
    /// Sheet header text paired with its role, in sheet order.
    pub columns: Vec<(String, MetadataField)>,
    pub rows: Vec<MetadataRow>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> CellValue {
        CellValue::String(v.to_string())
    }

    #[test]
    fn blank_and_duplicate_headers_are_normalised() {
        let df = DataFrame::from_grid(
            vec![s("Well"), CellValue::Null, s("Cq"), s(" "), s("Cq")],
            vec![vec![s("A1")]],
        );
        assert_eq!(
            df.columns,
            vec!["Well", "Unnamed: 1", "Cq", "Unnamed: 3", "Cq.1"]
        );
        assert_eq!(df.shape(), (1, 5));
        assert!(df.rows[0][1..].iter().all(CellValue::is_null));
    }

    #[test]
    fn renamed_duplicates_skip_names_already_present() {
        let df = DataFrame::from_grid(
            vec![s("Well"), s("Cq"), s("Cq"), s("Cq.1")],
            vec![vec![
                s("A1"),
                CellValue::Float(20.0),
                CellValue::Float(21.0),
                CellValue::Float(22.0),
            ]],
        );
        assert_eq!(df.columns, vec!["Well", "Cq", "Cq.1", "Cq.1.1"]);

        let df = DataFrame::from_grid(vec![s("Cq.1"), s("Cq"), s("Cq")], vec![]);
        assert_eq!(df.columns, vec!["Cq.1", "Cq", "Cq.1.1"]);
    }

    #[test]
    fn placeholder_columns_are_dropped() {
        let df = DataFrame::from_grid(
            vec![CellValue::Null, s("Well"), s("Cq")],
            vec![vec![CellValue::Integer(0), s("A1"), CellValue::Float(21.5)]],
        );
        let kept = df.without_placeholder_columns();
        assert_eq!(kept.columns, vec!["Well", "Cq"]);
        assert_eq!(kept.rows[0], vec![s("A1"), CellValue::Float(21.5)]);
    }

    #[test]
    fn na_strings_become_null() {
        assert_eq!(CellValue::text("NA"), CellValue::Null);
        assert_eq!(CellValue::text(""), CellValue::Null);
        assert_eq!(CellValue::text("Undetermined"), s("Undetermined"));
    }

    #[test]
    fn only_numbers_have_a_numeric_value() {
        assert_eq!(CellValue::Integer(3).as_f64(), Some(3.0));
        assert_eq!(CellValue::Float(20.5).as_f64(), Some(20.5));
        assert_eq!(CellValue::Float(f64::NAN).as_f64(), None);
        assert_eq!(s("20.5").as_f64(), None);
        assert_eq!(CellValue::Null.as_f64(), None);
    }

    #[test]
    fn csv_fields_follow_pandas_rendering() {
        assert_eq!(CellValue::Null.to_csv_field(), "");
        assert_eq!(CellValue::Float(2.0).to_csv_field(), "2.0");
        assert_eq!(CellValue::Float(0.125).to_csv_field(), "0.125");
        assert_eq!(CellValue::Integer(7).to_csv_field(), "7");
        assert_eq!(CellValue::Bool(true).to_csv_field(), "True");
        assert_eq!(format_float(None), "");
        assert_eq!(format_float(Some(f64::NAN)), "");
    }

    #[test]
    fn extreme_magnitudes_use_exponent_form() {
        assert_eq!(format_float(Some(1.253141174941413e-06)), "1.253141174941413e-06");
        assert_eq!(format_float(Some(1e16)), "1e+16");
        assert_eq!(format_float(Some(-2.5e20)), "-2.5e+20");
        assert_eq!(format_float(Some(3.2e-123)), "3.2e-123");
        assert_eq!(format_float(Some(0.0001)), "0.0001");
        assert_eq!(format_float(Some(0.0)), "0.0");
        assert_eq!(format_float(Some(123456789.0)), "123456789.0");
    }

    #[test]
    fn cell_values_order_by_type_then_value() {
        let mut v = vec![s("B1"), CellValue::Null, s("A1"), CellValue::Integer(1)];
        v.sort();
        assert_eq!(v, vec![CellValue::Null, CellValue::Integer(1), s("A1"), s("B1")]);
    }
}
