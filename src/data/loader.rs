use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{Context, Result, bail};
use calamine::{Data, Range, Reader, Sheets, open_workbook_auto};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::model::{CellValue, DataFrame};

// ---------------------------------------------------------------------------
// Spreadsheet source abstraction
// ---------------------------------------------------------------------------

/// A workbook of named sheets, each parseable into a [`DataFrame`] whose
/// first grid row is the header.
pub trait SpreadsheetSource {
    /// Workbook identity used in log and error messages (usually the filename).
    fn name(&self) -> &str;

    /// Sheet names in workbook order.
    fn sheet_names(&self) -> Vec<String>;

    /// Parse one sheet.
    fn parse(&mut self, sheet: &str) -> Result<DataFrame>;
}

/// Open a workbook from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.xlsx` / `.xlsm` / `.xlsb` / `.xls` / `.ods` – read with calamine
/// * `.json` – `{ "sheets": [{ "name", "columns", "rows" }, ...] }`
pub fn open_workbook(path: &Path) -> Result<Box<dyn SpreadsheetSource>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Ok(Box::new(CalamineWorkbook::open(path)?)),
        "json" => Ok(Box::new(JsonWorkbook::open(path)?)),
        other => bail!("Unsupported file extension: .{other}"),
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

// ---------------------------------------------------------------------------
// Excel / ODS workbooks
// ---------------------------------------------------------------------------

/// Excel-family workbook read through calamine.
pub struct CalamineWorkbook {
    name: String,
    workbook: Sheets<BufReader<File>>,
}

impl CalamineWorkbook {
    pub fn open(path: &Path) -> Result<Self> {
        let workbook = open_workbook_auto(path)
            .with_context(|| format!("opening workbook {}", path.display()))?;
        Ok(Self {
            name: display_name(path),
            workbook,
        })
    }
}

impl SpreadsheetSource for CalamineWorkbook {
    fn name(&self) -> &str {
        &self.name
    }

    fn sheet_names(&self) -> Vec<String> {
        self.workbook.sheet_names()
    }

    fn parse(&mut self, sheet: &str) -> Result<DataFrame> {
        let range = self
            .workbook
            .worksheet_range(sheet)
            .with_context(|| format!("reading sheet {sheet} of {}", self.name))?;
        Ok(range_to_frame(&range))
    }
}

/// Convert a calamine range into a frame, header taken from its first row.
///
/// calamine trims the used range to the first non-empty cell; columns left of
/// it are restored as blank (placeholder) columns so the sheet width matches
/// what the spreadsheet shows.
pub fn range_to_frame(range: &Range<Data>) -> DataFrame {
    let leading = range.start().map(|(_, col)| col as usize).unwrap_or(0);
    let mut rows = range.rows().map(|row| {
        std::iter::repeat(CellValue::Null)
            .take(leading)
            .chain(row.iter().map(excel_to_cell))
            .collect::<Vec<_>>()
    });

    let header = match rows.next() {
        Some(h) => h,
        None => return DataFrame::default(),
    };
    DataFrame::from_grid(header, rows.collect())
}

fn excel_to_cell(data: &Data) -> CellValue {
    match data {
        Data::Int(i) => CellValue::Integer(*i),
        Data::Float(f) => CellValue::Float(*f),
        Data::String(s) => CellValue::text(s),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(ts) if ts.time() == chrono::NaiveTime::MIN => {
                CellValue::Date(ts.date().format("%Y-%m-%d").to_string())
            }
            Some(ts) => CellValue::Date(ts.format("%Y-%m-%d %H:%M:%S").to_string()),
            None => CellValue::Float(dt.as_f64()),
        },
        Data::DateTimeIso(s) => CellValue::Date(s.clone()),
        Data::DurationIso(s) => CellValue::String(s.clone()),
        // #N/A, #DIV/0! and friends read as missing
        Data::Error(_) => CellValue::Null,
        Data::Empty => CellValue::Null,
    }
}

// ---------------------------------------------------------------------------
// JSON workbooks
// ---------------------------------------------------------------------------

/// Expected JSON schema:
///
/// ```json
/// {
///   "sheets": [
///     {
///       "name": "N1_rep1",
///       "columns": ["Well", "Sample Name", "Cq", ...],
///       "rows": [["A1", "S1", 24.1, ...], ...]
///     },
///     ...
///   ]
/// }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JsonWorkbookFile {
    pub sheets: Vec<JsonSheet>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonSheet {
    pub name: String,
    pub columns: Vec<JsonValue>,
    #[serde(default)]
    pub rows: Vec<Vec<JsonValue>>,
}

/// Workbook stored as JSON; used by the sample generator and tests.
pub struct JsonWorkbook {
    name: String,
    file: JsonWorkbookFile,
}

impl JsonWorkbook {
    pub fn open(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading JSON workbook {}", path.display()))?;
        let file: JsonWorkbookFile = serde_json::from_str(&text)
            .with_context(|| format!("parsing JSON workbook {}", path.display()))?;
        Ok(Self {
            name: display_name(path),
            file,
        })
    }
}

impl SpreadsheetSource for JsonWorkbook {
    fn name(&self) -> &str {
        &self.name
    }

    fn sheet_names(&self) -> Vec<String> {
        self.file.sheets.iter().map(|s| s.name.clone()).collect()
    }

    fn parse(&mut self, sheet: &str) -> Result<DataFrame> {
        let found = self
            .file
            .sheets
            .iter()
            .find(|s| s.name == sheet)
            .with_context(|| format!("sheet {sheet} not found in {}", self.name))?;

        let header = found.columns.iter().map(json_to_cell).collect();
        let rows = found
            .rows
            .iter()
            .map(|row| row.iter().map(json_to_cell).collect())
            .collect();
        Ok(DataFrame::from_grid(header, rows))
    }
}

fn json_to_cell(val: &JsonValue) -> CellValue {
    match val {
        JsonValue::String(s) => CellValue::text(s),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                CellValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                CellValue::Float(f)
            } else {
                CellValue::String(n.to_string())
            }
        }
        JsonValue::Bool(b) => CellValue::Bool(*b),
        JsonValue::Null => CellValue::Null,
        other => CellValue::String(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// In-memory workbooks
// ---------------------------------------------------------------------------

/// Workbook held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryWorkbook {
    name: String,
    sheets: Vec<(String, DataFrame)>,
}

impl MemoryWorkbook {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sheets: Vec::new(),
        }
    }

    /// Append a sheet (builder style).
    pub fn with_sheet(mut self, name: impl Into<String>, frame: DataFrame) -> Self {
        self.sheets.push((name.into(), frame));
        self
    }
}

impl SpreadsheetSource for MemoryWorkbook {
    fn name(&self) -> &str {
        &self.name
    }

    fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|(n, _)| n.clone()).collect()
    }

    fn parse(&mut self, sheet: &str) -> Result<DataFrame> {
        self.sheets
            .iter()
            .find(|(n, _)| n == sheet)
            .map(|(_, f)| f.clone())
            .with_context(|| format!("sheet {sheet} not found in {}", self.name))
    }
}
