use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::NaiveDate;
use log::debug;

use crate::error::PipelineError;
use crate::pipeline::merge::ResultTable;

// ---------------------------------------------------------------------------
// Report naming
// ---------------------------------------------------------------------------

/// Directory reports land in by default.
pub const DEFAULT_RESULTS_DIR: &str = "results";

/// Where a finished result table goes.
pub trait ResultSink {
    /// Persist `table`, naming the output after `source_name`. Returns where it went.
    fn persist(&mut self, table: &ResultTable, source_name: &str) -> Result<PathBuf, PipelineError>;
}

/// `<dir>/<YYYY-MM-DD>_processed_exp_<stem>.csv`, where `stem` is the file
/// name of `source_name` up to its first `.`.
pub fn report_path(results_dir: &Path, date: NaiveDate, source_name: &str) -> PathBuf {
    let file_name = Path::new(source_name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| source_name.to_string());
    let stem = file_name.split('.').next().unwrap_or_default();
    results_dir.join(format!("{}_processed_exp_{stem}.csv", date.format("%Y-%m-%d")))
}

// ---------------------------------------------------------------------------
// CSV output
// ---------------------------------------------------------------------------

/// Serialise a result table as CSV: header row, one record per row, no index.
pub fn write_csv<W: Write>(table: &ResultTable, writer: W) -> anyhow::Result<()> {
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(table.header()).context("writing CSV header")?;
    for (i, row) in table.rows.iter().enumerate() {
        out.write_record(table.record(row))
            .with_context(|| format!("writing CSV row {i}"))?;
    }
    out.flush().context("flushing CSV")?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Dated report writer
// ---------------------------------------------------------------------------

/// Writes dated CSV reports into a results directory.
#[derive(Debug, Clone)]
pub struct CsvReportWriter {
    results_dir: PathBuf,
    date: NaiveDate,
}

impl CsvReportWriter {
    /// Reports dated today (local time).
    pub fn new(results_dir: impl Into<PathBuf>) -> Self {
        Self::with_date(results_dir, chrono::Local::now().date_naive())
    }

    pub fn with_date(results_dir: impl Into<PathBuf>, date: NaiveDate) -> Self {
        Self {
            results_dir: results_dir.into(),
            date,
        }
    }
}

impl ResultSink for CsvReportWriter {
    fn persist(&mut self, table: &ResultTable, source_name: &str) -> Result<PathBuf, PipelineError> {
        let path = report_path(&self.results_dir, self.date, source_name);
        let persist_err = |source: anyhow::Error| PipelineError::Persist {
            path: path.clone(),
            source,
        };

        if self.results_dir.is_dir() {
            debug!("{} already exists", self.results_dir.display());
        }
        std::fs::create_dir_all(&self.results_dir)
            .with_context(|| format!("creating {}", self.results_dir.display()))
            .map_err(persist_err)?;

        let file = std::fs::File::create(&path)
            .with_context(|| format!("creating {}", path.display()))
            .map_err(persist_err)?;
        write_csv(table, std::io::BufWriter::new(file)).map_err(persist_err)?;
        Ok(path)
    }
}
