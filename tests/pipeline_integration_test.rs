// End-to-end runs: JSON workbook on disk -> pipeline -> CSV report on disk.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde_json::{Value, json};

use qpcr_panda::data::loader::{JsonSheet, JsonWorkbookFile, open_workbook};
use qpcr_panda::error::PipelineError;
use qpcr_panda::pipeline::{self, PipelineOptions, PipelineWarning, process_workbook};
use qpcr_panda::report::CsvReportWriter;

fn wells() -> Vec<String> {
    ('A'..='H')
        .flat_map(|row| (1..=12).map(move |col| format!("{row}{col}")))
        .collect()
}

/// 96x8 replicate sheet; `cq` picks each well's Cq cell.
fn replicate_sheet(name: &str, cq: impl Fn(&str) -> Value) -> JsonSheet {
    JsonSheet {
        name: name.to_string(),
        columns: ["", "Well", "Fluor", "Target", "Content", "Sample", "Cq", "SQ"]
            .iter()
            .map(|c| json!(c))
            .collect(),
        rows: wells()
            .iter()
            .enumerate()
            .map(|(i, well)| {
                vec![
                    json!(i),
                    json!(well),
                    json!("FAM"),
                    json!(name.split('_').next().unwrap()),
                    json!("Unkn"),
                    json!("S"),
                    cq(well.as_str()),
                    Value::Null,
                ]
            })
            .collect(),
    }
}

fn sample_sheet(name: &str, rows: &[(&str, &str, Value, Value)]) -> JsonSheet {
    JsonSheet {
        name: name.to_string(),
        columns: ["Well", "Sample ID", "Dilution factor SARS-CoV-2", "Dilution factor PMMV"]
            .iter()
            .map(|c| json!(c))
            .collect(),
        rows: rows
            .iter()
            .map(|(well, id, target, fecal)| {
                vec![json!(well), json!(id), target.clone(), fecal.clone()]
            })
            .collect(),
    }
}

fn write_workbook(dir: &Path, name: &str, sheets: Vec<JsonSheet>) -> PathBuf {
    let path = dir.join(name);
    let text = serde_json::to_string(&JsonWorkbookFile { sheets }).unwrap();
    std::fs::write(&path, text).unwrap();
    path
}

fn read_csv(path: &Path) -> (Vec<String>, Vec<Vec<String>>) {
    let mut reader = csv::Reader::from_path(path).unwrap();
    let header = reader.headers().unwrap().iter().map(String::from).collect();
    let rows = reader
        .records()
        .map(|r| r.unwrap().iter().map(String::from).collect())
        .collect();
    (header, rows)
}

fn assert_close(actual: f64, expected: f64) {
    assert!(
        ((actual - expected) / expected).abs() < 1e-12,
        "{actual} != {expected}"
    );
}

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 12, 19).unwrap()
}

#[test]
fn single_detected_well_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_workbook(
        dir.path(),
        "sample_data.json",
        vec![
            replicate_sheet("N1_rep1", |well| {
                if well == "A1" { json!(20.0) } else { json!("NA") }
            }),
            sample_sheet("sample_info", &[("A1", "WW-01", json!(2), json!(4))]),
        ],
    );

    let mut source = open_workbook(&path).unwrap();
    let results = dir.path().join("results");
    let mut sink = CsvReportWriter::with_date(&results, date());
    let summary = pipeline::run(source.as_mut(), &mut sink, &PipelineOptions::default()).unwrap();

    assert_eq!(summary.rows, 96);
    assert_eq!(
        summary.report_path,
        results.join("2020-12-19_processed_exp_sample_data.csv")
    );

    let (header, rows) = read_csv(&summary.report_path);
    assert_eq!(
        header,
        vec![
            "Well",
            "Fluor",
            "Target",
            "Content",
            "Sample",
            "Cq",
            "SQ",
            "total_copies",
            "sheet",
            "Sample ID",
            "Dilution factor SARS-CoV-2",
            "Dilution factor PMMV",
            "sewage_conc",
        ]
    );
    assert_eq!(rows.len(), 96);

    let col = |name: &str| header.iter().position(|h| h == name).unwrap();
    let a1 = &rows[0];
    assert_eq!(a1[col("Well")], "A1");
    let copies: f64 = a1[col("total_copies")].parse().unwrap();
    assert_close(copies, 10f64.powf(-0.3068 * 20.0 + 12.506));
    let conc: f64 = a1[col("sewage_conc")].parse().unwrap();
    assert_close(conc, copies * 2.0 / 15.0);
    assert_eq!(a1[col("Sample ID")], "WW-01");

    for row in &rows[1..] {
        assert_eq!(row[col("total_copies")], "");
        assert_eq!(row[col("sewage_conc")], "");
        assert_eq!(row[col("Sample ID")], "");
        assert_eq!(row[col("sheet")], "N1_rep1");
    }
}

#[test]
fn every_assay_family_in_one_workbook() {
    let dir = tempfile::tempdir().unwrap();
    let mut sheets = vec![sample_sheet(
        "sample_info",
        &[
            ("A1", "WW-01", json!(3), json!(5)),
            ("A2", "WW-01", json!(3), Value::Null),
        ],
    )];
    for family in ["N1", "N2", "PMMV"] {
        for rep in 1..=3 {
            sheets.push(replicate_sheet(&format!("{family}_rep{rep}"), |well| match well {
                "A1" | "A2" => json!(25.0),
                _ => json!("Undetermined"),
            }));
        }
    }
    let path = write_workbook(dir.path(), "plate.json", sheets);

    let mut source = open_workbook(&path).unwrap();
    let outcome = process_workbook(source.as_mut(), &PipelineOptions::default()).unwrap();
    assert_eq!(outcome.table.len(), 9 * 96);
    assert!(outcome.warnings.is_empty(), "{:?}", outcome.warnings);

    let row = |sheet: &str, well: &str| {
        outcome
            .table
            .rows
            .iter()
            .find(|r| r.replicate.sheet == sheet && r.replicate.well.to_csv_field() == well)
            .unwrap()
    };

    let n1 = row("N1_rep2", "A1");
    assert_close(n1.sewage_conc.unwrap(), n1.replicate.total_copies.unwrap() * 3.0 / 15.0);

    let n2 = row("N2_rep1", "A1");
    assert_close(n2.replicate.total_copies.unwrap(), 10f64.powf(-0.2876 * 25.0 + 11.912));

    let pmmv = row("PMMV_rep3", "A1");
    assert_close(pmmv.sewage_conc.unwrap(), pmmv.replicate.total_copies.unwrap() * 5.0 / 15.0);

    // PMMV dilution missing for A2
    assert_eq!(row("PMMV_rep1", "A2").sewage_conc, None);
    assert!(row("N2_rep1", "A2").sewage_conc.is_some());
}

#[test]
fn mis_shaped_sheet_writes_no_report() {
    let dir = tempfile::tempdir().unwrap();
    let mut short = replicate_sheet("N1_rep2", |_| json!(30.0));
    short.rows.truncate(90);
    let path = write_workbook(
        dir.path(),
        "plate.json",
        vec![
            replicate_sheet("N1_rep1", |_| json!(30.0)),
            short,
            sample_sheet("sample_info", &[]),
        ],
    );

    let mut source = open_workbook(&path).unwrap();
    let results = dir.path().join("results");
    let mut sink = CsvReportWriter::with_date(&results, date());
    let err = pipeline::run(source.as_mut(), &mut sink, &PipelineOptions::default()).unwrap_err();

    match &err {
        PipelineError::UnexpectedSheetShape { sheet, workbook, rows, .. } => {
            assert_eq!(sheet, "N1_rep2");
            assert_eq!(workbook, "plate.json");
            assert_eq!(*rows, 90);
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(err.to_string().contains("plate.json"));
    assert!(!results.exists());
}

#[test]
fn partial_replicates_keep_earlier_sheets() {
    let dir = tempfile::tempdir().unwrap();
    let mut short = replicate_sheet("N1_rep2", |_| json!(30.0));
    short.rows.truncate(90);
    let path = write_workbook(
        dir.path(),
        "plate.json",
        vec![
            replicate_sheet("N1_rep1", |_| json!(30.0)),
            short,
            replicate_sheet("N1_rep3", |_| json!(30.0)),
            sample_sheet("sample_info", &[]),
        ],
    );

    let mut source = open_workbook(&path).unwrap();
    let options = PipelineOptions {
        allow_partial_replicates: true,
        ..Default::default()
    };
    let outcome = process_workbook(source.as_mut(), &options).unwrap();
    assert_eq!(outcome.table.len(), 96);
    assert!(outcome.table.rows.iter().all(|r| r.replicate.sheet == "N1_rep1"));
    assert!(outcome
        .warnings
        .iter()
        .any(|w| matches!(w, PipelineWarning::TruncatedReplicates(v) if v.sheet == "N1_rep2")));
}

#[test]
fn missing_sample_sheet_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_workbook(
        dir.path(),
        "plate.json",
        vec![replicate_sheet("N1_rep1", |_| json!(30.0))],
    );
    let mut source = open_workbook(&path).unwrap();
    let err = process_workbook(source.as_mut(), &PipelineOptions::default()).unwrap_err();
    assert!(matches!(err, PipelineError::NoMetadataSheet { .. }));
}

#[test]
fn workbook_without_replicates_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_workbook(
        dir.path(),
        "plate.json",
        vec![sample_sheet("sample_info", &[("A1", "WW-01", json!(1), json!(1))])],
    );
    let mut source = open_workbook(&path).unwrap();
    let err = process_workbook(source.as_mut(), &PipelineOptions::default()).unwrap_err();
    assert!(matches!(err, PipelineError::NoReplicateData { .. }));
}

#[test]
fn inconsistent_detection_is_reported_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let mut sheets = vec![sample_sheet("sample_info", &[])];
    for rep in 1..=3 {
        sheets.push(replicate_sheet(&format!("N2_rep{rep}"), move |well| {
            if well == "B3" && rep == 2 { json!("Undetermined") } else { json!(28.5) }
        }));
    }
    let path = write_workbook(dir.path(), "plate.json", sheets);

    let mut source = open_workbook(&path).unwrap();
    let outcome = process_workbook(source.as_mut(), &PipelineOptions::default()).unwrap();
    assert_eq!(outcome.table.len(), 288);
    let messages: Vec<String> = outcome.warnings.iter().map(|w| w.to_string()).collect();
    assert_eq!(messages.len(), 1, "{messages:?}");
    assert!(messages[0].contains("B3"));
    assert!(messages[0].contains("N2_rep2"));
}
