use breadthlab_core::breadth::{BreadthParams, BreadthRow, BreadthTable};
use breadthlab_runner::reporting::{
    read_manifest, BreadthManifest, ReportOptions, ReportWriter, MANIFEST_SCHEMA_VERSION,
};
use chrono::{NaiveDate, Utc};
use polars::prelude::{DataType, ParquetReader, SerReader};
use std::fs::File;

fn make_table(rows: usize) -> BreadthTable {
    let base = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
    BreadthTable {
        params: BreadthParams::new(50, 200),
        rows: (0..rows)
            .map(|i| BreadthRow {
                date: base + chrono::Duration::days(i as i64),
                pct_fast: 10.0 + i as f64,
                pct_slow: 90.0 - i as f64,
                valid_fast: 40,
                valid_slow: 38,
            })
            .collect(),
    }
}

fn make_manifest(table: &BreadthTable) -> BreadthManifest {
    BreadthManifest {
        schema_version: MANIFEST_SCHEMA_VERSION,
        universe: "nifty50".into(),
        generated_at: Utc::now(),
        fast: 50,
        slow: 200,
        min_coverage: 0.8,
        matrix_rows: 400,
        matrix_cols: 42,
        kept_symbols: vec!["INFY".into(), "TCS".into()],
        dropped_symbols: vec!["NEWCO".into()],
        first_date: table.first_date(),
        last_date: table.last_date(),
        rows: table.len(),
        dataset_hash: "ab".repeat(32),
    }
}

#[test]
fn test_report_writer_exports_all_artifacts() {
    let temp_dir = tempfile::tempdir().unwrap();
    let out = temp_dir.path().join("output");
    let img = temp_dir.path().join("images");
    let writer = ReportWriter::new(&out, &img);
    let table = make_table(12);
    let manifest = make_manifest(&table);

    let paths = writer
        .save(
            &table,
            &manifest,
            ReportOptions {
                parquet: true,
                chart: true,
            },
        )
        .unwrap();

    assert_eq!(paths.csv, out.join("nifty50_dma_breadth.csv"));
    assert_eq!(paths.chart.as_deref(), Some(img.join("nifty50_dma_breadth.svg").as_path()));
    assert_eq!(paths.all().len(), 4);
    for path in paths.all() {
        assert!(path.exists(), "missing {}", path.display());
    }

    let csv = std::fs::read_to_string(&paths.csv).unwrap();
    assert_eq!(csv.lines().count(), 13);
    assert!(csv.starts_with("Date,pct_above_50dma,pct_above_200dma,"));

    let df = ParquetReader::new(File::open(paths.parquet.unwrap()).unwrap())
        .finish()
        .unwrap();
    assert_eq!(df.shape(), (12, 5));
    assert_eq!(df.column("Date").unwrap().dtype(), &DataType::Date);

    let back = read_manifest(&paths.manifest).unwrap();
    assert_eq!(back, manifest);
}

#[test]
fn test_optional_artifacts_are_skipped() {
    let temp_dir = tempfile::tempdir().unwrap();
    let img = temp_dir.path().join("images");
    let writer = ReportWriter::new(temp_dir.path(), &img);
    let table = make_table(3);

    let paths = writer
        .save(
            &table,
            &make_manifest(&table),
            ReportOptions {
                parquet: false,
                chart: false,
            },
        )
        .unwrap();

    assert!(paths.parquet.is_none());
    assert!(paths.chart.is_none());
    assert!(!img.exists());
    assert!(paths.csv.exists());
    assert!(paths.manifest.exists());
}

#[test]
fn test_manifest_without_schema_version_defaults() {
    let temp_dir = tempfile::tempdir().unwrap();
    let table = make_table(1);
    let mut json = serde_json::to_value(make_manifest(&table)).unwrap();
    json.as_object_mut().unwrap().remove("schema_version");
    let path = temp_dir.path().join("m.json");
    std::fs::write(&path, json.to_string()).unwrap();

    let back = read_manifest(&path).unwrap();
    assert_eq!(back.schema_version, MANIFEST_SCHEMA_VERSION);
}
