//! Integration tests for CSV conversion on real files.

use std::fs;
use std::io::Write;
use std::path::Path;

use tempfile::{tempdir, NamedTempFile};

use nakala_cli::converter::{convert_csv, parse_files, read_csv_rows, validate_dataset};
use nakala_cli::metadata::{DatasetStatus, MetaValue, Property};
use nakala_cli::NakalaError;

const HEADER: &str = "title,description,keywords,creator,date,license,type,files";

/// Helper to create a temporary file with given content.
fn create_test_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(content.as_bytes())
        .expect("Failed to write to temp file");
    file
}

fn write(dir: &Path, name: &str, content: &str) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

// =============================================================================
// Reading
// =============================================================================

#[test]
fn test_read_csv_rows_basic() {
    let file = create_test_file(
        "title,creator\n\
         en: Maps | fr: Cartes,\"Dupont, John\"\n\
         Second,Lowey\n",
    );

    let rows = read_csv_rows(file.path()).expect("read failed");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["title"], "en: Maps | fr: Cartes");
    assert_eq!(rows[0]["creator"], "Dupont, John");
    assert_eq!(rows[1]["creator"], "Lowey");
}

#[test]
fn test_read_csv_rows_strips_bom_and_header_spaces() {
    let file = create_test_file("\u{feff}title , license\nA,CC-BY-4.0\n");
    let rows = read_csv_rows(file.path()).unwrap();
    assert_eq!(rows[0]["title"], "A");
    assert_eq!(rows[0]["license"], "CC-BY-4.0");
}

#[test]
fn test_read_csv_rows_short_records() {
    let file = create_test_file("title,description,license\nOnly title\n");
    let rows = read_csv_rows(file.path()).unwrap();
    assert_eq!(rows[0]["title"], "Only title");
    assert!(!rows[0].contains_key("license"));
}

#[test]
fn test_read_missing_file_is_io_error() {
    let err = read_csv_rows("/definitely/not/here.csv").unwrap_err();
    assert!(matches!(err, NakalaError::Io { .. }));
}

// =============================================================================
// Conversion
// =============================================================================

#[test]
fn test_convert_csv_resolves_files_relative_to_csv() {
    let dir = tempdir().unwrap();
    write(dir.path(), "data/a.txt", "a");
    write(dir.path(), "data/b.txt", "b");
    write(dir.path(), "single.txt", "s");
    write(
        dir.path(),
        "input.csv",
        &format!(
            "{}\n\
             en: Maps,Old maps,history;maps,\"Dupont, John (0000-0001-2345-6789)\",2024,CC-BY-4.0,http://purl.org/coar/resource_type/c_c513,data | single.txt\n",
            HEADER
        ),
    );

    let records = convert_csv(dir.path().join("input.csv"), DatasetStatus::Published).unwrap();
    assert_eq!(records.len(), 1);

    let record = &records[0];
    assert_eq!(record.row, 1);
    let names: Vec<_> = record
        .files
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["a.txt", "b.txt", "single.txt"]);

    let dataset = &record.dataset;
    assert_eq!(dataset.status, DatasetStatus::Published);
    assert!(dataset.files.is_empty());
    assert_eq!(dataset.metas.iter().filter(|m| m.is(Property::Subject)).count(), 2);

    let creator = dataset.metas.iter().find(|m| m.is(Property::Creator)).unwrap();
    match &creator.value {
        MetaValue::Creator(c) => {
            assert_eq!(c.surname, "Dupont");
            assert_eq!(c.orcid.as_deref(), Some("0000-0001-2345-6789"));
        }
        other => panic!("unexpected creator value: {:?}", other),
    }

    let (ok, errors) = validate_dataset(dataset);
    assert!(ok, "{:?}", errors);
}

#[test]
fn test_convert_csv_reports_missing_fields_for_published() {
    let dir = tempdir().unwrap();
    write(
        dir.path(),
        "input.csv",
        &format!("{}\nTitle only,,,,,,,\n", HEADER),
    );

    let records = convert_csv(dir.path().join("input.csv"), DatasetStatus::Published).unwrap();
    let (ok, errors) = validate_dataset(&records[0].dataset);
    assert!(!ok);
    assert_eq!(errors.len(), 4);
    assert!(errors.iter().any(|e| e.ends_with("license")));
    assert!(records[0].files.is_empty());
}

#[test]
fn test_convert_csv_pending_always_valid() {
    let file = create_test_file("title\nDraft\n");
    let records = convert_csv(file.path(), DatasetStatus::Pending).unwrap();
    assert!(validate_dataset(&records[0].dataset).0);
}

// =============================================================================
// File lists
// =============================================================================

#[test]
fn test_parse_files_skips_hidden_and_missing() {
    let dir = tempdir().unwrap();
    write(dir.path(), "scans/.DS_Store", "x");
    write(dir.path(), "scans/page1.tif", "1");
    write(dir.path(), "scans/sub/page2.tif", "2");

    let files = parse_files("scans | missing.txt", dir.path());
    let names: Vec<_> = files
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["page1.tif", "page2.tif"]);
    assert!(files.iter().all(|p| p.is_absolute()));
}

#[test]
fn test_parse_files_accepts_absolute_paths() {
    let dir = tempdir().unwrap();
    write(dir.path(), "doc.pdf", "pdf");
    let absolute = dir.path().join("doc.pdf");

    let files = parse_files(&absolute.to_string_lossy(), Path::new("/elsewhere"));
    assert_eq!(files.len(), 1);
    assert!(parse_files("  |  ", dir.path()).is_empty());
}
