mod common;

use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use predicates::str::contains;
use serde_json::Value;
use tempfile::tempdir;

const CSV: &str = "title,keywords,creator,date,license,type\n\
en: Maps | fr: Cartes,history;maps,\"Dupont, John\",2024,CC-BY-4.0,http://purl.org/coar/resource_type/c_c513\n\
Incomplete,,,,,image\n";

fn cmd() -> Command {
    let mut cmd = Command::cargo_bin("nakala-cli").unwrap();
    cmd.env("NAKALA_INTERACTIVE_MODE", "false");
    cmd
}

#[test]
fn convert_prints_records() {
    let dir = tempdir().unwrap();
    let csv = dir.path().join("input.csv");
    fs::write(&csv, CSV).unwrap();

    let output = cmd().arg("convert").arg(&csv).output().unwrap();
    assert!(output.status.success());

    let records: Vec<Value> = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["row"], 1);
    assert_eq!(records[0]["dataset"]["status"], "pending");
    assert_eq!(records[0]["dataset"]["metas"][0]["value"], "Maps");
    assert_eq!(records[0]["dataset"]["metas"][1]["lang"], "fr");
}

#[test]
fn convert_published_reports_errors_on_stderr() {
    let dir = tempdir().unwrap();
    let csv = dir.path().join("input.csv");
    let out = dir.path().join("out.json");
    fs::write(&csv, CSV).unwrap();

    cmd()
        .args(["convert", "--status", "published", "--output"])
        .arg(&out)
        .arg(&csv)
        .assert()
        .success()
        .stdout(contains("2 record(s) written"))
        .stderr(contains("Row 2: Missing required field for published status: license"))
        .stderr(contains("Row 2: Type must be full COAR URI, not 'image'"));

    let written: Vec<Value> = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(written[1]["dataset"]["status"], "published");
}

#[test]
fn validate_accepts_convert_output() {
    let dir = tempdir().unwrap();
    let csv = dir.path().join("input.csv");
    let out = dir.path().join("out.json");
    fs::write(&csv, CSV).unwrap();

    cmd().args(["convert", "--output"]).arg(&out).arg(&csv).assert().success();
    cmd()
        .arg("validate")
        .arg(&out)
        .assert()
        .success()
        .stdout(contains("Dataset 2 is valid (pending)"))
        .stdout(contains("\u{1b}[").not());
}

#[test]
fn validate_fails_on_invalid_published_dataset() {
    let dir = tempdir().unwrap();
    let json = dir.path().join("dataset.json");
    fs::write(
        &json,
        r#"{"status":"published","metas":[{"propertyUri":"http://nakala.fr/terms#title","value":"T"}]}"#,
    )
    .unwrap();

    cmd()
        .arg("validate")
        .arg(&json)
        .assert()
        .failure()
        .stdout(contains("Dataset 1: Missing required field for published status: creator"))
        .stderr(contains("1 invalid dataset(s)"));
}

#[test]
fn validate_rejects_files_that_are_not_datasets() {
    let dir = tempdir().unwrap();
    let json = dir.path().join("metas.json");
    fs::write(
        &json,
        r#"[{"propertyUri":"http://nakala.fr/terms#title","value":"T"},{"Status":"published","metas":[]}]"#,
    )
    .unwrap();

    cmd()
        .arg("validate")
        .arg(&json)
        .assert()
        .failure()
        .stdout(contains("is valid").not())
        .stderr(contains("is not a dataset payload"));
}

#[test]
fn import_dry_run_stops_before_network() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("scan.txt"), "scan").unwrap();
    let csv = dir.path().join("input.csv");
    fs::write(
        &csv,
        "title,creator,date,license,type,files\n\
         Scan,Dupont,2024,CC-BY-4.0,http://purl.org/coar/resource_type/c_c513,scan.txt\n",
    )
    .unwrap();

    cmd()
        .args(["--api-url", "http://127.0.0.1:9", "--non-interactive", "import", "--dry-run"])
        .arg(&csv)
        .assert()
        .success()
        .stdout(contains("1 row(s) ready to import"));
}

#[test]
fn import_reports_failed_rows_and_keeps_going() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("one.txt"), "one").unwrap();
    fs::write(dir.path().join("two.txt"), "two").unwrap();
    let csv = dir.path().join("input.csv");
    fs::write(&csv, "title,files\nFirst,one.txt\nSecond,two.txt\n").unwrap();

    let (url, rx) = common::serve(vec![
        (201, r#"{"name":"one.txt","sha1":"aaa"}"#),
        (201, r#"{"code":201,"payload":{"id":"10.34847/nkl.one"}}"#),
        (500, r#"{"message":"storage unavailable"}"#),
    ]);

    cmd()
        .args(["--api-url", url.as_str(), "--non-interactive", "import"])
        .arg(&csv)
        .assert()
        .failure()
        .stdout(contains("Row 1: 10.34847/nkl.one"))
        .stdout(contains("Row 2: upload of"))
        .stdout(contains("1 dataset(s) created, 1 row(s) failed"))
        .stderr(contains("1 row(s) could not be imported"));

    let lines = common::request_lines(&rx);
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("POST /datas/uploads "));
    assert!(lines[1].starts_with("POST /datas "));
    assert!(lines[2].starts_with("POST /datas/uploads "));
}

#[test]
fn import_rejects_rows_without_files() {
    let dir = tempdir().unwrap();
    let csv = dir.path().join("input.csv");
    fs::write(&csv, "title\nNo files\n").unwrap();

    cmd()
        .args(["import", "--dry-run"])
        .arg(&csv)
        .assert()
        .failure()
        .stderr(contains("Row 1: no files to upload"));
}

#[test]
fn unknown_demo_is_rejected() {
    cmd().args(["demo", "nope"]).assert().failure();
}
