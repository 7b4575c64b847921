use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// Command isolated from any config file in the user's config directory.
fn tiss(config_home: &tempfile::TempDir) -> Command {
    let mut cmd = Command::cargo_bin("tiss").unwrap();
    cmd.env("XDG_CONFIG_HOME", config_home.path())
        .env("HOME", config_home.path());
    cmd
}

#[test]
fn process_consulta_as_json() {
    let home = tempfile::tempdir().unwrap();

    tiss(&home)
        .arg("process")
        .arg(fixture("LOTE_123_consulta.xml"))
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""batch_number":"123""#))
        .stdout(predicate::str::contains(r#""guide_count":2"#))
        .stdout(predicate::str::contains(r#""total_value":"150.50""#))
        .stdout(predicate::str::contains(r#""document_type":"consulta""#))
        .stdout(predicate::str::contains(r#""lote_matches":true"#));
}

#[test]
fn process_sadt_as_text() {
    let home = tempfile::tempdir().unwrap();

    tiss(&home)
        .args(["process", "--format", "text"])
        .arg(fixture("lote_555_sadt.xml"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Type: SP-SADT"))
        .stdout(predicate::str::contains("Batch: 555"))
        .stdout(predicate::str::contains("Total: R$ 200,00 (guide_totals)"))
        .stdout(predicate::str::contains("File name batch: 555 (matches)"));
}

#[test]
fn process_writes_output_file() {
    let home = tempfile::tempdir().unwrap();
    let out = home.path().join("report.csv");

    tiss(&home)
        .args(["process", "-f", "csv", "-o"])
        .arg(&out)
        .arg(fixture("LOTE_123_consulta.xml"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Output written to"));

    let csv = fs::read_to_string(&out).unwrap();
    assert!(csv.starts_with("file_name,batch_number,document_type"));
    assert!(csv.contains("LOTE_123_consulta.xml,123,CONSULTA,2,150.50,procedure_sum,123,true,false"));
}

#[test]
fn process_malformed_xml_fails() {
    let home = tempfile::tempdir().unwrap();

    tiss(&home)
        .arg("process")
        .arg(fixture("malformed.xml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("XML parse error"));
}

#[test]
fn process_missing_file_fails() {
    let home = tempfile::tempdir().unwrap();

    tiss(&home)
        .arg("process")
        .arg(home.path().join("nothing.xml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Input file not found"));
}

#[test]
fn process_rejects_non_xml_file() {
    let home = tempfile::tempdir().unwrap();
    let path = home.path().join("lote_1.txt");
    fs::write(&path, "<a/>").unwrap();

    tiss(&home)
        .arg("process")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported file format: txt"));
}

#[test]
fn process_with_explicit_config() {
    let home = tempfile::tempdir().unwrap();
    let config = home.path().join("custom.json");
    fs::write(&config, r#"{"output": {"pretty_json": true}}"#).unwrap();

    tiss(&home)
        .arg("--config")
        .arg(&config)
        .arg("process")
        .arg(fixture("LOTE_123_consulta.xml"))
        .assert()
        .success()
        .stdout(predicate::str::contains("\"batch_number\": \"123\""));
}

#[test]
fn audit_sadt_as_csv() {
    let home = tempfile::tempdir().unwrap();

    tiss(&home)
        .args(["audit", "--format", "csv"])
        .arg(fixture("lote_555_sadt.xml"))
        .assert()
        .success()
        .stdout(predicate::str::contains("document_type,guide_provider_number"))
        .stdout(predicate::str::contains("SP-SADT,S1,OP-S1,200.00,150.00,50.00,200.00,true"));
}

#[test]
fn items_sadt_as_csv() {
    let home = tempfile::tempdir().unwrap();

    tiss(&home)
        .arg("items")
        .arg(fixture("lote_555_sadt.xml"))
        .assert()
        .success()
        .stdout(predicate::str::starts_with("kind,guide_provider_number"))
        .stdout(predicate::str::contains("HEMOGRAMA COMPLETO"))
        .stdout(predicate::str::contains("other_expense,S1,OP-S1,02,20,90000001"));
}

#[test]
fn config_path_and_init() {
    let home = tempfile::tempdir().unwrap();

    tiss(&home)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration file:"));

    let target = home.path().join("init.json");
    tiss(&home)
        .args(["config", "init", "--output"])
        .arg(&target)
        .assert()
        .success();

    let written = fs::read_to_string(&target).unwrap();
    assert!(written.contains("strict_amounts"));

    tiss(&home)
        .args(["config", "init", "--output"])
        .arg(&target)
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn process_rejects_unreadable_amount() {
    let home = tempfile::tempdir().unwrap();

    tiss(&home)
        .arg("process")
        .arg(fixture("lote_9_invalid_amount.xml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid amount in valorProcedimento"));
}

#[test]
fn process_lenient_shows_warnings() {
    let home = tempfile::tempdir().unwrap();

    tiss(&home)
        .args(["process", "--lenient", "--show-warnings"])
        .arg(fixture("lote_9_invalid_amount.xml"))
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""total_value":"5.00""#))
        .stdout(predicate::str::contains(r#""guide_count":2"#))
        .stderr(predicate::str::contains("Warnings:"))
        .stderr(predicate::str::contains("dez reais"));
}

#[test]
fn audit_as_json_includes_match_flag() {
    let home = tempfile::tempdir().unwrap();

    tiss(&home)
        .args(["audit", "--format", "json"])
        .arg(fixture("lote_555_sadt.xml"))
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""guide_provider_number":"S1""#))
        .stdout(predicate::str::contains(r#""matches_declared":true"#));
}

#[test]
fn audit_lists_only_mismatches() {
    let home = tempfile::tempdir().unwrap();

    tiss(&home)
        .args(["audit", "--mismatches-only"])
        .arg(fixture("lote_556_sadt_mismatch.xml"))
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "SP-SADT M2 / OP-M2: declared R$ 100,00, items R$ 90,00 [MISMATCH]",
        ))
        .stdout(predicate::str::contains("M1 /").not())
        .stdout(predicate::str::contains("1 guides"))
        .stderr(predicate::str::contains("1 of 2 guides declare a total different"));
}

#[test]
fn config_commands_use_global_config_path() {
    let home = tempfile::tempdir().unwrap();
    let config = home.path().join("custom.json");
    fs::write(&config, r#"{"output": {"currency_symbol": "US$"}}"#).unwrap();

    tiss(&home)
        .arg("--config")
        .arg(&config)
        .args(["config", "get", "output.currency_symbol"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"US$\""));

    tiss(&home)
        .arg("--config")
        .arg(&config)
        .args(["config", "set", "output.pretty_json", "true"])
        .assert()
        .success();

    let written = fs::read_to_string(&config).unwrap();
    assert!(written.contains("\"pretty_json\": true"));
    assert!(written.contains("US$"));

    tiss(&home)
        .arg("--config")
        .arg(&config)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("custom.json"))
        .stdout(predicate::str::contains("exists"));
}
