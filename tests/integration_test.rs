//! Integration tests for the wht-ledger CLI.
//!
//! These tests run the actual binary against fixture files.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::io::Write;
use tempfile::NamedTempFile;

/// Get path to test data file
fn test_data_path(filename: &str) -> String {
    format!("tests/data/{}", filename)
}

/// Run the binary with the given arguments and return stdout
fn run_ledger(args: &[&str]) -> String {
    let mut cmd = Command::cargo_bin("wht-ledger").unwrap();
    let assert = cmd.args(args).assert().success();
    String::from_utf8(assert.get_output().stdout.clone()).unwrap()
}

fn temp_csv(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_report_summarizes_validation() {
    let output = run_ledger(&[test_data_path("declarations.csv").as_str()]);
    assert!(output.starts_with("Validation: 3 records: 2 valid, 1 invalid (66.7% valid)\n"));
}

#[test]
fn test_report_lists_unparseable_lines() {
    let output = run_ledger(&[test_data_path("declarations.csv").as_str()]);

    assert!(output.contains("Unparseable lines: 2\n"));
    assert!(output.contains("  Line 6: Validation error: Income code must be"));
    assert!(output.contains("  Line 7: Validation error: Invalid date values: 31/02/2025"));
}

#[test]
fn test_report_explains_checksum_mismatch() {
    let output = run_ledger(&[test_data_path("declarations.csv").as_str()]);

    assert!(output.contains("Transaction Line: WK003,Teaching,27/07/2025,3000.00,300.00\n"));
    assert!(output.contains("Checksum mismatch: expected 99, calculated 27"));
    assert!(!output.contains("Transaction Line: IN001"));
}

#[test]
fn test_report_taxes_only_valid_records() {
    let output = run_ledger(&[test_data_path("declarations.csv").as_str()]);

    assert!(output.contains("  Number of Records: 2\n"));
    assert!(output.contains("  Total Income: Rs 215,000.00\n"));
    assert!(output.contains("  Total WHT Paid: Rs 6,500.00\n"));
    assert!(output.contains("  Taxable Income: Rs 65,000.00\n"));
    assert!(output.contains("  Gross Tax: Rs 7,800.00\n"));
    assert!(output.contains("  NET TAX PAYABLE: Rs 1,300.00\n"));
}

#[test]
fn test_over_withheld_pays_nothing() {
    let output = run_ledger(&[test_data_path("over_withheld.csv").as_str()]);

    assert!(output.contains("Validation: 1 records: 1 valid, 0 invalid (100.0% valid)"));
    assert!(output.contains("  NET TAX PAYABLE: Rs 0.00\n"));
}

#[test]
fn test_repair_writes_corrected_csv() {
    let output = run_ledger(&[test_data_path("declarations.csv").as_str(), "--repair"]);
    let expected = fs::read_to_string(test_data_path("expected_repaired.csv")).unwrap();

    assert_eq!(output, expected);
}

#[test]
fn test_repaired_output_validates_cleanly() {
    let repaired = run_ledger(&[test_data_path("declarations.csv").as_str(), "--repair"]);
    let file = temp_csv(&repaired);

    let output = run_ledger(&[file.path().to_str().unwrap()]);
    assert!(output.starts_with("Validation: 3 records: 3 valid, 0 invalid (100.0% valid)\n"));
}

#[test]
fn test_headerless_input() {
    let file = temp_csv("IN001,Freelance Work,25/07/2025,10000.00,1000.00,30\n");

    let output = run_ledger(&[file.path().to_str().unwrap()]);
    assert!(output.contains("1 valid, 0 invalid"));
    assert!(output.contains("Unparseable lines: 0\n"));
    assert!(output.contains("  NET TAX PAYABLE: Rs 0.00\n"));
}

#[test]
fn test_empty_input() {
    let file = temp_csv("");

    let output = run_ledger(&[file.path().to_str().unwrap()]);
    assert!(output.contains("Validation: 0 records: 0 valid, 0 invalid (0.0% valid)"));
    assert!(output.contains("No records available for tax calculation."));
}

#[test]
fn test_missing_file_error() {
    let mut cmd = Command::cargo_bin("wht-ledger").unwrap();
    cmd.arg("nonexistent.csv")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error: I/O error"));
}

#[test]
fn test_missing_argument_error() {
    let mut cmd = Command::cargo_bin("wht-ledger").unwrap();
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Missing input file"));
}

#[test]
fn test_unknown_option_error() {
    let mut cmd = Command::cargo_bin("wht-ledger").unwrap();
    cmd.args([test_data_path("declarations.csv").as_str(), "--fix"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown option \"--fix\""));
}
