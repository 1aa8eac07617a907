//! Integration tests for the moon-reactions CLI
//!
//! These tests exercise the CLI commands end-to-end using assert_cmd.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Helper to get a moon-reactions command
fn moon() -> Command {
    Command::cargo_bin("moon-reactions").unwrap()
}

const SURVEY: &str = "\
Moon\tMoon Product\tQuantity\tOre TypeID\tSolarSystemID\tPlanetID\tMoonID
OP9L-F II - Moon 1
\tCopious Chromite\t1.0\t45501\t30002173\t40138526\t40138527
";

/// One reaction: 10,000 Chromium -> 1 Widget
const CATALOG: &str = r#"[
  {
    "formula_id": 1,
    "formula_name": "Widget Reaction Formula",
    "output": {"name": "Widget", "id": 900, "quantity": 1},
    "inputs": [{"name": "Chromium", "id": 16641, "quantity": 10000}]
  }
]"#;

fn write(tmp: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = tmp.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

// ============================================================================
// Basic
// ============================================================================

#[test]
fn test_help_displays() {
    moon()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("survey scans"));
}

#[test]
fn test_unknown_command_fails() {
    moon()
        .arg("unknown-command")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

// ============================================================================
// Parse
// ============================================================================

#[test]
fn test_parse_file_lists_sites() {
    let tmp = TempDir::new().unwrap();
    let survey = write(&tmp, "scan.txt", SURVEY);

    moon()
        .arg("parse")
        .arg(&survey)
        .assert()
        .success()
        .stdout(predicate::str::contains("[0] OP9L-F II - Moon 1"))
        .stdout(predicate::str::contains("Copious Chromite"));
}

#[test]
fn test_parse_stdin_json() {
    let output = moon()
        .args(["parse", "-", "--json"])
        .write_stdin(SURVEY)
        .output()
        .unwrap();
    assert!(output.status.success());

    let sites: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(sites[0]["name"], "OP9L-F II - Moon 1");
    assert_eq!(sites[0]["ores"][0]["ore"], "Chromite");
}

#[test]
fn test_parse_malformed_names_line() {
    moon()
        .args(["parse", "-"])
        .write_stdin("Site\n    Chromite 0.x 45501 1 2 3\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("line 2"));
}

// ============================================================================
// Catalog
// ============================================================================

#[test]
fn test_formulas_lists_catalog_in_order() {
    let output = moon().arg("formulas").output().unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<_> = stdout.lines().collect();
    assert_eq!(lines.len(), 30);
    assert!(lines[0].contains("Caesarium Cadmide Reaction Formula"));
}

#[test]
fn test_items_missing_from_price_sheet() {
    let tmp = TempDir::new().unwrap();
    let prices = write(&tmp, "prices.json", r#"{"Chromium": 100}"#);

    moon()
        .args(["--catalog"])
        .arg(write(&tmp, "catalog.json", CATALOG))
        .args(["items", "--missing-from"])
        .arg(&prices)
        .assert()
        .success()
        .stdout("Widget\n");
}

// ============================================================================
// Analyze
// ============================================================================

#[test]
fn test_analyze_holdings_at_opportunity_cost() {
    let tmp = TempDir::new().unwrap();
    let catalog = write(&tmp, "catalog.json", CATALOG);
    let survey = write(&tmp, "scan.txt", SURVEY);
    let prices = write(&tmp, "prices.json", r#"{"Chromium": 100, "Widget": {"buy": 1, "sell": 2000000}}"#);

    // 25,000 ore units of Chromite at 40 Chromium per 100 = 10,000 Chromium
    let output = moon()
        .arg("--catalog")
        .arg(&catalog)
        .args(["analyze", "--json", "--site-yield", "25000", "--survey"])
        .arg(&survey)
        .arg("--prices")
        .arg(&prices)
        .output()
        .unwrap();
    assert!(output.status.success());

    let rows: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let row = &rows[0];
    assert_eq!(row["input_cost"], 1_000_000.0);
    assert_eq!(row["output_value"], 2_000_000.0);
    assert_eq!(row["profit"], 1_000_000.0);
    assert_eq!(row["margin"], 50.0);
    assert_eq!(row["uses_user_materials"], true);
    assert_eq!(row["tree"]["source"], "finalOutput");
    assert_eq!(row["tree"]["children"][0]["source"], "fromHoldings");
}

#[test]
fn test_analyze_excludes_unpriced_input() {
    let tmp = TempDir::new().unwrap();
    let catalog = write(&tmp, "catalog.json", CATALOG);
    let prices = write(&tmp, "prices.json", r#"{"Widget": 2000000}"#);

    moon()
        .arg("--catalog")
        .arg(&catalog)
        .args(["analyze", "--show-excluded", "--prices"])
        .arg(&prices)
        .assert()
        .success()
        .stdout(predicate::str::contains("No reactions to show."))
        .stdout(predicate::str::contains("1 reaction(s) excluded"))
        .stdout(predicate::str::contains("No market price for Chromium"));
}

#[test]
fn test_analyze_bundled_catalog_with_tree() {
    let tmp = TempDir::new().unwrap();
    let survey = write(&tmp, "scan.txt", SURVEY);

    let names = moon().arg("items").output().unwrap().stdout;
    let sheet: serde_json::Map<String, serde_json::Value> = String::from_utf8(names)
        .unwrap()
        .lines()
        .map(|name| (name.to_string(), serde_json::json!(1000.0)))
        .collect();
    let prices = write(&tmp, "prices.json", &serde_json::Value::Object(sheet).to_string());

    let output = moon()
        .args(["analyze", "--tree", "--mine", "--limit", "3", "--survey"])
        .arg(&survey)
        .arg("--prices")
        .arg(&prices)
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("[HOLD]"));
    // Each shown row gets one tree and one summary
    assert_eq!(stdout.matches("[OUTPUT]").count(), 3);
    assert_eq!(stdout.matches("Profit:").count(), 3);
}

#[test]
fn test_analyze_missing_price_sheet_fails() {
    moon()
        .args(["analyze", "--prices", "/nonexistent/prices.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("price sheet"));
}

#[test]
fn test_analyze_rejects_bad_site_yield() {
    let tmp = TempDir::new().unwrap();
    let prices = write(&tmp, "prices.json", "{}");

    moon()
        .args(["analyze", "--site-yield", "0", "--prices"])
        .arg(&prices)
        .assert()
        .failure()
        .stderr(predicate::str::contains("site_yield"));
}

// ============================================================================
// Materials and session
// ============================================================================

#[test]
fn test_materials_from_survey_dir() {
    let tmp = TempDir::new().unwrap();
    write(&tmp, "a.txt", SURVEY);
    write(&tmp, "b.txt", "Other Moon\n    Sylvite 0.4 45491 1 2 3\n");

    moon()
        .args(["materials", "--survey-dir"])
        .arg(tmp.path())
        .assert()
        .success()
        .stdout("Copious Chromite\nSylvite\n");
}

#[test]
fn test_materials_with_yields() {
    let tmp = TempDir::new().unwrap();
    let survey = write(&tmp, "scan.txt", SURVEY);

    moon()
        .args(["materials", "--yields", "--survey"])
        .arg(&survey)
        .assert()
        .success()
        .stdout("Copious Chromite\n\nReaction materials:\n  Hydrocarbons\n  Chromium\n");
}

#[test]
fn test_session_add_list_remove() {
    let tmp = TempDir::new().unwrap();
    let survey = write(&tmp, "scan.txt", SURVEY);
    let prices = write(&tmp, "prices.json", "{}");

    let script = format!("add {}\nlist\nremove 5\nremove 0\nlist\nquit\n", survey.display());
    moon()
        .args(["session", "--prices"])
        .arg(&prices)
        .write_stdin(script)
        .assert()
        .success()
        .stdout(predicate::str::contains("Added 1 of 1 site(s)"))
        .stdout(predicate::str::contains("[0] OP9L-F II - Moon 1"))
        .stdout(predicate::str::contains("error: Site index 5 out of range"))
        .stdout(predicate::str::contains("No sites held."));
}
