//! Integration tests for the dosekit binary.
//!
//! These tests verify end-to-end behavior including:
//! - Single-dose decomposition and failure reporting
//! - Schedule generators with JSON and CSV output
//! - Injectable supply estimation
//! - Config file overrides

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Helper to create a scratch directory
fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Helper to get the CLI binary, isolated from any real user config
fn cli() -> Command {
    let home = Path::new(env!("CARGO_TARGET_TMPDIR")).join("dosekit-empty-home");
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("dosekit"));
    cmd.env("HOME", &home).env("XDG_CONFIG_HOME", home.join(".config"));
    cmd
}

/// Run a command and parse its stdout as JSON
fn run_json(args: &[&str]) -> Value {
    let output = cli().arg("--json").args(args).output().unwrap();
    assert!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout is not JSON")
}

#[test]
fn test_cli_help() {
    cli()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Tablet dose decomposition and dispensing planner",
        ));
}

#[test]
fn test_combo_with_half_tablet() {
    cli()
        .args(["combo", "--target", "7.5", "--strengths", "5,10,20", "--halves"])
        .assert()
        .success()
        .stdout(predicate::str::contains("7.5 = 1 x 5, 1 x 1/2 of 5"))
        .stdout(predicate::str::contains("2 tablets"));
}

#[test]
fn test_combo_accepts_comma_decimal() {
    cli()
        .args(["combo", "--target", "2,5", "--strengths", "5", "--halves"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 x 1/2 of 5"));
}

#[test]
fn test_combo_unrepresentable_fails() {
    cli()
        .args([
            "combo",
            "--target",
            "112.5",
            "--strengths",
            "100,125",
            "--no-halves",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be made"));
}

#[test]
fn test_combo_requires_strengths() {
    cli()
        .args(["combo", "--target", "5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--strengths"));
}

#[test]
fn test_combo_preference_changes_result() {
    let simple = run_json(&[
        "combo",
        "--target",
        "30",
        "--strengths",
        "10,20",
        "--no-halves",
        "--preference",
        "simple",
    ]);
    assert_eq!(simple["tablets"], 3);
    assert_eq!(simple["combination"]["score"], 1150);

    let few = run_json(&[
        "combo",
        "--target",
        "30",
        "--strengths",
        "10,20",
        "--no-halves",
        "--preference",
        "fewTabs",
    ]);
    assert_eq!(few["tablets"], 2);
    assert_eq!(few["preference"], "fewTabs");
}

#[test]
fn test_combo_uses_product_preset() {
    cli()
        .args(["combo", "--target", "4", "--product", "warfarin"])
        .assert()
        .success()
        .stdout(predicate::str::contains("4 = 4 x 1"));
}

#[test]
fn test_taper_json() {
    let schedule = run_json(&[
        "taper",
        "--start",
        "2026-03-02",
        "--step",
        "30x5",
        "--step",
        "20x5",
        "--strengths",
        "5,10,20",
        "--halves",
    ]);

    assert_eq!(schedule["start"], "2026-03-02");
    assert_eq!(schedule["end"], "2026-03-11");

    let steps = schedule["steps"].as_array().unwrap();
    assert_eq!(steps.len(), 2);
    assert_eq!(steps[0]["step"], 1);
    assert_eq!(steps[0]["end"], "2026-03-06");
    assert_eq!(steps[1]["start"], "2026-03-07");

    let items = steps[0]["combination"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["strength"], 10.0);
    assert_eq!(items[0]["whole"], 3);

    let tablets: Vec<u64> = schedule["lines"]
        .as_array()
        .unwrap()
        .iter()
        .map(|line| line["tablets"].as_u64().unwrap())
        .collect();
    assert_eq!(tablets, vec![0, 15, 5]);
}

#[test]
fn test_taper_reports_failing_step() {
    cli()
        .args([
            "taper",
            "--start",
            "2026-03-02",
            "--step",
            "20x3",
            "--step",
            "7x3",
            "--strengths",
            "5,10,20",
            "--no-halves",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Step 2"));
}

#[test]
fn test_taper_rejects_bad_step() {
    cli()
        .args(["taper", "--step", "30", "--strengths", "10"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("DOSExDAYS"));
}

#[test]
fn test_taper_csv_export() {
    let temp_dir = setup_test_dir();
    let csv_path = temp_dir.path().join("taper.csv");

    cli()
        .args([
            "taper",
            "--start",
            "2026-03-02",
            "--step",
            "30x5",
            "--step",
            "20x5",
            "--strengths",
            "5,10,20",
            "--halves",
            "--csv",
        ])
        .arg(&csv_path)
        .assert()
        .success();

    let contents = fs::read_to_string(&csv_path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 11);
    assert_eq!(lines[0], "date,weekday,dose,instruction,tablets");
    assert_eq!(lines[1], "2026-03-02,Mon,30,3 x 10,3");
    assert_eq!(lines[10], "2026-03-11,Wed,20,1 x 20,1");
}

#[test]
fn test_pattern_json() {
    let schedule = run_json(&[
        "pattern",
        "--start",
        "2026-01-05",
        "--weeks",
        "1",
        "--strengths",
        "1,3",
        "--pattern",
        "1,0,1,0,1,0,-",
        "--box-sizes",
        "28,28",
    ]);

    let entries = schedule["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 7);
    assert_eq!(entries[0]["weekday"], "Mon");
    assert_eq!(entries[0]["dose"], 3.0);
    assert_eq!(entries[6]["dose"], 0.0);

    let lines = schedule["lines"].as_array().unwrap();
    assert_eq!(lines[0]["days"], 3);
    assert_eq!(lines[1]["days"], 3);
    assert_eq!(lines[1]["boxes"], 1);
}

#[test]
fn test_pattern_requires_seven_days() {
    cli()
        .args([
            "pattern",
            "--weeks",
            "1",
            "--strengths",
            "1,3",
            "--pattern",
            "1,0,1",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("expected 7 entries"));
}

#[test]
fn test_variable_cycle() {
    let schedule = run_json(&[
        "variable",
        "--start",
        "2026-01-05",
        "--days",
        "4",
        "--cycle",
        "5,2.5",
        "--strengths",
        "5",
        "--halves",
    ]);

    let doses: Vec<f64> = schedule["entries"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["dose"].as_f64().unwrap())
        .collect();
    assert_eq!(doses, vec![5.0, 2.5, 5.0, 2.5]);
}

#[test]
fn test_variable_reports_failing_date() {
    cli()
        .args([
            "variable",
            "--start",
            "2026-01-05",
            "--days",
            "7",
            "--weekly",
            "5,5,5,5,5,5,2.5",
            "--strengths",
            "5",
            "--no-halves",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("2026-01-11"));
}

#[test]
fn test_weekly_schedule() {
    let schedule = run_json(&[
        "weekly",
        "--dose",
        "15",
        "--strength",
        "2.5",
        "--anchor",
        "fri",
        "--start",
        "2026-01-05",
        "--weeks",
        "2",
    ]);

    assert_eq!(schedule["anchor_date"], "2026-01-09");
    let entries = schedule["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[1]["date"], "2026-01-16");
    assert_eq!(schedule["line"]["tablets"], 12);
}

#[test]
fn test_weekly_inexact_dose_fails() {
    cli()
        .args([
            "weekly",
            "--dose",
            "10",
            "--strength",
            "7.5",
            "--anchor",
            "mon",
            "--weeks",
            "4",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not representable"));
}

#[test]
fn test_supply_reconciles() {
    let estimate = run_json(&[
        "supply",
        "--dose",
        "basal=10",
        "--dose",
        "bolus=10",
        "--days",
        "56",
        "--container",
        "pen",
        "--capacity",
        "300",
        "--per-box",
        "5",
        "--priming",
        "2",
        "--discard-after",
        "28",
    ]);

    assert_eq!(estimate["containers"], 5);
    assert_eq!(estimate["boxes"], 1);

    let dosed = estimate["units_dosed"].as_f64().unwrap();
    let primed = estimate["units_primed"].as_f64().unwrap();
    let discarded = estimate["units_discarded"].as_f64().unwrap();
    let stranded = estimate["units_stranded"].as_f64().unwrap();
    let leftover = estimate["leftover"].as_f64().unwrap();
    assert_eq!(dosed, 1120.0);
    assert_eq!(primed, 224.0);
    assert!((dosed + primed + discarded + stranded + leftover - 1500.0).abs() < 1e-6);
}

#[test]
fn test_supply_text_output() {
    cli()
        .args([
            "supply",
            "--dose",
            "daily=5",
            "--days",
            "56",
            "--product",
            "insulin_vial_100",
            "--discard-after",
            "28",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Containers:   2"))
        .stdout(predicate::str::contains("Wasted:"))
        .stdout(predicate::str::contains("Leftover:"));
}

#[test]
fn test_supply_rejects_tablet_product() {
    cli()
        .args(["supply", "--dose", "10", "--days", "7", "--product", "warfarin"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not an injectable product"));
}

#[test]
fn test_config_file_overrides_defaults() {
    let temp_dir = setup_test_dir();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "[search]\npreference = \"fewTabs\"\n").unwrap();

    let output = cli()
        .arg("--config")
        .arg(&config_path)
        .args([
            "--json",
            "combo",
            "--target",
            "30",
            "--strengths",
            "10,20",
            "--no-halves",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());

    let result: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result["preference"], "fewTabs");
    assert_eq!(result["tablets"], 2);
}

#[test]
fn test_malformed_config_is_reported() {
    let temp_dir = setup_test_dir();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "[search\n").unwrap();

    cli()
        .arg("--config")
        .arg(&config_path)
        .args(["combo", "--target", "5", "--strengths", "5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("TOML error"));
}

#[test]
fn test_presets_listing() {
    cli()
        .arg("presets")
        .assert()
        .success()
        .stdout(predicate::str::contains("warfarin"))
        .stdout(predicate::str::contains("insulin_pen_100"));
}

#[test]
fn test_user_config_location_is_ignored_in_tests() {
    let home = Path::new(env!("CARGO_TARGET_TMPDIR")).join("dosekit-empty-home");
    assert!(!home.join(".config/dosekit/config.toml").exists());

    // defaults apply: halves allowed, simple preference
    let result = run_json(&["combo", "--target", "7.5", "--strengths", "5"]);
    assert_eq!(result["preference"], "simple");
    assert_eq!(result["tablets"], 2);
}

#[test]
fn test_pattern_text_table() {
    cli()
        .args([
            "pattern",
            "--start",
            "2026-01-05",
            "--weeks",
            "1",
            "--strengths",
            "1,3",
            "--pattern",
            "1,0,1,0,1,0,-",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Day pattern 2026-01-05 to 2026-01-11"))
        .stdout(predicate::str::contains("Remainder"));
}
