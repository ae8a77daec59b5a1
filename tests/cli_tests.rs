//! Integration tests for the Optimus CLI

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

/// Test helper to get the CLI binary
fn optimus_cmd() -> Command {
    Command::cargo_bin("optimus").unwrap()
}

fn sample_data() -> &'static str {
    "Frozen pizza\nfrozen pizzas\nCheese pizza\nGreen tea\ngreen tea bags\nBlack tea\nCar tyres\nCar tyre\n"
}

#[test]
fn test_cli_help() {
    optimus_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("prepare-review"));
}

#[test]
fn test_print_default_config() {
    optimus_cmd()
        .arg("print-default-config")
        .assert()
        .success()
        .stdout(predicate::str::contains("cutoff:"))
        .stdout(predicate::str::contains("subword:100"));
}

#[test]
fn test_validate_config_accepts_valid_file() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("optimus.yml");
    fs::write(&config, "distance: 0.5\ncutoff: 3.0\nstepsize: 0.5\n").unwrap();

    optimus_cmd()
        .args(["validate-config", "--config"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("valid"));
}

#[test]
fn test_validate_config_rejects_invalid_file() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("optimus.yml");
    fs::write(&config, "distance: 5.0\ncutoff: 1.0\n").unwrap();

    optimus_cmd()
        .args(["validate-config", "--config"])
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("validation failed"));
}

#[test]
fn test_run_requires_data() {
    let dir = tempdir().unwrap();
    optimus_cmd()
        .current_dir(dir.path())
        .arg("run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No input data"));
}

#[test]
fn test_run_writes_results_knn_and_review() {
    let dir = tempdir().unwrap();
    let data = dir.path().join("data.csv");
    let out = dir.path().join("results.csv");
    let knn = dir.path().join("knn.csv");
    let review = dir.path().join("review.csv");
    fs::write(&data, sample_data()).unwrap();

    optimus_cmd()
        .arg("run")
        .arg("--data")
        .arg(&data)
        .arg("--out")
        .arg(&out)
        .arg("--knn")
        .arg("--knn-out")
        .arg(&knn)
        .arg("--review")
        .arg(&review)
        .args(["--cutoff", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Results saved to"));

    let results = fs::read_to_string(&out).unwrap();
    assert!(results.starts_with("original,tier_1"));
    assert_eq!(results.lines().count(), 9);

    let predictions = fs::read_to_string(&knn).unwrap();
    assert!(predictions.starts_with("original,word,predicted_label"));

    let review_table = fs::read_to_string(&review).unwrap();
    assert!(review_table.lines().next().unwrap().ends_with("new_labels"));
}

#[test]
fn test_run_with_missing_user_config_falls_back_to_defaults() {
    let dir = tempdir().unwrap();
    let data = dir.path().join("data.csv");
    let out = dir.path().join("results.csv");
    fs::write(&data, sample_data()).unwrap();

    optimus_cmd()
        .arg("run")
        .arg("--config")
        .arg(dir.path().join("absent.yml"))
        .arg("--data")
        .arg(&data)
        .arg("--out")
        .arg(&out)
        .assert()
        .success();
    assert!(out.exists());
}

#[test]
fn test_prepare_review() {
    let dir = tempdir().unwrap();
    let results = dir.path().join("results.csv");
    let review = dir.path().join("review.csv");
    fs::write(
        &results,
        "original,tier_1,tier_2,current_labels\n\
         Frozen pizza,frozen pizza,pizza,pizza\n\
         Cheese pizza,cheese pizza,pizza,pizza\n\
         Green tea,green tea,green tea,green tea\n",
    )
    .unwrap();

    optimus_cmd()
        .arg("prepare-review")
        .arg(&results)
        .arg("--out")
        .arg(&review)
        .args(["--min-cluster", "2", "--tiers", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("tier_2"));

    let content = fs::read_to_string(&review).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines[0], "original,tier_1,tier_2,current_labels,new_labels");
    assert_eq!(lines[1], "Frozen pizza,frozen pizza,pizza,pizza,");
    assert_eq!(lines[3], "Green tea,green tea,green tea,green tea,SKIPPED");
}
