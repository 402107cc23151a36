//! CLI integration tests

use std::process::{Command, Output};
use tempfile::TempDir;

fn fare(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_fare"))
        .args(args)
        .env_remove("FARE_API_URL")
        .output()
        .expect("Failed to execute command")
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = fare(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(stdout.contains("Taxi Fare Estimator"), "Should show app name");
    assert!(stdout.contains("predict"), "Should show predict command");
    assert!(stdout.contains("train"), "Should show train command");
    assert!(stdout.contains("dashboard"), "Should show dashboard command");
    assert!(stdout.contains("model"), "Should show model command");
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = fare(&["--version"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("fare"), "Should show binary name");
}

/// Test predict subcommand help
#[test]
fn test_predict_help() {
    let output = fare(&["predict", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Predict help should succeed");
    for flag in ["--km", "--min", "--hour", "--day"] {
        assert!(stdout.contains(flag), "Should show {} option", flag);
    }
}

/// Test train subcommand help
#[test]
fn test_train_help() {
    let output = fare(&["train", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Train help should succeed");
    assert!(stdout.contains("--fare"), "Should show fare option");
}

/// Test model subcommand help
#[test]
fn test_model_help() {
    let output = fare(&["model", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Model help should succeed");
    for command in ["show", "save", "reload", "init", "inspect"] {
        assert!(stdout.contains(command), "Should show {} command", command);
    }
}

/// Test that an unknown day name is rejected before any request
#[test]
fn test_invalid_day() {
    let output = fare(&[
        "predict", "--km", "5", "--min", "15", "--hour", "14", "--day", "Funday",
    ]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success(), "Invalid day should fail");
    assert!(stderr.contains("Funday"), "Should name the bad value");
}

/// Test that an out-of-range hour is rejected before any request
#[test]
fn test_invalid_hour() {
    let output = fare(&[
        "--api-url",
        "http://127.0.0.1:9",
        "predict",
        "--km",
        "5",
        "--min",
        "15",
        "--hour",
        "24",
        "--day",
        "Monday",
    ]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success(), "Invalid hour should fail");
    assert!(stderr.contains("hour"), "Should name the bad field");
}

/// Test unknown command
#[test]
fn test_unknown_command() {
    let output = fare(&["unknown-command"]);
    assert!(!output.status.success(), "Unknown command should fail");
}

/// Test creating and inspecting a local artifact
#[test]
fn test_model_init_and_inspect() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("fare_model.json");
    let path_arg = path.to_str().unwrap();

    let output = fare(&["model", "init", "--path", path_arg, "--format", "json"]);
    assert!(output.status.success(), "Model init should succeed");
    assert!(path.exists(), "Artifact should be written");

    let output = fare(&["model", "inspect", "--path", path_arg, "--format", "json"]);
    assert!(output.status.success(), "Model inspect should succeed");

    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["examples_seen"], 0);
    assert_eq!(summary["format_version"], 1);
    assert_eq!(summary["fields"].as_array().unwrap().len(), 4);
}

/// Test that init does not clobber an existing artifact
#[test]
fn test_model_init_refuses_overwrite() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("fare_model.json");
    let path_arg = path.to_str().unwrap();

    assert!(fare(&["model", "init", "--path", path_arg]).status.success());

    let output = fare(&["model", "init", "--path", path_arg]);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!output.status.success(), "Second init should fail");
    assert!(stderr.contains("--force"), "Should suggest --force");

    let output = fare(&["model", "init", "--path", path_arg, "--force"]);
    assert!(output.status.success(), "Forced init should succeed");
}

/// Test inspecting a corrupt artifact
#[test]
fn test_model_inspect_corrupt_artifact() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("fare_model.json");
    std::fs::write(&path, "{ not an artifact").unwrap();

    let output = fare(&["model", "inspect", "--path", path.to_str().unwrap()]);
    assert!(!output.status.success(), "Corrupt artifact should be rejected");
}
