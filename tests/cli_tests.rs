//! CLI tests for snapplug
//!
//! This test suite covers:
//! - Argument parsing and help output
//! - Plugin listing and schema output
//! - Project validation and its exit codes
//! - Building a project that needs no external commands
//! - Config file loading

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;
use tempfile::{tempdir, TempDir};

fn snapplug_cmd() -> Command {
    let mut cmd = Command::cargo_bin("snapplug").unwrap();
    cmd.env_remove("SNAPPLUG_CONFIG")
        .env_remove("SNAPPLUG_WORK_DIR")
        .env_remove("SNAPPLUG_AWS_CLI")
        .env("NO_COLOR", "1");
    cmd
}

fn write_project(dir: &TempDir, content: &str) -> PathBuf {
    let path = dir.path().join("snapplug.yaml");
    std::fs::write(&path, content).unwrap();
    path
}

const ROS_PROJECT: &str = r#"
name: mypkg
parts:
  mypkg:
    plugin: roscore
    rosversion: kinetic
"#;

// ============================================================================
// Basic CLI behavior
// ============================================================================

#[test]
fn test_help() {
    snapplug_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("build"))
        .stdout(predicate::str::contains("plugins"))
        .stdout(predicate::str::contains("validate"));
}

#[test]
fn test_version() {
    snapplug_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_unknown_subcommand_fails() {
    snapplug_cmd().arg("deploy").assert().failure();
}

// ============================================================================
// Plugins
// ============================================================================

#[test]
fn test_plugins_lists_builtins() {
    snapplug_cmd()
        .arg("plugins")
        .assert()
        .success()
        .stdout(predicate::str::contains("awsiot"))
        .stdout(predicate::str::contains("roscore"));
}

#[test]
fn test_plugins_json() {
    let output = snapplug_cmd()
        .args(["--output", "json", "plugins"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let plugins: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let names: Vec<&str> = plugins
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["awsiot", "roscore"]);
}

#[test]
fn test_schema_awsiot() {
    let output = snapplug_cmd().args(["schema", "awsiot"]).output().unwrap();
    assert!(output.status.success());

    let schema: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(schema["required"], serde_json::json!(["thing"]));
    assert_eq!(schema["properties"]["generatekeys"]["default"], true);
    assert_eq!(
        schema["properties"]["policyname"]["default"],
        "PubSubToAnyTopic"
    );
}

#[test]
fn test_schema_unknown_plugin() {
    snapplug_cmd()
        .args(["schema", "catkin"])
        .assert()
        .code(5)
        .stderr(predicate::str::contains("catkin"));
}

// ============================================================================
// Validate
// ============================================================================

#[test]
fn test_validate_ok() {
    let dir = tempdir().unwrap();
    let project = write_project(&dir, ROS_PROJECT);

    snapplug_cmd()
        .arg("validate")
        .arg("-p")
        .arg(&project)
        .assert()
        .success()
        .stdout(predicate::str::contains("mypkg"));
}

#[test]
fn test_validate_missing_thing() {
    let dir = tempdir().unwrap();
    let project = write_project(&dir, "name: device\nparts:\n  iot:\n    plugin: awsiot\n");

    snapplug_cmd()
        .arg("validate")
        .arg("-p")
        .arg(&project)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("thing"));
}

#[test]
fn test_validate_unknown_plugin() {
    let dir = tempdir().unwrap();
    let project = write_project(&dir, "name: x\nparts:\n  a:\n    plugin: catkin\n");

    snapplug_cmd()
        .arg("validate")
        .arg("-p")
        .arg(&project)
        .assert()
        .code(5);
}

#[test]
fn test_validate_missing_project_file() {
    let dir = tempdir().unwrap();

    snapplug_cmd()
        .arg("validate")
        .arg("-p")
        .arg(dir.path().join("nope.yaml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("nope.yaml"));
}

#[test]
fn test_validate_malformed_project() {
    let dir = tempdir().unwrap();
    let project = write_project(&dir, "name: [unterminated\n");

    snapplug_cmd()
        .arg("validate")
        .arg("-p")
        .arg(&project)
        .assert()
        .code(4);
}

// ============================================================================
// Build
// ============================================================================

#[test]
fn test_build_roscore_project() {
    let dir = tempdir().unwrap();
    let project = write_project(&dir, ROS_PROJECT);

    snapplug_cmd()
        .arg("build")
        .arg("-p")
        .arg(&project)
        .assert()
        .success()
        .stdout(predicate::str::contains("mypkg"))
        .stdout(predicate::str::contains("1 part(s) built"));

    assert!(dir.path().join("prime/bin/mypkg-rosmaster-service").exists());
    let services =
        std::fs::read_to_string(dir.path().join("prime/meta/services.yaml")).unwrap();
    assert!(services.contains("mypkg-rosmaster"));
    assert!(services.contains("11311/tcp"));
}

#[test]
fn test_build_json_report() {
    let dir = tempdir().unwrap();
    let project = write_project(&dir, ROS_PROJECT);

    let output = snapplug_cmd()
        .args(["--output", "json", "build", "-p"])
        .arg(&project)
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["parts"][0]["part"], "mypkg");
    assert_eq!(report["parts"][0]["service"], true);
    assert_eq!(
        report["services"]["mypkg-rosmaster"]["ports"]["internal"]["rosmaster"]["port"],
        "11311/tcp"
    );
}

#[test]
fn test_build_unknown_part() {
    let dir = tempdir().unwrap();
    let project = write_project(&dir, ROS_PROJECT);

    snapplug_cmd()
        .arg("build")
        .arg("-p")
        .arg(&project)
        .arg("other")
        .assert()
        .code(4)
        .stderr(predicate::str::contains("other"));
}

#[test]
fn test_build_failure_reports_part() {
    let dir = tempdir().unwrap();
    let project = write_project(
        &dir,
        "name: device\nparts:\n  iot:\n    plugin: awsiot\n    thing: sensor1\n",
    );
    let config = dir.path().join("snapplug.toml");
    std::fs::write(&config, "[aws]\ncli = \"false\"\n").unwrap();

    snapplug_cmd()
        .arg("-c")
        .arg(&config)
        .arg("build")
        .arg("-p")
        .arg(&project)
        .assert()
        .code(2)
        .stdout(predicate::str::contains("failed"));

    assert!(!dir.path().join("stage").exists());
}

#[test]
fn test_build_reports_each_part_in_order() {
    let dir = tempdir().unwrap();
    let project = write_project(
        &dir,
        "name: fleet\nparts:\n  left:\n    plugin: roscore\n  right:\n    plugin: roscore\n",
    );

    let output = snapplug_cmd()
        .arg("build")
        .arg("-p")
        .arg(&project)
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let at = |needle: &str| {
        stdout
            .find(needle)
            .unwrap_or_else(|| panic!("missing {:?} in {}", needle, stdout))
    };
    assert!(at("PART [left]") < at("built: [left]"));
    assert!(at("built: [left]") < at("PART [right]"));
    assert!(at("PART [right]") < at("built: [right]"));
}

#[test]
fn test_build_failure_skips_headers_of_later_parts() {
    let dir = tempdir().unwrap();
    let project = write_project(
        &dir,
        "name: robot\nparts:\n  iot:\n    plugin: awsiot\n    thing: robot1\n  ros:\n    plugin: roscore\n",
    );
    let config = dir.path().join("snapplug.toml");
    std::fs::write(&config, "[aws]\ncli = \"false\"\n").unwrap();

    snapplug_cmd()
        .arg("-c")
        .arg(&config)
        .arg("build")
        .arg("-p")
        .arg(&project)
        .assert()
        .code(2)
        .stdout(predicate::str::contains("PART [iot]"))
        .stdout(predicate::str::contains("failed: [iot]"))
        .stdout(predicate::str::contains("PART [ros]").not());
}

// ============================================================================
// Config
// ============================================================================

#[test]
fn test_config_directories_apply() {
    let dir = tempdir().unwrap();
    let project = write_project(&dir, ROS_PROJECT);
    let config = dir.path().join("snapplug.toml");
    std::fs::write(
        &config,
        "work_dir = \"work\"\nstage_dir = \"staging\"\nprime_dir = \"out\"\n",
    )
    .unwrap();

    snapplug_cmd()
        .arg("--config")
        .arg(&config)
        .arg("build")
        .arg("-p")
        .arg(&project)
        .assert()
        .success();

    assert!(dir.path().join("work/mypkg/install/bin/mypkg-rosmaster-service").exists());
    assert!(dir.path().join("staging/bin/mypkg-rosmaster-service").exists());
    assert!(dir.path().join("out/meta/services.yaml").exists());
}

#[test]
fn test_explicit_missing_config_fails() {
    let dir = tempdir().unwrap();

    snapplug_cmd()
        .arg("--config")
        .arg(dir.path().join("missing.toml"))
        .arg("plugins")
        .assert()
        .failure();
}
