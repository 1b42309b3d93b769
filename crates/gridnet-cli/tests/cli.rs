//! End-to-end tests of the `gridnet` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

/// A version 0 document: slack bus, switch, load bus.
fn v0_document() -> Value {
    json!({
        "buses": [
            {"id": "src", "type": "slack", "voltages": {"va": [230.0, 0.0], "vb": [-115.0, -199.2], "vc": [-115.0, 199.2]}},
            {"id": "b1", "type": "bus_neutral"}
        ],
        "branches": [{"id": "sw", "type": "switch", "bus1": "src", "bus2": "b1"}],
        "loads": [
            {"id": "load", "bus": "b1", "function": "y_pq_neutral", "powers": {"sa": [1000.0, 0.0], "sb": [1000.0, 0.0], "sc": [1000.0, 0.0]}}
        ],
        "line_types": [],
        "transformer_types": []
    })
}

fn write_json(dir: &Path, name: &str, value: &Value) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, serde_json::to_string_pretty(value).unwrap()).unwrap();
    path
}

/// Command isolated from the user's home directory and environment.
fn gridnet(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("gridnet").unwrap();
    cmd.env("HOME", home.path()).env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_migrate_writes_current_version() {
    let tmp = tempdir().unwrap();
    let input = write_json(tmp.path(), "v0.json", &v0_document());
    let output = tmp.path().join("v3.json");

    gridnet(&tmp)
        .args(["migrate", input.to_str().unwrap(), "-o", output.to_str().unwrap()])
        .assert()
        .success();

    let text = fs::read_to_string(&output).unwrap();
    assert!(text.contains("[230.0, 0.0]"));
    let migrated: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(migrated["version"], 3);
    assert_eq!(migrated["switches"][0]["phases"], "abcn");
    assert_eq!(migrated["sources"][0]["id"], "src");
}

#[test]
fn test_migrate_to_stdout() {
    let tmp = tempdir().unwrap();
    let input = write_json(tmp.path(), "v0.json", &v0_document());

    gridnet(&tmp)
        .args(["migrate", input.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"is_multiphase\": true"));
}

#[test]
fn test_check_reports_valid_network() {
    let tmp = tempdir().unwrap();
    let input = write_json(tmp.path(), "v0.json", &v0_document());

    gridnet(&tmp)
        .args(["check", input.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "valid network with 2 buses, 1 branches, 1 loads, 1 sources",
        ));
}

#[test]
fn test_check_fails_with_error_kind() {
    let tmp = tempdir().unwrap();
    let mut document = v0_document();
    document["version"] = json!(9);
    let input = write_json(tmp.path(), "future.json", &document);

    gridnet(&tmp)
        .args(["check", input.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error [unsupported_version]"));
}

#[test]
fn test_check_fails_without_potential_reference() {
    let tmp = tempdir().unwrap();
    let v0 = write_json(tmp.path(), "v0.json", &v0_document());
    let v3 = tmp.path().join("v3.json");
    gridnet(&tmp)
        .args(["migrate", v0.to_str().unwrap(), "-o", v3.to_str().unwrap()])
        .assert()
        .success();

    let mut document: Value = serde_json::from_str(&fs::read_to_string(&v3).unwrap()).unwrap();
    document["potential_refs"] = json!([]);
    let input = write_json(tmp.path(), "no_pref.json", &document);

    gridnet(&tmp)
        .args(["check", input.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error [no_potential_reference]"));
}

#[test]
fn test_inspect_lists_components() {
    let tmp = tempdir().unwrap();
    let input = write_json(tmp.path(), "v0.json", &v0_document());

    gridnet(&tmp)
        .args(["inspect", input.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Galvanic components: 1"))
        .stdout(predicate::str::contains("potential_refs"));

    gridnet(&tmp)
        .args(["inspect", input.to_str().unwrap(), "--dot"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("graph gridnet {"));
}

#[test]
fn test_request_uses_config_file() {
    let tmp = tempdir().unwrap();
    let input = write_json(tmp.path(), "v0.json", &v0_document());
    let config = tmp.path().join("gridnet.toml");
    fs::write(&config, "[solver]\nprecision = 1e-8\nmax_iterations = 50\n").unwrap();
    let output = tmp.path().join("request.json");

    gridnet(&tmp)
        .args([
            "--config",
            config.to_str().unwrap(),
            "request",
            input.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
        ])
        .assert()
        .success();

    let request: Value = serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(request["solver"], json!({"precision": 1e-8, "max_iterations": 50}));
    assert_eq!(request["network"]["version"], 3);
}

#[test]
fn test_default_config_is_read_from_home() {
    let tmp = tempdir().unwrap();
    let input = write_json(tmp.path(), "v0.json", &v0_document());
    fs::create_dir_all(tmp.path().join(".gridnet")).unwrap();
    fs::write(
        tmp.path().join(".gridnet").join("config.toml"),
        "[solver]\nmax_iterations = 7\n",
    )
    .unwrap();

    gridnet(&tmp)
        .args(["request", input.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"max_iterations\": 7"));
}

#[test]
fn test_missing_config_file_fails() {
    let tmp = tempdir().unwrap();
    let input = write_json(tmp.path(), "v0.json", &v0_document());

    gridnet(&tmp)
        .args(["--config", "/nonexistent/gridnet.toml", "check", input.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("reading config"));
}
