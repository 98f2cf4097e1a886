use std::fs;
use std::process::Output;

use assert_cmd::Command;
use assert_fs::TempDir;
use assert_fs::prelude::*;
use serde_json::{Value, json};

fn config() -> Value {
    json!({
        "elements": [
            { "type": "text", "name": "name", "label": "Name", "validation": { "required": true } },
            { "type": "checkbox", "name": "hasPhone" },
            {
                "type": "tel",
                "name": "phone",
                "visible": { "var": "hasPhone" },
                "validation": { "required": true }
            },
            {
                "type": "select",
                "name": "country",
                "options": [ { "value": "ua" }, { "value": "us" } ]
            },
            {
                "type": "select",
                "name": "city",
                "dependsOn": "country",
                "optionsProvider": "cities"
            },
            { "type": "custom", "name": "avatar", "component": "AvatarUpload" }
        ]
    })
}

fn workspace(files: &[(&str, Value)]) -> TempDir {
    let dir = TempDir::new().expect("temp dir");
    dir.child("config.json")
        .write_str(&config().to_string())
        .expect("write config");
    for (name, value) in files {
        dir.child(name)
            .write_str(&value.to_string())
            .expect("write file");
    }
    dir
}

fn bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_form-engine"))
}

fn stdout_json(output: Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("json stdout")
}

#[test]
fn check_reports_field_count() {
    let dir = workspace(&[]);
    let output = bin()
        .arg("check")
        .arg("--config")
        .arg(dir.child("config.json").path())
        .output()
        .expect("run");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("6 fields"), "{stdout}");
}

#[test]
fn check_with_catalog_rejects_unknown_components() {
    let dir = workspace(&[]);
    bin()
        .arg("check")
        .arg("--config")
        .arg(dir.child("config.json").path())
        .args(["--component", "MapPin"])
        .assert()
        .failure();
    bin()
        .arg("check")
        .arg("--config")
        .arg(dir.child("config.json").path())
        .args(["--component", "AvatarUpload"])
        .assert()
        .success();
}

#[test]
fn check_fails_on_invalid_configuration() {
    let dir = tempfile::tempdir().expect("temp dir");
    let bad = dir.path().join("bad.json");
    fs::write(
        &bad,
        r#"[{ "type": "text", "name": "a", "dependsOn": "ghost" }]"#,
    )
    .expect("write");
    let output = bin()
        .arg("check")
        .arg("--config")
        .arg(&bad)
        .output()
        .expect("run");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ghost"), "{stderr}");
}

#[test]
fn visibility_prints_the_map() {
    let dir = workspace(&[("data.json", json!({ "hasPhone": true }))]);
    let output = bin()
        .arg("visibility")
        .arg("--config")
        .arg(dir.child("config.json").path())
        .arg("--data")
        .arg(dir.child("data.json").path())
        .output()
        .expect("run");
    assert!(output.status.success());
    let visibility = stdout_json(output);
    assert_eq!(visibility["phone"], true);
    assert_eq!(visibility["name"], true);
}

#[test]
fn validate_fails_on_blocking_errors_only() {
    let dir = workspace(&[
        ("empty.json", json!({ "hasPhone": false })),
        ("filled.json", json!({ "name": "Ada", "hasPhone": false })),
    ]);
    let config = dir.child("config.json");

    let output = bin()
        .arg("validate")
        .arg("--config")
        .arg(config.path())
        .arg("--data")
        .arg(dir.child("empty.json").path())
        .output()
        .expect("run");
    assert!(!output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("name [error] required"), "{stdout}");
    assert!(!stdout.contains("phone"), "{stdout}");

    bin()
        .arg("validate")
        .arg("--config")
        .arg(config.path())
        .arg("--data")
        .arg(dir.child("filled.json").path())
        .assert()
        .success();

    let output = bin()
        .arg("validate")
        .arg("--config")
        .arg(config.path())
        .arg("--data")
        .arg(dir.child("filled.json").path())
        .args(["--policy", "warn"])
        .output()
        .expect("run");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("phone [warning] required"), "{stdout}");
}

#[test]
fn cascade_prints_resets_or_applied_data() {
    let dir = workspace(&[
        ("previous.json", json!({ "country": "ua", "city": "kyiv" })),
        ("data.json", json!({ "country": "us", "city": "kyiv" })),
    ]);
    let run = |apply: bool| {
        let mut cmd = bin();
        cmd.arg("cascade")
            .arg("--config")
            .arg(dir.child("config.json").path())
            .args(["--field", "country"])
            .arg("--previous")
            .arg(dir.child("previous.json").path())
            .arg("--data")
            .arg(dir.child("data.json").path());
        if apply {
            cmd.arg("--apply");
        }
        let output = cmd.output().expect("run");
        assert!(output.status.success());
        stdout_json(output)
    };

    let resets = run(false);
    assert_eq!(resets, json!([{ "field": "city", "value": null }]));
    let data = run(true);
    assert_eq!(data, json!({ "country": "us", "city": null }));
}

#[test]
fn cascade_rejects_unknown_fields() {
    let dir = workspace(&[("data.json", json!({}))]);
    bin()
        .arg("cascade")
        .arg("--config")
        .arg(dir.child("config.json").path())
        .args(["--field", "nope"])
        .arg("--previous")
        .arg(dir.child("data.json").path())
        .arg("--data")
        .arg(dir.child("data.json").path())
        .assert()
        .failure();
}

#[test]
fn defaults_merge_overrides() {
    let dir = workspace(&[("overrides.json", json!({ "name": "Ada" }))]);
    let output = bin()
        .arg("defaults")
        .arg("--config")
        .arg(dir.child("config.json").path())
        .arg("--overrides")
        .arg(dir.child("overrides.json").path())
        .output()
        .expect("run");
    assert!(output.status.success());
    let data = stdout_json(output);
    assert_eq!(data["name"], "Ada");
    assert_eq!(data["hasPhone"], false);
    assert_eq!(data["country"], Value::Null);
}

#[test]
fn describe_lists_dependencies() {
    let dir = workspace(&[]);
    let output = bin()
        .arg("describe")
        .arg("--config")
        .arg(dir.child("config.json").path())
        .output()
        .expect("run");
    assert!(output.status.success());
    let payload = stdout_json(output);
    assert_eq!(payload["dependencies"]["country"], json!(["city"]));
}

#[test]
fn describe_rejects_an_empty_configuration_file() {
    let dir = TempDir::new().expect("temp dir");
    dir.child("empty.json").touch().expect("touch");
    let output = bin()
        .arg("describe")
        .arg("--config")
        .arg(dir.child("empty.json").path())
        .output()
        .expect("run");
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to parse"), "{stderr}");
}

#[test]
fn schema_describes_the_configuration_format() {
    let output = bin().arg("schema").output().expect("run");
    assert!(output.status.success());
    let schema = stdout_json(output);
    assert!(schema.is_object());
    assert!(schema.to_string().contains("invisibleFieldValidation"));
}
