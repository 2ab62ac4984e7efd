#![allow(deprecated)]

use assert_cmd::cargo::cargo_bin;
use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn prefsync_cmd(home: &Path) -> Command {
    let mut cmd = Command::new(cargo_bin("prefsync"));
    cmd.env("PREFSYNC_HOME", home.as_os_str())
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG");
    cmd
}

fn stored_document(home: &Path, user: &str) -> Value {
    let path = home.join("preferences").join(format!("{}.json", user));
    let content = fs::read_to_string(path).unwrap();
    let envelope: Value = serde_json::from_str(&content).unwrap();
    envelope["preferences"].clone()
}

#[test]
fn test_show_defaults_without_writing() {
    let temp = TempDir::new().unwrap();

    prefsync_cmd(temp.path())
        .args(["show", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"theme\": \"system\""))
        .stdout(predicate::str::contains("\"depthChart\""));

    assert!(!temp.path().join("preferences").exists());
}

#[test]
fn test_theme_roundtrip() {
    let temp = TempDir::new().unwrap();

    prefsync_cmd(temp.path())
        .args(["theme", "dark"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Theme set to dark"));

    assert_eq!(stored_document(temp.path(), "default")["ui"]["theme"], "dark");

    prefsync_cmd(temp.path())
        .args(["theme"])
        .assert()
        .success()
        .stdout(predicate::str::contains("dark"));
}

#[test]
fn test_invalid_theme_is_rejected() {
    let temp = TempDir::new().unwrap();
    prefsync_cmd(temp.path())
        .args(["theme", "sepia"])
        .assert()
        .failure();
}

#[test]
fn test_partial_document_is_merged_with_defaults() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("preferences");
    fs::create_dir_all(&dir).unwrap();
    fs::write(
        dir.join("default.json"),
        r#"{ "preferences": { "ui": { "theme": "light" }, "grids": { "roster": { "sortColumn": "age" } } } }"#,
    )
    .unwrap();

    let output = prefsync_cmd(temp.path())
        .args(["show", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let doc: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(doc["ui"]["theme"], "light");
    assert_eq!(doc["grids"]["roster"]["sortColumn"], "age");
    assert_eq!(doc["grids"]["roster"]["columns"][0], "name");
    assert_eq!(doc["grids"]["standings"]["sortColumn"], "winPct");
}

#[test]
fn test_corrupt_document_fails_without_overwriting() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("preferences");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("default.json"), "{ broken").unwrap();

    prefsync_cmd(temp.path())
        .args(["theme", "dark"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load preferences"));

    assert_eq!(fs::read_to_string(dir.join("default.json")).unwrap(), "{ broken");
}

#[test]
fn test_team_colors() {
    let temp = TempDir::new().unwrap();

    prefsync_cmd(temp.path())
        .args(["team", "set", "7", "#0b162a", "#c83803", "--accent", "#fff"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Colors set for team 7"));

    let doc = stored_document(temp.path(), "default");
    assert_eq!(doc["teamColorSchemes"]["7"]["primary"], "#0b162a");
    assert_eq!(doc["teamColorSchemes"]["7"]["accent"], "#fff");

    prefsync_cmd(temp.path())
        .args(["team", "get", "7"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#c83803"));

    prefsync_cmd(temp.path())
        .args(["team", "set", "8", "navy", "#fff"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid color"));

    prefsync_cmd(temp.path())
        .args(["team", "rm", "7"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Colors removed"));

    prefsync_cmd(temp.path())
        .args(["team", "get", "7"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No colors set for team 7"));
}

#[test]
fn test_columns_toggle_and_move() {
    let temp = TempDir::new().unwrap();

    prefsync_cmd(temp.path())
        .args(["columns", "standings", "toggle", "streak"])
        .assert()
        .success()
        .stdout(predicate::str::contains("streak shown"));

    let doc = stored_document(temp.path(), "default");
    let columns: Vec<&str> = doc["grids"]["standings"]["columns"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c.as_str().unwrap())
        .collect();
    assert_eq!(columns.last(), Some(&"streak"));

    prefsync_cmd(temp.path())
        .args(["columns", "standings", "up", "team"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing to move"));

    prefsync_cmd(temp.path())
        .args(["columns", "standings", "move", "streak", "team"])
        .assert()
        .success();
    let doc = stored_document(temp.path(), "default");
    assert_eq!(doc["grids"]["standings"]["columns"][0], "streak");
    assert_eq!(doc["grids"]["standings"]["columns"][1], "team");

    prefsync_cmd(temp.path())
        .args(["columns", "standings", "reset"])
        .assert()
        .success();
    let doc = stored_document(temp.path(), "default");
    assert_eq!(doc["grids"]["standings"]["columns"][0], "team");
}

#[test]
fn test_columns_unknown_column() {
    let temp = TempDir::new().unwrap();
    prefsync_cmd(temp.path())
        .args(["columns", "roster", "toggle", "shoeSize"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown column: shoeSize"));
}

#[test]
fn test_columns_width() {
    let temp = TempDir::new().unwrap();
    prefsync_cmd(temp.path())
        .args(["columns", "depthChart", "width", "name", "220"])
        .assert()
        .success();

    let doc = stored_document(temp.path(), "default");
    assert_eq!(doc["grids"]["depthChart"]["columnWidths"]["name"], 220);
}

#[test]
fn test_filter_language() {
    let temp = TempDir::new().unwrap();

    prefsync_cmd(temp.path())
        .args(["filter", "parse", " >= 25 "])
        .assert()
        .success()
        .stdout(predicate::str::contains(">=25"));

    prefsync_cmd(temp.path())
        .args(["filter", "parse", ">>3"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid filter expression"));

    prefsync_cmd(temp.path())
        .args(["filter", "eval", "<5", "4.5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("pass"));

    prefsync_cmd(temp.path())
        .args(["filter", "eval", "<5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("fail"));
}

#[test]
fn test_filter_set_and_clear() {
    let temp = TempDir::new().unwrap();

    prefsync_cmd(temp.path())
        .args(["filter", "set", "rosterAll", "age", "<=30"])
        .assert()
        .success();
    let doc = stored_document(temp.path(), "default");
    assert_eq!(doc["grids"]["rosterAll"]["numericFilters"]["age"]["operator"], "<=");
    assert_eq!(doc["grids"]["rosterAll"]["numericFilters"]["age"]["value"], 30.0);

    prefsync_cmd(temp.path())
        .args(["filter", "clear", "rosterAll", "age"])
        .assert()
        .success();
    let doc = stored_document(temp.path(), "default");
    assert!(doc["grids"]["rosterAll"].get("numericFilters").is_none());
}

#[test]
fn test_reset_restores_defaults() {
    let temp = TempDir::new().unwrap();

    prefsync_cmd(temp.path()).args(["theme", "light"]).assert().success();
    prefsync_cmd(temp.path())
        .args(["reset"])
        .assert()
        .success()
        .stdout(predicate::str::contains("reset to defaults"));

    assert_eq!(stored_document(temp.path(), "default")["ui"]["theme"], "system");
}

#[test]
fn test_config_user_selects_document() {
    let temp = TempDir::new().unwrap();

    prefsync_cmd(temp.path())
        .args(["config", "user", "coach"])
        .assert()
        .success();
    prefsync_cmd(temp.path())
        .args(["config", "user"])
        .assert()
        .success()
        .stdout(predicate::str::contains("user = coach"));

    prefsync_cmd(temp.path()).args(["theme", "dark"]).assert().success();
    assert!(temp.path().join("preferences").join("coach.json").exists());
    assert!(!temp.path().join("preferences").join("default.json").exists());

    prefsync_cmd(temp.path())
        .args(["config", "colour"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown config key"));
}

#[test]
fn test_config_rejects_user_outside_preferences() {
    let temp = TempDir::new().unwrap();

    prefsync_cmd(temp.path())
        .args(["config", "user", "../../x"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid user name"));

    prefsync_cmd(temp.path())
        .args(["config", "user"])
        .assert()
        .success()
        .stdout(predicate::str::contains("user = default"));
}

#[test]
fn test_configured_theme_poll_interval_is_used() {
    let temp = TempDir::new().unwrap();

    prefsync_cmd(temp.path())
        .args(["config", "poll-system-theme-ms", "25"])
        .assert()
        .success();

    prefsync_cmd(temp.path())
        .args(["theme"])
        .assert()
        .success()
        .stdout(predicate::str::contains("system"));

    prefsync_cmd(temp.path())
        .args(["config", "poll-system-theme-ms", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("must be positive"));
}
