//! Basic CLI E2E tests.
//!
//! Tests invoke the built binary with HOME pointed at a temporary directory
//! so every test starts from an empty data directory.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

/// Run a CLI command and return (stdout, stderr, exit code).
fn run_cli(home: &Path, args: &[&str]) -> (String, String, i32) {
    run_cli_with_input(home, args, "")
}

fn run_cli_with_input(home: &Path, args: &[&str], input: &str) -> (String, String, i32) {
    let mut child = Command::new(env!("CARGO_BIN_EXE_timekeeper"))
        .args(args)
        .env("HOME", home)
        .env_remove("TIMEKEEPER_ENV")
        .env("RUST_LOG", "off")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to execute CLI command");

    child
        .stdin
        .take()
        .expect("stdin is piped")
        .write_all(input.as_bytes())
        .expect("Failed to write stdin");
    let output = child.wait_with_output().expect("Failed to wait for CLI");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

fn points_json(home: &Path) -> Vec<serde_json::Value> {
    let (stdout, _, code) = run_cli(home, &["points", "list", "--json"]);
    assert_eq!(code, 0, "points list failed");
    serde_json::from_str(&stdout).expect("points list prints JSON")
}

#[test]
fn test_presets_list() {
    let home = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli(home.path(), &["presets", "list"]);
    assert_eq!(code, 0, "presets list failed");
    for id in ["30min", "60min", "90min", "custom"] {
        assert!(stdout.contains(id), "missing preset {id}");
    }
}

#[test]
fn test_points_add_update_remove() {
    let home = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli(
        home.path(),
        &["points", "add", "5", "--label", "stretch", "--urgency", "warning"],
    );
    assert_eq!(code, 0, "points add failed: {stderr}");

    let points = points_json(home.path());
    assert_eq!(points.len(), 1);
    assert_eq!(points[0]["time_ms"], 300_000);
    assert_eq!(points[0]["label"], "stretch");
    assert_eq!(points[0]["urgency"], "warning");
    assert_eq!(points[0]["fired"], false);

    let id = points[0]["id"].as_str().unwrap().to_string();
    let (_, stderr, code) = run_cli(home.path(), &["points", "update", &id[..8], "--at", "7:30"]);
    assert_eq!(code, 0, "points update failed: {stderr}");
    assert_eq!(points_json(home.path())[0]["time_ms"], 450_000);

    let (_, _, code) = run_cli(home.path(), &["points", "remove", &id]);
    assert_eq!(code, 0, "points remove failed");
    assert!(points_json(home.path()).is_empty());
}

#[test]
fn test_points_add_out_of_range_fails() {
    let home = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli(home.path(), &["points", "add", "0:30"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("error:"));

    let (_, stderr, code) = run_cli(home.path(), &["points", "add", "307445734561827"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("offset too large"), "unexpected stderr: {stderr}");
    assert!(points_json(home.path()).is_empty());
}

#[test]
fn test_presets_apply_updates_settings() {
    let home = tempfile::tempdir().unwrap();
    let (_, _, code) = run_cli(home.path(), &["presets", "apply", "60min"]);
    assert_eq!(code, 0, "presets apply failed");

    let (stdout, _, code) = run_cli(home.path(), &["settings", "show"]);
    assert_eq!(code, 0, "settings show failed");
    let settings: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(settings["active_preset_id"], "60min");
    assert_eq!(settings["notification_points"].as_array().unwrap().len(), 4);

    let (_, _, code) = run_cli(home.path(), &["presets", "apply", "45min"]);
    assert_eq!(code, 1);
}

#[test]
fn test_settings_sound_and_theme() {
    let home = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli(
        home.path(),
        &["settings", "sound", "--enabled", "false", "--volume", "0.25"],
    );
    assert_eq!(code, 0, "settings sound failed");
    assert!(stdout.contains("sound off at 25%"));

    let (stdout, _, code) = run_cli(home.path(), &["settings", "theme"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("theme light"));

    let (stdout, _, _) = run_cli(home.path(), &["settings", "show"]);
    let settings: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(settings["sound_enabled"], false);
    assert_eq!(settings["sound_volume"], 0.25);
    assert_eq!(settings["theme"], "light");
}

#[test]
fn test_config_get_set() {
    let home = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli(home.path(), &["config", "get", "scheduler.stagger_ms"]);
    assert_eq!(code, 0, "config get failed");
    assert_eq!(stdout.trim(), "500");

    let (_, _, code) = run_cli(home.path(), &["config", "set", "scheduler.ticker", "interval"]);
    assert_eq!(code, 0, "config set failed");
    let (stdout, _, _) = run_cli(home.path(), &["config", "get", "scheduler.ticker"]);
    assert_eq!(stdout.trim(), "interval");

    let (_, stderr, code) = run_cli(home.path(), &["config", "get", "ui.dark_mode"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("Unknown configuration key"));
}

#[test]
fn test_run_session_persists_added_points() {
    let home = tempfile::tempdir().unwrap();
    let (stdout, stderr, code) = run_cli_with_input(
        home.path(),
        &["run", "--preset", "30min"],
        "status\nadd 1 urgent Go\nbogus\nquit\n",
    );
    assert_eq!(code, 0, "run failed: {stderr}");
    assert!(stdout.contains("stopped 00:00:00 preset=30min"));
    assert!(stdout.contains("added point at 1m"));
    assert!(stderr.contains("unknown command 'bogus'"));

    let points = points_json(home.path());
    assert_eq!(points.len(), 5);
    assert_eq!(points[0]["time_ms"], 60_000);
    assert_eq!(points[0]["urgency"], "urgent");
}
