//! Integration tests for the breakflow binary.
//!
//! Runs use `--simulate`, which drives the engine from a manual clock, so a
//! full work/break cycle finishes instantly.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// CLI with its config lookup pointed at an empty directory
fn cli(home: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("breakflow"));
    cmd.env("XDG_CONFIG_HOME", home)
        .env("HOME", home)
        .env_remove("RUST_LOG");
    cmd
}

fn json_events(output: &[u8]) -> Vec<Value> {
    String::from_utf8_lossy(output)
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| serde_json::from_str(l).expect("each line is a JSON event"))
        .collect()
}

fn events_named<'a>(events: &'a [Value], name: &str) -> Vec<&'a Value> {
    events.iter().filter(|e| e["event"] == name).collect()
}

#[test]
fn test_cli_help() {
    let home = setup_test_dir();
    cli(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Work/break timer with guided desk exercises",
        ));
}

#[test]
fn test_presets_lists_defaults() {
    let home = setup_test_dir();
    cli(home.path())
        .arg("presets")
        .assert()
        .success()
        .stdout(predicate::str::contains("Test"))
        .stdout(predicate::str::contains("Pomodoro"))
        .stdout(predicate::str::contains("Classic"))
        .stdout(predicate::str::contains("Deep"));
}

#[test]
fn test_catalog_lists_exercises_in_order() {
    let home = setup_test_dir();
    let output = cli(home.path()).arg("catalog").output().unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("7 exercises"));
    let neck = stdout.find("Neck Rolls").expect("neck rolls listed");
    let breathing = stdout.find("Deep Breathing").expect("deep breathing listed");
    assert!(neck < breathing);
}

#[test]
fn test_simulated_cycle_text_output() {
    let home = setup_test_dir();
    cli(home.path())
        .args(["run", "--name", "Ann", "--preset", "test", "--simulate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Work session 1 (01:00)"))
        .stdout(predicate::str::contains("Break after session 1 (01:00)"))
        .stdout(predicate::str::contains("Neck Rolls"))
        .stdout(predicate::str::contains("Work session 2"))
        .stdout(predicate::str::contains("Session summary"))
        .stdout(predicate::str::contains("Ann"));
}

#[test]
fn test_simulated_cycle_json_events() {
    let home = setup_test_dir();
    let output = cli(home.path())
        .args(["run", "--name", "Ann", "--preset", "test", "--simulate", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let events = json_events(&output.stdout);
    let phases = events_named(&events, "phase_entered");
    assert_eq!(phases.len(), 3);
    assert_eq!(phases[0]["phase"], "work");
    assert_eq!(phases[0]["cause"], "start");
    assert_eq!(phases[0]["duration_secs"], 60);
    assert_eq!(phases[1]["phase"], "break");
    assert_eq!(phases[1]["session_count"], 1);
    assert_eq!(phases[2]["phase"], "work");
    assert_eq!(phases[2]["session_count"], 2);

    assert_eq!(events_named(&events, "camera_online").len(), 1);
    assert!(!events_named(&events, "feedback").is_empty());

    let last = events.last().expect("at least one event");
    assert_eq!(last["event"], "stopped");
    assert_eq!(last["summary"]["user_name"], "Ann");
    assert_eq!(last["summary"]["sessions"], 2);
    assert_eq!(last["summary"]["focus_minutes"], 2);
    assert_eq!(last["summary"]["exercises_completed"], 1);
}

#[test]
fn test_exercises_rotate_during_longer_breaks() {
    let home = setup_test_dir();
    let output = cli(home.path())
        .args([
            "run", "--name", "Ann", "--work", "1", "--break", "2", "--sessions", "2",
            "--simulate", "--json",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());

    let events = json_events(&output.stdout);
    let advances = events_named(&events, "exercise_advanced");
    assert_eq!(advances.len(), 2);
    assert!(advances
        .iter()
        .all(|e| e["cause"] == "timer" && e["local_index"] == 1));
    assert_eq!(advances[0]["exercise_id"], "shoulder_shrugs");

    let last = events.last().unwrap();
    assert_eq!(last["summary"]["sessions"], 3);
    assert_eq!(last["summary"]["exercises_completed"], 4);
}

#[test]
fn test_no_camera_degrades_gracefully() {
    let home = setup_test_dir();
    let output = cli(home.path())
        .args([
            "run", "--name", "Ann", "--preset", "test", "--no-camera", "--simulate", "--json",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());

    let events = json_events(&output.stdout);
    let unavailable = events_named(&events, "camera_unavailable");
    assert_eq!(unavailable.len(), 1);
    assert_eq!(unavailable[0]["error"], "device_unavailable");
    assert!(events_named(&events, "feedback").is_empty());
    assert_eq!(events_named(&events, "phase_entered").len(), 3);
}

#[test]
fn test_durations_are_clamped() {
    let home = setup_test_dir();
    let output = cli(home.path())
        .args([
            "run", "--name", "Ann", "--work", "500", "--break", "0", "--simulate", "--json",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());

    let events = json_events(&output.stdout);
    let phases = events_named(&events, "phase_entered");
    assert_eq!(phases[0]["duration_secs"], 120 * 60);
    assert_eq!(phases[1]["duration_secs"], 60);
}

#[test]
fn test_blank_name_is_rejected() {
    let home = setup_test_dir();
    cli(home.path())
        .args(["run", "--name", "   ", "--simulate"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("user name must not be empty"));
}

#[test]
fn test_unknown_preset_is_rejected() {
    let home = setup_test_dir();
    cli(home.path())
        .args(["run", "--name", "Ann", "--preset", "marathon", "--simulate"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown preset 'marathon'"));
}

#[test]
fn test_zero_sessions_is_rejected() {
    let home = setup_test_dir();
    cli(home.path())
        .args(["run", "--name", "Ann", "--sessions", "0", "--simulate"])
        .assert()
        .failure();
}

#[test]
fn test_config_file_sets_defaults() {
    let home = setup_test_dir();
    let config_path = home.path().join("custom.toml");
    fs::write(
        &config_path,
        r#"
[timer]
work_minutes = 2
break_minutes = 1

[camera]
enabled = false
"#,
    )
    .unwrap();

    let output = cli(home.path())
        .args(["run", "--name", "Ann", "--simulate", "--json", "--config"])
        .arg(&config_path)
        .output()
        .unwrap();
    assert!(output.status.success());

    let events = json_events(&output.stdout);
    let phases = events_named(&events, "phase_entered");
    assert_eq!(phases[0]["duration_secs"], 120);
    assert_eq!(phases[1]["duration_secs"], 60);
    assert!(events_named(&events, "camera_online").is_empty());
    assert!(events_named(&events, "camera_unavailable").is_empty());
}

// dirs only honours XDG_CONFIG_HOME on Linux
#[cfg(target_os = "linux")]
#[test]
fn test_config_in_default_location_is_used() {
    let home = setup_test_dir();
    let config_dir = home.path().join("breakflow");
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(
        config_dir.join("config.toml"),
        r#"
[[exercises.custom]]
id = "wall_angels"
name = "Wall Angels"
reps = "8 reps"
cue = "Keep your lower back against the wall"
checkpoints = ["Back flat", "Elbows touch wall"]
"#,
    )
    .unwrap();

    cli(home.path())
        .arg("catalog")
        .assert()
        .success()
        .stdout(predicate::str::contains("8 exercises"))
        .stdout(predicate::str::contains("8. Wall Angels (8 reps)"));
}

#[test]
fn test_invalid_config_is_reported() {
    let home = setup_test_dir();
    let config_path = home.path().join("bad.toml");
    fs::write(&config_path, "[timer]\ntick_interval_ms = 5\n").unwrap();

    cli(home.path())
        .arg("--config")
        .arg(&config_path)
        .arg("presets")
        .assert()
        .failure()
        .stderr(predicate::str::contains("tick_interval_ms"));
}
