//! CLI integration tests using assert_cmd.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn spanlab() -> Command {
    #[allow(deprecated)]
    Command::cargo_bin("spanlab").unwrap()
}

#[test]
fn presets_lists_every_task() {
    spanlab()
        .arg("presets")
        .assert()
        .success()
        .stdout(predicate::str::contains("digit-span-forward"))
        .stdout(predicate::str::contains("visual-counting"))
        .stdout(predicate::str::contains("card-selection"));
}

#[test]
fn presets_show_prints_toml() {
    spanlab()
        .args(["presets", "--show", "change-detection"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#"mode = "change-detection""#))
        .stdout(predicate::str::contains("study_ms = 30000"));
}

#[test]
fn presets_show_unknown_task() {
    spanlab()
        .args(["presets", "--show", "stroop"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown task"));
}

#[test]
fn shown_preset_validates() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("backward.toml");
    let output = spanlab()
        .args(["presets", "--show", "digit-span-backward"])
        .output()
        .unwrap();
    fs::write(&path, output.stdout).unwrap();

    spanlab()
        .args(["config", "validate"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("digit-span-backward: valid backward task"));
}

#[test]
fn validate_rejects_inverted_bounds() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(
        &path,
        r#"
task_id = "broken"
mode = "forward"
min_level = 6
max_level = 3
"#,
    )
    .unwrap();

    spanlab()
        .args(["config", "validate"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid level bounds"));
}

#[test]
fn validate_missing_file() {
    spanlab()
        .args(["config", "validate", "/nonexistent/task.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read config"));
}

#[test]
fn simulate_perfect_participant_hits_ceiling() {
    spanlab()
        .args(["simulate", "--task", "card-selection", "--accuracy", "1.0", "--seed", "4"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ended: ceiling_reached"));
}

#[test]
fn simulate_needs_a_task() {
    spanlab()
        .arg("simulate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--task"));
}

#[test]
fn simulate_prints_csv() {
    spanlab()
        .args(["simulate", "--task", "digit-span-forward", "--accuracy", "0", "--print-csv"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("trial_index,"))
        .stdout(predicate::str::contains("consecutive_failures"));
}

#[test]
fn simulate_writes_both_formats() {
    let dir = TempDir::new().unwrap();
    spanlab()
        .args(["simulate", "--task", "visual-counting", "--seed", "11"])
        .args(["--participant", "P 07", "--format", "both", "--out"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote"));

    let mut names: Vec<String> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names.len(), 2);
    assert!(names[0].starts_with("P_07_visual-counting_") && names[0].ends_with(".csv"));
    assert!(names[1].ends_with(".json"));
}

#[test]
fn simulate_rejects_unusable_participant_id() {
    let dir = TempDir::new().unwrap();
    spanlab()
        .args(["simulate", "--task", "object-span", "--participant", "", "--out"])
        .arg(dir.path())
        .assert()
        .failure();
}
