use std::fs;
use std::path::PathBuf;
use std::process::Command;

use serde_json::Value;

fn workspace_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../..")
}

fn perks_fixture() -> String {
    workspace_root()
        .join("tests/fixtures/perks_flattened_full.json")
        .to_string_lossy()
        .to_string()
}

fn run_cli(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_perk-planner"))
        .env_remove("RUST_LOG")
        .env_remove("PERK_PLANNER_PERKS")
        .args(args)
        .output()
        .expect("failed to run perk-planner CLI")
}

#[test]
fn perks_lists_one_stat() {
    let perks = perks_fixture();
    let output = run_cli(&["--perks", &perks, "perks", "--stat", "luck"]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], "[L] Luck");
    assert!(lines[1].contains("Fortune Finder"));
    assert!(lines[2].contains("Scrounger"));
}

#[test]
fn perks_json_reports_images() {
    let perks = perks_fixture();
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    fs::write(dir.path().join("Gunslinger.png"), b"img").expect("failed to write image");
    let images = dir.path().to_string_lossy().to_string();

    let output = run_cli(&[
        "--perks", &perks, "perks", "--stat", "A", "--images", &images, "--json",
    ]);
    assert!(output.status.success());
    let value: Value = serde_json::from_slice(&output.stdout).expect("stdout should be JSON");

    let agility = value["A"].as_array().expect("agility perks");
    assert_eq!(agility.len(), 2);
    assert!(
        agility[0]["image"]
            .as_str()
            .is_some_and(|p| p.ends_with("Gunslinger.png"))
    );
    assert!(agility[1]["image"].is_null());
}

#[test]
fn unknown_stat_is_rejected() {
    let perks = perks_fixture();
    let output = run_cli(&["--perks", &perks, "perks", "--stat", "Z"]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn images_normalize_and_missing() {
    let perks = perks_fixture();
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    fs::write(dir.path().join("Big Leagues.PNG"), b"img").expect("failed to write image");
    fs::write(dir.path().join("sneak.jpg"), b"img").expect("failed to write image");
    let images = dir.path().to_string_lossy().to_string();

    let output = run_cli(&["images", &images, "--normalize"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.lines().count(), 1);
    assert!(stdout.trim().ends_with("big_leagues.png"));
    assert!(dir.path().join("big_leagues.png").exists());

    let output = run_cli(&["--perks", &perks, "images", &images, "--missing"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let missing: Vec<&str> = stdout.lines().collect();
    assert_eq!(missing.len(), 15);
    assert!(!missing.contains(&"Big Leagues"));
    assert!(!missing.contains(&"Sneak"));
    assert!(missing.contains(&"Gunslinger"));
}
