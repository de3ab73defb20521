use std::fs;
use std::path::PathBuf;
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

fn bin() -> &'static str {
    env!("CARGO_BIN_EXE_fleetforge")
}

fn unique_temp_path(name: &str, extension: &str) -> PathBuf {
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock should be after unix epoch")
        .as_nanos();
    std::env::temp_dir().join(format!("fleetforge-{name}-{stamp}.{extension}"))
}

fn run(args: &[&str]) -> std::process::Output {
    Command::new(bin())
        .args(args)
        .env_remove("FLEETFORGE_CATALOG")
        .env_remove("FLEETFORGE_WORKERS")
        .env("RUST_LOG", "warn")
        .output()
        .expect("binary should run")
}

#[test]
fn distance_command_emits_json() {
    let output = run(&["distance", "3:432:9", "3:411:12"]);

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    let payload: serde_json::Value =
        serde_json::from_str(&stdout).expect("distance should emit json");
    assert_eq!(payload["distance"], 4_695);
}

#[test]
fn simulate_command_emits_report() {
    let output = run(&[
        "simulate",
        "--attacker",
        "10,10,10,10,10,10,1:100:3,0,0,0,0,0,50",
        "--defender",
        "8,8,8,1:100:9,10000,5000,2000,0,0,20",
        "--runs",
        "12",
        "--seed",
        "4",
    ]);

    assert_eq!(output.status.code(), Some(0), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    let payload: serde_json::Value =
        serde_json::from_str(&stdout).expect("simulate should emit json");
    assert_eq!(payload["runs"], 12);
    assert_eq!(payload["distance"], 1_030);
    assert!(payload["attacker"]["victories"].is_number());
    assert!(payload["flight"]["seconds"].is_number());
}

#[test]
fn optimize_attacker_guess_needs_coordinate() {
    let output = run(&[
        "optimize",
        "--attacker",
        "10,10,10,10,10,10",
        "--defender",
        "10,10,10,1:100:9,50000,20000,5000,0,0,3,0,0,0,0,0,0,0,0,0,0,0,10",
        "--guess",
        "attacker",
        "--workers",
        "1",
        "--population",
        "8",
        "--max-eras",
        "2",
        "--seed",
        "1",
    ]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no coordinate"));
}

#[test]
fn optimize_with_coordinates_succeeds() {
    let output = run(&[
        "optimize",
        "--attacker",
        "10,10,10,10,10,10,1:100:3",
        "--defender",
        "10,10,10,1:100:9,50000,20000,5000,0,0,3,0,0,0,0,0,0,0,0,0,0,0,10",
        "--guess",
        "attacker",
        "--workers",
        "1",
        "--population",
        "8",
        "--max-eras",
        "2",
        "--seed",
        "1",
    ]);

    assert_eq!(output.status.code(), Some(0), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    let payload: serde_json::Value =
        serde_json::from_str(&stdout).expect("optimize should emit json");
    assert_eq!(payload["guess"], "attacker");
    assert_eq!(payload["termination"], "max_eras");
    assert_eq!(payload["population"], 8);
}

#[test]
fn missing_subcommand_is_usage_error() {
    let output = run(&[]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn bad_fleet_spec_fails() {
    let output = run(&[
        "simulate",
        "--attacker",
        "1,2,3",
        "--defender",
        "1,2,3",
    ]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("attacker"));
}

#[test]
fn unreadable_catalog_fails() {
    let path = unique_temp_path("catalog", "json");
    fs::write(&path, "{ not json").expect("fixture should be written");

    let output = run(&[
        "simulate",
        "--attacker",
        "0,0,0,0,0,0,1:1:1,1",
        "--defender",
        "0,0,0,1:1:2,0,0,0,1",
        "--catalog",
        path.to_string_lossy().as_ref(),
    ]);
    assert_eq!(output.status.code(), Some(1));

    let _ = fs::remove_file(path);
}
