//! CLI integration tests for followbot
//!
//! These only exercise paths that never reach the network: help output,
//! setup failures, input validation and local snapshot status.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Helper to escape path for TOML on Windows
fn escape_path_for_toml(path: &str) -> String {
    path.replace('\\', "\\\\")
}

/// Write a complete config whose snapshots live in the temp dir
fn setup_test_env() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let dir = escape_path_for_toml(&temp_dir.path().to_string_lossy());

    let config_path = temp_dir.path().join("config.toml");
    let config_content = format!(
        r#"
[account]
handle = "followbot"

[credentials]
consumer_key = "ck"
consumer_secret = "cs"
oauth_token = "ot"
oauth_secret = "os"

[snapshots]
followers = "{dir}/followers.txt"
following = "{dir}/following.txt"
already_followed = "{dir}/already-followed.txt"

[keep]
following = [42]
"#,
        dir = dir
    );
    fs::write(&config_path, config_content).unwrap();

    (temp_dir, config_path)
}

fn followbot() -> Command {
    let mut cmd = Command::cargo_bin("followbot").unwrap();
    cmd.env_remove("FOLLOWBOT_CONFIG")
        .env_remove("RUST_LOG")
        .env("FOLLOWBOT_LOG_LEVEL", "error");
    cmd
}

#[test]
fn test_help_flag_output() {
    followbot()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("follow-back"))
        .stdout(predicate::str::contains("unfollow-nonfollowers"))
        .stdout(predicate::str::contains("mute-following"))
        .stdout(predicate::str::contains("--config"))
        .stdout(predicate::str::contains("--format"));
}

#[test]
fn test_missing_config_is_not_set_up() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("absent.toml");

    followbot()
        .arg("--config")
        .arg(&missing)
        .arg("follow-back")
        .assert()
        .failure()
        .code(4)
        .stderr(predicate::str::contains("not been set up"));
}

#[test]
fn test_incomplete_config_is_not_set_up() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "[account]\nhandle = \"followbot\"\n").unwrap();

    followbot()
        .arg("--config")
        .arg(&config_path)
        .arg("status")
        .assert()
        .code(4)
        .stderr(predicate::str::contains("credentials.consumer_key"));

    assert!(!temp_dir.path().join("followers.txt").exists());
}

#[test]
fn test_config_from_environment() {
    let (temp_dir, config_path) = setup_test_env();

    followbot()
        .env("FOLLOWBOT_CONFIG", &config_path)
        .arg("status")
        .assert()
        .success();

    assert!(temp_dir.path().join("already-followed.txt").is_file());
}

#[test]
fn test_status_text_output() {
    let (temp_dir, config_path) = setup_test_env();
    fs::write(temp_dir.path().join("followers.txt"), "1\n2\n3\n").unwrap();

    followbot()
        .arg("--config")
        .arg(&config_path)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("followers: 3 ids"))
        .stdout(predicate::str::contains("following: 0 ids"))
        .stdout(predicate::str::contains("already-followed: 0 ids"));
}

#[test]
fn test_status_json_output() {
    let (temp_dir, config_path) = setup_test_env();
    fs::write(temp_dir.path().join("following.txt"), "7\n8\n").unwrap();

    let output = followbot()
        .args(["--format", "json", "status", "--config"])
        .arg(&config_path)
        .output()
        .unwrap();

    assert!(output.status.success());
    let status: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let entries = status.as_array().unwrap();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[1]["role"], "following");
    assert_eq!(entries[1]["count"], 2);
    assert_eq!(entries[1]["stale"], false);
}

#[test]
fn test_corrupt_snapshot_fails() {
    let (temp_dir, config_path) = setup_test_env();
    fs::write(temp_dir.path().join("followers.txt"), "1\nabc\n").unwrap();

    followbot()
        .arg("--config")
        .arg(&config_path)
        .arg("status")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Corrupt snapshot"));
}

#[test]
fn test_empty_search_query_is_invalid_input() {
    let (_temp_dir, config_path) = setup_test_env();

    followbot()
        .arg("--config")
        .arg(&config_path)
        .args(["search", "  "])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("search query cannot be empty"));
}

#[test]
fn test_empty_screen_name_is_invalid_input() {
    let (_temp_dir, config_path) = setup_test_env();

    followbot()
        .arg("--config")
        .arg(&config_path)
        .args(["follow-followers-of", "@"])
        .assert()
        .code(3);
}

#[test]
fn test_invalid_format_rejected() {
    followbot()
        .args(["--format", "xml", "status"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value 'xml'"));
}

#[test]
fn test_invalid_result_type_rejected() {
    followbot()
        .args(["search", "rust", "--result-type", "oldest"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid result type"));
}
