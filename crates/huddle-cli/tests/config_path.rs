use std::fs;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::tempdir;

#[test]
fn test_config_path_command() {
    let dir = tempdir().unwrap();

    cargo_bin_cmd!("huddle")
        .env("HUDDLE_HOME", dir.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_config_init_creates_file() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("config.toml");

    assert!(!config_path.exists());

    cargo_bin_cmd!("huddle")
        .env("HUDDLE_HOME", dir.path())
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created config at"));

    let contents = fs::read_to_string(&config_path).unwrap();
    assert!(contents.contains("api_url ="));
    assert!(contents.contains("refresh_policy ="));
}

#[test]
fn test_config_init_fails_if_exists() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("config.toml"), "# existing config").unwrap();

    cargo_bin_cmd!("huddle")
        .env("HUDDLE_HOME", dir.path())
        .args(["config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_config_set_url_saves_url() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("config.toml");
    fs::write(&config_path, "# my notes\napi_url = \"http://old.example/api\"\n").unwrap();

    cargo_bin_cmd!("huddle")
        .env("HUDDLE_HOME", dir.path())
        .args(["config", "set-url", "https://chat.example.com/api/"])
        .assert()
        .success()
        .stdout(predicate::str::contains("https://chat.example.com/api"));

    let contents = fs::read_to_string(&config_path).unwrap();
    assert!(contents.contains("\"https://chat.example.com/api\""));
    assert!(!contents.contains("old.example"));
}

#[test]
fn test_config_set_url_rejects_bad_scheme() {
    let dir = tempdir().unwrap();

    cargo_bin_cmd!("huddle")
        .env("HUDDLE_HOME", dir.path())
        .args(["config", "set-url", "ftp://chat.example.com"])
        .assert()
        .failure();
}
