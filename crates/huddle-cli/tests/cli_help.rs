use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

#[test]
fn test_help_lists_commands() {
    cargo_bin_cmd!("huddle")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("login"))
        .stdout(predicate::str::contains("groups"))
        .stdout(predicate::str::contains("chat"))
        .stdout(predicate::str::contains("--api-url"));
}

#[test]
fn test_groups_help_shows_subcommands() {
    cargo_bin_cmd!("huddle")
        .args(["groups", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("public"))
        .stdout(predicate::str::contains("join"))
        .stdout(predicate::str::contains("show"));
}

#[test]
fn test_unknown_command_fails() {
    cargo_bin_cmd!("huddle").arg("nope").assert().failure();
}
