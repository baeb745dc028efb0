//! End-to-end tests of the `cumulo` binary's argument handling.

use assert_cmd::Command;
use predicates::prelude::*;

fn cumulo() -> Command {
    Command::cargo_bin("cumulo").expect("binary should build")
}

#[test]
fn help_lists_command_families() {
    cumulo()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("stacks"))
        .stdout(predicate::str::contains("formations"))
        .stdout(predicate::str::contains("snapshots"))
        .stdout(predicate::str::contains("profiles"));
}

#[test]
fn version_prints() {
    cumulo()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn unknown_subcommand_fails() {
    cumulo()
        .arg("teleport")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

#[test]
fn stacks_redeploy_requires_no_extra_args_but_fails_without_token() {
    // With an isolated HOME there is no token, so the command fails before
    // any network access.
    let home = tempfile::TempDir::new().expect("tempdir");
    cumulo()
        .env("HOME", home.path())
        .env_remove("CUMULO_TOKEN")
        .args(["stacks", "restart", "-s", "web"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no access token"));
}

#[test]
fn profiles_round_trip_in_isolated_home() {
    let home = tempfile::TempDir::new().expect("tempdir");

    cumulo()
        .env("HOME", home.path())
        .args(["profiles", "create", "work", "--url", "https://api.internal/v3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Profile work saved"));

    cumulo()
        .env("HOME", home.path())
        .args(["profiles", "use", "work"])
        .assert()
        .success();

    cumulo()
        .env("HOME", home.path())
        .args(["profiles", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("work"))
        .stdout(predicate::str::contains("https://api.internal/v3"));

    cumulo()
        .env("HOME", home.path())
        .args(["profiles", "delete", "work"])
        .assert()
        .success();
}

#[test]
fn profiles_list_as_json() {
    let home = tempfile::TempDir::new().expect("tempdir");
    let output = cumulo()
        .env("HOME", home.path())
        .args(["-f", "json", "profiles", "list"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let parsed: serde_json::Value = serde_json::from_slice(&output).expect("valid json");
    assert!(parsed["profiles"].is_array());
}

#[test]
fn services_scale_requires_target() {
    cumulo()
        .args(["services", "scale", "web"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("TARGET"));
}
