use std::fs;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::tempdir;

#[test]
fn test_config_path_command() {
    let dir = tempdir().unwrap();

    cargo_bin_cmd!("answerflow")
        .env("ANSWERFLOW_HOME", dir.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"))
        .stderr(predicate::str::contains("built-in defaults apply"));
}

#[test]
fn test_config_show_applies_env_override() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("config.toml"),
        "[backend]\nbase_url = \"http://from-file:1\"\n\n[pacing]\ntick_ms = 50\n",
    )
    .unwrap();

    cargo_bin_cmd!("answerflow")
        .env("ANSWERFLOW_HOME", dir.path())
        .env("ANSWERFLOW_BASE_URL", "http://from-env:2/")
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#"base_url = "http://from-env:2""#))
        .stdout(predicate::str::contains("tick_ms = 50"))
        .stdout(predicate::str::contains("from-file").not());
}

#[test]
fn test_config_init_creates_file() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("config.toml");

    assert!(!config_path.exists());

    cargo_bin_cmd!("answerflow")
        .env("ANSWERFLOW_HOME", dir.path())
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created config at"));

    assert!(config_path.exists());

    let contents = fs::read_to_string(&config_path).unwrap();
    assert!(contents.contains("[backend]"));
    assert!(contents.contains("tick_ms = 30"));
    assert!(contents.contains("reveal_quantum = 5"));
}

#[test]
fn test_config_init_fails_if_exists() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("config.toml");

    fs::write(&config_path, "# existing config").unwrap();

    cargo_bin_cmd!("answerflow")
        .env("ANSWERFLOW_HOME", dir.path())
        .args(["config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_invalid_config_is_reported() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("config.toml"), "[pacing\n").unwrap();

    cargo_bin_cmd!("answerflow")
        .env("ANSWERFLOW_HOME", dir.path())
        .args(["ask", "anything"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("load config"));
}
