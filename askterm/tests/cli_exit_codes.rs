//! CLI tests for askterm startup.
//!
//! Spawns the binary against a temporary home and checks exit codes for
//! broken configuration and missing credentials.

use std::fs;
use std::process::{Command, Stdio};

use askterm::exit_codes;
use askterm::io::config::{AppConfig, load_config};
use askterm::io::credentials::{API_KEY_VAR, BASE_URL_VAR, MODEL_VAR};
use askterm::io::paths::{HOME_ENV, PathManager};

fn askterm(home: &std::path::Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_askterm"));
    cmd.arg("--home")
        .arg(home)
        .env_remove(HOME_ENV)
        .env_remove(MODEL_VAR)
        .env_remove(BASE_URL_VAR)
        .env_remove(API_KEY_VAR)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped());
    cmd
}

#[test]
fn help_exits_ok() {
    let status = Command::new(env!("CARGO_BIN_EXE_askterm"))
        .arg("--help")
        .stdout(Stdio::null())
        .status()
        .expect("askterm --help");
    assert_eq!(status.code(), Some(exit_codes::OK));
}

#[test]
fn invalid_config_exits_with_invalid_code() {
    let temp = tempfile::tempdir().expect("tempdir");
    let paths = PathManager::new(temp.path());
    fs::write(&paths.config_path, "output_limit_bytes = 0\n").expect("seed config");

    let output = askterm(temp.path()).output().expect("askterm");

    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("output_limit_bytes"));
}

#[test]
fn invalid_rules_file_exits_with_invalid_code() {
    let temp = tempfile::tempdir().expect("tempdir");
    let paths = PathManager::new(temp.path());
    let rules = temp.path().join("rules.json");
    fs::write(&rules, r#"{"DENY_ALWAYS": [""], "CONFIRM_FIRST": []}"#).expect("seed rules");
    fs::write(
        &paths.config_path,
        format!("safety_rules = {:?}\n", rules.display().to_string()),
    )
    .expect("seed config");

    let output = askterm(temp.path()).output().expect("askterm");

    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
}

#[test]
fn quick_mode_without_credentials_exits_with_no_credentials_code() {
    let temp = tempfile::tempdir().expect("tempdir");

    let output = askterm(temp.path())
        .args(["--quick", "hello"])
        .output()
        .expect("askterm");

    assert_eq!(output.status.code(), Some(exit_codes::NO_CREDENTIALS));
}

#[test]
fn interactive_mode_ends_cleanly_at_end_of_input() {
    let temp = tempfile::tempdir().expect("tempdir");

    let output = askterm(temp.path()).output().expect("askterm");

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let paths = PathManager::new(temp.path());
    let log = fs::read_to_string(&paths.transcript_path).expect("transcript");
    assert!(log.contains("Goodbye!"));
    assert!(paths.debug_log_path.is_file());
    assert_eq!(
        load_config(&paths.config_path).expect("seeded config"),
        AppConfig::default()
    );
}
