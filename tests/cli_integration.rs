//! CLI integration tests.
//!
//! These tests verify the CLI argument parsing and configuration loading.

use std::ffi::OsString;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use tempfile::NamedTempFile;

use tmux_relay::cli::{parse_args_from, Args};
use tmux_relay::config::Config;

fn args(args: &[&str]) -> Vec<OsString> {
    std::iter::once("tmux-relay")
        .chain(args.iter().copied())
        .map(OsString::from)
        .collect()
}

// ============================================================================
// CLI Argument Tests
// ============================================================================

#[test]
fn test_cli_defaults() {
    let result = parse_args_from(args(&[])).unwrap();

    assert_eq!(result.caller, "console");
    assert!(result.config.is_none());
    assert!(result.scratch_dir.is_none());
    assert!(result.settle_ms.is_none());
    assert!(result.log_level.is_none());
    assert!(!result.kill_orphans);
}

#[test]
fn test_cli_full_options() {
    let result = parse_args_from(args(&[
        "-u",
        "alice",
        "-s",
        "/srv/relay/tmp",
        "--settle-ms",
        "2500",
        "-l",
        "debug",
        "--kill-orphans",
    ]))
    .unwrap();

    assert_eq!(result.caller, "alice");
    assert_eq!(result.scratch_dir, Some(PathBuf::from("/srv/relay/tmp")));
    assert_eq!(result.settle_ms, Some(2500));
    assert_eq!(result.log_level, Some("debug".to_string()));
    assert!(result.kill_orphans);
}

#[test]
fn test_cli_unknown_flag() {
    assert!(parse_args_from(args(&["--bogus"])).is_err());
}

// ============================================================================
// Configuration Tests
// ============================================================================

#[test]
fn test_config_file_then_args() {
    let json = r#"{
        "capture": { "scratch_dir": "/from/file", "settle_ms": 900 },
        "session": { "idle_timeout_secs": 120 }
    }"#;
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(json.as_bytes()).unwrap();

    let parsed = Args {
        config: Some(file.path().to_path_buf()),
        settle_ms: Some(50),
        ..Args::default()
    };
    let config = Config::load(&parsed).unwrap();

    // CLI beats file, file beats defaults
    assert_eq!(config.capture.settle_ms, 50);
    assert_eq!(config.session.idle_timeout_secs, 120);

    let manager = config.manager_config();
    assert_eq!(manager.settle, Duration::from_millis(50));
    assert_eq!(manager.idle_timeout, Duration::from_secs(120));
}

#[test]
fn test_config_missing_file() {
    let parsed = Args {
        config: Some(PathBuf::from("/nonexistent/tmux-relay.json")),
        ..Args::default()
    };
    assert!(Config::load(&parsed).is_err());
}

#[test]
fn test_config_invalid_pattern_rejected_on_load() {
    let json = r#"{ "security": { "extra_patterns": ["[unterminated"] } }"#;
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(json.as_bytes()).unwrap();

    let parsed = Args {
        config: Some(file.path().to_path_buf()),
        ..Args::default()
    };
    let err = Config::load(&parsed).unwrap_err();
    assert!(err.to_string().contains("deny pattern"));
}
