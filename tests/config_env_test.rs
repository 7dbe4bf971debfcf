//! Config environment variable tests
//!
//! These tests verify that Config::from_env() correctly reads and applies
//! environment variable overrides.
//!
//! Tests use #[serial] to prevent race conditions with shared env vars.

use std::env;
use std::path::PathBuf;

use serial_test::serial;
use ultrathink::config::{Config, LogFormat, StorageConfig};
use ultrathink::AppError;

fn clear_vars() {
    env::remove_var("ULTRATHINK_SESSIONS_DIR");
    env::remove_var("LOG_LEVEL");
    env::remove_var("LOG_FORMAT");
}

#[test]
#[serial]
fn test_config_defaults() {
    clear_vars();

    let config = Config::from_env().unwrap();
    assert_eq!(
        config.storage.sessions_dir,
        StorageConfig::default_sessions_dir()
    );
    assert!(config.storage.sessions_dir.ends_with("ultrathink/sessions"));
    assert_eq!(config.logging.level, "warn");
    assert_eq!(config.logging.format, LogFormat::Pretty);
}

#[test]
#[serial]
fn test_config_from_env_custom_sessions_dir() {
    clear_vars();
    env::set_var("ULTRATHINK_SESSIONS_DIR", "/custom/sessions");

    let config = Config::from_env().unwrap();
    assert_eq!(
        config.storage.sessions_dir,
        PathBuf::from("/custom/sessions")
    );

    clear_vars();
}

#[test]
#[serial]
fn test_config_from_env_empty_sessions_dir() {
    clear_vars();
    env::set_var("ULTRATHINK_SESSIONS_DIR", "  ");

    let err = Config::from_env().unwrap_err();
    assert!(matches!(err, AppError::Config { .. }));
    assert_eq!(err.report().error, "config_error");

    clear_vars();
}

#[test]
#[serial]
fn test_config_from_env_json_log_format() {
    clear_vars();
    env::set_var("LOG_FORMAT", "JSON");

    let config = Config::from_env().unwrap();
    assert_eq!(config.logging.format, LogFormat::Json);

    env::set_var("LOG_FORMAT", "anything-else");
    let config = Config::from_env().unwrap();
    assert_eq!(config.logging.format, LogFormat::Pretty);

    clear_vars();
}

#[test]
#[serial]
fn test_config_from_env_log_level() {
    clear_vars();
    env::set_var("LOG_LEVEL", "debug");

    let config = Config::from_env().unwrap();
    assert_eq!(config.logging.level, "debug");

    clear_vars();
}
