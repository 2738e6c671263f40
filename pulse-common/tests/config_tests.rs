//! Configuration file resolution and loading
//!
//! Tests that set environment variables are marked `#[serial]`.

use pulse_common::config::{load_toml_or_default, resolve_config_file, LoggingConfig, APP_DIR};
use pulse_common::Error;
use serde::Deserialize;
use serial_test::serial;
use std::path::PathBuf;

const TEST_ENV_VAR: &str = "PULSE_COMMON_TEST_CONFIG";

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
struct ServiceToml {
    port: u16,
    logging: LoggingConfig,
}

#[test]
#[serial]
fn test_cli_argument_beats_environment() {
    std::env::set_var(TEST_ENV_VAR, "/tmp/from-env.toml");
    let cli = PathBuf::from("/tmp/from-cli.toml");
    let resolved = resolve_config_file(Some(cli.as_path()), TEST_ENV_VAR, "svc.toml");
    std::env::remove_var(TEST_ENV_VAR);

    assert_eq!(resolved, Some(cli));
}

#[test]
#[serial]
fn test_environment_used_without_cli_argument() {
    std::env::set_var(TEST_ENV_VAR, "/tmp/from-env.toml");
    let resolved = resolve_config_file(None, TEST_ENV_VAR, "svc.toml");
    std::env::remove_var(TEST_ENV_VAR);

    assert_eq!(resolved, Some(PathBuf::from("/tmp/from-env.toml")));
}

#[test]
#[serial]
fn test_blank_environment_is_ignored() {
    std::env::set_var(TEST_ENV_VAR, "  ");
    let resolved = resolve_config_file(None, TEST_ENV_VAR, "pulse-test-never-installed.toml");
    std::env::remove_var(TEST_ENV_VAR);

    assert_eq!(resolved, None);
}

#[test]
fn test_app_dir_name() {
    assert_eq!(APP_DIR, "tlv-pulse");
}

#[test]
fn test_load_full_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("svc.toml");
    std::fs::write(&path, "port = 5740\n\n[logging]\nlevel = \"debug\"\n").unwrap();

    let config: ServiceToml = load_toml_or_default(Some(path.as_path())).unwrap();
    assert_eq!(config.port, 5740);
    assert_eq!(config.logging.level, "debug");
}

#[test]
fn test_wrong_value_type_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("svc.toml");
    std::fs::write(&path, "port = \"not a number\"\n").unwrap();

    let result: pulse_common::Result<ServiceToml> = load_toml_or_default(Some(path.as_path()));
    match result {
        Err(Error::Config(msg)) => assert!(msg.contains("svc.toml")),
        other => panic!("expected config error, got {:?}", other),
    }
}

#[test]
fn test_missing_file_is_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");

    let config: ServiceToml = load_toml_or_default(Some(path.as_path())).unwrap();
    assert_eq!(config, ServiceToml::default());
}
