//! Tests for configuration resolution and graceful degradation
//!
//! Covers:
//! - CLI > ENV > TOML > default priority for individual settings
//! - Missing or malformed TOML files never abort startup
//! - Config file location via explicit path and PILAH_CONFIG
//!
//! Tests that manipulate process environment are marked #[serial].

use pilah_common::config::{
    load_toml_config, load_toml_config_or_default, locate_config_file, resolve_setting,
    CompiledDefaults, ConfigFile, ConfigSource, TomlConfig, ENV_CONFIG_PATH,
};
use serial_test::serial;
use std::env;
use std::path::PathBuf;

const TEST_PORT_VAR: &str = "PILAH_TEST_PORT";

#[test]
fn test_compiled_defaults() {
    let defaults = CompiledDefaults::for_current_platform();

    assert_eq!(defaults.port, 5780);
    assert_eq!(defaults.api_url, "http://localhost:3005/api");
    assert!(defaults.model_path.ends_with("model.onnx"));
    assert!(defaults.credentials_path.ends_with("credentials.json"));

    #[cfg(target_os = "linux")]
    assert_eq!(defaults.camera_device, "/dev/video0");
}

#[test]
#[serial]
fn test_cli_value_wins() {
    env::set_var(TEST_PORT_VAR, "7000");

    let resolved = resolve_setting("port", Some(6000u16), TEST_PORT_VAR, Some(8000), 5780);
    assert_eq!(resolved.value, 6000);
    assert_eq!(resolved.source, ConfigSource::CommandLine);

    env::remove_var(TEST_PORT_VAR);
}

#[test]
#[serial]
fn test_env_beats_toml() {
    env::set_var(TEST_PORT_VAR, "7000");

    let resolved = resolve_setting::<u16>("port", None, TEST_PORT_VAR, Some(8000), 5780);
    assert_eq!(resolved.value, 7000);
    assert_eq!(resolved.source, ConfigSource::Environment);

    env::remove_var(TEST_PORT_VAR);
}

#[test]
#[serial]
fn test_unparsable_env_falls_through_to_toml() {
    env::set_var(TEST_PORT_VAR, "not-a-port");

    let resolved = resolve_setting::<u16>("port", None, TEST_PORT_VAR, Some(8000), 5780);
    assert_eq!(resolved.value, 8000);
    assert_eq!(resolved.source, ConfigSource::Toml);

    env::remove_var(TEST_PORT_VAR);
}

#[test]
#[serial]
fn test_default_when_nothing_set() {
    env::remove_var(TEST_PORT_VAR);

    let resolved = resolve_setting::<u16>("port", None, TEST_PORT_VAR, None, 5780);
    assert_eq!(resolved.value, 5780);
    assert_eq!(resolved.source, ConfigSource::Default);
}

#[test]
fn test_missing_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");
    let (config, outcome) = load_toml_config_or_default(Some(&path));
    assert_eq!(config, TomlConfig::default());
    assert_eq!(outcome, ConfigFile::Missing(path));
}

#[test]
fn test_malformed_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.toml");
    std::fs::write(&path, "port = [not valid").unwrap();

    assert!(load_toml_config(&path).is_err());
    let (config, outcome) = load_toml_config_or_default(Some(&path));
    assert_eq!(config, TomlConfig::default());
    assert!(matches!(outcome, ConfigFile::Invalid { .. }));
}

#[test]
fn test_full_file_is_read() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pilah-scan.toml");
    std::fs::write(
        &path,
        r#"
port = 6001
model_path = "/opt/pilah/model.onnx"
api_url = "https://scores.example.org/api"
camera_device = "/dev/video2"

[logging]
level = "debug"
"#,
    )
    .unwrap();

    let config = load_toml_config(&path).unwrap();
    assert_eq!(config.port, Some(6001));
    assert_eq!(config.model_path, Some(PathBuf::from("/opt/pilah/model.onnx")));
    assert_eq!(config.api_url.as_deref(), Some("https://scores.example.org/api"));
    assert_eq!(config.camera_device.as_deref(), Some("/dev/video2"));
    assert_eq!(config.logging.level, "debug");
    assert!(config.credentials_path.is_none());
}

#[test]
fn test_loaded_file_reports_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pilah-scan.toml");
    std::fs::write(&path, "port = 6100\n[logging]\nlevel = \"warn\"\n").unwrap();

    let (config, outcome) = load_toml_config_or_default(Some(&path));
    assert_eq!(config.port, Some(6100));
    assert_eq!(config.logging.level, "warn");
    assert_eq!(outcome, ConfigFile::Loaded(path));

    let (config, outcome) = load_toml_config_or_default(None);
    assert_eq!(config, TomlConfig::default());
    assert_eq!(outcome, ConfigFile::NoLocation);
}

#[test]
#[serial]
fn test_locate_prefers_explicit_path() {
    env::set_var(ENV_CONFIG_PATH, "/tmp/pilah-from-env.toml");

    let explicit = PathBuf::from("/tmp/pilah-explicit.toml");
    assert_eq!(
        locate_config_file(Some(&explicit), "pilah-scan"),
        Some(explicit.clone())
    );
    assert_eq!(
        locate_config_file(None, "pilah-scan"),
        Some(PathBuf::from("/tmp/pilah-from-env.toml"))
    );

    env::remove_var(ENV_CONFIG_PATH);
}
