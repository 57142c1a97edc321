//! Integration tests for config file resolution and loading
//!
//! Tests that manipulate WAVELOOP_CONFIG are marked with #[serial] so they
//! run sequentially, not in parallel.

use serial_test::serial;
use std::env;
use std::io::Write;
use tempfile::TempDir;
use waveloop_common::config::{resolve_config_path, ConfigSource, TomlConfig, CONFIG_ENV_VAR};
use waveloop_common::Error;

fn write_config(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
    path
}

#[test]
#[serial]
fn test_env_var_used_when_no_cli_path() {
    env::set_var(CONFIG_ENV_VAR, "/tmp/from-env.toml");

    let source = resolve_config_path(None);
    assert_eq!(
        source,
        ConfigSource::Explicit("/tmp/from-env.toml".into())
    );

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_cli_path_overrides_env_var() {
    env::set_var(CONFIG_ENV_VAR, "/tmp/from-env.toml");

    let source = resolve_config_path(Some(std::path::Path::new("/tmp/from-cli.toml")));
    assert_eq!(
        source,
        ConfigSource::Explicit("/tmp/from-cli.toml".into())
    );

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_no_override_falls_back_to_platform_default() {
    env::remove_var(CONFIG_ENV_VAR);

    match resolve_config_path(None) {
        ConfigSource::PlatformDefault(path) => {
            assert!(path.ends_with("waveloop/config.toml"));
        }
        // Headless CI without a home directory
        ConfigSource::None => {}
        ConfigSource::Explicit(path) => panic!("unexpected explicit path {:?}", path),
    }
}

#[test]
#[serial]
fn test_load_explicit_file() {
    env::remove_var(CONFIG_ENV_VAR);
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        "waveloop.toml",
        r#"
        [timeline]
        width = 800

        [segment]
        start = 0.25
        duration = 1.0

        [logging]
        level = "debug"
        "#,
    );

    let config = TomlConfig::load(Some(&path)).unwrap();
    assert_eq!(config.timeline.width, 800);
    assert_eq!(config.timeline.height, 200);
    assert_eq!(config.segment.start, 0.25);
    assert_eq!(config.segment.duration, 1.0);
    assert_eq!(config.logging.level, "debug");
}

#[test]
#[serial]
fn test_load_explicit_missing_file_is_error() {
    env::remove_var(CONFIG_ENV_VAR);
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope.toml");

    let result = TomlConfig::load(Some(&missing));
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
#[serial]
fn test_load_via_env_var() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "env.toml", "[playback]\nheadless = true\n");
    env::set_var(CONFIG_ENV_VAR, &path);

    let config = TomlConfig::load(None).unwrap();
    assert!(config.playback.headless);

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_invalid_values_rejected_on_load() {
    env::remove_var(CONFIG_ENV_VAR);
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "bad.toml", "[playback]\nframe_interval_ms = 0\n");

    let result = TomlConfig::load(Some(&path));
    assert!(matches!(result, Err(Error::Config(_))));
}
