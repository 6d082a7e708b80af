//! Config file discovery and TOML loading tests
//!
//! Tests that manipulate XDG_CONFIG_HOME are marked with #[serial]
//! so they never race each other on the process environment.

use platter_common::config::{find_config_file, load_toml, CONFIG_FILE_NAME};
use platter_common::Error;
use serde::Deserialize;
use serial_test::serial;
use std::env;
use std::fs;
use tempfile::TempDir;

#[derive(Debug, Deserialize, PartialEq)]
struct Sample {
    name: String,
    #[serde(default)]
    count: u32,
}

#[test]
fn test_explicit_path_is_used_when_present() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("custom.toml");
    fs::write(&path, "name = \"explicit\"\n").unwrap();

    let found = find_config_file(Some(&path), "platter-test").unwrap();
    assert_eq!(found, Some(path));
}

#[test]
#[serial]
fn test_user_config_dir_is_discovered() {
    let dir = TempDir::new().unwrap();
    let app_dir = dir.path().join("platter-test");
    fs::create_dir_all(&app_dir).unwrap();
    let path = app_dir.join(CONFIG_FILE_NAME);
    fs::write(&path, "name = \"discovered\"\n").unwrap();

    env::set_var("XDG_CONFIG_HOME", dir.path());
    let found = find_config_file(None, "platter-test");
    env::remove_var("XDG_CONFIG_HOME");

    #[cfg(target_os = "linux")]
    assert_eq!(found.unwrap(), Some(path));
    #[cfg(not(target_os = "linux"))]
    assert!(found.is_ok());
}

#[test]
#[serial]
fn test_nothing_discovered_returns_none() {
    let dir = TempDir::new().unwrap();

    env::set_var("XDG_CONFIG_HOME", dir.path());
    let found = find_config_file(None, "platter-test-absent");
    env::remove_var("XDG_CONFIG_HOME");

    assert_eq!(found.unwrap(), None);
}

#[test]
fn test_load_toml_applies_serde_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sample.toml");
    fs::write(&path, "name = \"platter\"\n").unwrap();

    let sample: Sample = load_toml(&path).unwrap();
    assert_eq!(
        sample,
        Sample {
            name: "platter".to_string(),
            count: 0
        }
    );
}

#[test]
fn test_load_toml_reports_parse_errors() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.toml");
    fs::write(&path, "name = [unterminated\n").unwrap();

    let result: Result<Sample, _> = load_toml(&path);
    match result {
        Err(Error::Config(msg)) => assert!(msg.contains("broken.toml")),
        other => panic!("expected Config error, got {:?}", other),
    }
}

#[test]
fn test_load_toml_missing_file_is_io_error() {
    let dir = TempDir::new().unwrap();
    let result: Result<Sample, _> = load_toml(&dir.path().join("missing.toml"));
    assert!(matches!(result, Err(Error::Io(_))));
}
