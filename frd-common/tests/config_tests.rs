//! Integration tests for configuration loading
//!
//! Tests that touch process environment variables are marked with #[serial]
//! so they never run in parallel with each other.

use frd_common::config::{
    ConfigSource, TomlConfig, ENV_APPROVALS_DATABASE, ENV_HOSTAWAY_BASE_URL, ENV_PLACES_API_KEY,
};
use frd_common::Error;
use serial_test::serial;
use std::env;
use std::path::PathBuf;

#[test]
fn test_load_explicit_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("frd-ingest.toml");
    std::fs::write(
        &path,
        r#"
        [server]
        host = "0.0.0.0"
        port = 8088

        [logging]
        level = "debug"

        [hostaway]
        client_id = "61148"
        client_secret = "secret"

        [places]
        cache_ttl_secs = 60
        "#,
    )
    .unwrap();

    let (config, source) = TomlConfig::load(Some(&path)).unwrap();
    assert_eq!(source, ConfigSource::File(path.clone()));
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.server.port, 8088);
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.hostaway.client_id, "61148");
    assert_eq!(config.places.cache_ttl_secs, 60);
}

#[test]
fn test_load_missing_explicit_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");

    let err = TomlConfig::load(Some(&path)).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn test_load_malformed_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.toml");
    std::fs::write(&path, "server = [").unwrap();

    assert!(TomlConfig::load(Some(&path)).is_err());
}

#[test]
#[serial]
fn test_env_overrides_take_priority_over_toml() {
    env::set_var(ENV_HOSTAWAY_BASE_URL, "http://127.0.0.1:9999/v1");
    env::set_var(ENV_PLACES_API_KEY, "env-key");
    env::set_var(ENV_APPROVALS_DATABASE, "/tmp/approvals.db");

    let mut config = TomlConfig::from_toml_str(
        r#"
        [hostaway]
        base_url = "https://toml.example/v1"

        [places]
        api_key = "toml-key"
        "#,
    )
    .unwrap();
    config.apply_env_overrides();

    env::remove_var(ENV_HOSTAWAY_BASE_URL);
    env::remove_var(ENV_PLACES_API_KEY);
    env::remove_var(ENV_APPROVALS_DATABASE);

    assert_eq!(config.hostaway.base_url, "http://127.0.0.1:9999/v1");
    assert_eq!(config.places_api_key(), Some("env-key"));
    assert_eq!(
        config.approvals.database_path,
        Some(PathBuf::from("/tmp/approvals.db"))
    );
}

#[test]
#[serial]
fn test_without_env_toml_values_survive() {
    env::remove_var(ENV_HOSTAWAY_BASE_URL);
    env::remove_var(ENV_PLACES_API_KEY);

    let mut config = TomlConfig::from_toml_str(
        r#"
        [hostaway]
        base_url = "https://toml.example/v1"
        "#,
    )
    .unwrap();
    config.apply_env_overrides();

    assert_eq!(config.hostaway.base_url, "https://toml.example/v1");
    assert_eq!(config.places_api_key(), None);
}
