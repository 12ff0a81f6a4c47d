//! Integration tests for the config crate

use ledger_wizard_config::{
    validate_config, AppConfig, ConfigError, ConfigLoader, ConfirmationSettings, Environment,
};
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

fn preset(name: &str) -> PathBuf {
    std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../../config")
        .join(name)
}

#[test]
fn test_load_default_config() {
    let config = ConfigLoader::from_file(&preset("default.toml"))
        .expect("Failed to load default config");

    assert_eq!(config.environment, Environment::Mainnet);
    assert_eq!(config.confirmation, ConfirmationSettings::default());
    assert!(config.logging.json);
    assert!(validate_config(&config).is_ok());
}

#[test]
fn test_load_local_config() {
    let config =
        ConfigLoader::from_file(&preset("local.toml")).expect("Failed to load local config");

    assert_eq!(config.environment, Environment::Local);
    assert_eq!(config.logging.level, "trace");
    assert_eq!(config.confirmation.max_checks, 3);
    assert_eq!(config.confirmation.backoff_multiplier, 1.0);
    assert!(!config.metrics.enabled);
    assert!(validate_config(&config).is_ok());
}

#[test]
fn test_config_validation_invalid_timing() {
    let config = AppConfig {
        confirmation: ConfirmationSettings {
            first_check_delay_ms: 2000,
            retry_delay_ms: 5000,
            ..Default::default()
        },
        ..Default::default()
    };

    let result = validate_config(&config);
    assert!(matches!(result, Err(ConfigError::ValidationError(_))));
}

#[test]
fn test_config_builder() {
    let toml = r#"
environment = "testnet"

[logging]
level = "debug"
    "#;

    let mut file = NamedTempFile::new().unwrap();
    file.write_all(toml.as_bytes()).unwrap();
    file.flush().unwrap();

    let config = ConfigLoader::builder()
        .add_file(file.path(), true)
        .build()
        .expect("Failed to build config");

    assert_eq!(config.environment, Environment::Testnet);
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.metrics.namespace, "ledger_wizard");
}

#[test]
fn test_builder_layers_files_in_order() {
    let mut base = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    base.write_all(b"[confirmation]\nmax_checks = 4\nretry_delay_ms = 3000\n")
        .unwrap();

    let mut overlay = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    overlay
        .write_all(b"confirmation:\n  max_checks: 6\n")
        .unwrap();

    let config = ConfigLoader::builder()
        .add_file(base.path(), true)
        .add_file(overlay.path(), true)
        .build()
        .unwrap();

    assert_eq!(config.confirmation.max_checks, 6);
    assert_eq!(config.confirmation.retry_delay_ms, 3000);
}

#[test]
fn test_env_overrides_file() {
    // Unique prefix so parallel tests do not see each other's variables
    std::env::set_var("LWTEST_FILE_ENV_CONFIRMATION__MAX_CHECKS", "5");
    std::env::set_var("LWTEST_FILE_ENV_LOGGING__LEVEL", "warn");

    let config = ConfigLoader::from_file_with_env(&preset("local.toml"), "LWTEST_FILE_ENV")
        .expect("Failed to load config with env overrides");

    assert_eq!(config.confirmation.max_checks, 5);
    assert_eq!(config.logging.level, "warn");
    assert_eq!(config.environment, Environment::Local);

    std::env::remove_var("LWTEST_FILE_ENV_CONFIRMATION__MAX_CHECKS");
    std::env::remove_var("LWTEST_FILE_ENV_LOGGING__LEVEL");
}

#[test]
fn test_env_only() {
    std::env::set_var("LWTEST_ENV_ONLY_ENVIRONMENT", "testnet");
    std::env::set_var("LWTEST_ENV_ONLY_METRICS__ENABLED", "false");

    let config = ConfigLoader::from_env_with_prefix("LWTEST_ENV_ONLY").unwrap();

    assert_eq!(config.environment, Environment::Testnet);
    assert!(!config.metrics.enabled);
    assert_eq!(config.confirmation.first_check_delay_ms, 12000);

    std::env::remove_var("LWTEST_ENV_ONLY_ENVIRONMENT");
    std::env::remove_var("LWTEST_ENV_ONLY_METRICS__ENABLED");
}

#[test]
fn test_missing_file() {
    let result = ConfigLoader::from_file_with_env(&preset("missing.toml"), "LWTEST_MISSING");
    assert!(matches!(result, Err(ConfigError::LoadError(_))));
}

#[test]
fn test_yaml_and_json_formats() {
    let yaml = r#"
environment: testnet
confirmation:
  max_checks: 3
    "#;
    let config = ConfigLoader::from_yaml(yaml).expect("Failed to parse YAML");
    assert_eq!(config.confirmation.max_checks, 3);

    let json = r#"{ "logging": { "level": "error", "json": true } }"#;
    let config = ConfigLoader::from_json(json).expect("Failed to parse JSON");
    assert_eq!(config.logging.level, "error");
    assert!(config.logging.json);
    assert_eq!(config.environment, Environment::Local);
}

#[test]
fn test_invalid_toml() {
    let result = ConfigLoader::from_toml("[confirmation\nmax_checks = ");
    assert!(matches!(result, Err(ConfigError::TomlError(_))));
}
