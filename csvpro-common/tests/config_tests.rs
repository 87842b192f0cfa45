//! Tests for bootstrap configuration and root folder resolution
//!
//! Note: Uses serial_test to prevent ENV variable race conditions.
//! Tests that manipulate CSVPRO_ROOT_FOLDER or CSVPRO_WEBHOOK_SECRET are
//! marked with #[serial].

use csvpro_common::config::{
    RootFolderInitializer, RootFolderResolver, TomlConfig, ROOT_FOLDER_ENV, WEBHOOK_SECRET_ENV,
};
use serial_test::serial;
use std::env;
use std::path::PathBuf;

#[test]
#[serial]
fn test_cli_argument_has_highest_priority() {
    env::set_var(ROOT_FOLDER_ENV, "/from/env");
    let config = TomlConfig {
        root_folder: Some(PathBuf::from("/from/toml")),
        ..TomlConfig::default()
    };

    let resolved = RootFolderResolver::new("converter")
        .with_cli_arg(Some(PathBuf::from("/from/cli")))
        .with_toml(&config)
        .resolve();

    assert_eq!(resolved, PathBuf::from("/from/cli"));
    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_env_beats_toml() {
    env::set_var(ROOT_FOLDER_ENV, "/from/env");
    let config = TomlConfig {
        root_folder: Some(PathBuf::from("/from/toml")),
        ..TomlConfig::default()
    };

    let resolved = RootFolderResolver::new("converter").with_toml(&config).resolve();

    assert_eq!(resolved, PathBuf::from("/from/env"));
    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_toml_used_without_cli_or_env() {
    env::remove_var(ROOT_FOLDER_ENV);
    let config = TomlConfig {
        root_folder: Some(PathBuf::from("/from/toml")),
        ..TomlConfig::default()
    };

    let resolved = RootFolderResolver::new("converter").with_toml(&config).resolve();

    assert_eq!(resolved, PathBuf::from("/from/toml"));
}

#[test]
#[serial]
fn test_default_root_folder_when_nothing_configured() {
    env::remove_var(ROOT_FOLDER_ENV);

    let resolved = RootFolderResolver::new("converter").resolve();

    assert!(!resolved.as_os_str().is_empty());
    assert!(resolved.to_string_lossy().contains("csvpro"));
}

#[test]
#[serial]
fn test_webhook_secret_env_overrides_toml() {
    let mut config = TomlConfig::default();
    config.billing.webhook_secret = Some("from_toml".to_string());

    env::remove_var(WEBHOOK_SECRET_ENV);
    assert_eq!(config.webhook_secret().as_deref(), Some("from_toml"));

    env::set_var(WEBHOOK_SECRET_ENV, "from_env");
    assert_eq!(config.webhook_secret().as_deref(), Some("from_env"));
    env::remove_var(WEBHOOK_SECRET_ENV);

    // Blank secrets count as unset
    config.billing.webhook_secret = Some("   ".to_string());
    assert_eq!(config.webhook_secret(), None);
}

#[test]
fn test_missing_config_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent.toml");

    let config = TomlConfig::load_or_default(Some(&missing)).unwrap();

    assert_eq!(config.port, TomlConfig::default().port);
}

#[test]
fn test_config_file_loaded_and_invalid_file_rejected() {
    let dir = tempfile::tempdir().unwrap();

    let good = dir.path().join("good.toml");
    std::fs::write(&good, "port = 6001\nmax_upload_bytes = 1024\n").unwrap();
    let config = TomlConfig::load_or_default(Some(&good)).unwrap();
    assert_eq!(config.port, 6001);
    assert_eq!(config.max_upload_bytes, 1024);

    let bad = dir.path().join("bad.toml");
    std::fs::write(&bad, "port = [").unwrap();
    assert!(TomlConfig::load_or_default(Some(&bad)).is_err());
}

#[test]
fn test_initializer_creates_directory() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("a").join("b");

    let init = RootFolderInitializer::new(root.clone());
    init.ensure_directory_exists().unwrap();

    assert!(root.is_dir());
    assert_eq!(init.root_folder(), root.as_path());
    assert_eq!(init.database_path(), root.join("csvpro.db"));
}
