use std::path::PathBuf;
use webpush_core::{ConfigError, Store, StoreConfig, SweepConfig};

#[test]
fn config_parses_with_default_sweep() {
    let config: StoreConfig = serde_json::from_str(r#"{"db_path": "/var/lib/webpush.db"}"#).unwrap();

    assert_eq!(config.db_path, PathBuf::from("/var/lib/webpush.db"));
    assert_eq!(config.sweep, SweepConfig::default());
    config.validate().unwrap();
}

#[test]
fn config_parses_partial_sweep_section() {
    let config: StoreConfig = serde_json::from_str(
        r#"{"db_path": "/var/lib/webpush.db", "sweep": {"warning_after_secs": 3600}}"#,
    )
    .unwrap();

    assert_eq!(config.sweep.warning_after_secs, 3600);
    assert_eq!(
        config.sweep.expire_after_secs,
        SweepConfig::default().expire_after_secs
    );
}

#[test]
fn config_rejects_unknown_fields() {
    let result = serde_json::from_str::<StoreConfig>(
        r#"{"db_path": "/var/lib/webpush.db", "cache_size": 10}"#,
    );
    assert!(result.is_err());
}

#[test]
fn validation_catches_inverted_sweep() {
    let config: StoreConfig = serde_json::from_str(
        r#"{"db_path": "/var/lib/webpush.db", "sweep": {"warning_after_secs": 60, "expire_after_secs": 30}}"#,
    )
    .unwrap();

    assert!(matches!(
        config.validate(),
        Err(ConfigError::WarningNotBeforeExpiry { .. })
    ));
}

#[test]
fn store_opens_from_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = StoreConfig::new(dir.path().join("webpush.db"));

    let store = Store::from_config(&config).unwrap();
    let outcome = store.sweep_with_config(&config.sweep).unwrap();
    assert!(outcome.targets.is_empty());
    store.close().unwrap();
}
