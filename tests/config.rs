//! Tests for configuration loading

use explorer_tiles::{ExplorerConfig, ExplorerError};
use std::fs;
use std::path::PathBuf;

#[test]
fn test_defaults() {
    let config = ExplorerConfig::default();
    assert_eq!(config.zoom_levels, vec![14, 17]);
    assert_eq!(config.state_path, PathBuf::from("Cache/tile-state.json"));
    assert_eq!(
        config.ledger_path,
        PathBuf::from("Cache/work-tracker-tile-state.txt")
    );
    assert_eq!(config.time_series_cache_size, 3000);
    assert!(config.validate().is_ok());
}

#[test]
fn test_load_partial_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    fs::write(&path, r#"{"zoom_levels": [12, 19]}"#).unwrap();

    let config = ExplorerConfig::load(&path).unwrap();
    assert_eq!(config.zoom_levels, vec![12, 19]);
    assert_eq!(config.time_series_cache_size, 3000);
}

#[test]
fn test_missing_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = ExplorerConfig::load(dir.path().join("absent.json")).unwrap();
    assert_eq!(config, ExplorerConfig::default());
}

#[test]
fn test_invalid_values_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    fs::write(&path, r#"{"zoom_levels": [20]}"#).unwrap();
    assert!(matches!(
        ExplorerConfig::load(&path),
        Err(ExplorerError::InvalidZoom(20))
    ));

    let mut config = ExplorerConfig::default();
    config.time_series_cache_size = 0;
    assert!(matches!(config.validate(), Err(ExplorerError::Config(_))));

    fs::write(&path, "zoom_levels = [14]").unwrap();
    assert!(matches!(
        ExplorerConfig::load(&path),
        Err(ExplorerError::Serialization(_))
    ));
}
