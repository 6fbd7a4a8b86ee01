//! Configuration for the explorer engine.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::{ExplorerError, Result};
use crate::MAX_ZOOM;

/// Configuration for tile tracking and evolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorerConfig {
    /// Zoom levels for which cluster and square evolution are computed.
    /// Tile visits are always recorded for every zoom in 0..=19.
    /// Default: [14, 17]
    pub zoom_levels: Vec<u8>,

    /// Location of the persisted tile state.
    /// Default: "Cache/tile-state.json"
    pub state_path: PathBuf,

    /// Location of the work ledger of processed activities.
    /// Default: "Cache/work-tracker-tile-state.txt"
    pub ledger_path: PathBuf,

    /// Capacity of the repository's time-series cache (entries).
    /// Default: 3000
    pub time_series_cache_size: usize,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self::with_cache_dir("Cache")
    }
}

impl ExplorerConfig {
    /// Default configuration with all persisted files under `dir`.
    pub fn with_cache_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            zoom_levels: vec![14, 17],
            state_path: dir.join("tile-state.json"),
            ledger_path: dir.join("work-tracker-tile-state.txt"),
            time_series_cache_size: 3000,
        }
    }

    /// Load a JSON configuration file.
    ///
    /// A missing file yields the defaults; unset fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config: Self = match fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content)?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(
                    "[Config] {} not found, using default configuration",
                    path.display()
                );
                Self::default()
            }
            Err(e) => return Err(ExplorerError::io(path, e)),
        };
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        if let Some(&zoom) = self.zoom_levels.iter().find(|&&z| z > MAX_ZOOM) {
            return Err(ExplorerError::InvalidZoom(zoom));
        }
        if self.time_series_cache_size == 0 {
            return Err(ExplorerError::Config(
                "time_series_cache_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
