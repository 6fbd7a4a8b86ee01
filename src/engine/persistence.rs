//! Versioned, atomically written tile state.
//!
//! The whole tracker state lives in one JSON document. Loading treats a
//! missing file, a schema version mismatch or undecodable content as absent
//! state, which makes the caller rebuild from scratch. Writes go to a
//! sibling temporary file that is then renamed over the target.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::{ExplorerError, Result};
use crate::evolution::EvolutionState;
use crate::ActivityId;

use super::visit_store::TileVisitStore;

/// Schema version of the persisted state. Bump on any layout change.
pub const TILE_STATE_VERSION: u32 = 4;

/// Everything the tracker persists between runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TileState {
    pub version: u32,
    pub visits: TileVisitStore,
    /// Activities folded into `visits`; authoritative over the work ledger
    pub processed: BTreeSet<ActivityId>,
    /// Evolution state per zoom level
    pub evolution: BTreeMap<u8, EvolutionState>,
}

impl Default for TileState {
    fn default() -> Self {
        Self::new()
    }
}

impl TileState {
    pub fn new() -> Self {
        Self {
            version: TILE_STATE_VERSION,
            visits: TileVisitStore::new(),
            processed: BTreeSet::new(),
            evolution: BTreeMap::new(),
        }
    }

    /// Evolution state of a zoom, created empty on first use.
    pub fn evolution_or_insert(&mut self, zoom: u8) -> &mut EvolutionState {
        self.evolution.entry(zoom).or_default()
    }
}

#[derive(Deserialize)]
struct VersionProbe {
    #[serde(default)]
    version: Option<u32>,
}

/// Load persisted state, or `None` if it is absent or unusable.
pub fn load_state(path: &Path) -> Result<Option<TileState>> {
    let content = match fs::read(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(ExplorerError::io(path, e)),
    };

    match serde_json::from_slice::<VersionProbe>(&content) {
        Ok(VersionProbe {
            version: Some(TILE_STATE_VERSION),
        }) => {}
        Ok(probe) => {
            info!(
                "[Persistence] State version {:?} does not match {}, rebuilding",
                probe.version, TILE_STATE_VERSION
            );
            return Ok(None);
        }
        Err(e) => {
            warn!("[Persistence] Unreadable state {}: {}", path.display(), e);
            return Ok(None);
        }
    }

    match serde_json::from_slice(&content) {
        Ok(state) => Ok(Some(state)),
        Err(e) => {
            warn!("[Persistence] Corrupt state {}: {}", path.display(), e);
            Ok(None)
        }
    }
}

/// Persist state atomically.
pub fn save_state(path: &Path, state: &TileState) -> Result<()> {
    write_atomic(path, |writer| {
        serde_json::to_writer(writer, state)?;
        Ok(())
    })
}

fn temporary_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write a file through a temporary sibling and rename it into place.
pub(crate) fn write_atomic(
    path: &Path,
    write: impl FnOnce(&mut BufWriter<File>) -> Result<()>,
) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| ExplorerError::io(parent, e))?;
    }

    let tmp_path = temporary_path(path);
    let file = File::create(&tmp_path).map_err(|e| ExplorerError::io(&tmp_path, e))?;
    let mut writer = BufWriter::new(file);
    write(&mut writer)?;
    writer.flush().map_err(|e| ExplorerError::io(&tmp_path, e))?;
    writer
        .get_ref()
        .sync_all()
        .map_err(|e| ExplorerError::io(&tmp_path, e))?;
    drop(writer);

    fs::rename(&tmp_path, path).map_err(|e| ExplorerError::io(path, e))
}

/// Serialize `HashMap<Tile, V>` as a sorted sequence of `(tile, value)` pairs.
pub(crate) mod tile_map {
    use std::collections::HashMap;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use crate::Tile;

    pub fn serialize<S, V>(map: &HashMap<Tile, V>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        V: Serialize,
    {
        let mut entries: Vec<(&Tile, &V)> = map.iter().collect();
        entries.sort_unstable_by_key(|(tile, _)| **tile);
        serializer.collect_seq(entries)
    }

    pub fn deserialize<'de, D, V>(deserializer: D) -> Result<HashMap<Tile, V>, D::Error>
    where
        D: Deserializer<'de>,
        V: Deserialize<'de>,
    {
        let entries = Vec::<(Tile, V)>::deserialize(deserializer)?;
        Ok(entries.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temporary_path_is_sibling() {
        let tmp = temporary_path(Path::new("Cache/tile-state.json"));
        assert_eq!(tmp, Path::new("Cache/tile-state.json.tmp"));
    }
}
