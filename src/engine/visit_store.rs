//! Per-zoom tile visit storage.
//!
//! For every zoom level the store keeps:
//! - the set of activities that ever touched each tile
//! - first/last visit by an achievement-eligible activity
//! - the append-only discovery history consumed by the evolution trackers

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::{ExplorerError, Result};
use crate::{ActivityId, Tile, Timestamp, MAX_ZOOM, ZOOM_LEVELS};

use super::persistence::tile_map;

/// A visit by one activity at one time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Visit {
    pub time: Timestamp,
    pub activity_id: ActivityId,
}

/// Visit metadata of one tile at one zoom.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileInfo {
    /// Every activity that touched the tile, eligible or not
    pub activity_ids: BTreeSet<ActivityId>,
    /// Earliest eligible visit; `None` until the tile is discovered
    pub first: Option<Visit>,
    /// Latest eligible visit
    pub last: Option<Visit>,
}

impl TileInfo {
    /// Whether an achievement-eligible activity has visited the tile.
    pub fn is_discovered(&self) -> bool {
        self.first.is_some()
    }

    fn record_visit(&mut self, visit: Visit) {
        // Ties on time are broken by activity id so the result does not
        // depend on processing order.
        if self.first.map_or(true, |first| visit < first) {
            self.first = Some(visit);
        }
        if self.last.map_or(true, |last| visit > last) {
            self.last = Some(visit);
        }
    }
}

/// First discovery of a tile by an eligible activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileHistoryEntry {
    pub activity_id: ActivityId,
    pub time: Timestamp,
    pub tile: Tile,
}

/// Visit table and discovery history of one zoom level.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoomVisits {
    #[serde(with = "tile_map")]
    tiles: HashMap<Tile, TileInfo>,
    history: Vec<TileHistoryEntry>,
}

/// Tile visit store for all zoom levels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileVisitStore {
    zooms: Vec<ZoomVisits>,
}

impl Default for TileVisitStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TileVisitStore {
    /// Create an empty store covering zooms 0..=19.
    pub fn new() -> Self {
        Self {
            zooms: vec![ZoomVisits::default(); ZOOM_LEVELS],
        }
    }

    fn zoom(&self, zoom: u8) -> Option<&ZoomVisits> {
        self.zooms.get(zoom as usize)
    }

    fn zoom_mut(&mut self, zoom: u8) -> Result<&mut ZoomVisits> {
        self.zooms
            .get_mut(zoom as usize)
            .ok_or(ExplorerError::InvalidZoom(zoom))
    }

    /// Record that `activity_id` touched `tile` at `time`.
    ///
    /// The activity is always added to the tile's activity set. Eligible
    /// activities also update first/last visit, and the first eligible touch
    /// of a tile appends a discovery history entry.
    ///
    /// Returns whether the tile was newly discovered.
    pub fn record_touch(
        &mut self,
        zoom: u8,
        tile: Tile,
        activity_id: ActivityId,
        time: Timestamp,
        counts_for_achievements: bool,
    ) -> Result<bool> {
        if zoom > MAX_ZOOM {
            return Err(ExplorerError::InvalidZoom(zoom));
        }
        if !tile.is_valid(zoom) {
            return Err(ExplorerError::InvalidTrajectory {
                activity_id,
                index: 0,
                reason: format!("tile {tile} out of range for zoom {zoom}"),
            });
        }

        let visits = self.zoom_mut(zoom)?;
        let info = visits.tiles.entry(tile).or_insert_with(TileInfo::default);
        info.activity_ids.insert(activity_id);

        if !counts_for_achievements {
            return Ok(false);
        }

        let discovered = !info.is_discovered();
        info.record_visit(Visit { time, activity_id });
        if discovered {
            visits.history.push(TileHistoryEntry {
                activity_id,
                time,
                tile,
            });
        }
        Ok(discovered)
    }

    /// Discovery history of one zoom, in order of discovery.
    pub fn discovery_history(&self, zoom: u8) -> &[TileHistoryEntry] {
        self.zoom(zoom).map(|z| z.history.as_slice()).unwrap_or(&[])
    }

    /// Visit metadata of a tile.
    pub fn tile_info(&self, zoom: u8, tile: Tile) -> Option<&TileInfo> {
        self.zoom(zoom)?.tiles.get(&tile)
    }

    /// Tile to activity set mapping of one zoom.
    pub fn tile_activities(&self, zoom: u8) -> HashMap<Tile, &BTreeSet<ActivityId>> {
        self.zoom(zoom)
            .map(|z| {
                z.tiles
                    .iter()
                    .map(|(tile, info)| (*tile, &info.activity_ids))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Tiles discovered by eligible activities at one zoom.
    pub fn discovered_tiles(&self, zoom: u8) -> impl Iterator<Item = Tile> + '_ {
        self.zoom(zoom)
            .into_iter()
            .flat_map(|z| z.tiles.iter())
            .filter(|(_, info)| info.is_discovered())
            .map(|(tile, _)| *tile)
    }

    /// Number of tiles touched at one zoom.
    pub fn tile_count(&self, zoom: u8) -> usize {
        self.zoom(zoom).map(|z| z.tiles.len()).unwrap_or(0)
    }

    /// Every activity id referenced anywhere in the store.
    pub fn referenced_activity_ids(&self) -> BTreeSet<ActivityId> {
        let mut ids = BTreeSet::new();
        for zoom in &self.zooms {
            for info in zoom.tiles.values() {
                ids.extend(info.activity_ids.iter().copied());
                ids.extend(info.first.map(|v| v.activity_id));
                ids.extend(info.last.map(|v| v.activity_id));
            }
        }
        ids
    }

    pub fn is_empty(&self) -> bool {
        self.zooms.iter().all(|z| z.tiles.is_empty())
    }
}
