//! # Explorer Tiles
//!
//! Incremental explorer-tile tracking for recorded GPS activities.
//!
//! This library provides:
//! - Projection of GPS trajectories onto web-map quad-tree tiles, with gap-free
//!   interpolation inside a recording segment
//! - A persisted, per-zoom tile visit store with chronological discovery history
//! - A resumable work ledger so every activity is folded in at most once
//! - Consistency checking against the upstream activity repository
//! - Incremental cluster evolution (connected interior tiles, union-find)
//! - Incremental, greedy square evolution (largest fully visited square)
//!
//! ## Features
//!
//! - **`parallel`** - Compute evolution for several zoom levels on rayon workers
//! - **`cli`** - Build the `explorer-cli` debug tool
//! - **`synthetic`** - Synthetic trajectory generator for benches
//!
//! ## Quick Start
//!
//! ```rust
//! use explorer_tiles::{ActivityMeta, ExplorerConfig, ExplorerEngine, InMemoryRepository,
//!     NoopProgress, TimeSeriesRow};
//!
//! let dir = std::env::temp_dir().join("explorer-tiles-doctest");
//! let mut engine = ExplorerEngine::open(ExplorerConfig::with_cache_dir(&dir)).unwrap();
//!
//! let mut repo = InMemoryRepository::new();
//! repo.insert(
//!     ActivityMeta::new(1, true),
//!     vec![
//!         TimeSeriesRow::from_lat_lon(0, 47.3769, 8.5417, 0),
//!         TimeSeriesRow::from_lat_lon(60, 47.3780, 8.5450, 0),
//!     ],
//! );
//!
//! let report = engine.update(&repo, &NoopProgress).unwrap();
//! assert_eq!(report.processed, 1);
//! assert!(!engine.visits().tile_activities(19).is_empty());
//! # std::fs::remove_dir_all(&dir).ok();
//! ```

use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{ExplorerError, OptionExt, Result};

// Dense union-find used by cluster evolution
pub mod union_find;
pub use union_find::DenseUnionFind;

// Trajectory to tile projection
pub mod projector;
pub use projector::{mercator_tile_float, tiles_from_points, TrajectoryPoint};

// Configuration
pub mod config;
pub use config::ExplorerConfig;

// Upstream activity repository
pub mod repository;
pub use repository::{ActivityRepository, DirectoryRepository, InMemoryRepository};

// Progress reporting
pub mod progress;
pub use progress::{
    AtomicProgressTracker, LogProgress, NoopProgress, Phase, ProgressCallback, ProgressSnapshot,
};

// Cluster and square evolution trackers
pub mod evolution;
pub use evolution::{ClusterMilestone, EvolutionState, SquareMilestone};

// Stateful engine with persistence
pub mod engine;
pub use engine::{
    EngineStats, ExplorerEngine, IngestReport, TileHistoryEntry, TileInfo, TileState,
    TileVisitStore, WorkLedger,
};

// Synthetic trajectories for benchmarking
#[cfg(feature = "synthetic")]
pub mod synthetic;

// ============================================================================
// Core Types
// ============================================================================

/// Identifier of an activity in the upstream repository.
pub type ActivityId = u64;

/// Unix timestamp in seconds.
pub type Timestamp = i64;

/// Finest zoom level tracked.
pub const MAX_ZOOM: u8 = 19;

/// Number of zoom levels tracked (0..=MAX_ZOOM).
pub const ZOOM_LEVELS: usize = MAX_ZOOM as usize + 1;

/// A cell of the web-map quad-tree at an implicit zoom level.
///
/// Valid coordinates at zoom `z` lie in `[0, 2^z)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Tile {
    pub x: u32,
    pub y: u32,
}

impl Tile {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// The covering tile one zoom level coarser.
    pub fn parent(&self) -> Self {
        Self {
            x: self.x / 2,
            y: self.y / 2,
        }
    }

    /// Whether the coordinates are in range for `zoom`.
    pub fn is_valid(&self, zoom: u8) -> bool {
        let extent = 1u64 << zoom;
        (self.x as u64) < extent && (self.y as u64) < extent
    }

    /// The 4-connected neighbors (left, right, up, down).
    ///
    /// Neighbors with a negative coordinate do not exist and are skipped.
    pub fn neighbors(&self) -> impl Iterator<Item = Tile> {
        let Tile { x, y } = *self;
        [
            x.checked_sub(1).map(|x| Tile::new(x, y)),
            x.checked_add(1).map(|x| Tile::new(x, y)),
            y.checked_sub(1).map(|y| Tile::new(x, y)),
            y.checked_add(1).map(|y| Tile::new(x, y)),
        ]
        .into_iter()
        .flatten()
    }
}

impl std::fmt::Display for Tile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A tile entered at a given time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileTouch {
    pub time: Timestamp,
    pub tile: Tile,
}

impl TileTouch {
    /// The same touch moved one level up the quad-tree.
    pub fn parent(&self) -> Self {
        Self {
            time: self.time,
            tile: self.tile.parent(),
        }
    }
}

/// Activity metadata as provided by the repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityMeta {
    pub id: ActivityId,
    /// Start of the activity, used to order ingestion
    #[serde(default)]
    pub start: Option<Timestamp>,
    /// Whether the activity counts toward exploration milestones
    #[serde(default = "default_true")]
    pub achievement_eligible: bool,
    /// Sport kind (e.g. "Ride", "Run")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

fn default_true() -> bool {
    true
}

impl ActivityMeta {
    pub fn new(id: ActivityId, achievement_eligible: bool) -> Self {
        Self {
            id,
            start: None,
            achievement_eligible,
            kind: None,
        }
    }

    pub fn with_start(mut self, start: Timestamp) -> Self {
        self.start = Some(start);
        self
    }
}

/// One row of an activity's enriched time series.
///
/// `x` and `y` are normalized Web-Mercator coordinates in `[0, 1)`; scaled by
/// `2^zoom` they become fractional tile coordinates. When absent they are
/// derived from `latitude`/`longitude`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesRow {
    pub time: Timestamp,
    #[serde(default)]
    pub x: Option<f64>,
    #[serde(default)]
    pub y: Option<f64>,
    #[serde(default)]
    pub segment_id: u32,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

impl TimeSeriesRow {
    /// Row with precomputed normalized Mercator coordinates.
    pub fn from_xy(time: Timestamp, x: f64, y: f64, segment_id: u32) -> Self {
        Self {
            time,
            x: Some(x),
            y: Some(y),
            segment_id,
            latitude: None,
            longitude: None,
        }
    }

    /// Row carrying only a geographic position.
    pub fn from_lat_lon(time: Timestamp, latitude: f64, longitude: f64, segment_id: u32) -> Self {
        Self {
            time,
            x: None,
            y: None,
            segment_id,
            latitude: Some(latitude),
            longitude: Some(longitude),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parent_is_integer_halving() {
        assert_eq!(Tile::new(5, 8).parent(), Tile::new(2, 4));
        assert_eq!(Tile::new(0, 1).parent(), Tile::new(0, 0));
    }

    #[test]
    fn test_neighbors_skip_negative() {
        let n: Vec<Tile> = Tile::new(0, 0).neighbors().collect();
        assert_eq!(n, vec![Tile::new(1, 0), Tile::new(0, 1)]);
        assert_eq!(Tile::new(3, 3).neighbors().count(), 4);
    }

    #[test]
    fn test_tile_range() {
        assert!(Tile::new(0, 0).is_valid(0));
        assert!(!Tile::new(1, 0).is_valid(0));
        assert!(Tile::new((1 << 19) - 1, 0).is_valid(19));
        assert!(!Tile::new(1 << 19, 0).is_valid(19));
    }
}
