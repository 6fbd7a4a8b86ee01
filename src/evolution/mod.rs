//! # Explorer Evolution
//!
//! Incremental milestone tracking over the tile discovery history of one
//! zoom level:
//! - `ClusterEvolution` - union-find over fully enclosed tiles, recording when
//!   the largest connected cluster grows
//! - `SquareEvolution` - greedy tracking of the largest fully visited square
//!
//! Both trackers consume the append-only discovery history from their own
//! persisted cursor, so each pass only touches newly discovered tiles.

pub mod cluster;
pub mod square;

pub use cluster::{ClusterEvolution, ClusterMilestone};
pub use square::{SquareEvolution, SquareMilestone};

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::engine::TileHistoryEntry;
use crate::Tile;

/// Evolution state of one zoom level.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvolutionState {
    pub clusters: ClusterEvolution,
    pub squares: SquareEvolution,
}

impl EvolutionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold every history entry neither tracker has seen yet.
    ///
    /// Returns the number of new (cluster, square) milestones.
    pub fn advance(&mut self, history: &[TileHistoryEntry]) -> (usize, usize) {
        (self.clusters.advance(history), self.squares.advance(history))
    }
}

/// Dense id assignment for tiles, in order of first sight.
///
/// Serialized as the plain tile list; the reverse index is rebuilt on load.
#[derive(Debug, Clone, Default)]
pub(crate) struct TileArena {
    tiles: Vec<Tile>,
    index: HashMap<Tile, u32>,
}

impl TileArena {
    pub(crate) fn get(&self, tile: Tile) -> Option<u32> {
        self.index.get(&tile).copied()
    }

    /// Assign the next id to a tile not yet in the arena.
    pub(crate) fn insert(&mut self, tile: Tile) -> u32 {
        let id = self.tiles.len() as u32;
        self.tiles.push(tile);
        self.index.insert(tile, id);
        id
    }

    pub(crate) fn tile(&self, id: u32) -> Tile {
        self.tiles[id as usize]
    }

    pub(crate) fn len(&self) -> usize {
        self.tiles.len()
    }
}

impl From<Vec<Tile>> for TileArena {
    fn from(tiles: Vec<Tile>) -> Self {
        let index = tiles
            .iter()
            .enumerate()
            .map(|(id, tile)| (*tile, id as u32))
            .collect();
        Self { tiles, index }
    }
}

impl Serialize for TileArena {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.tiles.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for TileArena {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<Tile>::deserialize(deserializer).map(TileArena::from)
    }
}
