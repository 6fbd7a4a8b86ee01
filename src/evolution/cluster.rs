//! Cluster evolution.
//!
//! A discovered tile becomes a cluster tile once all four of its 4-connected
//! neighbors are discovered too. Adjacent cluster tiles are joined in a
//! union-find forest, and every time a merge pushes the largest cluster past
//! the previous record a milestone is appended.

use std::collections::HashMap;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::TileArena;
use crate::engine::TileHistoryEntry;
use crate::union_find::DenseUnionFind;
use crate::{Tile, Timestamp};

/// A new record for the largest cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterMilestone {
    pub time: Timestamp,
    pub max_cluster_size: u32,
}

/// Incremental cluster tracker for one zoom level.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterEvolution {
    /// Every discovered tile, densely numbered
    arena: TileArena,
    /// Discovered 4-connected neighbors per arena id
    num_neighbors: Vec<u8>,
    /// Whether the arena id is a cluster tile
    is_member: Vec<bool>,
    /// Cluster forest over arena ids; only member ids are ever united
    forest: DenseUnionFind,
    /// Size of the largest live cluster
    largest: u32,
    timeline: Vec<ClusterMilestone>,
    /// Number of history entries already folded in
    cursor: usize,
}

impl ClusterEvolution {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process `history[cursor..]` and move the cursor to the end.
    ///
    /// Returns the number of milestones appended.
    pub fn advance(&mut self, history: &[TileHistoryEntry]) -> usize {
        if self.cursor > history.len() {
            warn!(
                "[Evolution] Cluster cursor {} beyond history length {}, recomputing",
                self.cursor,
                history.len()
            );
            *self = Self::default();
        }

        let before = self.timeline.len();
        for entry in &history[self.cursor..] {
            self.discover(entry.tile, entry.time);
            self.cursor += 1;
        }
        self.timeline.len() - before
    }

    /// Fold one newly discovered tile.
    pub fn discover(&mut self, tile: Tile, time: Timestamp) -> Option<ClusterMilestone> {
        if self.arena.get(tile).is_some() {
            debug!("[Evolution] Tile {tile} discovered twice, ignoring");
            return None;
        }

        let id = self.arena.insert(tile);
        self.num_neighbors.push(0);
        self.is_member.push(false);
        self.forest.make_set();

        let mut candidates = vec![id];
        for other in tile.neighbors() {
            if let Some(other_id) = self.arena.get(other) {
                self.num_neighbors[id as usize] += 1;
                self.num_neighbors[other_id as usize] += 1;
                candidates.push(other_id);
            }
        }

        for &candidate in &candidates {
            if self.num_neighbors[candidate as usize] == 4 && !self.is_member[candidate as usize] {
                self.is_member[candidate as usize] = true;
                self.largest = self.largest.max(1);
            }
        }

        let mut merged = false;
        for &candidate in &candidates {
            if !self.is_member[candidate as usize] {
                continue;
            }
            for other in self.arena.tile(candidate).neighbors() {
                let Some(other_id) = self.arena.get(other) else {
                    continue;
                };
                if !self.is_member[other_id as usize] {
                    continue;
                }
                if let Some(root) = self.forest.union(candidate, other_id) {
                    merged = true;
                    self.largest = self.largest.max(self.forest.set_size(root));
                }
            }
        }

        if merged && self.largest > self.max_recorded() {
            let milestone = ClusterMilestone {
                time,
                max_cluster_size: self.largest,
            };
            self.timeline.push(milestone);
            return Some(milestone);
        }
        None
    }

    fn max_recorded(&self) -> u32 {
        self.timeline
            .last()
            .map(|m| m.max_cluster_size)
            .unwrap_or(0)
    }

    /// Milestones in order of occurrence.
    pub fn timeline(&self) -> &[ClusterMilestone] {
        &self.timeline
    }

    /// Number of history entries already processed.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Number of discovered tiles seen by this tracker.
    pub fn discovered_count(&self) -> usize {
        self.arena.len()
    }

    /// Size of the largest live cluster (including singletons).
    pub fn largest_cluster_size(&self) -> u32 {
        self.largest
    }

    /// Discovered 4-connected neighbors of a tile, `None` if undiscovered.
    pub fn num_neighbors(&self, tile: Tile) -> Option<u8> {
        self.arena
            .get(tile)
            .map(|id| self.num_neighbors[id as usize])
    }

    /// Representative tile of the cluster containing `tile`.
    pub fn cluster_of(&self, tile: Tile) -> Option<Tile> {
        let id = self.arena.get(tile)?;
        if !self.is_member[id as usize] {
            return None;
        }
        Some(self.arena.tile(self.forest.root(id)))
    }

    /// Size of the cluster containing `tile`.
    pub fn cluster_size(&self, tile: Tile) -> Option<u32> {
        let id = self.arena.get(tile)?;
        if !self.is_member[id as usize] {
            return None;
        }
        Some(self.forest.set_size(id))
    }

    /// All live clusters: representative tile to sorted member tiles.
    pub fn clusters(&self) -> HashMap<Tile, Vec<Tile>> {
        let members = (0..self.arena.len() as u32).filter(|&id| self.is_member[id as usize]);
        self.forest
            .groups_of(members)
            .into_iter()
            .map(|(root, ids)| {
                let mut tiles: Vec<Tile> = ids.into_iter().map(|id| self.arena.tile(id)).collect();
                tiles.sort_unstable();
                (self.arena.tile(root), tiles)
            })
            .collect()
    }
}
