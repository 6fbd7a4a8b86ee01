//! Square evolution.
//!
//! Tracks the largest axis-aligned square of visited tiles greedily: each
//! newly discovered tile may grow the record by exactly one, and only by a
//! square that contains that tile. Earlier tiles are never re-examined, so
//! the cost per tile is O(record size^2) block probes.

use std::collections::HashSet;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::engine::TileHistoryEntry;
use crate::{Tile, Timestamp};

/// A new record square.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SquareMilestone {
    pub time: Timestamp,
    pub size: u32,
    /// Top-left corner
    pub x: u32,
    pub y: u32,
}

/// Incremental square tracker for one zoom level.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SquareEvolution {
    visited: HashSet<Tile>,
    max_size: u32,
    corner: Option<Tile>,
    timeline: Vec<SquareMilestone>,
    cursor: usize,
}

impl SquareEvolution {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process `history[cursor..]` and move the cursor to the end.
    ///
    /// Returns the number of milestones appended.
    pub fn advance(&mut self, history: &[TileHistoryEntry]) -> usize {
        if self.cursor > history.len() {
            warn!(
                "[Evolution] Square cursor {} beyond history length {}, recomputing",
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
    pub fn discover(&mut self, tile: Tile, time: Timestamp) -> Option<SquareMilestone> {
        self.visited.insert(tile);

        let size = self.max_size + 1;
        for dx in 0..size {
            for dy in 0..size {
                let (Some(x), Some(y)) = (tile.x.checked_sub(dx), tile.y.checked_sub(dy)) else {
                    continue;
                };
                if self.block_visited(x, y, size) {
                    self.max_size = size;
                    self.corner = Some(Tile::new(x, y));
                    let milestone = SquareMilestone { time, size, x, y };
                    self.timeline.push(milestone);
                    return Some(milestone);
                }
            }
        }
        None
    }

    fn block_visited(&self, x: u32, y: u32, size: u32) -> bool {
        (0..size).all(|xx| {
            (0..size).all(|yy| {
                match (x.checked_add(xx), y.checked_add(yy)) {
                    (Some(bx), Some(by)) => self.visited.contains(&Tile::new(bx, by)),
                    _ => false,
                }
            })
        })
    }

    /// Milestones in order of occurrence.
    pub fn timeline(&self) -> &[SquareMilestone] {
        &self.timeline
    }

    /// Current record size (0 before the first tile).
    pub fn max_size(&self) -> u32 {
        self.max_size
    }

    /// Top-left corner of the current record square.
    pub fn corner(&self) -> Option<Tile> {
        self.corner
    }

    /// Number of history entries already processed.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_visited(&self, tile: Tile) -> bool {
        self.visited.contains(&tile)
    }
}
