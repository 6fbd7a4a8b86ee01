//! Progress reporting for ingest and evolution passes.
//!
//! The engine announces each phase with its item count, then ticks once per
//! item. Under the `parallel` feature evolution ticks arrive from rayon
//! workers.

use std::fmt;
use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};

use log::info;

/// Phases of an update, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Referenced activity ids against the repository
    ConsistencyCheck,
    /// Unprocessed activities into the tile visit store
    TileVisits,
    /// New discovery history into the cluster trackers
    ClusterEvolution,
    /// New discovery history into the square trackers
    SquareEvolution,
}

impl Phase {
    pub const ALL: [Phase; 4] = [
        Phase::ConsistencyCheck,
        Phase::TileVisits,
        Phase::ClusterEvolution,
        Phase::SquareEvolution,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::ConsistencyCheck => "consistency_check",
            Phase::TileVisits => "tile_visits",
            Phase::ClusterEvolution => "cluster_evolution",
            Phase::SquareEvolution => "square_evolution",
        }
    }

    fn from_index(index: u8) -> Option<Phase> {
        Phase::ALL.get(index as usize).copied()
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receiver of progress updates.
pub trait ProgressCallback: Send + Sync {
    /// A new phase starts with `total` items.
    fn on_phase(&self, phase: Phase, total: u32);
    /// One item of the current phase is done.
    fn on_progress(&self);
}

/// Discards all updates.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

impl ProgressCallback for NoopProgress {
    fn on_phase(&self, _phase: Phase, _total: u32) {}
    fn on_progress(&self) {}
}

/// Logs non-empty phases at `info` level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl ProgressCallback for LogProgress {
    fn on_phase(&self, phase: Phase, total: u32) {
        if total > 0 {
            info!("[Progress] {}: {} items", phase, total);
        }
    }

    fn on_progress(&self) {}
}

/// Point-in-time view of an [`AtomicProgressTracker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSnapshot {
    /// `None` before the first phase starts
    pub phase: Option<Phase>,
    pub completed: u32,
    pub total: u32,
}

impl ProgressSnapshot {
    /// Completed share of the current phase; an empty phase counts as done.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            f64::from(self.completed.min(self.total)) / f64::from(self.total)
        }
    }
}

const IDLE: u8 = u8::MAX;

/// Lock-free tracker that another thread can poll with [`snapshot`].
///
/// [`snapshot`]: AtomicProgressTracker::snapshot
#[derive(Debug)]
pub struct AtomicProgressTracker {
    phase: AtomicU8,
    completed: AtomicU32,
    total: AtomicU32,
}

impl Default for AtomicProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl AtomicProgressTracker {
    pub fn new() -> Self {
        Self {
            phase: AtomicU8::new(IDLE),
            completed: AtomicU32::new(0),
            total: AtomicU32::new(0),
        }
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            phase: Phase::from_index(self.phase.load(Ordering::Acquire)),
            completed: self.completed.load(Ordering::Acquire),
            total: self.total.load(Ordering::Acquire),
        }
    }
}

impl ProgressCallback for AtomicProgressTracker {
    fn on_phase(&self, phase: Phase, total: u32) {
        self.completed.store(0, Ordering::Release);
        self.total.store(total, Ordering::Release);
        self.phase.store(phase as u8, Ordering::Release);
    }

    fn on_progress(&self) {
        self.completed.fetch_add(1, Ordering::AcqRel);
    }
}
