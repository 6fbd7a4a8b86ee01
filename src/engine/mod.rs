//! # Explorer Engine
//!
//! Stateful orchestrator for tile visits and their evolution.
//!
//! ## Architecture
//!
//! The engine is composed of focused modules:
//! - `TileVisitStore` - Per-zoom tile visits and discovery history
//! - `WorkLedger` - Resumable record of processed activities
//! - `consistency` - Detection of deleted upstream activities
//! - `persistence` - Versioned, atomically written state
//!
//! One ingest pass owns all mutable state. Activities are processed one at a
//! time; a failing activity is reported and skipped without touching the
//! store, and the smallest resumable unit is one activity.

pub mod consistency;
pub mod persistence;
pub mod visit_store;
pub mod work_ledger;

pub use consistency::find_deleted_activities;
pub use persistence::{load_state, save_state, TileState, TILE_STATE_VERSION};
pub use visit_store::{TileHistoryEntry, TileInfo, TileVisitStore, Visit};
pub use work_ledger::WorkLedger;

use log::{debug, info, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::error::{OptionExt, Result};
use crate::evolution::{ClusterMilestone, EvolutionState, SquareMilestone};
use crate::progress::{Phase, ProgressCallback};
use crate::projector::{collapse_runs, project_points, rollup, tiles_from_points};
use crate::repository::ActivityRepository;
use crate::{ActivityId, ExplorerConfig, Tile, Timestamp, MAX_ZOOM};

/// Outcome of one ingest pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Activities folded into the store in this pass
    pub processed: usize,
    /// Tiles discovered across all zoom levels
    pub discovered_tiles: usize,
    /// Activities that failed and will be retried on a later pass
    pub failed: Vec<(ActivityId, String)>,
    /// Referenced activities missing upstream (non-empty means a rebuild happened)
    pub deleted_activities: Vec<ActivityId>,
}

impl IngestReport {
    pub fn rebuilt(&self) -> bool {
        !self.deleted_activities.is_empty()
    }
}

/// Summary statistics of the engine state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineStats {
    pub processed_activities: usize,
    pub referenced_activities: usize,
    /// Tiles touched at the finest zoom
    pub touched_tiles: usize,
    /// Tiles discovered at the finest zoom
    pub discovered_tiles: usize,
    pub tracked_zooms: Vec<u8>,
}

/// Explorer tile engine with persistence.
pub struct ExplorerEngine {
    config: ExplorerConfig,
    state: TileState,
    ledger: WorkLedger,
}

impl ExplorerEngine {
    /// Open the engine, loading persisted state and ledger.
    ///
    /// The saved state decides which activities are done: ledger entries
    /// written after the last save are dropped, and absent or incompatible
    /// state resets the ledger so every activity is processed again.
    pub fn open(config: ExplorerConfig) -> Result<Self> {
        config.validate()?;
        let mut ledger = WorkLedger::open(&config.ledger_path)?;
        let state = match load_state(&config.state_path)? {
            Some(state) => {
                ledger.reconcile(&state.processed)?;
                state
            }
            None => {
                if !ledger.is_empty() {
                    info!(
                        "[Ingest] No usable tile state, forgetting {} processed activities",
                        ledger.len()
                    );
                }
                ledger.reset()?;
                TileState::new()
            }
        };
        Ok(Self {
            config,
            state,
            ledger,
        })
    }

    // ========================================================================
    // Ingestion
    // ========================================================================

    /// Fold every unprocessed activity of `repo` into the tile visit store.
    ///
    /// Runs the consistency check first; any referenced activity missing
    /// upstream discards the store and ledger and ingestion restarts from
    /// empty. The state is saved when the pass completes.
    pub fn ingest(
        &mut self,
        repo: &dyn ActivityRepository,
        progress: &dyn ProgressCallback,
    ) -> Result<IngestReport> {
        let mut report = IngestReport::default();

        progress.on_phase(Phase::ConsistencyCheck, 1);
        let present = repo.activity_ids();
        let deleted = find_deleted_activities(&self.state.visits, &present);
        if !deleted.is_empty() {
            warn!(
                "[Consistency] Activities {:?} have been deleted, recomputing explorer tiles",
                deleted
            );
            self.state = TileState::new();
            self.ledger.reset()?;
            report.deleted_activities = deleted.into_iter().collect();
        }
        progress.on_progress();

        let mut pending: Vec<(Option<Timestamp>, ActivityId)> = self
            .ledger
            .unprocessed(present)
            .into_iter()
            .map(|id| (repo.activity(id).and_then(|meta| meta.start), id))
            .collect();
        pending.sort_unstable();

        info!("[Ingest] Processing {} new activities", pending.len());
        progress.on_phase(Phase::TileVisits, pending.len() as u32);

        for (_, id) in pending {
            match self.process_activity(repo, id) {
                Ok(discovered) => {
                    self.state.processed.insert(id);
                    self.ledger.mark_done(id)?;
                    report.processed += 1;
                    report.discovered_tiles += discovered;
                }
                Err(e) if e.is_activity_local() => {
                    warn!("[Ingest] Skipping activity {}: {}", id, e);
                    report.failed.push((id, e.to_string()));
                }
                Err(e) => {
                    // Keep the activities finished so far.
                    if let Err(save_err) = self.save() {
                        warn!("[Ingest] Could not save partial progress: {}", save_err);
                    }
                    return Err(e);
                }
            }
            progress.on_progress();
        }

        self.save()?;
        info!(
            "[Ingest] Processed {} activities, {} new tiles, {} failed",
            report.processed,
            report.discovered_tiles,
            report.failed.len()
        );
        Ok(report)
    }

    /// Project one activity and record its touches at every zoom.
    ///
    /// Reads and trajectory validation happen before the store is mutated.
    /// Projected tiles are clamped to each zoom's range, so `record_touch`
    /// cannot fail once recording has started.
    fn process_activity(&mut self, repo: &dyn ActivityRepository, id: ActivityId) -> Result<usize> {
        let meta = repo.activity(id).ok_or_missing_activity(id)?;
        let rows = repo.time_series(id)?;
        let points = project_points(id, &rows)?;

        let mut touches = collapse_runs(tiles_from_points(&points, MAX_ZOOM));
        let mut discovered = 0;
        for zoom in (0..=MAX_ZOOM).rev() {
            for touch in &touches {
                if self.state.visits.record_touch(
                    zoom,
                    touch.tile,
                    id,
                    touch.time,
                    meta.achievement_eligible,
                )? {
                    discovered += 1;
                }
            }
            touches = rollup(&touches);
        }

        debug!(
            "[Ingest] Activity {}: {} points, {} new tiles",
            id,
            points.len(),
            discovered
        );
        Ok(discovered)
    }

    // ========================================================================
    // Evolution
    // ========================================================================

    /// Advance cluster and square evolution for every configured zoom.
    ///
    /// Only discovery history appended since the last call is processed.
    /// Returns the number of new (cluster, square) milestones.
    pub fn compute_evolution(&mut self, progress: &dyn ProgressCallback) -> (usize, usize) {
        for &zoom in &self.config.zoom_levels {
            self.state.evolution_or_insert(zoom);
        }

        let TileState {
            visits, evolution, ..
        } = &mut self.state;
        let visits: &TileVisitStore = visits;
        let zooms = &self.config.zoom_levels;
        let mut work: Vec<(u8, &mut EvolutionState)> = evolution
            .iter_mut()
            .filter(|(zoom, _)| zooms.contains(zoom))
            .map(|(zoom, state)| (*zoom, state))
            .collect();

        progress.on_phase(Phase::ClusterEvolution, work.len() as u32);
        let clusters: usize = for_each_zoom(&mut work, |zoom, state| {
            let added = state.clusters.advance(visits.discovery_history(zoom));
            progress.on_progress();
            added
        });

        progress.on_phase(Phase::SquareEvolution, work.len() as u32);
        let squares: usize = for_each_zoom(&mut work, |zoom, state| {
            let added = state.squares.advance(visits.discovery_history(zoom));
            progress.on_progress();
            added
        });

        info!(
            "[Evolution] {} new cluster milestones, {} new square milestones",
            clusters, squares
        );
        (clusters, squares)
    }

    /// Ingest, advance evolution and save.
    pub fn update(
        &mut self,
        repo: &dyn ActivityRepository,
        progress: &dyn ProgressCallback,
    ) -> Result<IngestReport> {
        let report = self.ingest(repo, progress)?;
        self.compute_evolution(progress);
        self.save()?;
        Ok(report)
    }

    /// Persist state and compact the ledger.
    pub fn save(&mut self) -> Result<()> {
        save_state(&self.config.state_path, &self.state)?;
        self.ledger.compact()
    }

    /// Discard all state and start from empty.
    pub fn reset(&mut self) -> Result<()> {
        self.state = TileState::new();
        self.ledger.reset()?;
        save_state(&self.config.state_path, &self.state)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn config(&self) -> &ExplorerConfig {
        &self.config
    }

    pub fn state(&self) -> &TileState {
        &self.state
    }

    pub fn visits(&self) -> &TileVisitStore {
        &self.state.visits
    }

    pub fn ledger(&self) -> &WorkLedger {
        &self.ledger
    }

    pub fn evolution(&self, zoom: u8) -> Option<&EvolutionState> {
        self.state.evolution.get(&zoom)
    }

    /// Cluster milestones of a zoom (empty if not tracked).
    pub fn cluster_timeline(&self, zoom: u8) -> &[ClusterMilestone] {
        self.evolution(zoom)
            .map(|e| e.clusters.timeline())
            .unwrap_or(&[])
    }

    /// Square milestones of a zoom (empty if not tracked).
    pub fn square_timeline(&self, zoom: u8) -> &[SquareMilestone] {
        self.evolution(zoom)
            .map(|e| e.squares.timeline())
            .unwrap_or(&[])
    }

    /// Live clusters of a zoom: representative tile to members.
    pub fn clusters(&self, zoom: u8) -> std::collections::HashMap<Tile, Vec<Tile>> {
        self.evolution(zoom)
            .map(|e| e.clusters.clusters())
            .unwrap_or_default()
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            processed_activities: self.state.processed.len(),
            referenced_activities: self.state.visits.referenced_activity_ids().len(),
            touched_tiles: self.state.visits.tile_count(MAX_ZOOM),
            discovered_tiles: self.state.visits.discovery_history(MAX_ZOOM).len(),
            tracked_zooms: self.state.evolution.keys().copied().collect(),
        }
    }
}

/// Run `f` for every zoom's state and sum the results.
///
/// Each zoom's state is owned by exactly one worker.
#[cfg(feature = "parallel")]
fn for_each_zoom<F>(work: &mut [(u8, &mut EvolutionState)], f: F) -> usize
where
    F: Fn(u8, &mut EvolutionState) -> usize + Sync + Send,
{
    work.par_iter_mut()
        .map(|(zoom, state)| f(*zoom, &mut **state))
        .sum()
}

#[cfg(not(feature = "parallel"))]
fn for_each_zoom<F>(work: &mut [(u8, &mut EvolutionState)], f: F) -> usize
where
    F: Fn(u8, &mut EvolutionState) -> usize,
{
    work.iter_mut()
        .map(|(zoom, state)| f(*zoom, &mut **state))
        .sum()
}
