//! Upstream activity repository.
//!
//! The tracker only needs three things from the outside world: the universe
//! of activity ids, per-activity metadata and per-activity time series.
//! - `InMemoryRepository` holds everything in maps (tests, embedding callers)
//! - `DirectoryRepository` reads JSON files and memoizes time series in an
//!   explicit bounded LRU cache

use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::ErrorKind;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use log::{debug, error};
use lru::LruCache;

use crate::error::{ExplorerError, OptionExt, Result};
use crate::{ActivityId, ActivityMeta, TimeSeriesRow};

/// Source of activities consumed by the ingest loop.
pub trait ActivityRepository {
    /// All activity ids currently present.
    fn activity_ids(&self) -> HashSet<ActivityId>;

    /// Metadata for one activity.
    fn activity(&self, id: ActivityId) -> Option<ActivityMeta>;

    /// Ordered time series for one activity.
    fn time_series(&self, id: ActivityId) -> Result<Arc<Vec<TimeSeriesRow>>>;
}

// ============================================================================
// In-memory repository
// ============================================================================

/// Repository backed by in-memory maps.
#[derive(Debug, Default, Clone)]
pub struct InMemoryRepository {
    meta: HashMap<ActivityId, ActivityMeta>,
    series: HashMap<ActivityId, Arc<Vec<TimeSeriesRow>>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an activity.
    pub fn insert(&mut self, meta: ActivityMeta, rows: Vec<TimeSeriesRow>) {
        self.series.insert(meta.id, Arc::new(rows));
        self.meta.insert(meta.id, meta);
    }

    /// Remove an activity. Returns whether it existed.
    pub fn remove(&mut self, id: ActivityId) -> bool {
        self.series.remove(&id);
        self.meta.remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.meta.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meta.is_empty()
    }
}

impl ActivityRepository for InMemoryRepository {
    fn activity_ids(&self) -> HashSet<ActivityId> {
        self.meta.keys().copied().collect()
    }

    fn activity(&self, id: ActivityId) -> Option<ActivityMeta> {
        self.meta.get(&id).cloned()
    }

    fn time_series(&self, id: ActivityId) -> Result<Arc<Vec<TimeSeriesRow>>> {
        self.series.get(&id).cloned().ok_or_missing_activity(id)
    }
}

// ============================================================================
// Directory repository
// ============================================================================

/// Repository reading a directory of JSON files.
///
/// Layout:
/// - `activities.json` - array of [`ActivityMeta`]
/// - `time_series/<id>.json` - array of [`TimeSeriesRow`]
pub struct DirectoryRepository {
    root: PathBuf,
    meta: HashMap<ActivityId, ActivityMeta>,
    cache: Mutex<LruCache<ActivityId, Arc<Vec<TimeSeriesRow>>>>,
}

impl DirectoryRepository {
    /// Open a repository directory, loading all metadata eagerly.
    pub fn open(root: impl Into<PathBuf>, cache_size: usize) -> Result<Self> {
        let capacity = NonZeroUsize::new(cache_size).ok_or_else(|| {
            ExplorerError::Config("time series cache size must be at least 1".to_string())
        })?;
        let mut repo = Self {
            root: root.into(),
            meta: HashMap::new(),
            cache: Mutex::new(LruCache::new(capacity)),
        };
        repo.reload()?;
        Ok(repo)
    }

    /// Re-read `activities.json` and drop cached time series.
    pub fn reload(&mut self) -> Result<()> {
        let path = self.root.join("activities.json");
        let content = fs::read_to_string(&path).map_err(|e| ExplorerError::io(&path, e))?;
        let activities: Vec<ActivityMeta> = serde_json::from_str(&content)?;
        self.meta = activities.into_iter().map(|a| (a.id, a)).collect();
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        debug!(
            "[Repository] Loaded {} activities from {}",
            self.meta.len(),
            self.root.display()
        );
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn time_series_path(&self, id: ActivityId) -> PathBuf {
        self.root.join("time_series").join(format!("{id}.json"))
    }

    /// Read a time series file, deleting it if it is unusable.
    fn read_time_series(&self, id: ActivityId) -> Result<Vec<TimeSeriesRow>> {
        let path = self.time_series_path(id);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ExplorerError::TimeSeries {
                    activity_id: id,
                    reason: format!("{} does not exist", path.display()),
                });
            }
            Err(e) => {
                discard_cache_file(&path);
                return Err(ExplorerError::TimeSeries {
                    activity_id: id,
                    reason: e.to_string(),
                });
            }
        };

        serde_json::from_slice(&bytes).map_err(|e| {
            discard_cache_file(&path);
            ExplorerError::TimeSeries {
                activity_id: id,
                reason: e.to_string(),
            }
        })
    }
}

fn discard_cache_file(path: &Path) {
    error!(
        "[Repository] Error while reading {}, deleting cache file",
        path.display()
    );
    if let Err(e) = fs::remove_file(path) {
        if e.kind() != ErrorKind::NotFound {
            error!("[Repository] Could not delete {}: {}", path.display(), e);
        }
    }
}

impl ActivityRepository for DirectoryRepository {
    fn activity_ids(&self) -> HashSet<ActivityId> {
        self.meta.keys().copied().collect()
    }

    fn activity(&self, id: ActivityId) -> Option<ActivityMeta> {
        self.meta.get(&id).cloned()
    }

    fn time_series(&self, id: ActivityId) -> Result<Arc<Vec<TimeSeriesRow>>> {
        if let Some(rows) = self
            .cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
        {
            return Ok(Arc::clone(rows));
        }

        let rows = Arc::new(self.read_time_series(id)?);
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .put(id, Arc::clone(&rows));
        Ok(rows)
    }
}
