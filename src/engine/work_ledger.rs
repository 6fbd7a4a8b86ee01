//! Work ledger of fully processed activities.
//!
//! The ledger is a text file with one activity id per line. Marking an
//! activity done appends a line immediately, so an interrupted run repeats at
//! most the activity that was in flight. `compact` and `reset` rewrite the
//! file atomically.

use std::collections::{BTreeSet, HashSet};
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use log::warn;

use crate::error::{ExplorerError, Result};
use crate::ActivityId;

use super::persistence::write_atomic;

/// Persistent set of processed activity ids.
#[derive(Debug)]
pub struct WorkLedger {
    path: PathBuf,
    done: HashSet<ActivityId>,
    file: File,
}

impl WorkLedger {
    /// Open the ledger at `path`, creating it if necessary.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let (done, torn) = read_ids(&path)?;
        let file = open_append(&path)?;
        let mut ledger = Self { path, done, file };
        if torn {
            ledger.compact()?;
        }
        Ok(ledger)
    }

    /// Candidates that have not been processed yet, in ascending order.
    pub fn unprocessed(&self, candidates: impl IntoIterator<Item = ActivityId>) -> Vec<ActivityId> {
        let mut ids: Vec<ActivityId> = candidates
            .into_iter()
            .filter(|id| !self.done.contains(id))
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    pub fn is_done(&self, id: ActivityId) -> bool {
        self.done.contains(&id)
    }

    /// Record an activity as fully processed and persist it immediately.
    pub fn mark_done(&mut self, id: ActivityId) -> Result<()> {
        if !self.done.insert(id) {
            return Ok(());
        }
        writeln!(self.file, "{id}")
            .and_then(|_| self.file.flush())
            .map_err(|e| ExplorerError::io(&self.path, e))
    }

    /// Make the ledger agree with the ids recorded in the saved state.
    ///
    /// Ids marked after the last state save are dropped so those activities
    /// are processed again. Returns the number of dropped ids.
    pub fn reconcile(&mut self, processed: &BTreeSet<ActivityId>) -> Result<usize> {
        let before = self.done.len();
        self.done.retain(|id| processed.contains(id));
        let dropped = before - self.done.len();
        let missing = processed.len() - self.done.len();
        if dropped == 0 && missing == 0 {
            return Ok(0);
        }
        if dropped > 0 {
            warn!(
                "[Ledger] {} processed activities are missing from the saved state, redoing them",
                dropped
            );
        }
        self.done.extend(processed.iter().copied());
        self.rewrite()?;
        Ok(dropped)
    }

    /// Forget every processed activity.
    pub fn reset(&mut self) -> Result<()> {
        self.done.clear();
        self.rewrite()
    }

    /// Rewrite the file with one sorted line per id.
    pub fn compact(&mut self) -> Result<()> {
        self.rewrite()
    }

    fn rewrite(&mut self) -> Result<()> {
        let mut ids: Vec<ActivityId> = self.done.iter().copied().collect();
        ids.sort_unstable();
        write_atomic(&self.path, |writer| {
            for id in &ids {
                writeln!(writer, "{id}").map_err(|e| ExplorerError::io(&self.path, e))?;
            }
            Ok(())
        })?;
        self.file = open_append(&self.path)?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.done.len()
    }

    pub fn is_empty(&self) -> bool {
        self.done.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Read the ids of a ledger file; the flag reports a torn last line.
fn read_ids(path: &Path) -> Result<(HashSet<ActivityId>, bool)> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok((HashSet::new(), false)),
        Err(e) => return Err(ExplorerError::io(path, e)),
    };

    let mut ids = HashSet::new();
    let mut torn = false;
    for (line_no, line) in content.split_inclusive('\n').enumerate() {
        // An unterminated last line is a torn append; that activity is redone.
        if !line.ends_with('\n') {
            warn!(
                "[Ledger] Ignoring incomplete line {} in {}",
                line_no + 1,
                path.display()
            );
            torn = true;
            continue;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match line.parse::<ActivityId>() {
            Ok(id) => {
                ids.insert(id);
            }
            Err(_) => warn!(
                "[Ledger] Skipping malformed line {} in {}: {:?}",
                line_no + 1,
                path.display(),
                line
            ),
        }
    }
    Ok((ids, torn))
}

fn open_append(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| ExplorerError::io(parent, e))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| ExplorerError::io(path, e))
}
