//! Unified error handling for explorer tile tracking.
//!
//! All fallible operations in the crate return [`Result<T>`]. Failures that
//! only concern a single activity (bad trajectory, unreadable time series) are
//! reported through the same type so the ingest loop can isolate them.

use std::path::PathBuf;

use thiserror::Error;

use crate::ActivityId;

/// Errors produced by the tile tracker and its collaborators.
#[derive(Debug, Error)]
pub enum ExplorerError {
    /// Reading or writing a file failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// State or ledger content could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A trajectory point violates the projector's input contract.
    #[error("activity {activity_id}: invalid trajectory point {index}: {reason}")]
    InvalidTrajectory {
        activity_id: ActivityId,
        index: usize,
        reason: String,
    },

    /// The repository does not know the activity.
    #[error("activity {0} not found in repository")]
    MissingActivity(ActivityId),

    /// The cached time series for an activity is unusable and was discarded.
    #[error("time series for activity {activity_id} unreadable: {reason}")]
    TimeSeries {
        activity_id: ActivityId,
        reason: String,
    },

    /// Zoom outside 0..=19.
    #[error("zoom level {0} is out of range (0..=19)")]
    InvalidZoom(u8),

    /// Invalid configuration value.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, ExplorerError>;

impl ExplorerError {
    /// Wrap an [`std::io::Error`] together with the path it concerns.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ExplorerError::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether the error only affects one activity and the pass may continue.
    pub fn is_activity_local(&self) -> bool {
        matches!(
            self,
            ExplorerError::InvalidTrajectory { .. }
                | ExplorerError::MissingActivity(_)
                | ExplorerError::TimeSeries { .. }
        )
    }
}

/// Conversions from `Option` into typed errors.
pub trait OptionExt<T> {
    /// Turn `None` into [`ExplorerError::MissingActivity`].
    fn ok_or_missing_activity(self, activity_id: ActivityId) -> Result<T>;

    /// Turn `None` into [`ExplorerError::InvalidTrajectory`].
    fn ok_or_invalid_point(self, activity_id: ActivityId, index: usize, reason: &str)
        -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_missing_activity(self, activity_id: ActivityId) -> Result<T> {
        self.ok_or(ExplorerError::MissingActivity(activity_id))
    }

    fn ok_or_invalid_point(
        self,
        activity_id: ActivityId,
        index: usize,
        reason: &str,
    ) -> Result<T> {
        self.ok_or_else(|| ExplorerError::InvalidTrajectory {
            activity_id,
            index,
            reason: reason.to_string(),
        })
    }
}
