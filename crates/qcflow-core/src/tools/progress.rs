//! Project progress adapter trait.

use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Absolute progress value pushed after each completed cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub project_id: i64,
    pub completed_parts: u32,
    pub timestamp: DateTime<Utc>,
}

/// Project progress adapter trait.
///
/// The value sent is the total for the project, not an increment, so a
/// retried update is harmless. The engine reads the stored total at
/// check-in and counts on from there.
pub trait ProgressService: Send + Sync {
    /// Returns the completed-parts total for `project_id`, 0 if none is
    /// stored yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored progress cannot be read.
    fn completed_parts(&self, project_id: i64) -> Result<u32>;

    /// Sets the completed-parts total for `project_id`.
    ///
    /// # Errors
    ///
    /// Returns `QcError::PersistenceFailed` if the update is not accepted.
    fn update_completed_parts(&self, project_id: i64, completed_parts: u32) -> Result<()>;
}
