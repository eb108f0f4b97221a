//! Mock progress service for testing.

use crate::error::{QcError, Result};
use crate::tools::progress::{ProgressService, ProgressUpdate};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// In-memory progress service that keeps every update.
#[derive(Debug, Clone, Default)]
pub struct MockProgressService {
    updates: Arc<Mutex<Vec<ProgressUpdate>>>,
    totals: Arc<Mutex<HashMap<i64, u32>>>,
    fail: Arc<Mutex<bool>>,
    fail_reads: Arc<Mutex<bool>>,
}

impl MockProgressService {
    /// Creates a service that accepts every update.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent updates fail.
    pub fn set_failing(&self, fail: bool) {
        *self.fail.lock().unwrap() = fail;
    }

    /// Makes subsequent reads of the stored total fail.
    pub fn set_failing_reads(&self, fail: bool) {
        *self.fail_reads.lock().unwrap() = fail;
    }

    /// Stores a total for `project_id` as if set by an earlier station.
    pub fn set_total(&self, project_id: i64, completed_parts: u32) {
        self.totals.lock().unwrap().insert(project_id, completed_parts);
    }

    /// Returns all accepted updates in order.
    pub fn updates(&self) -> Vec<ProgressUpdate> {
        self.updates.lock().unwrap().clone()
    }

    /// Returns the last accepted total.
    pub fn last_total(&self) -> Option<u32> {
        self.updates.lock().unwrap().last().map(|u| u.completed_parts)
    }
}

impl ProgressService for MockProgressService {
    fn completed_parts(&self, project_id: i64) -> Result<u32> {
        if *self.fail_reads.lock().unwrap() {
            return Err(QcError::PersistenceFailed("mock progress read failure".into()));
        }
        Ok(self.totals.lock().unwrap().get(&project_id).copied().unwrap_or(0))
    }

    fn update_completed_parts(&self, project_id: i64, completed_parts: u32) -> Result<()> {
        if *self.fail.lock().unwrap() {
            return Err(QcError::PersistenceFailed("mock progress failure".into()));
        }
        self.totals.lock().unwrap().insert(project_id, completed_parts);
        self.updates.lock().unwrap().push(ProgressUpdate {
            project_id,
            completed_parts,
            timestamp: chrono::Utc::now(),
        });
        Ok(())
    }
}
