//! Mock audit store for testing.

use crate::checkpoint::Checkpoint;
use crate::error::{QcError, Result};
use crate::quality::{CategoryCorrection, QualityAnswerRecord};
use crate::tools::audit::AuditStore;
use std::sync::{Arc, Mutex};

/// In-memory audit store.
///
/// Records everything it receives and applies the same upsert merge as the
/// file-backed store. Each write kind can be switched to fail.
#[derive(Debug, Clone, Default)]
pub struct MockAuditStore {
    checkpoints: Arc<Mutex<Vec<Checkpoint>>>,
    quality: Arc<Mutex<Vec<QualityAnswerRecord>>>,
    corrections: Arc<Mutex<Vec<CategoryCorrection>>>,
    failures: Arc<Mutex<FailureModes>>,
}

#[derive(Debug, Default)]
struct FailureModes {
    checkpoints: bool,
    quality: bool,
    corrections: bool,
}

impl MockAuditStore {
    /// Creates an empty store that accepts every write.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes checkpoint writes fail.
    pub fn fail_checkpoints(&self, fail: bool) {
        self.failures.lock().unwrap().checkpoints = fail;
    }

    /// Makes quality-answer upserts fail.
    pub fn fail_quality(&self, fail: bool) {
        self.failures.lock().unwrap().quality = fail;
    }

    /// Makes category-correction writes fail.
    pub fn fail_corrections(&self, fail: bool) {
        self.failures.lock().unwrap().corrections = fail;
    }

    /// Returns recorded checkpoints in arrival order.
    pub fn checkpoints(&self) -> Vec<Checkpoint> {
        self.checkpoints.lock().unwrap().clone()
    }

    /// Returns the merged quality-answer records.
    pub fn quality_answers(&self) -> Vec<QualityAnswerRecord> {
        self.quality.lock().unwrap().clone()
    }

    /// Returns recorded category corrections.
    pub fn corrections(&self) -> Vec<CategoryCorrection> {
        self.corrections.lock().unwrap().clone()
    }
}

impl AuditStore for MockAuditStore {
    fn record_checkpoint(&self, checkpoint: &Checkpoint) -> Result<()> {
        if self.failures.lock().unwrap().checkpoints {
            return Err(QcError::PersistenceFailed("mock checkpoint failure".into()));
        }
        self.checkpoints.lock().unwrap().push(checkpoint.clone());
        Ok(())
    }

    fn upsert_quality_answers(&self, record: &QualityAnswerRecord) -> Result<()> {
        if self.failures.lock().unwrap().quality {
            return Err(QcError::PersistenceFailed("mock quality failure".into()));
        }
        let mut records = self.quality.lock().unwrap();
        match records.iter_mut().find(|existing| existing.same_key(record)) {
            Some(existing) => existing.merge(record),
            None => records.push(record.clone()),
        }
        Ok(())
    }

    fn record_category_correction(&self, correction: &CategoryCorrection) -> Result<()> {
        if self.failures.lock().unwrap().corrections {
            return Err(QcError::PersistenceFailed("mock correction failure".into()));
        }
        self.corrections.lock().unwrap().push(correction.clone());
        Ok(())
    }
}
