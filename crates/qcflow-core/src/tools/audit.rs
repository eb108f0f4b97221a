//! Audit store adapter trait.
//!
//! The audit store receives everything the inspection writes for later
//! review: scan checkpoints, per-phase quality answers, and the category
//! correction made at the branch step.

use crate::checkpoint::Checkpoint;
use crate::error::Result;
use crate::quality::{CategoryCorrection, QualityAnswerRecord};

/// Audit store adapter trait.
///
/// Implementations can persist to local files or be mocked for testing.
pub trait AuditStore: Send + Sync {
    /// Appends one scan checkpoint.
    ///
    /// # Errors
    ///
    /// Returns `QcError::PersistenceFailed` if the record cannot be written.
    fn record_checkpoint(&self, checkpoint: &Checkpoint) -> Result<()>;

    /// Inserts or merges the quality-answer record for
    /// `session_id + phase`.
    ///
    /// Fields already stored for the key are kept unless the update carries
    /// the same field name, in which case the update wins.
    ///
    /// # Errors
    ///
    /// Returns `QcError::PersistenceFailed` if the record cannot be written.
    fn upsert_quality_answers(&self, record: &QualityAnswerRecord) -> Result<()>;

    /// Stores the battery codes and categories chosen at the branch step.
    ///
    /// # Errors
    ///
    /// Returns `QcError::PersistenceFailed` if the record cannot be written.
    fn record_category_correction(&self, correction: &CategoryCorrection) -> Result<()>;
}
