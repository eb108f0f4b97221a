//! Error types for inspection workflow operations.
//!
//! Only input validation, workflow-state misuse, configuration and local I/O
//! surface as errors. Negative answers and out-of-order submissions are
//! ordinary [`AdvanceResult::Blocked`](crate::cursor::AdvanceResult) values,
//! and failed writes to the quality-answer or progress services are reported
//! as warnings on an otherwise successful outcome.

use crate::category::Slot;
use std::path::PathBuf;
use thiserror::Error;

/// Error types for inspection workflow operations.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum QcError {
    // Input validation errors
    /// A scan step received the wrong number of codes.
    #[error("step {step} requires {expected} scanned code(s), got {got}")]
    MissingScanCodes {
        /// Step number being answered.
        step: u8,
        /// Number of codes the step requires.
        expected: usize,
        /// Number of codes supplied.
        got: usize,
    },

    /// A scan step received a blank code.
    #[error("step {0} received an empty scanned code")]
    EmptyScanCode(u8),

    /// Category sub-workflow closed without a category for a slot.
    #[error("missing category for {0}")]
    MissingCategory(Slot),

    /// Category sub-workflow closed without a code for a slot.
    #[error("missing code for {0}")]
    MissingCode(Slot),

    /// Unknown category label.
    #[error("invalid category: {0} (expected one of A, B, C, D, E)")]
    InvalidCategory(String),

    /// Unknown item slot.
    #[error("invalid slot: {0} (expected item1 or item2)")]
    InvalidSlot(String),

    // Workflow state errors
    /// Step number outside the catalog.
    #[error("step not found: {0}")]
    StepNotFound(u8),

    /// An inspection operation was attempted without a check-in.
    #[error("no active inspection - check in to a project first")]
    NotCheckedIn,

    /// A category operation was attempted while the sub-workflow is closed.
    #[error("category submission is not open")]
    CategorySubmissionClosed,

    // Persistence errors
    /// A collaborator rejected or could not accept a record.
    #[error("persistence failed: {0}")]
    PersistenceFailed(String),

    /// Saved session snapshot could not be parsed.
    #[error("corrupted session snapshot: {0}")]
    CorruptedSnapshot(PathBuf),

    /// Location could not be determined.
    #[error("location unavailable: {0}")]
    LocationUnavailable(String),

    // Config errors
    /// Invalid configuration detected.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// Error parsing configuration file.
    #[error("config parse error: {0}")]
    ConfigParseError(String),

    /// Guidance templates could not be prepared.
    #[error("guidance error: {0}")]
    Guidance(#[from] qcflow_guide::GuidanceError),

    // IO and system errors
    /// Standard IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context from anyhow.
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

/// Result type alias for inspection workflow operations.
pub type Result<T> = std::result::Result<T, QcError>;
