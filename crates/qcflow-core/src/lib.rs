//! qcflow core - quality-inspection workflow engine.
//!
//! This crate drives a 21-step battery repack inspection: a fixed step
//! catalog, a cursor that only moves on accepted answers, a category
//! sub-workflow at the branch step, per-unit timing, an audit trail of scan
//! checkpoints, and a cycle controller that rotates sessions and counts
//! completed items.
//!
//! # Architecture
//!
//! - [`catalog`]: immutable step definitions and blocking policies
//! - [`policy`]: answer validation and branch handling
//! - [`session`] and [`cursor`]: per-unit state and the step state machine
//! - [`category`]: the two-item classification at step 14
//! - [`timer`]: unit durations and display formatting
//! - [`checkpoint`] and [`quality`]: audit records and the background recorder
//! - [`controller`]: [`InspectionEngine`], the entry point for front-ends
//! - [`tools`]: collaborator traits with file-backed and mock implementations
//! - [`config`], [`snapshot`], [`error`]
//!
//! # Example
//!
//! ```rust,no_run
//! use qcflow_core::{Answer, InspectionEngine, QcConfig};
//! use std::path::PathBuf;
//!
//! # fn main() -> qcflow_core::Result<()> {
//! let config = QcConfig::load(PathBuf::from("/srv/station"))?;
//! let mut engine = InspectionEngine::with_std_tools(config)?;
//!
//! engine.check_in(28)?;
//! engine.submit(1, Answer::yes())?;
//! engine.submit(2, Answer::with_codes(["BOX123"]))?;
//!
//! let view = engine.view()?;
//! println!("step {}: {}", view.step.number, view.step.prompt);
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod category;
pub mod checkpoint;
pub mod config;
pub mod controller;
pub mod cursor;
pub mod error;
pub mod policy;
pub mod quality;
pub mod session;
pub mod snapshot;
pub mod timer;
pub mod tools;

// Re-export core types for convenience
pub use catalog::{BlockingPolicy, Phase, StepDefinition, StepNumber};
pub use category::{Category, CategoryAssignment, CategoryDraft, Slot};
pub use checkpoint::{Checkpoint, CheckpointKind, CheckpointRecorder};
pub use config::QcConfig;
pub use controller::{
    CycleReport, EngineView, Guidance, InspectionEngine, ProductionCounter, SubmitOutcome,
    UNITS_PER_CYCLE, Warning, WarningKind,
};
pub use cursor::{AdvanceResult, BlockReason, WorkflowCursor};
pub use error::{QcError, Result};
pub use policy::Answer;
pub use session::{AnswerValue, SessionId, WorkflowSession};
pub use snapshot::SessionSnapshot;
pub use timer::{BoxTiming, CycleTimer, TimerDisplay};
pub use tools::Collaborators;
