//! Guidance messages for blocked inspection steps.
//!
//! When a technician answers "no" to a prerequisite step, the workflow stays
//! on that step and shows a guidance message. This crate renders those
//! messages from minijinja templates. Built-in templates ship with the crate;
//! a station can override any of them from a directory on disk.
//!
//! # Examples
//!
//! ```
//! use qcflow_guide::{GuidanceContext, GuidanceEngine, GuidanceManager};
//!
//! let manager = GuidanceManager::builtin();
//! let context = GuidanceContext::new(8, "categorization")
//!     .with_prompt("Protective equipment worn?");
//!
//! let message = manager.blocked_message(&context)?;
//! println!("{message}");
//! # Ok::<(), qcflow_guide::GuidanceError>(())
//! ```

pub mod builtin;
pub mod context;
pub mod engine;
pub mod error;
pub mod manager;

pub use context::GuidanceContext;
pub use engine::GuidanceEngine;
pub use error::{GuidanceError, Result};
pub use manager::GuidanceManager;
