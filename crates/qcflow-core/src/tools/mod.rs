//! External collaborators of the inspection engine.
//!
//! Each collaborator is a trait with a real implementation (`*_impl`) and
//! an in-memory mock (`*_mock`) for tests. The engine only sees the traits.

pub mod audit;
pub mod audit_impl;
pub mod audit_mock;
pub mod clock;
pub mod clock_mock;
pub mod location;
pub mod location_impl;
pub mod location_mock;
pub mod progress;
pub mod progress_impl;
pub mod progress_mock;

use crate::config::QcConfig;
use std::sync::Arc;

/// Collaborators used by the inspection engine.
///
/// Adapters are shared trait objects so the checkpoint recorder's worker
/// thread can hold the audit store alongside the engine.
#[derive(Clone)]
pub struct Collaborators {
    /// Device location for checkpoints.
    pub location: Arc<dyn location::LocationProvider>,

    /// Checkpoint, quality-answer and correction storage.
    pub audit: Arc<dyn audit::AuditStore>,

    /// Project completed-parts total.
    pub progress: Arc<dyn progress::ProgressService>,

    /// Time source for timestamps and the cycle timer.
    pub clock: Arc<dyn clock::Clock>,
}

/// Handles onto the mocks inside [`Collaborators::with_mocks`].
#[derive(Debug, Clone, Default)]
pub struct MockHandles {
    pub location: location_mock::MockLocationProvider,
    pub audit: audit_mock::MockAuditStore,
    pub progress: progress_mock::MockProgressService,
    pub clock: clock_mock::MockClock,
}

impl Collaborators {
    /// Creates a collaborator set from the provided adapters.
    pub fn new(
        location: Arc<dyn location::LocationProvider>,
        audit: Arc<dyn audit::AuditStore>,
        progress: Arc<dyn progress::ProgressService>,
        clock: Arc<dyn clock::Clock>,
    ) -> Self {
        Self {
            location,
            audit,
            progress,
            clock,
        }
    }

    /// File-backed adapters under the configured data directory.
    pub fn standard(config: &QcConfig) -> Self {
        Self::new(
            Arc::new(location_impl::FixedLocationProvider::from_config(
                &config.location,
            )),
            Arc::new(audit_impl::JsonlAuditStore::new(&config.data_dir)),
            Arc::new(progress_impl::JsonlProgressService::new(&config.data_dir)),
            Arc::new(clock::SystemClock::new()),
        )
    }

    /// Mock adapters, plus handles for inspecting them.
    ///
    /// The location mock starts denied.
    pub fn with_mocks() -> (Self, MockHandles) {
        let handles = MockHandles::default();
        let tools = Self::new(
            Arc::new(handles.location.clone()),
            Arc::new(handles.audit.clone()),
            Arc::new(handles.progress.clone()),
            Arc::new(handles.clock.clone()),
        );
        (tools, handles)
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators")
            .field("location", &"Arc<dyn LocationProvider>")
            .field("audit", &"Arc<dyn AuditStore>")
            .field("progress", &"Arc<dyn ProgressService>")
            .field("clock", &"Arc<dyn Clock>")
            .finish()
    }
}
