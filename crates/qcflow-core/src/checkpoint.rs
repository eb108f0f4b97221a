//! Audit checkpoints and the background recorder.
//!
//! Every scan event produces one immutable [`Checkpoint`] per scanned code.
//! Recording is an audit side-channel: checkpoints are queued on a tokio
//! channel and written by a single worker, so a slow or failing store never
//! holds up the workflow, and the queue keeps them in submission order.

use crate::catalog::{Phase, StepDefinition};
use crate::category::{Category, CategoryAssignment, Slot};
use crate::error::Result;
use crate::session::SessionId;
use crate::tools::audit::AuditStore;
use crate::tools::location::GeoPoint;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::JoinHandle;
use tokio::sync::{mpsc, oneshot};

/// Kind of scan event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointKind {
    /// Incoming box label (step 2).
    BoxInitial,
    /// First-layer batteries (step 9).
    BatteryLayer1,
    /// Repack box label (step 15).
    BoxCategoryB,
    /// Batteries placed in the repack box (step 17).
    BatteryRepack,
}

impl CheckpointKind {
    /// Fixed ordinal stored with every checkpoint of this kind.
    pub fn ordinal(&self) -> u8 {
        match self {
            CheckpointKind::BoxInitial => 1,
            CheckpointKind::BatteryLayer1 => 2,
            CheckpointKind::BoxCategoryB => 3,
            CheckpointKind::BatteryRepack => 4,
        }
    }

    /// Returns the string representation of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckpointKind::BoxInitial => "box_initial",
            CheckpointKind::BatteryLayer1 => "battery_layer1",
            CheckpointKind::BoxCategoryB => "box_category_b",
            CheckpointKind::BatteryRepack => "battery_repack",
        }
    }

    /// Category tag for a checkpoint of this kind.
    ///
    /// Battery scans follow their slot: scan order 1 is item1, scan order 2
    /// is item2. Box scans take item1's category, including the repack box
    /// label, even when item2 was classified differently.
    pub fn category_for(
        &self,
        scan_order: u32,
        assignment: Option<&CategoryAssignment>,
    ) -> Option<Category> {
        let assignment = assignment?;
        let slot = match self {
            CheckpointKind::BatteryLayer1 | CheckpointKind::BatteryRepack if scan_order == 2 => {
                Slot::Item2
            }
            _ => Slot::Item1,
        };
        Some(assignment.category(slot))
    }
}

impl fmt::Display for CheckpointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable audit record of one scanned code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub session_id: String,
    #[serde(rename = "checkpoint_type")]
    pub kind: CheckpointKind,
    #[serde(rename = "checkpoint_number")]
    pub ordinal: u8,
    pub scanned_code: String,
    /// 1-based position within a multi-code scan.
    pub scan_order: u32,
    #[serde(rename = "categorie")]
    pub category: Option<Category>,
    pub phase: Phase,
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: Option<f64>,
    pub project_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technician_id: Option<i64>,
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

/// Shared inputs for the checkpoints of one scan event.
#[derive(Debug, Clone)]
pub struct ScanContext<'a> {
    pub session_id: &'a SessionId,
    pub project_id: i64,
    pub technician_id: Option<i64>,
    pub location: GeoPoint,
    pub assignment: Option<&'a CategoryAssignment>,
    pub timestamp: DateTime<Utc>,
}

/// Builds one checkpoint per code for a scan step. Non-scan steps yield
/// nothing.
pub fn checkpoints_for(
    step: &StepDefinition,
    codes: &[String],
    ctx: &ScanContext<'_>,
) -> Vec<Checkpoint> {
    let Some(scan) = step.scan else {
        return Vec::new();
    };

    (1u32..)
        .zip(codes)
        .map(|(scan_order, code)| Checkpoint {
            session_id: ctx.session_id.to_string(),
            kind: scan.checkpoint,
            ordinal: scan.checkpoint.ordinal(),
            scanned_code: code.clone(),
            scan_order,
            category: scan.checkpoint.category_for(scan_order, ctx.assignment),
            phase: step.phase,
            latitude: ctx.location.latitude,
            longitude: ctx.location.longitude,
            accuracy: ctx.location.accuracy,
            project_id: ctx.project_id,
            technician_id: ctx.technician_id,
            status: "ok".to_string(),
            timestamp: ctx.timestamp,
        })
        .collect()
}

enum Command {
    Record(Box<Checkpoint>),
    Flush(oneshot::Sender<()>),
}

/// Delivery counters shared with the worker.
#[derive(Debug, Default)]
struct RecorderStats {
    recorded: AtomicU64,
    failed: AtomicU64,
}

/// Fire-and-forget checkpoint writer.
///
/// Checkpoints are handed to a dedicated worker through an unbounded FIFO
/// channel. The store is synchronous, so the worker runs on its own thread
/// and uses `blocking_recv`. Store failures are logged and counted, never
/// returned.
pub struct CheckpointRecorder {
    sender: Option<mpsc::UnboundedSender<Command>>,
    worker: Option<JoinHandle<()>>,
    stats: Arc<RecorderStats>,
}

impl CheckpointRecorder {
    /// Starts the worker writing to `store`.
    ///
    /// # Errors
    ///
    /// Returns `QcError::Io` if the worker thread cannot be spawned.
    pub fn spawn(store: Arc<dyn AuditStore>) -> Result<Self> {
        let (sender, mut receiver) = mpsc::unbounded_channel::<Command>();
        let stats = Arc::new(RecorderStats::default());
        let worker_stats = Arc::clone(&stats);

        let worker = std::thread::Builder::new()
            .name("qcflow-checkpoints".into())
            .spawn(move || {
                while let Some(command) = receiver.blocking_recv() {
                    match command {
                        Command::Record(checkpoint) => {
                            deliver(&*store, &checkpoint, &worker_stats);
                        }
                        Command::Flush(done) => {
                            let _ = done.send(());
                        }
                    }
                }
                tracing::debug!("checkpoint queue closed");
            })?;

        Ok(Self {
            sender: Some(sender),
            worker: Some(worker),
            stats,
        })
    }

    /// Queues a checkpoint and returns immediately.
    pub fn record(&self, checkpoint: Checkpoint) {
        let delivered = self
            .sender
            .as_ref()
            .is_some_and(|sender| sender.send(Command::Record(Box::new(checkpoint))).is_ok());
        if !delivered {
            self.stats.failed.fetch_add(1, Ordering::Relaxed);
            tracing::warn!("checkpoint recorder stopped, checkpoint dropped");
        }
    }

    /// Resolves once every checkpoint queued so far has been handled.
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        let queued = self
            .sender
            .as_ref()
            .is_some_and(|sender| sender.send(Command::Flush(done_tx)).is_ok());
        if queued {
            let _ = done_rx.await;
        }
    }

    /// Number of checkpoints written successfully.
    pub fn recorded(&self) -> u64 {
        self.stats.recorded.load(Ordering::Relaxed)
    }

    /// Number of checkpoints that could not be written.
    pub fn failures(&self) -> u64 {
        self.stats.failed.load(Ordering::Relaxed)
    }
}

fn deliver(store: &dyn AuditStore, checkpoint: &Checkpoint, stats: &RecorderStats) {
    match store.record_checkpoint(checkpoint) {
        Ok(()) => {
            stats.recorded.fetch_add(1, Ordering::Relaxed);
        }
        Err(e) => {
            stats.failed.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(
                session_id = %checkpoint.session_id,
                kind = %checkpoint.kind,
                scan_order = checkpoint.scan_order,
                error = %e,
                "checkpoint not recorded"
            );
        }
    }
}

impl fmt::Debug for CheckpointRecorder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckpointRecorder")
            .field("recorded", &self.recorded())
            .field("failures", &self.failures())
            .finish()
    }
}

impl Drop for CheckpointRecorder {
    fn drop(&mut self) {
        // Closing the channel ends the worker loop after the queue drains
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
