//! Inspection engine and cycle controller.
//!
//! [`InspectionEngine`] is the single entry point for a station front-end.
//! It owns the cursor, timer and production counter of the checked-in
//! project, dispatches side effects to the collaborators, and finalizes a
//! unit when the last step is accepted:
//!
//! 1. stop the unit timer
//! 2. write the last step's quality answers with the running average
//! 3. add [`UNITS_PER_CYCLE`] to the counter and push the new total
//! 4. rotate to a fresh session at step 1
//! 5. start timing the next unit
//!
//! The counter starts from the project's stored total at check-in, since
//! the progress service keeps whatever total it is sent last.
//!
//! Persistence failures never undo a step. Quality-answer, correction,
//! progress and snapshot failures come back as [`Warning`]s; checkpoint
//! failures are logged by the recorder and counted in the view.

use crate::catalog::{self, StepDefinition, StepNumber};
use crate::category::{Category, CategoryDraft, Slot};
use crate::checkpoint::{CheckpointRecorder, ScanContext, checkpoints_for};
use crate::config::QcConfig;
use crate::cursor::{AdvanceResult, BlockReason, WorkflowCursor};
use crate::error::{QcError, Result};
use crate::policy::Answer;
use crate::quality::{CategoryCorrection, QualityAnswerRecord};
use crate::session::SessionId;
use crate::snapshot::SessionSnapshot;
use crate::timer::{CycleTimer, TimerDisplay};
use crate::tools::Collaborators;
use crate::tools::location::locate_or_zero;
use chrono::{DateTime, Utc};
use qcflow_guide::{GuidanceContext, GuidanceEngine, GuidanceManager};
use std::fmt;

/// Blocked-step guidance shown to the technician.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Guidance {
    pub step: StepNumber,
    pub message: String,
}

/// Which write a [`Warning`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    QualityAnswers,
    CategoryCorrection,
    Progress,
    Snapshot,
}

/// Items completed per unit: each box carries two batteries.
pub const UNITS_PER_CYCLE: u32 = 2;

/// Non-fatal persistence failure attached to a successful operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    fn new(kind: WarningKind, err: &QcError) -> Self {
        Self {
            kind,
            message: err.to_string(),
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let what = match self.kind {
            WarningKind::QualityAnswers => "quality answers not saved",
            WarningKind::CategoryCorrection => "category correction not saved",
            WarningKind::Progress => "project progress not synchronized",
            WarningKind::Snapshot => "session snapshot not saved",
        };
        write!(f, "{}: {}", what, self.message)
    }
}

/// Summary of a completed unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub completed_session: SessionId,
    pub next_session: SessionId,
    pub duration_seconds: u64,
    pub first_unit_duration: Option<u64>,
    pub running_average_seconds: Option<u64>,
    /// Counter total after this unit.
    pub production_counter: u32,
}

/// Result of a submission or category completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitOutcome {
    pub result: AdvanceResult,
    /// Set when the step is blocked by a negative answer.
    pub guidance: Option<Guidance>,
    pub warnings: Vec<Warning>,
    /// Set when this submission completed the unit.
    pub cycle: Option<CycleReport>,
}

impl SubmitOutcome {
    fn new(result: AdvanceResult) -> Self {
        Self {
            result,
            guidance: None,
            warnings: Vec::new(),
            cycle: None,
        }
    }
}

/// Completed items for the checked-in project.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProductionCounter {
    units: u32,
}

impl ProductionCounter {
    /// Creates a counter starting at `units`.
    pub fn new(units: u32) -> Self {
        Self { units }
    }

    /// Current total.
    pub fn get(&self) -> u32 {
        self.units
    }

    /// Adds one cycle's worth of items and returns the new total.
    pub fn increment(&mut self) -> u32 {
        self.units = self.units.saturating_add(UNITS_PER_CYCLE);
        self.units
    }
}

/// What a front-end needs to render the station.
#[derive(Debug, Clone)]
pub struct EngineView {
    pub project_id: i64,
    pub session_id: SessionId,
    pub step: &'static StepDefinition,
    pub guidance: Option<Guidance>,
    pub timer: TimerDisplay,
    pub production_counter: u32,
    pub category_open: bool,
    pub draft: Option<CategoryDraft>,
    /// Warnings from the most recent operation.
    pub warnings: Vec<Warning>,
    pub checkpoints_recorded: u64,
    pub checkpoint_failures: u64,
}

#[derive(Debug)]
struct ActiveInspection {
    project_id: i64,
    technician_id: Option<i64>,
    cursor: WorkflowCursor,
    timer: CycleTimer,
    counter: ProductionCounter,
    guidance: Option<Guidance>,
    warnings: Vec<Warning>,
}

impl ActiveInspection {
    fn snapshot(&self, saved_at: DateTime<Utc>) -> SessionSnapshot {
        SessionSnapshot {
            project_id: self.project_id,
            technician_id: self.technician_id,
            cursor: self.cursor.clone(),
            timer: self.timer.clone(),
            counter: self.counter.get(),
            saved_at,
        }
    }
}

/// Inspection engine for one station.
#[derive(Debug)]
pub struct InspectionEngine {
    config: QcConfig,
    tools: Collaborators,
    guide: GuidanceManager,
    recorder: CheckpointRecorder,
    active: Option<ActiveInspection>,
}

impl InspectionEngine {
    /// Creates an engine with the given collaborators. Nothing is checked in.
    ///
    /// # Errors
    ///
    /// Returns `QcError::Guidance` if the configured template override
    /// directory is missing, or `QcError::Io` if the checkpoint worker
    /// cannot start.
    pub fn new(config: QcConfig, tools: Collaborators) -> Result<Self> {
        let guide = GuidanceManager::new(config.guidance.template_dir.clone())?;
        let recorder = CheckpointRecorder::spawn(tools.audit.clone())?;
        Ok(Self {
            config,
            tools,
            guide,
            recorder,
            active: None,
        })
    }

    /// Creates an engine with the file-backed collaborators.
    pub fn with_std_tools(config: QcConfig) -> Result<Self> {
        let tools = Collaborators::standard(&config);
        Self::new(config, tools)
    }

    /// Creates an engine and resumes the saved inspection, if any.
    ///
    /// # Errors
    ///
    /// Returns `QcError::CorruptedSnapshot` if the snapshot is unreadable.
    pub fn restore(config: QcConfig, tools: Collaborators) -> Result<Self> {
        let mut engine = Self::new(config, tools)?;
        if let Some(snapshot) = SessionSnapshot::load(&engine.config.snapshot_file)? {
            tracing::info!(
                project_id = snapshot.project_id,
                session_id = %snapshot.cursor.session().session_id,
                step = snapshot.cursor.session().current_step_index + 1,
                "resuming saved inspection"
            );
            engine.active = Some(ActiveInspection {
                project_id: snapshot.project_id,
                technician_id: snapshot.technician_id,
                cursor: snapshot.cursor,
                timer: snapshot.timer,
                counter: ProductionCounter::new(snapshot.counter),
                guidance: None,
                warnings: Vec::new(),
            });
        }
        Ok(engine)
    }

    /// Returns the configuration.
    pub fn config(&self) -> &QcConfig {
        &self.config
    }

    /// Whether a project is checked in.
    pub fn is_checked_in(&self) -> bool {
        self.active.is_some()
    }

    /// Checks in to `project_id`, starting a fresh session and timing.
    ///
    /// The production counter starts from the project's stored total. If
    /// that cannot be read it starts from 0 and the view carries a
    /// [`WarningKind::Progress`] warning. Any inspection already in
    /// progress is discarded first.
    #[tracing::instrument(skip(self))]
    pub fn check_in(&mut self, project_id: i64) -> Result<SessionId> {
        if let Some(previous) = self.active.take() {
            tracing::warn!(
                project_id = previous.project_id,
                session_id = %previous.cursor.session().session_id,
                "check-in while an inspection is active, discarding it"
            );
        }

        let mut warnings = Vec::new();
        let completed_parts = match self.tools.progress.completed_parts(project_id) {
            Ok(total) => total,
            Err(e) => {
                tracing::warn!(error = %e, "stored progress unreadable, counting from 0");
                warnings.push(Warning::new(WarningKind::Progress, &e));
                0
            }
        };

        let now = self.tools.clock.now();
        let mut timer = CycleTimer::new();
        timer.start_unit(now);
        let active = ActiveInspection {
            project_id,
            technician_id: self.config.station.technician_id,
            cursor: WorkflowCursor::new(now),
            timer,
            counter: ProductionCounter::new(completed_parts),
            guidance: None,
            warnings: Vec::new(),
        };
        let session_id = active.cursor.session().session_id.clone();
        tracing::info!(session_id = %session_id, completed_parts, "checked in");

        self.active = Some(active);
        warnings.extend(self.save_snapshot());
        if let Some(active) = self.active.as_mut() {
            active.warnings = warnings;
        }
        Ok(session_id)
    }

    /// Checks out, abandoning the unit in progress.
    ///
    /// Queued checkpoints are still delivered; the open category draft and
    /// the snapshot are discarded.
    ///
    /// # Errors
    ///
    /// Returns `QcError::NotCheckedIn` if nothing is checked in.
    #[tracing::instrument(skip(self))]
    pub async fn check_out(&mut self) -> Result<()> {
        let active = self.active.take().ok_or(QcError::NotCheckedIn)?;
        self.recorder.flush().await;
        SessionSnapshot::remove(&self.config.snapshot_file)?;
        tracing::info!(
            project_id = active.project_id,
            session_id = %active.cursor.session().session_id,
            production_counter = active.counter.get(),
            "checked out"
        );
        Ok(())
    }

    /// Submits an answer for step `step`.
    ///
    /// # Errors
    ///
    /// Returns `QcError::NotCheckedIn`, `QcError::StepNotFound` for a
    /// number outside the catalog, or an input validation error. In every
    /// error case the workflow state is unchanged.
    #[tracing::instrument(skip(self, answer))]
    pub fn submit(&mut self, step: u8, answer: Answer) -> Result<SubmitOutcome> {
        let step = StepNumber::new(step)?;
        let now = self.tools.clock.now();
        let mut active = self.active.take().ok_or(QcError::NotCheckedIn)?;
        let outcome = self.submit_active(&mut active, step, &answer, now);
        self.active = Some(active);
        self.finish(outcome)
    }

    /// Stores a code for a slot of the open category submission.
    pub fn set_category_code(&mut self, slot: Slot, code: &str) -> Result<()> {
        self.active_mut()?.cursor.set_category_code(slot, code)?;
        self.save_snapshot_logged();
        Ok(())
    }

    /// Toggles a slot's category. Returns the slot's category afterwards.
    pub fn toggle_category(&mut self, slot: Slot, category: Category) -> Result<Option<Category>> {
        let selected = self.active_mut()?.cursor.toggle_category(slot, category)?;
        self.save_snapshot_logged();
        Ok(selected)
    }

    /// Closes the category submission and moves on to step 15.
    ///
    /// # Errors
    ///
    /// Returns `QcError::CategorySubmissionClosed`, or
    /// `MissingCategory`/`MissingCode` for an incomplete draft.
    #[tracing::instrument(skip(self))]
    pub fn complete_categories(&mut self) -> Result<SubmitOutcome> {
        let now = self.tools.clock.now();
        let mut active = self.active.take().ok_or(QcError::NotCheckedIn)?;
        let outcome = self.complete_categories_active(&mut active, now);
        self.active = Some(active);
        self.finish(outcome)
    }

    /// Builds the station view.
    pub fn view(&self) -> Result<EngineView> {
        let active = self.active_ref()?;
        Ok(EngineView {
            project_id: active.project_id,
            session_id: active.cursor.session().session_id.clone(),
            step: active.cursor.current()?,
            guidance: active.guidance.clone(),
            timer: active.timer.display(self.tools.clock.now()),
            production_counter: active.counter.get(),
            category_open: active.cursor.is_category_open(),
            draft: active.cursor.draft().cloned(),
            warnings: active.warnings.clone(),
            checkpoints_recorded: self.recorder.recorded(),
            checkpoint_failures: self.recorder.failures(),
        })
    }

    /// Timer display for the periodic tick. Never changes timing.
    pub fn tick(&self) -> Result<TimerDisplay> {
        Ok(self.active_ref()?.timer.display(self.tools.clock.now()))
    }

    /// Waits until every queued checkpoint has been handled.
    pub async fn flush_checkpoints(&self) {
        self.recorder.flush().await;
    }

    fn submit_active(
        &self,
        active: &mut ActiveInspection,
        step: StepNumber,
        answer: &Answer,
        now: DateTime<Utc>,
    ) -> Result<SubmitOutcome> {
        let result = active.cursor.submit(step, answer, now)?;
        let mut outcome = SubmitOutcome::new(result.clone());

        match result {
            AdvanceResult::Blocked {
                step,
                reason: BlockReason::NegativeAnswer,
            } => {
                let guidance = self.guidance_for(catalog::definition(step));
                active.guidance = Some(guidance.clone());
                outcome.guidance = Some(guidance);
            }
            AdvanceResult::Blocked { .. } => {}
            AdvanceResult::Advanced { from, .. } => {
                active.guidance = None;
                outcome.warnings = self.record_step(active, from, None, now);
            }
            AdvanceResult::CategorySubmissionOpened { step } => {
                active.guidance = None;
                outcome.warnings = self.record_step(active, step, None, now);
            }
            AdvanceResult::CycleComplete { .. } => {
                active.guidance = None;
                let (report, warnings) = self.finalize_cycle(active, step, now);
                outcome.warnings = warnings;
                outcome.cycle = Some(report);
            }
        }
        Ok(outcome)
    }

    fn complete_categories_active(
        &self,
        active: &mut ActiveInspection,
        now: DateTime<Utc>,
    ) -> Result<SubmitOutcome> {
        let (assignment, result) = active.cursor.complete_categories()?;
        let mut outcome = SubmitOutcome::new(result);

        let correction = CategoryCorrection::new(
            &active.cursor.session().session_id,
            active.project_id,
            &assignment,
            now,
        );
        if let Err(e) = self.tools.audit.record_category_correction(&correction) {
            tracing::warn!(error = %e, "category correction not saved");
            outcome
                .warnings
                .push(Warning::new(WarningKind::CategoryCorrection, &e));
        }
        tracing::info!(
            item1 = %assignment.item1.category,
            item2 = %assignment.item2.category,
            "categories assigned"
        );
        Ok(outcome)
    }

    /// Writes checkpoints and quality answers for an accepted step.
    fn record_step(
        &self,
        active: &ActiveInspection,
        step: StepNumber,
        avg_box_time: Option<u64>,
        now: DateTime<Utc>,
    ) -> Vec<Warning> {
        let definition = catalog::definition(step);
        let session = active.cursor.session();
        let Some(answer) = session.answer(step) else {
            return Vec::new();
        };

        if definition.requires_scan() {
            let ctx = ScanContext {
                session_id: &session.session_id,
                project_id: active.project_id,
                technician_id: active.technician_id,
                location: locate_or_zero(&*self.tools.location),
                assignment: active.cursor.assignment(),
                timestamp: now,
            };
            for checkpoint in checkpoints_for(definition, &answer.codes, &ctx) {
                self.recorder.record(checkpoint);
            }
        }

        let record = QualityAnswerRecord::for_step(
            &session.session_id,
            active.project_id,
            active.technician_id,
            definition,
            answer,
            avg_box_time,
        );
        match self.tools.audit.upsert_quality_answers(&record) {
            Ok(()) => Vec::new(),
            Err(e) => {
                tracing::warn!(step = %step, error = %e, "quality answers not saved");
                vec![Warning::new(WarningKind::QualityAnswers, &e)]
            }
        }
    }

    fn finalize_cycle(
        &self,
        active: &mut ActiveInspection,
        last: StepNumber,
        now: DateTime<Utc>,
    ) -> (CycleReport, Vec<Warning>) {
        let duration = active.timer.complete_unit(now);
        let timing = active.timer.timing().clone();

        let mut warnings = self.record_step(active, last, timing.running_average_seconds, now);

        let total = active.counter.increment();
        if let Err(e) = self
            .tools
            .progress
            .update_completed_parts(active.project_id, total)
        {
            tracing::warn!(project_id = active.project_id, total, error = %e, "project progress not updated");
            warnings.push(Warning::new(WarningKind::Progress, &e));
        }

        let completed_session = active.cursor.session().session_id.clone();
        let next_session = active.cursor.reset(now).clone();
        active.timer.start_unit(now);

        tracing::info!(
            completed_session = %completed_session,
            next_session = %next_session,
            duration,
            production_counter = total,
            "cycle completed"
        );

        let report = CycleReport {
            completed_session,
            next_session,
            duration_seconds: duration,
            first_unit_duration: timing.first_unit_duration,
            running_average_seconds: timing.running_average_seconds,
            production_counter: total,
        };
        (report, warnings)
    }

    fn guidance_for(&self, definition: &StepDefinition) -> Guidance {
        let ctx = GuidanceContext::new(definition.number.get(), definition.phase.as_str())
            .with_prompt(definition.prompt)
            .with_multiple_operators(definition.requires_multiple_operators);
        let message = self.guide.blocked_message(&ctx).unwrap_or_else(|e| {
            tracing::warn!(step = %definition.number, error = %e, "guidance template failed");
            format!(
                "Step {} cannot be skipped. Complete the physical action, then answer again.",
                definition.number
            )
        });
        Guidance {
            step: definition.number,
            message,
        }
    }

    /// Saves the snapshot and stores the outcome's warnings on the active
    /// inspection.
    fn finish(&mut self, outcome: Result<SubmitOutcome>) -> Result<SubmitOutcome> {
        let mut outcome = outcome?;
        if outcome.result.is_accepted() {
            outcome.warnings.extend(self.save_snapshot());
        }
        if let Some(active) = self.active.as_mut() {
            active.warnings = outcome.warnings.clone();
        }
        Ok(outcome)
    }

    fn save_snapshot(&self) -> Option<Warning> {
        let active = self.active.as_ref()?;
        let snapshot = active.snapshot(self.tools.clock.now());
        match snapshot.save(&self.config.snapshot_file) {
            Ok(()) => None,
            Err(e) => {
                tracing::warn!(path = %self.config.snapshot_file.display(), error = %e, "session snapshot not saved");
                Some(Warning::new(WarningKind::Snapshot, &e))
            }
        }
    }

    fn save_snapshot_logged(&mut self) {
        let warnings: Vec<Warning> = self.save_snapshot().into_iter().collect();
        if let Some(active) = self.active.as_mut() {
            active.warnings = warnings;
        }
    }

    fn active_ref(&self) -> Result<&ActiveInspection> {
        self.active.as_ref().ok_or(QcError::NotCheckedIn)
    }

    fn active_mut(&mut self) -> Result<&mut ActiveInspection> {
        self.active.as_mut().ok_or(QcError::NotCheckedIn)
    }
}
