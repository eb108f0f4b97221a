//! Workflow cursor.
//!
//! The cursor owns the current session and moves it through the catalog.
//! It is a state machine:
//!
//! ```text
//! AwaitingAnswer(n) --no--------------------> AwaitingAnswer(n)
//! AwaitingAnswer(n) --yes, n != 14, 21------> AwaitingAnswer(n + 1)
//! AwaitingAnswer(14) --yes|no---------------> AwaitingCategorySubmission
//! AwaitingCategorySubmission --complete-----> AwaitingAnswer(15)
//! AwaitingAnswer(21) --yes------------------> CycleComplete
//! ```
//!
//! `CycleComplete` leaves the session untouched; the cycle controller
//! finalizes the unit and calls [`WorkflowCursor::reset`].

use crate::catalog::{self, StepDefinition, StepNumber};
use crate::category::{Category, CategoryAssignment, CategoryDraft, Slot};
use crate::error::{QcError, Result};
use crate::policy::{self, Answer, Verdict};
use crate::session::{AnswerValue, RecordedAnswer, SessionId, WorkflowSession};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Why a submission did not advance the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockReason {
    /// The technician answered "no"; guidance applies.
    NegativeAnswer,

    /// The submission named a step other than the current one.
    OutOfOrder { submitted: StepNumber },

    /// The branch step was answered and its category submission is still
    /// open.
    CategorySubmissionPending,
}

/// Result of a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdvanceResult {
    /// The answer was recorded and the cursor moved.
    Advanced { from: StepNumber, to: StepNumber },

    /// Nothing changed. `step` is the step still awaiting an answer.
    Blocked { step: StepNumber, reason: BlockReason },

    /// The branch step was answered; category submission is now open.
    CategorySubmissionOpened { step: StepNumber },

    /// The last step was answered.
    CycleComplete { session_id: SessionId },
}

impl AdvanceResult {
    /// Whether the submission was recorded.
    pub fn is_accepted(&self) -> bool {
        !matches!(self, AdvanceResult::Blocked { .. })
    }
}

/// Current session plus the category sub-workflow state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowCursor {
    session: WorkflowSession,

    /// Open category submission (`Some` only while step 14 awaits it).
    draft: Option<CategoryDraft>,

    /// Completed assignment for this session.
    assignment: Option<CategoryAssignment>,
}

impl WorkflowCursor {
    /// Creates a cursor on a fresh session at step 1.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            session: WorkflowSession::start(now),
            draft: None,
            assignment: None,
        }
    }

    /// The session being worked.
    pub fn session(&self) -> &WorkflowSession {
        &self.session
    }

    /// The step awaiting an answer.
    pub fn current(&self) -> Result<&'static StepDefinition> {
        self.session.current_definition()
    }

    /// The open category draft, if any.
    pub fn draft(&self) -> Option<&CategoryDraft> {
        self.draft.as_ref()
    }

    /// The completed category assignment, if any.
    pub fn assignment(&self) -> Option<&CategoryAssignment> {
        self.assignment.as_ref()
    }

    /// Whether category submission is open.
    pub fn is_category_open(&self) -> bool {
        self.draft.is_some()
    }

    /// Submits an answer for `step`.
    ///
    /// # Errors
    ///
    /// Returns input errors from [`policy::evaluate`]; the cursor is left
    /// unchanged. Negative answers and out-of-order submissions are
    /// returned as [`AdvanceResult::Blocked`].
    pub fn submit(
        &mut self,
        step: StepNumber,
        answer: &Answer,
        at: DateTime<Utc>,
    ) -> Result<AdvanceResult> {
        let current = self.session.current_step()?;

        if step != current {
            tracing::error!(
                submitted = %step,
                current = %current,
                session_id = %self.session.session_id,
                "submission for a step that is not current, dropped"
            );
            return Ok(AdvanceResult::Blocked {
                step: current,
                reason: BlockReason::OutOfOrder { submitted: step },
            });
        }

        if self.draft.is_some() {
            return Ok(AdvanceResult::Blocked {
                step: current,
                reason: BlockReason::CategorySubmissionPending,
            });
        }

        let definition = catalog::definition(current);
        match policy::evaluate(definition, answer)? {
            Verdict::Reject => {
                tracing::info!(step = %current, "negative answer, step blocked");
                Ok(AdvanceResult::Blocked {
                    step: current,
                    reason: BlockReason::NegativeAnswer,
                })
            }
            Verdict::BranchAnswer(value) => {
                self.session.record(current, recorded(value, Vec::new(), at));
                self.draft = Some(CategoryDraft::new());
                tracing::debug!(step = %current, answer = value.as_wire(), "category submission opened");
                Ok(AdvanceResult::CategorySubmissionOpened { step: current })
            }
            Verdict::Accept { codes } => {
                self.session
                    .record(current, recorded(AnswerValue::Yes, codes, at));
                Ok(self.step_forward(current))
            }
        }
    }

    /// Stores a code for a slot of the open category submission.
    ///
    /// # Errors
    ///
    /// Returns `QcError::CategorySubmissionClosed` outside step 14.
    pub fn set_category_code(&mut self, slot: Slot, code: &str) -> Result<()> {
        self.draft_mut()?.set_code(slot, code);
        Ok(())
    }

    /// Toggles a slot's category in the open category submission.
    ///
    /// # Errors
    ///
    /// Returns `QcError::CategorySubmissionClosed` outside step 14.
    pub fn toggle_category(&mut self, slot: Slot, category: Category) -> Result<Option<Category>> {
        Ok(self.draft_mut()?.toggle_category(slot, category))
    }

    /// Closes the category submission and advances past the branch step.
    ///
    /// # Errors
    ///
    /// Returns `QcError::CategorySubmissionClosed` when nothing is open,
    /// or `MissingCategory`/`MissingCode` when the draft is incomplete, in
    /// which case the submission stays open.
    pub fn complete_categories(&mut self) -> Result<(CategoryAssignment, AdvanceResult)> {
        let assignment = self
            .draft
            .as_ref()
            .ok_or(QcError::CategorySubmissionClosed)?
            .complete()?;

        self.draft = None;
        self.assignment = Some(assignment.clone());
        let current = self.session.current_step()?;
        Ok((assignment, self.step_forward(current)))
    }

    /// Replaces the session with a fresh one at step 1, dropping all
    /// per-unit state.
    pub fn reset(&mut self, now: DateTime<Utc>) -> &SessionId {
        *self = Self::new(now);
        &self.session.session_id
    }

    fn draft_mut(&mut self) -> Result<&mut CategoryDraft> {
        self.draft.as_mut().ok_or(QcError::CategorySubmissionClosed)
    }

    fn step_forward(&mut self, from: StepNumber) -> AdvanceResult {
        match self.session.advance() {
            Some(to) => {
                tracing::debug!(from = %from, to = %to, "cursor advanced");
                AdvanceResult::Advanced { from, to }
            }
            None => AdvanceResult::CycleComplete {
                session_id: self.session.session_id.clone(),
            },
        }
    }
}

fn recorded(value: AnswerValue, codes: Vec<String>, at: DateTime<Utc>) -> RecordedAnswer {
    RecordedAnswer {
        value,
        codes,
        answered_at: at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(n: u8) -> StepNumber {
        StepNumber::new(n).unwrap()
    }

    fn answer_for(n: u8) -> Answer {
        match n {
            2 => Answer::with_codes(["BOX123"]),
            9 | 17 => Answer::with_codes(["BAT1", "BAT2"]),
            15 => Answer::with_codes(["BOX123B"]),
            _ => Answer::yes(),
        }
    }

    fn advance_to(cursor: &mut WorkflowCursor, target: u8) {
        for n in 1..target {
            if n == 14 {
                cursor.submit(step(14), &Answer::yes(), Utc::now()).unwrap();
                cursor.set_category_code(Slot::Item1, "B1").unwrap();
                cursor.set_category_code(Slot::Item2, "B2").unwrap();
                cursor.toggle_category(Slot::Item1, Category::A).unwrap();
                cursor.toggle_category(Slot::Item2, Category::C).unwrap();
                cursor.complete_categories().unwrap();
            } else {
                cursor.submit(step(n), &answer_for(n), Utc::now()).unwrap();
            }
        }
    }

    #[test]
    fn test_should_advance_on_yes() {
        let mut cursor = WorkflowCursor::new(Utc::now());
        let result = cursor.submit(step(1), &Answer::yes(), Utc::now()).unwrap();
        assert_eq!(
            result,
            AdvanceResult::Advanced {
                from: step(1),
                to: step(2)
            }
        );
        assert_eq!(cursor.current().unwrap().number, step(2));
    }

    #[test]
    fn test_negative_answer_keeps_state() {
        let mut cursor = WorkflowCursor::new(Utc::now());
        advance_to(&mut cursor, 5);
        let before = cursor.clone();

        let result = cursor.submit(step(5), &Answer::no(), Utc::now()).unwrap();

        assert_eq!(
            result,
            AdvanceResult::Blocked {
                step: step(5),
                reason: BlockReason::NegativeAnswer
            }
        );
        assert_eq!(cursor, before);
        assert!(cursor.session().answer(step(5)).is_none());
    }

    #[test]
    fn test_out_of_order_submission_is_dropped() {
        let mut cursor = WorkflowCursor::new(Utc::now());
        cursor.submit(step(1), &Answer::yes(), Utc::now()).unwrap();
        let before = cursor.clone();

        let result = cursor.submit(step(1), &Answer::yes(), Utc::now()).unwrap();

        assert_eq!(
            result,
            AdvanceResult::Blocked {
                step: step(2),
                reason: BlockReason::OutOfOrder {
                    submitted: step(1)
                }
            }
        );
        assert_eq!(cursor, before);
    }

    #[test]
    fn test_input_error_leaves_cursor_unchanged() {
        let mut cursor = WorkflowCursor::new(Utc::now());
        advance_to(&mut cursor, 9);
        let before = cursor.clone();

        let result = cursor.submit(step(9), &Answer::with_codes(["BAT1"]), Utc::now());

        assert!(matches!(result, Err(QcError::MissingScanCodes { .. })));
        assert_eq!(cursor, before);
    }

    #[test]
    fn test_branch_step_opens_category_submission() {
        let mut cursor = WorkflowCursor::new(Utc::now());
        advance_to(&mut cursor, 14);

        let result = cursor.submit(step(14), &Answer::no(), Utc::now()).unwrap();

        assert_eq!(result, AdvanceResult::CategorySubmissionOpened { step: step(14) });
        assert!(cursor.is_category_open());
        assert_eq!(cursor.current().unwrap().number, step(14));
        assert_eq!(
            cursor.session().answer(step(14)).unwrap().value,
            AnswerValue::No
        );

        let again = cursor.submit(step(14), &Answer::yes(), Utc::now()).unwrap();
        assert_eq!(
            again,
            AdvanceResult::Blocked {
                step: step(14),
                reason: BlockReason::CategorySubmissionPending
            }
        );
    }

    #[test]
    fn test_incomplete_categories_keep_submission_open() {
        let mut cursor = WorkflowCursor::new(Utc::now());
        advance_to(&mut cursor, 14);
        cursor.submit(step(14), &Answer::yes(), Utc::now()).unwrap();
        cursor.set_category_code(Slot::Item1, "B1").unwrap();
        cursor.set_category_code(Slot::Item2, "B2").unwrap();
        cursor.toggle_category(Slot::Item1, Category::A).unwrap();

        let result = cursor.complete_categories();

        assert!(matches!(result, Err(QcError::MissingCategory(Slot::Item2))));
        assert!(cursor.is_category_open());
        assert_eq!(cursor.current().unwrap().number, step(14));
    }

    #[test]
    fn test_complete_categories_advances_to_repack() {
        let mut cursor = WorkflowCursor::new(Utc::now());
        advance_to(&mut cursor, 15);

        assert!(!cursor.is_category_open());
        assert_eq!(cursor.current().unwrap().number, step(15));
        let assignment = cursor.assignment().unwrap();
        assert_eq!(assignment.category(Slot::Item1), Category::A);
        assert_eq!(assignment.category(Slot::Item2), Category::C);
    }

    #[test]
    fn test_category_operations_require_open_submission() {
        let mut cursor = WorkflowCursor::new(Utc::now());
        assert!(matches!(
            cursor.set_category_code(Slot::Item1, "B1"),
            Err(QcError::CategorySubmissionClosed)
        ));
        assert!(matches!(
            cursor.complete_categories(),
            Err(QcError::CategorySubmissionClosed)
        ));
    }

    #[test]
    fn test_last_step_signals_cycle_complete() {
        let mut cursor = WorkflowCursor::new(Utc::now());
        advance_to(&mut cursor, 21);
        let session_id = cursor.session().session_id.clone();

        let result = cursor.submit(step(21), &Answer::yes(), Utc::now()).unwrap();

        assert_eq!(result, AdvanceResult::CycleComplete { session_id: session_id.clone() });
        assert_eq!(cursor.session().answers.len(), 21);

        let new_id = cursor.reset(Utc::now()).clone();
        assert_ne!(new_id, session_id);
        assert_eq!(cursor.current().unwrap().number, StepNumber::FIRST);
        assert!(cursor.assignment().is_none());
        assert!(cursor.session().answers.is_empty());
    }
}
