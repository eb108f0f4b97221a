//! Per-unit workflow session.
//!
//! A session is the identity and answer history of one box's pass through
//! the catalog. It is created when a unit starts and replaced when the unit
//! completes or the technician checks out.

use crate::catalog::{self, StepDefinition, StepNumber};
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Opaque unique session identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Generates a fresh random session id.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stored value of an accepted step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerValue {
    Yes,
    /// Only ever stored for the branch step's sub-question.
    No,
}

impl AnswerValue {
    /// Value written to the quality-answer service.
    pub fn as_wire(&self) -> &'static str {
        match self {
            AnswerValue::Yes => "si",
            AnswerValue::No => "no",
        }
    }
}

/// An accepted answer as recorded in the session history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedAnswer {
    pub value: AnswerValue,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub codes: Vec<String>,
    pub answered_at: DateTime<Utc>,
}

/// Identity and answer history of one unit.
///
/// `answers` only holds steps before the current one (plus the branch step
/// while its category submission is open), so iterating it yields steps in
/// completion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowSession {
    /// Session identifier.
    pub session_id: SessionId,

    /// Zero-based catalog index of the step awaiting an answer.
    pub current_step_index: usize,

    /// Accepted answers keyed by step.
    pub answers: BTreeMap<StepNumber, RecordedAnswer>,

    /// When the unit started.
    pub started_at: DateTime<Utc>,
}

impl WorkflowSession {
    /// Starts a new session at step 1.
    pub fn start(started_at: DateTime<Utc>) -> Self {
        Self {
            session_id: SessionId::new(),
            current_step_index: 0,
            answers: BTreeMap::new(),
            started_at,
        }
    }

    /// Number of the step awaiting an answer.
    ///
    /// # Errors
    ///
    /// Returns `QcError::StepNotFound` if the index was corrupted, e.g. by
    /// a hand-edited snapshot.
    pub fn current_step(&self) -> Result<StepNumber> {
        StepNumber::from_index(self.current_step_index)
    }

    /// Definition of the step awaiting an answer.
    pub fn current_definition(&self) -> Result<&'static StepDefinition> {
        Ok(catalog::definition(self.current_step()?))
    }

    /// Records an accepted answer for `step`.
    pub fn record(&mut self, step: StepNumber, answer: RecordedAnswer) {
        self.answers.insert(step, answer);
    }

    /// Moves to the next step. Returns the new step, or `None` when the
    /// current step is the last one.
    pub fn advance(&mut self) -> Option<StepNumber> {
        let next = self.current_step().ok()?.next()?;
        self.current_step_index = next.index();
        Some(next)
    }

    /// Returns the recorded answer for a step.
    pub fn answer(&self, step: StepNumber) -> Option<&RecordedAnswer> {
        self.answers.get(&step)
    }

    /// Highest step with a recorded answer.
    pub fn highest_completed(&self) -> Option<StepNumber> {
        self.answers.keys().next_back().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yes() -> RecordedAnswer {
        RecordedAnswer {
            value: AnswerValue::Yes,
            codes: Vec::new(),
            answered_at: Utc::now(),
        }
    }

    #[test]
    fn test_should_start_at_first_step() {
        let session = WorkflowSession::start(Utc::now());
        assert_eq!(session.current_step().unwrap(), StepNumber::FIRST);
        assert!(session.answers.is_empty());
        assert!(session.highest_completed().is_none());
    }

    #[test]
    fn test_should_generate_distinct_ids() {
        let a = WorkflowSession::start(Utc::now());
        let b = WorkflowSession::start(Utc::now());
        assert_ne!(a.session_id, b.session_id);
    }

    #[test]
    fn test_should_advance_sequentially() {
        let mut session = WorkflowSession::start(Utc::now());
        for expected in 2..=21 {
            let step = session.current_step().unwrap();
            session.record(step, yes());
            assert_eq!(session.advance().unwrap().get(), expected);
        }
        assert_eq!(session.advance(), None);
        assert_eq!(session.current_step().unwrap(), StepNumber::LAST);
        assert_eq!(session.highest_completed().unwrap().get(), 20);
    }

    #[test]
    fn test_answers_serialize_with_step_keys() {
        let mut session = WorkflowSession::start(Utc::now());
        session.record(StepNumber::FIRST, yes());
        session.advance();

        let json = serde_json::to_string(&session).unwrap();
        let restored: WorkflowSession = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, session);
        assert!(restored.answer(StepNumber::FIRST).is_some());
    }
}
