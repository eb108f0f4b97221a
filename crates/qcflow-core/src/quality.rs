//! Quality-answer and category-correction records.
//!
//! Besides checkpoints, every accepted step is written to the quality-answer
//! service. The service keeps one record per session per phase and merges
//! each step's fields into it (`respuesta{N}`, and `escaneo{N}` for scan
//! steps). The terminal step also carries the running average box time.

use crate::catalog::{Phase, StepDefinition};
use crate::category::{Category, CategoryAssignment};
use crate::session::{RecordedAnswer, SessionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One upserted quality-answer record, keyed by `session_id + phase`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityAnswerRecord {
    pub session_id: String,
    pub project_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technician_id: Option<i64>,
    pub phase: Phase,

    /// Per-step fields such as `respuesta3 = "si"` or `escaneo9 = "BAT1,BAT2"`.
    #[serde(flatten)]
    pub fields: BTreeMap<String, String>,

    /// Running average seconds per box, only sent with step 21.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_box_time: Option<u64>,

    pub timestamp: DateTime<Utc>,
}

impl QualityAnswerRecord {
    /// Builds the record carrying a single step's answer.
    pub fn for_step(
        session_id: &SessionId,
        project_id: i64,
        technician_id: Option<i64>,
        step: &StepDefinition,
        answer: &RecordedAnswer,
        avg_box_time: Option<u64>,
    ) -> Self {
        let number = step.number.get();
        let mut fields = BTreeMap::new();
        fields.insert(format!("respuesta{number}"), answer.value.as_wire().to_string());
        if !answer.codes.is_empty() {
            fields.insert(format!("escaneo{number}"), answer.codes.join(","));
        }

        Self {
            session_id: session_id.to_string(),
            project_id,
            technician_id,
            phase: step.phase,
            fields,
            avg_box_time: if step.is_last() { avg_box_time } else { None },
            timestamp: answer.answered_at,
        }
    }

    /// Whether two records address the same upsert key.
    pub fn same_key(&self, other: &Self) -> bool {
        self.session_id == other.session_id && self.phase == other.phase
    }

    /// Merges a later record for the same key into this one.
    pub fn merge(&mut self, update: &Self) {
        self.fields
            .extend(update.fields.iter().map(|(k, v)| (k.clone(), v.clone())));
        if update.avg_box_time.is_some() {
            self.avg_box_time = update.avg_box_time;
        }
        if update.technician_id.is_some() {
            self.technician_id = update.technician_id;
        }
        self.timestamp = update.timestamp;
    }

    /// Returns a field value, e.g. `field("respuesta14")`.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// Correction written to the session record once both batteries are
/// classified at the branch step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCorrection {
    pub session_id: String,
    pub project_id: i64,
    pub battery1_code: String,
    pub battery1_category: Category,
    pub battery2_code: String,
    pub battery2_category: Category,
    pub timestamp: DateTime<Utc>,
}

impl CategoryCorrection {
    /// Builds the correction for a completed assignment.
    pub fn new(
        session_id: &SessionId,
        project_id: i64,
        assignment: &CategoryAssignment,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            session_id: session_id.to_string(),
            project_id,
            battery1_code: assignment.item1.code.clone(),
            battery1_category: assignment.item1.category,
            battery2_code: assignment.item2.code.clone(),
            battery2_category: assignment.item2.category,
            timestamp,
        }
    }
}
