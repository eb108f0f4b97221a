//! File-backed audit store.
//!
//! Checkpoints and category corrections are appended as JSON lines.
//! Quality answers are merged in place, so each session gets its own small
//! JSON file under `quality_answers/` and an upsert only rewrites that one.

use crate::checkpoint::Checkpoint;
use crate::error::{QcError, Result};
use crate::quality::{CategoryCorrection, QualityAnswerRecord};
use crate::tools::audit::AuditStore;
use anyhow::Context;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub const CHECKPOINTS_FILE: &str = "checkpoints.jsonl";
pub const QUALITY_ANSWERS_DIR: &str = "quality_answers";
pub const CORRECTIONS_FILE: &str = "category_corrections.jsonl";

/// Audit store writing under a data directory.
#[derive(Debug)]
pub struct JsonlAuditStore {
    data_dir: PathBuf,
    /// Serializes writers, quality files are read-modify-write.
    lock: Mutex<()>,
}

impl JsonlAuditStore {
    /// Creates a store rooted at `data_dir`. The directory is created on
    /// first write.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            lock: Mutex::new(()),
        }
    }

    /// Returns the data directory.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Reads back all recorded checkpoints.
    pub fn checkpoints(&self) -> Result<Vec<Checkpoint>> {
        read_lines(&self.data_dir.join(CHECKPOINTS_FILE))
    }

    /// Reads back all quality-answer records, ordered by session file.
    pub fn quality_answers(&self) -> Result<Vec<QualityAnswerRecord>> {
        let dir = self.data_dir.join(QUALITY_ANSWERS_DIR);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut paths = std::fs::read_dir(&dir)
            .with_context(|| format!("failed to read {}", dir.display()))?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<std::io::Result<Vec<_>>>()?;
        paths.retain(|path| path.extension().is_some_and(|ext| ext == "json"));
        paths.sort();

        let mut records = Vec::new();
        for path in paths {
            records.extend(read_records(&path)?);
        }
        Ok(records)
    }

    /// Reads the quality-answer records of one session.
    pub fn session_quality_answers(&self, session_id: &str) -> Result<Vec<QualityAnswerRecord>> {
        read_records(&self.quality_path(session_id))
    }

    fn quality_path(&self, session_id: &str) -> PathBuf {
        self.data_dir
            .join(QUALITY_ANSWERS_DIR)
            .join(format!("{session_id}.json"))
    }

    /// Reads back all category corrections.
    pub fn corrections(&self) -> Result<Vec<CategoryCorrection>> {
        read_lines(&self.data_dir.join(CORRECTIONS_FILE))
    }

    fn append<T: Serialize>(&self, file: &str, record: &T) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let path = self.data_dir.join(file);
        append_line(&path, record).map_err(|e| persistence_error(&path, e))
    }
}

impl AuditStore for JsonlAuditStore {
    fn record_checkpoint(&self, checkpoint: &Checkpoint) -> Result<()> {
        self.append(CHECKPOINTS_FILE, checkpoint)
    }

    fn upsert_quality_answers(&self, record: &QualityAnswerRecord) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let path = self.quality_path(&record.session_id);

        let mut records = read_records(&path).map_err(|e| persistence_error(&path, e))?;
        match records.iter_mut().find(|existing| existing.same_key(record)) {
            Some(existing) => existing.merge(record),
            None => records.push(record.clone()),
        }

        write_json(&path, &records).map_err(|e| persistence_error(&path, e))
    }

    fn record_category_correction(&self, correction: &CategoryCorrection) -> Result<()> {
        self.append(CORRECTIONS_FILE, correction)
    }
}

fn persistence_error(path: &Path, err: impl std::fmt::Display) -> QcError {
    QcError::PersistenceFailed(format!("{}: {}", path.display(), err))
}

fn ensure_parent(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    Ok(())
}

fn append_line<T: Serialize>(path: &Path, record: &T) -> anyhow::Result<()> {
    ensure_parent(path)?;
    let mut line = serde_json::to_string(record)?;
    line.push('\n');
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    file.write_all(line.as_bytes())?;
    Ok(())
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    ensure_parent(path)?;
    let content = serde_json::to_string_pretty(value)?;
    std::fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))
}

fn read_records(path: &Path) -> Result<Vec<QualityAnswerRecord>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    Ok(serde_json::from_str(&content)?)
}

fn read_lines<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).map_err(QcError::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{self, Phase};
    use crate::category::{CategoryAssignment, Category, ItemAssignment};
    use crate::checkpoint::{ScanContext, checkpoints_for};
    use crate::session::{AnswerValue, RecordedAnswer, SessionId};
    use crate::tools::location::GeoPoint;
    use chrono::Utc;
    use tempfile::TempDir;

    fn answer(codes: &[&str]) -> RecordedAnswer {
        RecordedAnswer {
            value: AnswerValue::Yes,
            codes: codes.iter().map(|c| c.to_string()).collect(),
            answered_at: Utc::now(),
        }
    }

    #[test]
    fn test_checkpoints_append() {
        let temp = TempDir::new().unwrap();
        let store = JsonlAuditStore::new(temp.path().join("data"));
        let session = SessionId::new();
        let ctx = ScanContext {
            session_id: &session,
            project_id: 28,
            technician_id: None,
            location: GeoPoint::UNAVAILABLE,
            assignment: None,
            timestamp: Utc::now(),
        };
        let codes = vec!["BAT1".to_string(), "BAT2".to_string()];

        for checkpoint in checkpoints_for(catalog::step_at(9).unwrap(), &codes, &ctx) {
            store.record_checkpoint(&checkpoint).unwrap();
        }

        let stored = store.checkpoints().unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[1].scanned_code, "BAT2");
        assert!(temp.path().join("data").join(CHECKPOINTS_FILE).exists());
    }

    #[test]
    fn test_quality_upsert_merges_by_session_and_phase() {
        let temp = TempDir::new().unwrap();
        let store = JsonlAuditStore::new(temp.path());
        let session = SessionId::new();

        let first = QualityAnswerRecord::for_step(
            &session,
            28,
            None,
            catalog::step_at(1).unwrap(),
            &answer(&[]),
            None,
        );
        let second = QualityAnswerRecord::for_step(
            &session,
            28,
            None,
            catalog::step_at(2).unwrap(),
            &answer(&["BOX123"]),
            None,
        );
        let repack = QualityAnswerRecord::for_step(
            &session,
            28,
            None,
            catalog::step_at(15).unwrap(),
            &answer(&["BOX1B"]),
            None,
        );
        store.upsert_quality_answers(&first).unwrap();
        store.upsert_quality_answers(&second).unwrap();
        store.upsert_quality_answers(&repack).unwrap();

        let records = store.quality_answers().unwrap();
        assert_eq!(records.len(), 2);

        let categorization = records
            .iter()
            .find(|r| r.phase == Phase::Categorization)
            .unwrap();
        assert_eq!(categorization.field("respuesta1"), Some("si"));
        assert_eq!(categorization.field("respuesta2"), Some("si"));
        assert_eq!(categorization.field("escaneo2"), Some("BOX123"));
    }

    #[test]
    fn test_quality_records_kept_per_session_file() {
        let temp = TempDir::new().unwrap();
        let store = JsonlAuditStore::new(temp.path());
        let first = SessionId::new();
        let second = SessionId::new();

        for session in [&first, &second] {
            let record = QualityAnswerRecord::for_step(
                session,
                28,
                None,
                catalog::step_at(1).unwrap(),
                &answer(&[]),
                None,
            );
            store.upsert_quality_answers(&record).unwrap();
        }
        let update = QualityAnswerRecord::for_step(
            &second,
            28,
            None,
            catalog::step_at(2).unwrap(),
            &answer(&["BOX9"]),
            None,
        );
        store.upsert_quality_answers(&update).unwrap();

        let dir = temp.path().join(QUALITY_ANSWERS_DIR);
        assert!(dir.join(format!("{first}.json")).exists());
        assert!(dir.join(format!("{second}.json")).exists());
        assert_eq!(store.quality_answers().unwrap().len(), 2);

        let first_records = store.session_quality_answers(first.as_str()).unwrap();
        assert_eq!(first_records.len(), 1);
        assert_eq!(first_records[0].field("escaneo2"), None);

        let second_records = store.session_quality_answers(second.as_str()).unwrap();
        assert_eq!(second_records[0].field("escaneo2"), Some("BOX9"));
    }

    #[test]
    fn test_category_correction_append() {
        let temp = TempDir::new().unwrap();
        let store = JsonlAuditStore::new(temp.path());
        let assignment = CategoryAssignment {
            item1: ItemAssignment {
                code: "B1".into(),
                category: Category::A,
            },
            item2: ItemAssignment {
                code: "B2".into(),
                category: Category::C,
            },
        };
        let correction = CategoryCorrection::new(&SessionId::new(), 28, &assignment, Utc::now());

        store.record_category_correction(&correction).unwrap();

        let stored = store.corrections().unwrap();
        assert_eq!(stored, vec![correction]);
    }

    #[test]
    fn test_unwritable_data_dir() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();
        let store = JsonlAuditStore::new(blocker.join("data"));

        let correction = CategoryCorrection {
            session_id: "s".into(),
            project_id: 1,
            battery1_code: "B1".into(),
            battery1_category: Category::A,
            battery2_code: "B2".into(),
            battery2_category: Category::B,
            timestamp: Utc::now(),
        };
        let result = store.record_category_correction(&correction);
        assert!(matches!(result, Err(QcError::PersistenceFailed(_))));
    }
}
