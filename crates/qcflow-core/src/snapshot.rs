//! Serializable snapshot of an active inspection.
//!
//! The engine saves a snapshot after every state change so an interrupted
//! station can resume the unit in progress, including an open category
//! submission and the timing collected so far.

use crate::cursor::WorkflowCursor;
use crate::error::{QcError, Result};
use crate::timer::CycleTimer;
use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Everything needed to resume an inspection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub project_id: i64,
    pub technician_id: Option<i64>,
    pub cursor: WorkflowCursor,
    pub timer: CycleTimer,
    /// Production counter for this check-in.
    pub counter: u32,
    pub saved_at: DateTime<Utc>,
}

impl SessionSnapshot {
    /// Writes the snapshot as JSON, replacing any previous one.
    ///
    /// The file is written next to its final path and renamed into place.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(self)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, content)
            .with_context(|| format!("failed to write {}", tmp.display()))?;
        std::fs::rename(&tmp, path)
            .with_context(|| format!("failed to replace {}", path.display()))?;
        Ok(())
    }

    /// Reads a snapshot. Returns `None` when no snapshot exists.
    ///
    /// # Errors
    ///
    /// Returns `QcError::CorruptedSnapshot` if the file cannot be parsed.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)?;
        let snapshot: Self = serde_json::from_str(&content).map_err(|e| {
            tracing::warn!(path = %path.display(), error = %e, "unreadable session snapshot");
            QcError::CorruptedSnapshot(path.to_path_buf())
        })?;
        // The cursor index must still name a catalog step
        snapshot
            .cursor
            .current()
            .map_err(|_| QcError::CorruptedSnapshot(path.to_path_buf()))?;
        Ok(Some(snapshot))
    }

    /// Deletes the snapshot if present.
    pub fn remove(path: &Path) -> Result<()> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::StepNumber;
    use crate::category::{Category, Slot};
    use crate::policy::Answer;
    use tempfile::TempDir;

    fn sample() -> SessionSnapshot {
        let now = Utc::now();
        let mut cursor = WorkflowCursor::new(now);
        cursor
            .submit(StepNumber::FIRST, &Answer::yes(), now)
            .unwrap();
        let mut timer = CycleTimer::new();
        timer.start_unit(now);
        SessionSnapshot {
            project_id: 28,
            technician_id: Some(4),
            cursor,
            timer,
            counter: 6,
            saved_at: now,
        }
    }

    #[test]
    fn test_save_and_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("data").join("session.json");
        let snapshot = sample();

        snapshot.save(&path).unwrap();
        let loaded = SessionSnapshot::load(&path).unwrap().unwrap();

        assert_eq!(loaded, snapshot);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_open_category_submission_survives() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("session.json");
        let mut snapshot = sample();
        let now = Utc::now();
        for n in 2..=14u8 {
            let answer = match n {
                2 => Answer::with_codes(["BOX123"]),
                9 => Answer::with_codes(["BAT1", "BAT2"]),
                _ => Answer::yes(),
            };
            snapshot
                .cursor
                .submit(StepNumber::new(n).unwrap(), &answer, now)
                .unwrap();
        }
        snapshot.cursor.set_category_code(Slot::Item1, "B1").unwrap();
        snapshot.cursor.toggle_category(Slot::Item1, Category::D).unwrap();

        snapshot.save(&path).unwrap();
        let loaded = SessionSnapshot::load(&path).unwrap().unwrap();

        assert!(loaded.cursor.is_category_open());
        let draft = loaded.cursor.draft().unwrap();
        assert_eq!(draft.item1.code, "B1");
        assert_eq!(draft.item1.category, Some(Category::D));
    }

    #[test]
    fn test_missing_snapshot() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("session.json");
        assert!(SessionSnapshot::load(&path).unwrap().is_none());
        assert!(SessionSnapshot::remove(&path).is_ok());
    }

    #[test]
    fn test_corrupted_snapshot() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("session.json");
        std::fs::write(&path, "{ not json").unwrap();

        let result = SessionSnapshot::load(&path);
        assert!(matches!(result, Err(QcError::CorruptedSnapshot(_))));
    }
}
