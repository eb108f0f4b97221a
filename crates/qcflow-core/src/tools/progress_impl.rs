//! File-backed progress service.

use crate::error::{QcError, Result};
use crate::tools::progress::{ProgressService, ProgressUpdate};
use anyhow::Context;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const PROGRESS_FILE: &str = "progress.jsonl";

/// Progress service appending each update to `progress.jsonl`.
///
/// The last line for a project is its current total.
#[derive(Debug)]
pub struct JsonlProgressService {
    path: PathBuf,
}

impl JsonlProgressService {
    /// Creates a service writing under `data_dir`.
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            path: data_dir.as_ref().join(PROGRESS_FILE),
        }
    }

    fn append(&self, update: &ProgressUpdate) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let mut line = serde_json::to_string(update)?;
        line.push('\n');
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("failed to open {}", self.path.display()))?
            .write_all(line.as_bytes())?;
        Ok(())
    }
}

impl ProgressService for JsonlProgressService {
    fn completed_parts(&self, project_id: i64) -> Result<u32> {
        if !self.path.exists() {
            return Ok(0);
        }
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;

        let mut total = 0;
        for line in content.lines().filter(|l| !l.trim().is_empty()) {
            let update: ProgressUpdate = serde_json::from_str(line)?;
            if update.project_id == project_id {
                total = update.completed_parts;
            }
        }
        Ok(total)
    }

    fn update_completed_parts(&self, project_id: i64, completed_parts: u32) -> Result<()> {
        let update = ProgressUpdate {
            project_id,
            completed_parts,
            timestamp: chrono::Utc::now(),
        };
        self.append(&update)
            .map_err(|e| QcError::PersistenceFailed(format!("{}: {}", self.path.display(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_latest_total_per_project() {
        let temp = TempDir::new().unwrap();
        let service = JsonlProgressService::new(temp.path());

        assert_eq!(service.completed_parts(28).unwrap(), 0);

        service.update_completed_parts(28, 2).unwrap();
        service.update_completed_parts(7, 10).unwrap();
        service.update_completed_parts(28, 4).unwrap();

        assert_eq!(service.completed_parts(28).unwrap(), 4);
        assert_eq!(service.completed_parts(7).unwrap(), 10);
    }

    #[test]
    fn test_unreadable_progress_file() {
        let temp = TempDir::new().unwrap();
        let service = JsonlProgressService::new(temp.path());
        std::fs::write(temp.path().join(PROGRESS_FILE), "not json\n").unwrap();

        assert!(service.completed_parts(28).is_err());
    }
}
