use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::task::Task;

pub const EXPORT_VERSION: &str = "1.0";

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to encode backup: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Downloadable backup of the task list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub tasks: Vec<Task>,
    pub exported_at: DateTime<Utc>,
    pub version: String,
}

impl ExportDocument {
    pub fn new(tasks: &[Task], now: DateTime<Utc>) -> Self {
        Self {
            tasks: tasks.to_vec(),
            exported_at: now,
            version: EXPORT_VERSION.to_string(),
        }
    }

    /// e.g. `voice-todo-backup-2024-05-01.json`
    pub fn file_name(&self) -> String {
        format!("voice-todo-backup-{}.json", self.exported_at.format("%Y-%m-%d"))
    }

    pub fn to_json(&self) -> Result<String, ExportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the document into `dir`, returning the file path.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf, ExportError> {
        let data = self.to_json()?;
        fs::create_dir_all(dir).map_err(|source| ExportError::Write {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = dir.join(self.file_name());
        fs::write(&path, data).map_err(|source| ExportError::Write {
            path: path.clone(),
            source,
        })?;
        log::info!("Tasks exported to {}", path.display());
        Ok(path)
    }
}
