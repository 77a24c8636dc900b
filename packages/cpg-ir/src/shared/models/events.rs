//! File change and progress event types (spec §6, §4.7, §4.8).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileChangeKind {
    Created,
    Modified,
    Deleted,
    Renamed,
}

/// A single file-system change, as supplied by the external change-source
/// collaborator (spec §6). The core never watches the file system itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileChangeEvent {
    pub path: String,
    pub kind: FileChangeKind,
    pub old_path: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl FileChangeEvent {
    pub fn created(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: FileChangeKind::Created,
            old_path: None,
            timestamp: Utc::now(),
        }
    }

    pub fn modified(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: FileChangeKind::Modified,
            old_path: None,
            timestamp: Utc::now(),
        }
    }

    pub fn deleted(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: FileChangeKind::Deleted,
            old_path: None,
            timestamp: Utc::now(),
        }
    }

    pub fn renamed(old_path: impl Into<String>, new_path: impl Into<String>) -> Self {
        Self {
            path: new_path.into(),
            kind: FileChangeKind::Renamed,
            old_path: Some(old_path.into()),
            timestamp: Utc::now(),
        }
    }
}

/// Progress reported by the Populator to a caller-supplied callback.
/// Carries only counts and the current file — never user-code state
/// (spec §6 egress).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub processed: usize,
    pub total: usize,
    pub current_file: String,
}
