//! Snapshot errors.

use heapscope_census::{AccessError, LayoutError};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while opening a heap snapshot
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("Process {0} is not running")]
    ProcessNotFound(u32),

    #[error("No heap snapshot for process {pid} in {}", dir.display())]
    SnapshotMissing { pid: u32, dir: PathBuf },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Snapshot is empty")]
    Empty,

    #[error("Malformed snapshot header: {0}")]
    Header(#[source] serde_json::Error),

    #[error("Snapshot belongs to process {found}, expected {expected}")]
    PidMismatch { expected: u32, found: u32 },

    #[error("Version mismatch: expected {expected}, got {got}")]
    VersionMismatch { expected: u32, got: u32 },

    #[error("Unusable heap layout: {0}")]
    BadLayout(#[from] LayoutError),
}

impl SnapshotError {
    /// Map onto the census error taxonomy for process `pid`.
    pub fn into_access_error(self, pid: u32) -> AccessError {
        match self {
            Self::VersionMismatch { got, .. } => AccessError::UnsupportedRuntime {
                found: format!("heap export format {got}"),
            },
            Self::BadLayout(err) => AccessError::UnsupportedRuntime {
                found: format!("heap layout ({err})"),
            },
            other => AccessError::Attach {
                pid,
                reason: other.to_string(),
            },
        }
    }
}
