//! Failures from loading, saving, and locking resume state.

use std::path::PathBuf;

/// Errors surfaced by the `resume` crate.
#[derive(Debug, thiserror::Error)]
pub enum ResumeError {
    /// Reading, writing, or renaming the state file failed.
    #[error("resume state I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The state file's contents were not valid `TransferState` JSON.
    #[error("resume state file was not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),
    /// The per-destination lock was not acquired within the timeout,
    /// meaning another transfer currently owns this destination.
    #[error("destination {path} is busy: another transfer holds its lock")]
    DestinationBusy {
        /// The destination root whose lock could not be acquired.
        path: PathBuf,
    },
}
