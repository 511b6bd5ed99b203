//! The `.steamroll_received` marker file a receiver writes on successful
//! completion, so a later sender offering the same package can be told
//! `is_received: true` up front (§6.6).

use std::net::SocketAddr;
use std::path::Path;

use serde::{Deserialize, Serialize};

use protocol::wire::Magic;
use protocol::TransferError;

/// Filename of the completion marker, written at the package's destination
/// root.
pub const RECEIVED_MARKER_FILENAME: &str = ".steamroll_received";

/// Contents of the completion marker.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReceivedMarker {
    /// RFC3339 timestamp of when the transfer completed.
    #[serde(rename = "ReceivedAt")]
    pub received_at: String,
    /// The sending peer's address.
    #[serde(rename = "ReceivedFrom")]
    pub received_from: String,
    /// The protocol magic negotiated for the completed session (`[ADDED]`
    /// beyond the literal field list in §6.6, so a later sender can tell
    /// whether the prior transfer was encrypted without re-deriving it).
    #[serde(rename = "Magic")]
    pub magic: Magic,
}

impl ReceivedMarker {
    /// Builds a marker recording completion of a transfer from `peer`
    /// negotiated under `magic`, timestamped now.
    #[must_use]
    pub fn now(peer: SocketAddr, magic: Magic) -> Self {
        Self {
            received_at: humantime::format_rfc3339(std::time::SystemTime::now()).to_string(),
            received_from: peer.to_string(),
            magic,
        }
    }
}

/// Writes the marker file at `destination_root` atomically (tmp file then
/// rename), matching the resume-state file's crash-safety pattern.
///
/// # Errors
///
/// Returns [`TransferError::Io`] on any write or rename failure.
pub fn write(destination_root: &Path, marker: &ReceivedMarker) -> Result<(), TransferError> {
    let path = destination_root.join(RECEIVED_MARKER_FILENAME);
    let tmp_path = path.with_extension("tmp");
    let json = serde_json::to_string_pretty(marker)
        .map_err(|e| TransferError::protocol(format!("failed to encode received marker: {e}")))?;
    std::fs::write(&tmp_path, json).map_err(|e| TransferError::io_at(&tmp_path, e))?;
    std::fs::rename(&tmp_path, &path).map_err(|e| TransferError::io_at(&path, e))?;
    Ok(())
}

/// Reads the marker file at `destination_root`, if present.
///
/// # Errors
///
/// Returns [`TransferError::Io`] on any read failure other than the file
/// not existing, and [`TransferError::Protocol`] if its contents are not
/// valid marker JSON.
pub fn read(destination_root: &Path) -> Result<Option<ReceivedMarker>, TransferError> {
    let path = destination_root.join(RECEIVED_MARKER_FILENAME);
    match std::fs::read_to_string(&path) {
        Ok(contents) => serde_json::from_str(&contents)
            .map(Some)
            .map_err(|e| TransferError::protocol(format!("malformed received marker: {e}"))),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(error) => Err(TransferError::io_at(&path, error)),
    }
}
