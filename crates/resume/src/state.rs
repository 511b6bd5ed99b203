//! The resumable transfer-state record itself (§3 `TransferState`).

use std::collections::BTreeSet;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use checksums::strong::{Sha256, StrongDigest};
use serde::{Deserialize, Serialize};

/// Filename the state file is written under, at the destination root
/// (§6.5).
pub const RESUME_STATE_FILENAME: &str = ".steamroll_transfer_state";

/// A state file older than this (by its `last_updated_at`) is treated as
/// expired and discarded rather than resumed from (§3, §6.5).
pub const RESUME_STATE_MAX_AGE: Duration = Duration::from_secs(24 * 3600);

/// Minimum cadence at which an in-progress receiver persists state (§6.5:
/// "Saved at least every 5 seconds during reception").
pub const RESUME_SAVE_INTERVAL: Duration = Duration::from_secs(5);

/// Resumable progress for one package transfer to one destination.
///
/// Reused across a restart only if [`Self::fingerprint`] matches the
/// incoming manifest's recomputed fingerprint and the state is not
/// expired — see [`Self::is_usable_for`].
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransferState {
    /// The package's display name.
    pub game_name: String,
    /// Total number of files the manifest declares.
    pub total_files: u64,
    /// Total size in bytes the manifest declares.
    pub total_size: u64,
    /// Count of files fully received and verified so far.
    pub files_completed: u64,
    /// Bytes received across all completed files so far.
    pub bytes_received: u64,
    /// Relative paths of files fully received and verified. A `BTreeSet`
    /// rather than a hash set so the serialized state is stable and
    /// diff-friendly across saves.
    pub completed_relative_paths: BTreeSet<String>,
    /// Unix timestamp, in seconds, when this transfer began.
    pub started_at_unix_secs: u64,
    /// Unix timestamp, in seconds, of the most recent save.
    pub last_updated_at_unix_secs: u64,
    /// SHA-256 fingerprint of the manifest this state was built against
    /// (see [`compute_fingerprint`]).
    pub fingerprint: String,
}

impl TransferState {
    /// Starts tracking a new transfer against `fingerprint`.
    #[must_use]
    pub fn new(
        game_name: impl Into<String>,
        total_files: u64,
        total_size: u64,
        fingerprint: impl Into<String>,
    ) -> Self {
        let now = unix_now();
        Self {
            game_name: game_name.into(),
            total_files,
            total_size,
            files_completed: 0,
            bytes_received: 0,
            completed_relative_paths: BTreeSet::new(),
            started_at_unix_secs: now,
            last_updated_at_unix_secs: now,
            fingerprint: fingerprint.into(),
        }
    }

    /// Records `relative_path` as fully received and verified, and bumps
    /// the completion counters if it was not already recorded.
    ///
    /// Idempotent: recording the same path twice (e.g. a resumed transfer
    /// replaying a file the sender retransmits) does not double-count it.
    pub fn mark_file_complete(&mut self, relative_path: impl Into<String>, file_size: u64) {
        if self.completed_relative_paths.insert(relative_path.into()) {
            self.files_completed += 1;
            self.bytes_received += file_size;
        }
        self.last_updated_at_unix_secs = unix_now();
    }

    /// Whether `relative_path` was already fully received in a prior run.
    #[must_use]
    pub fn is_completed(&self, relative_path: &str) -> bool {
        self.completed_relative_paths.contains(relative_path)
    }

    /// Whether this state is too old to trust, per [`RESUME_STATE_MAX_AGE`].
    #[must_use]
    pub fn is_expired(&self) -> bool {
        unix_now().saturating_sub(self.last_updated_at_unix_secs) > RESUME_STATE_MAX_AGE.as_secs()
    }

    /// Whether this state may be reused for a manifest whose recomputed
    /// fingerprint is `fingerprint` (§3 invariant: "reuse only if
    /// fingerprint matches the incoming manifest").
    #[must_use]
    pub fn is_usable_for(&self, fingerprint: &str) -> bool {
        self.fingerprint == fingerprint && !self.is_expired()
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock reads after the unix epoch")
        .as_secs()
}

/// Computes the file-list fingerprint: SHA-256 over every `path:size:hash`
/// line, one per manifest entry, sorted by path before hashing.
///
/// Sorting first is a deliberate refinement over hashing manifest order
/// directly: file-system directory iteration order is not guaranteed
/// stable between runs, and an order-sensitive fingerprint would treat an
/// identical file list as a mismatch purely because the sender happened to
/// enumerate it differently, defeating resume for no reason.
#[must_use]
pub fn compute_fingerprint<'a>(entries: impl IntoIterator<Item = (&'a str, u64, &'a str)>) -> String {
    let mut lines: Vec<String> = entries
        .into_iter()
        .map(|(path, size, hash)| format!("{path}:{size}:{hash}"))
        .collect();
    lines.sort_unstable();

    let mut hasher = Sha256::new();
    for line in &lines {
        hasher.update(line.as_bytes());
        hasher.update(b"\n");
    }
    hex_encode(&hasher.finalize())
}

fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write as _;
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(&mut out, "{byte:02x}");
    }
    out
}
