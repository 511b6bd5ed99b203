//! Smart-sync analysis: deciding, per manifest entry, whether the receiver
//! already has the file (skip), can delta-sync against an existing copy
//! (offer signatures), or needs the whole file (§4.8, §4.9).

use std::collections::HashMap;
use std::path::Path;

use checksums::strong::Xxh64;
use protocol::wire::BlockSignature;
use protocol::{FileEntry, TransferError};
use tokio_util::sync::CancellationToken;

/// Below this size an existing file is hashed inline rather than handed to
/// the blocking pool; the syscall and hash cost is negligible and the
/// `spawn_blocking` round-trip would dominate.
const SMALL_FILE_SYNC_THRESHOLD: u64 = 1024 * 1024;

/// The outcome of comparing one manifest against the receiver's existing
/// files at `destination_root`.
#[derive(Debug, Default)]
pub struct SmartSyncPlan {
    /// Relative paths the receiver already holds, byte-identical.
    pub skipped_paths: Vec<String>,
    /// Block signatures offered for existing files eligible for delta-sync,
    /// keyed by relative path.
    pub delta_signatures: HashMap<String, Vec<BlockSignature>>,
}

/// Builds a [`SmartSyncPlan`] for `entries` against files already present
/// under `destination_root`.
///
/// `cancel` is checked once per chunk while hashing a large existing file
/// (see [`hash_existing`]), so an in-progress scan can be abandoned without
/// waiting for a multi-gigabyte file to finish hashing.
///
/// # Errors
///
/// Returns [`TransferError::Io`] if an existing file cannot be hashed or
/// signed, and [`TransferError::Cancelled`] if `cancel` is triggered while a
/// large file is being hashed.
pub async fn analyze(
    destination_root: &Path,
    entries: &[FileEntry],
    cancel: &CancellationToken,
) -> Result<SmartSyncPlan, TransferError> {
    let mut plan = SmartSyncPlan::default();

    for entry in entries {
        let existing = destination_root.join(&entry.relative_path);
        let Ok(metadata) = tokio::fs::metadata(&existing).await else {
            continue;
        };
        if !metadata.is_file() {
            continue;
        }

        let existing_hash = hash_existing(&existing, metadata.len(), cancel).await?;
        if existing_hash.eq_ignore_ascii_case(&entry.hash) {
            plan.skipped_paths.push(entry.relative_path.clone());
            continue;
        }

        if entry.use_delta && delta::is_size_eligible(entry.size, metadata.len()) {
            let path = existing.clone();
            let signatures = tokio::task::spawn_blocking(move || delta::generate_signatures(&path))
                .await
                .map_err(|e| TransferError::protocol(format!("signature task panicked: {e}")))?
                .map_err(|e| TransferError::io_at(&existing, std::io::Error::other(e)))?;
            plan.delta_signatures.insert(entry.relative_path.clone(), signatures);
        }
    }

    Ok(plan)
}

/// Hashes an existing file, using the synchronous non-cancellable path for
/// files below [`SMALL_FILE_SYNC_THRESHOLD`] (the blocking-task round-trip
/// would cost more than the hash itself) and the cancellable variant, run
/// in a blocking task, for everything larger.
async fn hash_existing(
    path: &Path,
    size: u64,
    cancel: &CancellationToken,
) -> Result<String, TransferError> {
    if size < SMALL_FILE_SYNC_THRESHOLD {
        let digest = checksums::hash_file::<Xxh64>(path)
            .map_err(|e| TransferError::io_at(path, std::io::Error::other(e)))?;
        return Ok(Xxh64::to_hex(digest));
    }
    let owned = path.to_owned();
    let token = cancel.clone();
    tokio::task::spawn_blocking(move || {
        checksums::hash_file_cancellable::<Xxh64>(&owned, &token).map(Xxh64::to_hex)
    })
    .await
    .map_err(|e| TransferError::protocol(format!("hash task panicked: {e}")))?
    .map_err(|e| match e {
        checksums::HashError::Cancelled { .. } => TransferError::Cancelled,
        other => TransferError::io_at(path, std::io::Error::other(other)),
    })
}
