//! Disk-space preflight check (§5 "disk-space check +500MiB buffer").

use std::path::Path;

use protocol::TransferError;

/// Extra headroom required beyond the manifest's declared total size,
/// covering filesystem overhead and in-flight temporary files (§5).
pub const DISK_SPACE_BUFFER_BYTES: u64 = 500 * 1024 * 1024;

/// Checks that `destination`'s filesystem has at least `required_bytes`
/// plus [`DISK_SPACE_BUFFER_BYTES`] of free space.
///
/// # Errors
///
/// Returns [`TransferError::Resource`] if free space is insufficient, or
/// if the free-space query itself fails (e.g. `destination` does not
/// exist yet and cannot be statted).
pub fn ensure_sufficient_space(destination: &Path, required_bytes: u64) -> Result<(), TransferError> {
    let statted = existing_ancestor(destination);
    let available = fs2::available_space(statted)
        .map_err(|e| TransferError::resource(format!("could not query free space: {e}")))?;

    let required = required_bytes.saturating_add(DISK_SPACE_BUFFER_BYTES);
    if available < required {
        return Err(TransferError::resource(format!(
            "insufficient disk space: {available} bytes free, {required} bytes required \
             ({required_bytes} for the transfer plus a {DISK_SPACE_BUFFER_BYTES} byte buffer)"
        )));
    }
    Ok(())
}

fn existing_ancestor(path: &Path) -> &Path {
    let mut candidate = path;
    loop {
        if candidate.exists() {
            return candidate;
        }
        match candidate.parent() {
            Some(parent) => candidate = parent,
            None => return candidate,
        }
    }
}
