//! Atomic persistence of [`TransferState`] at a destination root (§6.5).

use std::path::{Path, PathBuf};

use crate::error::ResumeError;
use crate::state::{TransferState, RESUME_STATE_FILENAME};

/// Path of the state file for `destination`.
#[must_use]
pub fn state_path(destination: &Path) -> PathBuf {
    destination.join(RESUME_STATE_FILENAME)
}

/// Loads the state file at `destination`, if present.
///
/// # Errors
///
/// Returns [`ResumeError::Io`] on any read failure other than the file not
/// existing, and [`ResumeError::Malformed`] if its contents are not valid
/// `TransferState` JSON.
pub fn load(destination: &Path) -> Result<Option<TransferState>, ResumeError> {
    let path = state_path(destination);
    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(Some(serde_json::from_str(&contents)?)),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(error) => Err(error.into()),
    }
}

/// Loads state for `destination` only if it exists, is unexpired, and its
/// fingerprint matches the incoming manifest's `fingerprint`.
///
/// A present-but-unusable state file (wrong fingerprint or expired) is
/// deleted so a subsequent [`save`] starts the destination clean, per §6.5:
/// "On mismatch the state is deleted."
///
/// # Errors
///
/// Returns [`ResumeError`] on any I/O or parse failure.
pub fn load_if_usable(
    destination: &Path,
    fingerprint: &str,
) -> Result<Option<TransferState>, ResumeError> {
    match load(destination)? {
        Some(state) if state.is_usable_for(fingerprint) => Ok(Some(state)),
        Some(_) => {
            delete(destination)?;
            Ok(None)
        }
        None => Ok(None),
    }
}

/// Persists `state` to `destination`'s state file atomically: serialized to
/// a sibling `.tmp` file, then renamed over the real path, so a crash
/// mid-write never leaves a half-written state file in place.
///
/// # Errors
///
/// Returns [`ResumeError::Io`] if the write or rename fails.
pub fn save(destination: &Path, state: &TransferState) -> Result<(), ResumeError> {
    let path = state_path(destination);
    let json = serde_json::to_string_pretty(state)?;
    let tmp_path = path.with_extension("tmp");
    std::fs::write(&tmp_path, json)?;
    std::fs::rename(&tmp_path, &path)?;
    tracing::debug!(path = %path.display(), files_completed = state.files_completed, "resume state saved");
    Ok(())
}

/// Deletes the state file at `destination`, if any. Called on clean
/// completion and when a stale/mismatched state is discarded.
///
/// # Errors
///
/// Returns [`ResumeError::Io`] on any removal failure other than the file
/// already being absent.
pub fn delete(destination: &Path) -> Result<(), ResumeError> {
    let path = state_path(destination);
    match std::fs::remove_file(&path) {
        Ok(()) => Ok(()),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(error) => Err(error.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = TransferState::new("Test Game", 3, 300, "fp-1");
        state.mark_file_complete("a.txt", 100);

        save(dir.path(), &state).unwrap();
        let loaded = load(dir.path()).unwrap().unwrap();
        assert_eq!(loaded, state);
    }

    #[test]
    fn load_missing_state_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load(dir.path()).unwrap().is_none());
    }

    #[test]
    fn load_if_usable_deletes_a_fingerprint_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let state = TransferState::new("Test Game", 1, 1, "fp-old");
        save(dir.path(), &state).unwrap();

        let result = load_if_usable(dir.path(), "fp-new").unwrap();
        assert!(result.is_none());
        assert!(!state_path(dir.path()).exists());
    }

    #[test]
    fn load_if_usable_returns_state_on_fingerprint_match() {
        let dir = tempfile::tempdir().unwrap();
        let state = TransferState::new("Test Game", 1, 1, "fp-match");
        save(dir.path(), &state).unwrap();

        let result = load_if_usable(dir.path(), "fp-match").unwrap();
        assert_eq!(result, Some(state));
    }

    #[test]
    fn delete_is_idempotent_when_nothing_exists() {
        let dir = tempfile::tempdir().unwrap();
        delete(dir.path()).unwrap();
        delete(dir.path()).unwrap();
    }

    #[test]
    fn no_tmp_file_survives_a_successful_save() {
        let dir = tempfile::tempdir().unwrap();
        let state = TransferState::new("Test Game", 1, 1, "fp");
        save(dir.path(), &state).unwrap();
        assert!(!state_path(dir.path()).with_extension("tmp").exists());
    }
}
