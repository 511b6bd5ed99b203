//! Per-destination mutual exclusion (§4.9, §9 "the resume-state file is
//! writable only by the receiver owning that destination").

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use tokio::sync::{Mutex as TokioMutex, OwnedMutexGuard};

use crate::error::ResumeError;

/// How long a caller waits to acquire a destination's lock before giving up
/// (§4.9: "waits up to 2 s; rejects with reason otherwise").
pub const DESTINATION_LOCK_TIMEOUT: Duration = Duration::from_secs(2);

/// A process-wide registry of per-destination locks.
///
/// Each distinct destination path gets its own [`tokio::sync::Mutex`],
/// created lazily on first use and kept alive for the process lifetime —
/// the registry never shrinks, which is acceptable since the number of
/// distinct destinations a long-running receiver process serves is small
/// and bounded by local disk layout, not by peer count.
#[derive(Clone, Default)]
pub struct DestinationLocks {
    locks: Arc<StdMutex<HashMap<PathBuf, Arc<TokioMutex<()>>>>>,
}

impl DestinationLocks {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the lock for `destination`, waiting up to
    /// [`DESTINATION_LOCK_TIMEOUT`].
    ///
    /// # Errors
    ///
    /// Returns [`ResumeError::DestinationBusy`] if the lock is not
    /// acquired within the timeout.
    pub async fn acquire(
        &self,
        destination: &Path,
    ) -> Result<OwnedMutexGuard<()>, ResumeError> {
        let mutex = {
            let mut locks = self
                .locks
                .lock()
                .expect("destination lock registry is never poisoned");
            locks
                .entry(destination.to_path_buf())
                .or_insert_with(|| Arc::new(TokioMutex::new(())))
                .clone()
        };

        tokio::time::timeout(DESTINATION_LOCK_TIMEOUT, mutex.lock_owned())
            .await
            .map_err(|_| ResumeError::DestinationBusy {
                path: destination.to_path_buf(),
            })
    }
}
