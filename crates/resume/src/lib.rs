#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! Crash-safe resume state for the receiver (§2.7, §3 `TransferState`, §6.5).
//!
//! # Overview
//!
//! A receiver persists a [`TransferState`] at `<destination>/.steamroll_transfer_state`
//! as it completes each file, so a crash or restart mid-transfer loses at
//! most the one file in flight. On startup, [`store::load_if_usable`]
//! returns the prior state only if its [`state::compute_fingerprint`]
//! matches the incoming manifest and it is not older than
//! [`RESUME_STATE_MAX_AGE`]; otherwise the stale file is discarded.
//!
//! [`DestinationLocks`] provides the per-destination mutual exclusion that
//! keeps two receiver sessions from writing the same destination's state
//! file concurrently.
//!
//! # Design
//!
//! State is written atomically: serialized to a sibling `.tmp` file, then
//! renamed over the real path, so a reader never observes a partially
//! written file. The fingerprint is computed over every manifest entry's
//! `path:size:hash`, sorted by path first so the result does not depend on
//! file-system enumeration order.
//!
//! # Errors
//!
//! All fallible operations return [`ResumeError`].

mod error;
mod lock;
mod state;
mod store;

pub use error::ResumeError;
pub use lock::{DestinationLocks, DESTINATION_LOCK_TIMEOUT};
pub use state::{
    compute_fingerprint, TransferState, RESUME_SAVE_INTERVAL, RESUME_STATE_FILENAME,
    RESUME_STATE_MAX_AGE,
};
pub use store::{delete, load, load_if_usable, save, state_path};
