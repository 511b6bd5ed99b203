//! Additive event payloads published by the sender and receiver.
//!
//! These are not part of the wire format; they are the channel contract
//! between the transfer core and whatever UI an external collaborator
//! builds on top of it (see the workspace-level design notes on
//! "Approval/cancellation across an async boundary").

use std::net::SocketAddr;

use crate::error::TransferError;

/// Throttled progress, emitted at most once per 100 ms per session (plus
/// always once more on completion, even if that falls inside the throttle
/// window).
#[derive(Clone, Debug, PartialEq)]
pub struct ProgressEvent {
    /// Total bytes the session will transfer once finished.
    pub bytes_total: u64,
    /// Bytes transferred so far.
    pub bytes_done: u64,
    /// Total files the session will transfer.
    pub files_total: u32,
    /// Files completed so far.
    pub files_done: u32,
    /// The file currently being transferred, if any.
    pub current_file: Option<String>,
    /// Instantaneous throughput, bytes per second.
    pub bytes_per_second: f64,
}

/// The single result every session resolves to.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionOutcome {
    /// The session completed successfully.
    Success {
        /// Number of files actually transferred (excludes skips).
        files_transferred: u32,
        /// Number of bytes actually transferred (excludes skips).
        bytes_transferred: u64,
        /// Number of files skipped via smart-sync.
        files_skipped: u32,
    },
    /// The session failed.
    Failed {
        /// A short, user-facing description of what went wrong.
        message: String,
    },
}

impl SessionOutcome {
    /// Builds a [`SessionOutcome::Failed`] from a [`TransferError`].
    #[must_use]
    pub fn from_error(error: &TransferError) -> Self {
        Self::Failed {
            message: error.to_string(),
        }
    }

    /// Returns `true` if this outcome represents success.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// A one-shot approval request published by the receiver before it begins
/// smart-sync analysis of an incoming package.
///
/// An external collaborator resolves `respond` with `true` to proceed or
/// `false` to reject; if nothing resolves it within 60 seconds the
/// receiver treats the request as rejected, matching a negative response
/// with reason `"approval timed out"`.
#[derive(Debug)]
pub struct ApprovalRequest {
    /// The package's display name.
    pub game_name: String,
    /// Total size in bytes of the incoming package.
    pub total_size: u64,
    /// The peer offering the transfer.
    pub from_peer: SocketAddr,
    /// The channel the receiver polls for a decision.
    pub respond: tokio::sync::oneshot::Sender<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_error_copies_the_display_message() {
        let error = TransferError::path("../escape.txt");
        let outcome = SessionOutcome::from_error(&error);
        match outcome {
            SessionOutcome::Failed { message } => {
                assert!(message.contains("unsafe relative path"));
            }
            SessionOutcome::Success { .. } => panic!("expected a failure outcome"),
        }
    }

    #[test]
    fn only_success_variant_reports_is_success() {
        let success = SessionOutcome::Success {
            files_transferred: 3,
            bytes_transferred: 1024,
            files_skipped: 0,
        };
        let failed = SessionOutcome::Failed {
            message: "boom".to_owned(),
        };
        assert!(success.is_success());
        assert!(!failed.is_success());
    }
}
