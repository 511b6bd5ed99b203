//! Errors specific to the swarm coordinator, convertible into the
//! workspace-wide [`protocol::TransferError`] at the boundary where a
//! swarm session is reported to a caller.

use protocol::TransferError;

/// Failures that can occur while coordinating or executing a swarm
/// download.
#[derive(Debug, thiserror::Error)]
pub enum SwarmError {
    /// A block was requeued past [`crate::job::MAX_RETRY_ATTEMPTS`] and is
    /// permanently abandoned, making the whole swarm result a failure
    /// (§4.10 "if any block is permanently abandoned, the whole swarm
    /// result is failure").
    #[error("block {index} permanently abandoned after {attempts} failed attempts")]
    BlockAbandoned {
        /// Index of the abandoned block.
        index: u32,
        /// Number of attempts made before abandonment.
        attempts: u32,
    },

    /// A swarm download was requested with no candidate source peers.
    #[error("no source peers available for swarm download")]
    NoPeersAvailable,

    /// A per-block or per-connection transfer error.
    #[error(transparent)]
    Transfer(#[from] TransferError),
}

impl From<SwarmError> for TransferError {
    fn from(err: SwarmError) -> Self {
        match err {
            SwarmError::Transfer(inner) => inner,
            other => TransferError::protocol(other.to_string()),
        }
    }
}
