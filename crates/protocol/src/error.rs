//! The workspace-wide error taxonomy.

use std::net::SocketAddr;
use std::path::PathBuf;

/// Every kind of failure a transfer session can end in.
///
/// Variants map directly onto the taxonomy in the design notes: Protocol,
/// Auth, Path, Integrity, Resource, Policy, Transient I/O, Cancellation.
/// Each variant carries enough context to log without re-deriving it from
/// the call site, but never carries secret material (pairing codes,
/// derived keys, PSK bytes are never stored in an error).
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    /// Malformed frame, unknown magic, oversize length, or a header/manifest
    /// size mismatch. Fatal: the connection is closed.
    #[error("protocol violation: {message}")]
    Protocol {
        /// Human-readable description of the violation.
        message: String,
    },

    /// Encryption was required but no paired key exists, or the handshake
    /// or a record failed to decrypt. Fatal: no retry, no plaintext fallback.
    #[error("authentication failed for {peer:?}: {message}")]
    Auth {
        /// The remote peer address, when known.
        peer: Option<SocketAddr>,
        /// Human-readable description of the failure.
        message: String,
    },

    /// A manifest entry or delta target carried an unsafe relative path.
    /// Fatal: the connection is closed immediately without consuming
    /// further payload bytes.
    #[error("unsafe relative path: {path}")]
    Path {
        /// The offending relative path as received on the wire.
        path: String,
    },

    /// A received or reconstructed file's hash did not match the
    /// sender-declared hash. The session is aborted; the whole package is
    /// considered untrusted.
    #[error("integrity check failed for {path}: expected {expected}, got {actual}")]
    Integrity {
        /// The relative path whose contents failed verification.
        path: String,
        /// The expected hash, as lowercase hex.
        expected: String,
        /// The computed hash, as lowercase hex.
        actual: String,
    },

    /// Insufficient disk space, or the per-destination mutex could not be
    /// acquired within its timeout. A negative ACK is sent before closing.
    #[error("resource unavailable: {message}")]
    Resource {
        /// Human-readable description of the resource constraint.
        message: String,
    },

    /// The approval prompt was rejected, or timed out after 60 seconds.
    /// A negative ACK is sent before closing.
    #[error("policy rejected the transfer: {reason}")]
    Policy {
        /// The reason reported back to the sender.
        reason: String,
    },

    /// A read/write failed on a file or socket, or a frame deadline
    /// expired. Per-block recoverable in swarm mode (requeued up to 3
    /// times); fatal to the session everywhere else.
    #[error("transient I/O error: {source}")]
    Io {
        /// The path involved, when the error is file-scoped.
        path: Option<PathBuf>,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The session or operation was cancelled. Not surfaced to the peer as
    /// an error; the connection is simply closed.
    #[error("operation cancelled")]
    Cancelled,
}

impl TransferError {
    /// Builds a [`TransferError::Protocol`] with a formatted message.
    #[must_use]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Builds a [`TransferError::Path`] for the given relative path.
    #[must_use]
    pub fn path(path: impl Into<String>) -> Self {
        Self::Path { path: path.into() }
    }

    /// Builds a [`TransferError::Resource`] with a formatted message.
    #[must_use]
    pub fn resource(message: impl Into<String>) -> Self {
        Self::Resource {
            message: message.into(),
        }
    }

    /// Builds a [`TransferError::Policy`] with the given rejection reason.
    #[must_use]
    pub fn policy(reason: impl Into<String>) -> Self {
        Self::Policy {
            reason: reason.into(),
        }
    }

    /// Builds a [`TransferError::Io`] wrapping a file-scoped I/O error.
    #[must_use]
    pub fn io_at(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: Some(path.into()),
            source,
        }
    }

    /// Returns `true` if this error is fatal to the whole session (as
    /// opposed to recoverable on a per-block basis, which only applies to
    /// [`TransferError::Io`] encountered inside the swarm coordinator).
    #[must_use]
    pub const fn is_session_fatal(&self) -> bool {
        !matches!(self, Self::Io { .. })
    }
}

impl From<std::io::Error> for TransferError {
    fn from(source: std::io::Error) -> Self {
        Self::Io { path: None, source }
    }
}
