//! Failures produced by key derivation, the V3 handshake, and the record layer.

use std::io;

use protocol::TransferError;

/// Errors surfaced by the `crypto` crate.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// The V3 handshake failed to establish a shared channel: a decryption
    /// failed, an unexpected challenge echo was received, or the peer
    /// closed the connection mid-handshake.
    #[error("handshake failed: {reason}")]
    HandshakeFailed {
        /// Human-readable description of what went wrong.
        reason: String,
    },
    /// A record's authentication tag did not verify. Per §4.5, this is
    /// fatal: the connection is closed, there is no retry and no fallback.
    #[error("record authentication failed")]
    DecryptionFailed,
    /// A record's nonce counter was not strictly greater than the last one
    /// accepted on this channel, which can only mean a replayed or
    /// reordered record.
    #[error("record nonce counter went backwards (replay or reorder detected)")]
    ReplayDetected,
    /// A record's declared ciphertext length exceeded the configured
    /// maximum, which would otherwise let a peer drive unbounded
    /// allocation before authentication is checked.
    #[error("record of {len} bytes exceeds the {max} byte ceiling")]
    RecordTooLarge {
        /// The length a peer declared for an incoming record.
        len: u32,
        /// The maximum this channel accepts.
        max: u32,
    },
    /// The underlying stream failed.
    #[error("record layer I/O error: {0}")]
    Io(#[from] io::Error),
}

impl From<CryptoError> for TransferError {
    fn from(error: CryptoError) -> Self {
        match error {
            CryptoError::HandshakeFailed { reason } => TransferError::Auth {
                peer: None,
                message: reason,
            },
            CryptoError::DecryptionFailed => TransferError::Auth {
                peer: None,
                message: "record authentication failed".to_owned(),
            },
            CryptoError::ReplayDetected => {
                TransferError::protocol("encrypted record replay or reorder detected")
            }
            CryptoError::RecordTooLarge { len, max } => TransferError::protocol(format!(
                "encrypted record of {len} bytes exceeds the {max} byte ceiling"
            )),
            CryptoError::Io(source) => TransferError::Io { path: None, source },
        }
    }
}
