//! Failures produced while generating, calculating, or applying a delta.

use std::io;
use std::path::PathBuf;

/// Errors surfaced by the `delta` crate's three operations.
#[derive(Debug, thiserror::Error)]
pub enum DeltaError {
    /// Reading the file being signed or diffed failed.
    #[error("failed to read {path}: {source}")]
    Io {
        /// Path that was being read.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// A [`protocol::wire::DeltaInstruction::CopyFromTarget`] referenced a
    /// region outside the target file, which can only mean the signatures
    /// supplied to [`crate::calculate_delta`] were stale relative to the
    /// file actually being read.
    #[error("copy instruction references offset {offset} + length {length}, past target end")]
    InstructionOutOfRange {
        /// Offset named by the instruction.
        offset: u64,
        /// Length named by the instruction.
        length: u32,
    },
    /// A [`protocol::wire::DeltaInstruction::LiteralData`] referenced a
    /// region outside the literal byte buffer sent alongside the
    /// instruction stream, which can only mean the stream was truncated or
    /// the instructions were tampered with in transit.
    #[error("literal instruction references stream offset {stream_offset} + length {length}, past literal buffer end")]
    LiteralOutOfRange {
        /// Offset into the literal buffer named by the instruction.
        stream_offset: u32,
        /// Length named by the instruction.
        length: u32,
    },
    /// The reconstructed file's integrity hash did not match the
    /// sender-declared hash from the manifest.
    #[error("reconstructed file hash mismatch: expected {expected}, computed {actual}")]
    IntegrityMismatch {
        /// Hash declared by the sender's manifest entry.
        expected: String,
        /// Hash actually computed from the reconstructed bytes.
        actual: String,
    },
}

impl DeltaError {
    pub(crate) fn io(path: &std::path::Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
