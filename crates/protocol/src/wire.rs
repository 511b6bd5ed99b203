//! The wire-level data model: headers, manifests, acknowledgements, and
//! delta primitives exchanged in that order over one TCP session.
//!
//! Order of frames for a package transfer: [`TransferHeader`], then a
//! `Vec<FileEntry>` manifest, then one [`Ack`], then per-file payloads (see
//! the `sender`/`receiver` crates), then a final [`TransferComplete`] frame.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The three protocol magics, selecting which stream adapters wrap the raw
/// socket bytes after the header.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Magic {
    /// Plain bytes, no compression, no encryption.
    #[serde(rename = "STEAMROLL_TRANSFER_V1")]
    V1,
    /// GZip-compressed payload bytes, no encryption.
    #[serde(rename = "STEAMROLL_TRANSFER_V2")]
    V2,
    /// AES-256-GCM encrypted record layer; payload may additionally be
    /// GZip-compressed before encryption.
    #[serde(rename = "STEAMROLL_TRANSFER_V3")]
    V3,
}

impl Magic {
    /// Chooses the magic implied by a compression/encryption policy, per
    /// the sender's rule: `V1` if neither is requested, `V2` if only
    /// compression, `V3` if encryption is required (compression may still
    /// apply on top).
    #[must_use]
    pub const fn select(enable_compression: bool, require_encryption: bool) -> Self {
        if require_encryption {
            Self::V3
        } else if enable_compression {
            Self::V2
        } else {
            Self::V1
        }
    }

    /// Returns whether sessions using this magic carry an AES-256-GCM
    /// record layer.
    #[must_use]
    pub const fn is_encrypted(self) -> bool {
        matches!(self, Self::V3)
    }
}

/// In-stream compression applied to file payload bytes.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Compression {
    /// No compression.
    None,
    /// GZip (header + deflate body + trailer).
    GZip,
}

/// What kind of session this connection carries.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum TransferType {
    /// A full package directory tree.
    Package,
    /// A single opaque save-game payload.
    SaveSync,
    /// A request for the peer's package library listing.
    ListRequest,
    /// A request that the peer initiate an outbound send back to us.
    PullRequest,
    /// A bandwidth measurement session.
    SpeedTest,
    /// A request for a single swarm block of a package file.
    BlockRequest,
}

/// The first frame sent in every session.
///
/// Invariant: `total_size` must equal the sum of sizes in the manifest
/// frame that immediately follows; a receiver observing a mismatch rejects
/// the session with [`crate::TransferError::protocol`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransferHeader {
    /// Protocol magic selecting the session's stream adapters.
    pub magic: Magic,
    /// The package's display name.
    pub game_name: String,
    /// Total number of files described by the following manifest.
    pub total_files: u32,
    /// Total size in bytes of all files in the manifest.
    pub total_size: u64,
    /// What this session carries.
    pub transfer_type: TransferType,
    /// In-stream compression used for file payload bytes.
    pub compression: Compression,
    /// Whether the sender is willing to accept delta signatures in the ACK.
    pub supports_delta: bool,
    /// Whether the sender believes the destination already received this
    /// package (set from the receiver's marker file on a prior attempt).
    pub is_received: bool,
}

/// One file described in the manifest.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FileEntry {
    /// Forward-slash-normalized relative path. Must pass
    /// [`pathguard::ensure_safe_relative_path`] before being joined to a
    /// destination root.
    pub relative_path: String,
    /// File size in bytes.
    pub size: u64,
    /// Lowercase-hex integrity hash (XxHash64, per §4.3).
    pub hash: String,
    /// Whether this entry is eligible for delta-sync (source-side
    /// eligibility per §4.6; the final decision also depends on whether
    /// the receiver supplies signatures for it).
    pub use_delta: bool,
}

/// The receiver's single reply to the manifest.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Ack {
    /// Whether the receiver accepts the transfer at all.
    pub accepted: bool,
    /// Rejection reason, set only when `accepted` is `false`.
    pub reason: Option<String>,
    /// Relative paths the receiver already has, byte-identical.
    pub skipped_paths: Vec<String>,
    /// Whether the receiver is able to apply delta payloads.
    pub supports_delta: bool,
    /// Block signatures the receiver computed for existing local files,
    /// keyed by relative path, for files it elected to delta-sync.
    pub delta_signatures: HashMap<String, Vec<BlockSignature>>,
}

impl Ack {
    /// Builds a plain acceptance with no skips and no delta signatures.
    #[must_use]
    pub fn accept() -> Self {
        Self {
            accepted: true,
            reason: None,
            skipped_paths: Vec::new(),
            supports_delta: true,
            delta_signatures: HashMap::new(),
        }
    }

    /// Builds a rejection carrying `reason`.
    #[must_use]
    pub fn reject(reason: impl Into<String>) -> Self {
        Self {
            accepted: false,
            reason: Some(reason.into()),
            skipped_paths: Vec::new(),
            supports_delta: false,
            delta_signatures: HashMap::new(),
        }
    }
}

/// A signature over one 64 KiB (or shorter, for the final chunk) region of
/// an existing target file.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct BlockSignature {
    /// Byte offset of this block within the target file.
    pub offset: u64,
    /// Length of this block in bytes; at most [`DELTA_BLOCK_SIZE`].
    pub length: u32,
    /// Rolling (Adler-32-style) weak hash, see `delta::rolling`.
    pub weak: u32,
    /// XxHash64 strong hash, as an 8-byte little-endian digest reinterpreted
    /// as `u64` for compact wire representation.
    pub strong: u64,
    /// Zero-based index of this block within the file.
    pub index: u32,
}

/// The block size used for delta signatures (§4.6): 64 KiB.
pub const DELTA_BLOCK_SIZE: u32 = 64 * 1024;

/// The block size used by the swarm coordinator (§4.10): 4 MiB.
pub const SWARM_BLOCK_SIZE: u64 = 4 * 1024 * 1024;

/// The maximum size of any single frame payload (§6.2): 128 MiB.
pub const MAX_FRAME_LEN: u32 = 128 * 1024 * 1024;

/// One instruction in a delta reconstruction program.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum DeltaInstruction {
    /// Copy `length` bytes from the existing target file starting at
    /// `offset`.
    CopyFromTarget {
        /// Index of the matched target block (informational; the copy
        /// itself uses `offset`/`length`).
        target_block_index: u32,
        /// Byte offset within the target file to copy from.
        offset: u64,
        /// Number of bytes to copy.
        length: u32,
    },
    /// Copy `length` bytes from the literal byte buffer starting at
    /// `stream_offset`.
    LiteralData {
        /// Byte offset within the literal buffer.
        stream_offset: u32,
        /// Number of bytes to copy.
        length: u32,
    },
}

/// The one-byte payload-mode marker preceding a delta payload.
pub const DELTA_MODE_DELTA: u8 = 0x01;
/// The one-byte payload-mode marker preceding a whole-file payload sent
/// for a file that *was* offered delta signatures but whose delta savings
/// fell below the eligibility threshold.
pub const DELTA_MODE_WHOLE_FILE: u8 = 0x00;

/// The fixed-size header preceding a delta payload's variable-length
/// sections, all fields little-endian.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct DeltaPayloadHeader {
    /// Number of [`DeltaInstruction`] values encoded in `instructions_bytes`.
    pub instruction_count: u32,
    /// Length in bytes of the literal data section.
    pub literal_len: u32,
    /// Length in bytes of the serialized instructions section.
    pub instructions_len: u32,
}

/// The frame following a [`TransferType::BlockRequest`] header, naming the
/// exact byte range of a package file's swarm block the requester wants
/// streamed back (§4.10).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BlockRequestDetails {
    /// Forward-slash-normalized relative path of the file the block
    /// belongs to, validated the same way a manifest entry is.
    pub relative_path: String,
    /// Byte offset within the file where the block begins.
    pub offset: u64,
    /// Length of the block in bytes; at most [`SWARM_BLOCK_SIZE`].
    pub length: u32,
}

/// The final frame sent by the receiver on a successful transfer.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransferComplete {
    /// Number of files the receiver actually wrote (excludes skips).
    pub files_transferred: u32,
    /// Total bytes the receiver wrote to disk (excludes skips).
    pub bytes_transferred: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magic_selection_matches_the_documented_rule() {
        assert_eq!(Magic::select(false, false), Magic::V1);
        assert_eq!(Magic::select(true, false), Magic::V2);
        assert_eq!(Magic::select(false, true), Magic::V3);
        assert_eq!(Magic::select(true, true), Magic::V3);
    }

    #[test]
    fn only_v3_reports_encrypted() {
        assert!(!Magic::V1.is_encrypted());
        assert!(!Magic::V2.is_encrypted());
        assert!(Magic::V3.is_encrypted());
    }

    #[test]
    fn magic_serializes_to_the_documented_wire_strings() {
        assert_eq!(
            serde_json::to_string(&Magic::V1).unwrap(),
            "\"STEAMROLL_TRANSFER_V1\""
        );
        assert_eq!(
            serde_json::to_string(&Magic::V3).unwrap(),
            "\"STEAMROLL_TRANSFER_V3\""
        );
    }

    #[test]
    fn ack_accept_and_reject_have_sensible_defaults() {
        let accept = Ack::accept();
        assert!(accept.accepted);
        assert!(accept.reason.is_none());

        let reject = Ack::reject("disk full");
        assert!(!reject.accepted);
        assert_eq!(reject.reason.as_deref(), Some("disk full"));
    }

    #[test]
    fn transfer_header_round_trips_through_json() {
        let header = TransferHeader {
            magic: Magic::V2,
            game_name: "Example Game".to_owned(),
            total_files: 3,
            total_size: 10_046,
            transfer_type: TransferType::Package,
            compression: Compression::GZip,
            supports_delta: true,
            is_received: false,
        };
        let json = serde_json::to_vec(&header).unwrap();
        let decoded: TransferHeader = serde_json::from_slice(&json).unwrap();
        assert_eq!(decoded.game_name, header.game_name);
        assert_eq!(decoded.total_size, header.total_size);
        assert_eq!(decoded.magic, header.magic);
    }

    #[test]
    fn delta_instruction_round_trips_through_json() {
        let copy = DeltaInstruction::CopyFromTarget {
            target_block_index: 2,
            offset: 131_072,
            length: 65_536,
        };
        let literal = DeltaInstruction::LiteralData {
            stream_offset: 0,
            length: 128,
        };
        for instruction in [copy, literal] {
            let json = serde_json::to_vec(&instruction).unwrap();
            let decoded: DeltaInstruction = serde_json::from_slice(&json).unwrap();
            assert_eq!(decoded, instruction);
        }
    }
}
