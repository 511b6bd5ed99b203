#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `protocol` defines the wire types, length-prefixed JSON framing, and
//! error taxonomy shared by every endpoint in SteamRoll's peer-to-peer
//! transfer subsystem: the sender, the receiver, and the swarm
//! coordinator all speak frames defined here.
//!
//! # Design
//!
//! - [`wire`] holds the data model: [`wire::TransferHeader`],
//!   [`wire::FileEntry`], [`wire::Ack`], [`wire::BlockSignature`],
//!   [`wire::DeltaInstruction`], [`wire::BlockRequestDetails`], and the
//!   discriminated [`wire::Magic`] and [`wire::TransferType`] enums.
//! - [`framing`] implements `send_frame`/`receive_frame` over any
//!   `AsyncWrite`/`AsyncRead`, enforcing the 128 MiB frame-size ceiling and
//!   a 60 second per-frame deadline via a bounded reader.
//! - [`error`] defines [`error::TransferError`], the workspace-wide error
//!   taxonomy (Protocol, Auth, Path, Integrity, Resource, Policy, Io,
//!   Cancelled) that every other crate in the workspace re-exports from
//!   here rather than defining its own top-level error enum.
//! - [`progress`] defines the additive event payloads ([`progress::ProgressEvent`],
//!   [`progress::SessionOutcome`]) that the sender and receiver emit; these
//!   are not part of the wire format, they are the channel contract
//!   between the core and whatever UI an external collaborator builds.
//! - [`metadata`] parses the external `steamroll.json` package metadata
//!   file (§6.1) that the sender consults for smart hashing and the
//!   receiver for smart-sync comparison.
//!
//! # Invariants
//!
//! - Every frame is length-prefixed with a little-endian `u32` byte count;
//!   a length of `0` or greater than [`framing::MAX_FRAME_LEN`] is rejected
//!   without reading a payload.
//! - Within one session, header precedes manifest precedes ACK precedes
//!   file stream precedes completion frame (see [`wire`] docs for the
//!   full sequence).

pub mod error;
pub mod framing;
pub mod metadata;
pub mod progress;
pub mod wire;

pub use error::TransferError;
pub use framing::{receive_frame, send_frame, BoundedReader};
pub use metadata::PackageMetadata;
pub use wire::{
    Ack, BlockRequestDetails, BlockSignature, Compression, DeltaInstruction, FileEntry, Magic,
    TransferComplete, TransferHeader, TransferType,
};
