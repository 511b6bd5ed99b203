#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `delta` implements the rsync-style block-level delta engine described in
//! the transfer protocol's component design: signature generation over an
//! existing target file, delta calculation against a source buffer, and
//! delta application to reconstruct the source from the target plus a
//! reconstruction program.
//!
//! # Design
//!
//! - [`signature`] reads an existing file sequentially in
//!   [`protocol::wire::DELTA_BLOCK_SIZE`] chunks and emits one
//!   [`protocol::wire::BlockSignature`] per chunk.
//! - [`calculate`] slides a rolling-hash window across a source buffer,
//!   matching against the target's signatures and emitting a sequence of
//!   [`protocol::wire::DeltaInstruction`] values plus a literal byte buffer.
//! - [`apply`] replays that sequence against the target file to reconstruct
//!   the source, verifying the result against a sender-declared hash.
//!
//! # Invariants
//!
//! - Delta is only ever attempted when [`calculate::is_size_eligible`]
//!   holds and the computed payload clears
//!   [`calculate::meets_savings_threshold`]; callers that skip these checks
//!   may still call [`calculate::calculate_delta`] directly (e.g. for
//!   testing) but production code paths gate on both.
//! - [`apply::apply_delta`] never trusts an instruction blindly: a
//!   `CopyFromTarget` referencing bytes past the target file's end is
//!   reported as [`error::DeltaError::InstructionOutOfRange`], and a
//!   `LiteralData` referencing bytes past the literal buffer's end is
//!   reported as [`error::DeltaError::LiteralOutOfRange`], rather than
//!   either case indexing unchecked.
//!
//! # Errors
//!
//! All three operations that touch the file system return
//! [`error::DeltaError`].
//!
//! # Examples
//!
//! ```
//! use delta::{calculate_delta, generate_signatures};
//! use std::io::Write;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let dir = tempfile::tempdir()?;
//! let target_path = dir.path().join("target.bin");
//! std::fs::write(&target_path, vec![0x42_u8; 200_000])?;
//!
//! let signatures = generate_signatures(&target_path)?;
//! let source = vec![0x42_u8; 200_000];
//! let (instructions, literal) = calculate_delta(&source, &signatures);
//! assert!(literal.is_empty());
//! assert!(!instructions.is_empty());
//! # Ok(())
//! # }
//! ```

mod apply;
mod calculate;
mod error;
mod signature;

pub use apply::apply_delta;
pub use calculate::{
    calculate_delta, is_size_eligible, meets_savings_threshold, MIN_DELTA_SAVINGS_RATIO,
    MIN_DELTA_SOURCE_SIZE,
};
pub use error::DeltaError;
pub use signature::generate_signatures;
