#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `checksums` provides the rolling and strong checksum primitives used by
//! SteamRoll's delta-sync engine and wire protocol.
//!
//! # Design
//!
//! The crate offers three modules:
//!
//! - [`rolling`] implements the Adler-32-style weak checksum used for block
//!   matching during delta transfers.
//! - [`strong`] exposes XXH64 and SHA-256 digests together with the
//!   [`strong::StrongDigest`] trait that higher layers use to abstract over
//!   the negotiated algorithm.
//! - [`hashing`] computes whole-file strong digests, switching between a
//!   buffered streaming reader and a memory-mapped reader depending on file
//!   size, with a cancellable variant checked once per chunk for callers
//!   hashing a large existing file from a blocking task.
//!
//! # Invariants
//!
//! - `RollingChecksum` truncates both state components to 16 bits after every
//!   update.
//! - Rolling updates reject mismatched slice lengths and empty windows so the
//!   caller never observes silent state corruption.
//! - Strong digests stream data incrementally and never panic; they surface
//!   failures through the standard digest traits.
//!
//! # Errors
//!
//! [`RollingError`] reports invalid rolling operations (empty windows, window
//! lengths that overflow `u32`, or mismatched slice lengths) and implements
//! [`std::error::Error`] so the failure can be forwarded to user-facing
//! diagnostics.
//! [`RollingSliceError`] signals that a digest could not be reconstructed from a
//! byte slice because the input length differed from the expected four bytes.
//! [`hashing::HashError`] reports I/O failures encountered while hashing a
//! file from disk, plus cancellation of the [`hashing::hash_file_cancellable`]
//! variant.
//!
//! # Examples
//!
//! Compute a rolling checksum for a block and then advance the window.
//!
//! ```
//! use checksums::RollingChecksum;
//!
//! let mut rolling = RollingChecksum::new();
//! rolling.update(b"abcd");
//! assert_eq!(rolling.len(), 4);
//!
//! // Replace the first byte with `e` and observe that the helper succeeds.
//! rolling.roll(b'a', b'e').unwrap();
//! assert_eq!(rolling.len(), 4);
//! ```
//!
//! Calculate a strong checksum using the XXH64 wrapper.
//!
//! ```
//! use checksums::strong::Xxh64;
//!
//! let digest = Xxh64::digest(0, b"hello");
//! assert_eq!(digest.len(), 8);
//! ```

mod hashing;
mod rolling;
pub mod strong;

pub use hashing::{hash_file, hash_file_cancellable, HashError};
pub use rolling::{RollingChecksum, RollingDigest, RollingError, RollingSliceError};
