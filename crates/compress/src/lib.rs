#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `compress` implements the optional in-stream GZip wrapper negotiated by
//! the `V2` and `V3` protocol magics.
//!
//! # Design
//!
//! The crate provides the [`gzip`] module, a streaming-friendly encoder and
//! decoder built on top of [`flate2`](https://docs.rs/flate2). The API
//! emphasises incremental processing: callers provide scratch buffers that
//! are filled with compressed or decompressed data while the internal state
//! tracks totals for progress reporting.
//!
//! # Invariants
//!
//! - Encoders and decoders never allocate internal output buffers. All output is
//!   written into the caller-provided vectors, allowing upper layers to reuse
//!   storage across files.
//! - Streams are finalised explicitly via
//!   [`gzip::CountingGzEncoder::finish`], which emits trailer bytes and
//!   reports the final compressed length.
//! - Errors from the underlying gzip implementation are surfaced as
//!   [`std::io::Error`] values.
//!
//! # Errors
//!
//! The encoder and decoder functions return [`std::io::Result`].
//!
//! # Examples
//!
//! Compressing and decompressing a buffer with the streaming encoder and
//! convenience helpers:
//!
//! ```
//! use compress::gzip::{CompressionLevel, CountingGzEncoder, compress_to_vec, decompress_to_vec};
//!
//! # fn main() -> std::io::Result<()> {
//! let data = b"streaming example payload";
//! let mut encoder = CountingGzEncoder::new(CompressionLevel::Default);
//! encoder.write(data)?;
//! let compressed_len = encoder.finish()?;
//! assert!(compressed_len > 0);
//!
//! let compressed = compress_to_vec(data, CompressionLevel::Default)?;
//! let decompressed = decompress_to_vec(&compressed)?;
//! assert_eq!(decompressed, data);
//! # Ok(())
//! # }
//! ```

mod common;
pub mod gzip;

pub use common::CountingSink;
