//! Pairing, key derivation, and the encrypted record layer behind `V3`
//! sessions (§4.5 "Pairing and Authenticated Encryption (V3)").
//!
//! # Overview
//!
//! Two devices pair once, out of band, by exchanging a short numeric code
//! (`generate_pairing_code`). Both sides stretch that code into a 256-bit
//! [`SharedKey`] with PBKDF2-HMAC-SHA256 (`derive_pairing_key`), salted by
//! their two device ids so the derivation is deterministic regardless of
//! which side initiates a later session. Callers persist the resulting key
//! behind a [`PairingStore`] so the code is only ever entered once per peer.
//!
//! A later transfer session runs the `V3` handshake
//! (`handshake_initiator`/`handshake_responder`) over the freshly connected
//! socket to prove both sides hold the same [`SharedKey`] without
//! transmitting it, then splits it into two independent
//! [`DirectionalKey`]s (`derive_directional_keys`) so the two halves of the
//! duplex connection encrypt under different keys. The handshake hands back
//! an [`EncryptedChannel`], a drop-in encrypted substitute for the plain
//! socket that the rest of a session's wire protocol reads and writes
//! through unmodified.
//!
//! # Design
//!
//! - Key stretching uses PBKDF2 rather than using the pairing code
//!   directly, since a six-digit code has far too little entropy to use as
//!   an AES key on its own.
//! - Splitting into directional subkeys (rather than sharing one key and
//!   one nonce counter across both directions) is a deliberate refinement:
//!   two independent counters starting at zero on a single shared key
//!   would let the two directions' records collide in nonce space. See
//!   `DESIGN.md` for the record of this decision.
//! - The record layer authenticates every record before returning any of
//!   its plaintext, and treats both a failed tag and a non-increasing
//!   nonce counter as fatal for the connection, never as a recoverable
//!   condition to retry past.
//!
//! # Errors
//!
//! All fallible operations in this crate return [`CryptoError`], which
//! converts into the workspace-wide `protocol::TransferError` at the
//! session boundary.

mod error;
mod handshake;
mod keys;
mod record;
mod store;

pub use error::CryptoError;
pub use handshake::{handshake_initiator, handshake_responder};
pub use keys::{
    derive_directional_keys, derive_pairing_key, generate_pairing_code, DirectionalKey,
    SharedKey, PBKDF2_ITERATIONS,
};
pub use record::{EncryptedChannel, DEFAULT_RECORD_LEN};
pub use store::{FilePairingStore, InMemoryPairingStore, PairingStore};
