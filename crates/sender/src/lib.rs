#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `sender` drives the outbound half of a SteamRoll transfer session: it
//! enumerates a package directory into a manifest (smart-hashing against
//! `steamroll.json` where possible), exchanges the header/manifest/ACK
//! handshake with a peer, and streams file payloads — whole, GZip-compressed,
//! or delta-encoded — under a shared rate limiter.
//!
//! # Design
//!
//! - [`manifest::build_manifest`] performs the directory walk and hashing
//!   decisions (§4.8 "smart hashing").
//! - [`transport::Session`] hides the plain/`V3`-encrypted distinction
//!   behind one small enum, since [`crypto::EncryptedChannel`] does not
//!   implement `AsyncRead`/`AsyncWrite`.
//! - [`payload`] emits the three payload shapes the wire protocol defines:
//!   whole-file, whole-file-after-delta-decline, and delta.
//! - [`session::send`] is the state machine itself: `CONNECT ->
//!   SEND_HEADER -> SEND_MANIFEST -> RECV_ACK -> [ABORT|SEND_FILES] ->
//!   RECV_COMPLETE -> DONE`.

pub mod manifest;
pub mod payload;
pub mod session;
pub mod transport;

pub use session::{send, SendRequest, CONNECT_DEADLINE};
pub use transport::Session;
