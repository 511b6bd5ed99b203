#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! UDP broadcast peer presence and the peer directory (§2.11, §6.3).
//!
//! # Overview
//!
//! Every process announces itself every [`ANNOUNCE_INTERVAL`] by
//! broadcasting a JSON [`DiscoveryMessage`] on [`DEFAULT_DISCOVERY_PORT`]
//! ([`run_announcer`]). A second task ([`run_listener`]) receives those
//! datagrams and records the sender in a [`PeerDirectory`], evicting any
//! peer not re-heard from within [`PEER_TIMEOUT`]. The same message type
//! also carries unicast `TransferRequest`/`TransferAccept`/`TransferReject`
//! exchanges for the pull-request flow (§6.3), sent directly to a peer's
//! address via [`send_message`] rather than broadcast.
//!
//! # Design
//!
//! The directory is a single coarse lock around a hash map
//! (§9 "Interior mutability in the peer directory"): callers take a
//! [`PeerDirectory::snapshot`] clone rather than holding the lock across
//! iteration, so a slow consumer of the peer list never blocks the
//! listener task from recording new announcements.
//!
//! A peer's address is always taken from the UDP datagram's source
//! address, never from a field inside the JSON payload — a forged
//! `host_name` only misleads a human reading the peer list, but a forged
//! address could redirect an outbound transfer request.
//!
//! # Errors
//!
//! [`DiscoveryError`] covers socket bind/send/receive failures. Malformed
//! or unrecognized datagrams are not modelled as errors; see
//! [`run_listener`].

mod announcer;
mod error;
mod listener;
mod message;
mod peer;
mod socket;

pub use announcer::run_announcer;
pub use error::DiscoveryError;
pub use listener::run_listener;
pub use message::{DiscoveryMessage, MessageType, DISCOVERY_MAGIC};
pub use peer::{Peer, PeerDirectory, ANNOUNCE_INTERVAL, DEFAULT_DISCOVERY_PORT, PEER_TIMEOUT};
pub use socket::{bind_broadcast_socket, send_message};
