#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `swarm` downloads a single large package file from several peers at
//! once, splitting it into 4 MiB blocks assigned across connected peers
//! with work-stealing for stragglers (§4.10).
//!
//! Unlike `sender`/`receiver`, which drive a whole package transfer over
//! one connection, swarm mode opens one short-lived connection per block:
//! each connection carries a [`protocol::wire::TransferType::BlockRequest`]
//! session that the receiver's `handle_block_request` answers with exactly
//! the requested byte range. This crate is the requester's half of that
//! exchange, plus the scheduling and reassembly needed to make many such
//! requests, across many peers, add up to one correct file.
//!
//! # Design
//!
//! - [`job::BlockJob`] and [`coordinator::BlockCoordinator`] implement the
//!   block lifecycle (Pending → InFlight → Completed, or back to Pending
//!   up to [`job::MAX_RETRY_ATTEMPTS`] times before permanent abandonment).
//! - [`writer::RandomAccessWriter`] is the single owner of the output file,
//!   pre-sized up front and written at exact offsets under one mutex, since
//!   block completion order is unordered by design.
//! - [`worker::fetch_block`] drives one block request to one peer over
//!   [`transport::Session`] (a swarm-local copy of the plain/`V3`-encrypted
//!   transport enum `sender` and `receiver` each keep their own of, since
//!   `protocol` cannot depend on `crypto`).
//! - [`speed::SpeedTracker`] keeps an exponential moving average of
//!   per-peer throughput so the work-stealing loop in [`puller::pull`] can
//!   reassign a stalled block to whichever connected peer is fastest.
//!
//! # Errors
//!
//! Per-block and per-connection failures return [`protocol::TransferError`]
//! (via [`error::SwarmError`]'s conversion); [`puller::pull`] itself
//! resolves to [`protocol::progress::SessionOutcome`] so a caller handles
//! "download failed because a block was abandoned" the same way it handles
//! any other transfer failure.

pub mod coordinator;
pub mod error;
pub mod job;
pub mod puller;
pub mod speed;
pub mod transport;
pub mod worker;
pub mod writer;

pub use coordinator::{BlockCoordinator, BlockCounts};
pub use error::SwarmError;
pub use job::{BlockJob, MAX_RETRY_ATTEMPTS, STALL_TIMEOUT};
pub use puller::{pull, PullRequest, SwarmPeer, MAX_CONCURRENT_PEERS, WORK_STEALING_INTERVAL};
pub use speed::{SpeedTracker, EMA_ALPHA};
pub use writer::RandomAccessWriter;
