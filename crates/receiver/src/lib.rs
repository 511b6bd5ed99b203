#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `receiver` drives the inbound half of a SteamRoll transfer session: it
//! negotiates the `V3` handshake when required, reads the header and
//! manifest, dispatches by [`protocol::TransferType`], and for a `Package`
//! session runs the approval/smart-sync/stream/verify pipeline described in
//! the component design.
//!
//! # Design
//!
//! - [`options::ReceiverOptions`] carries the policy this endpoint was
//!   started with (library root, encryption requirement, device id).
//! - [`transport::Session`] hides the plain/`V3`-encrypted distinction,
//!   mirroring `sender`'s transport enum.
//! - [`disk`], [`marker`], [`smart_sync`], and [`payload`] each implement
//!   one piece of the `Package` pipeline; [`session::handle_connection`]
//!   is the state machine that sequences them.
//! - [`library::LibraryProvider`] is the trait an external collaborator
//!   implements to answer `ListRequest` sessions with this device's
//!   package catalog.
//!
//! # Errors
//!
//! Every fallible operation returns [`protocol::TransferError`].

pub mod context;
pub mod disk;
pub mod library;
pub mod marker;
pub mod options;
pub mod outbound;
pub mod payload;
pub mod session;
pub mod smart_sync;
pub mod transport;

pub use context::ReceiveContext;
pub use options::ReceiverOptions;
pub use session::{handle_connection, APPROVAL_TIMEOUT};
pub use tokio_util::sync::CancellationToken;
pub use transport::Session;
