//! Everything one inbound connection needs beyond the bytes on the wire.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crypto::PairingStore;
use protocol::progress::{ApprovalRequest, ProgressEvent};
use resume::DestinationLocks;

use crate::library::LibraryProvider;
use crate::options::ReceiverOptions;

/// Dependencies a single [`crate::session::handle_connection`] call draws
/// on, shared across every connection a receiver process serves.
pub struct ReceiveContext<'a> {
    /// Policy this endpoint was started with.
    pub options: &'a ReceiverOptions,
    /// Pairing-key lookup for the `V3` handshake.
    pub pairing: &'a dyn PairingStore,
    /// Shared inbound rate limiter.
    pub limiter: &'a bandwidth::Limiter,
    /// Registry of per-destination locks, shared across every connection
    /// this process serves.
    pub locks: &'a DestinationLocks,
    /// Optional channel for throttled progress events.
    pub progress: Option<mpsc::Sender<ProgressEvent>>,
    /// Optional channel an external collaborator drains to approve or
    /// reject incoming `Package` transfers. When absent, transfers are
    /// approved automatically (headless/test use).
    pub approvals: Option<mpsc::Sender<ApprovalRequest>>,
    /// Optional package-catalog provider, consulted for `ListRequest`
    /// sessions. When absent, `ListRequest` is answered with an empty list.
    pub library: Option<&'a dyn LibraryProvider>,
    /// Cancels the smart-sync hashing of large existing files when a
    /// caller holding a clone triggers it. A fresh, never-cancelled token
    /// behaves exactly like an uncancellable session.
    pub cancel: CancellationToken,
}
