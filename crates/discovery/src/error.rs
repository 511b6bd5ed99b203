//! Failures from the discovery socket itself. Malformed or unexpected UDP
//! datagrams are not modelled as errors here — on an unauthenticated
//! broadcast port that is normal network noise, not a fault — the listener
//! logs and discards them instead (see [`crate::listener::run_listener`]).

/// Errors surfaced by the `discovery` crate.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    /// Binding, sending on, or receiving from the discovery UDP socket failed.
    #[error("discovery socket I/O error: {0}")]
    Io(#[from] std::io::Error),
}
