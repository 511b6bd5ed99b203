//! The `discover` subcommand: announces this device's presence and reports
//! peers heard from over a fixed window (§2.11, §6.3).

use std::net::SocketAddr;
use std::time::Duration;

use discovery::{run_announcer, run_listener, DiscoveryMessage, Peer, PeerDirectory, ANNOUNCE_INTERVAL};
use protocol::TransferError;

use crate::settings::Settings;

/// Runs discovery for `seconds`, then returns every peer heard from.
///
/// The announcer and listener share one broadcast-enabled socket and run
/// concurrently until the window elapses, at which point both loops
/// (each otherwise unending) are dropped.
///
/// # Errors
///
/// Returns [`TransferError`] if the discovery socket cannot be bound.
pub async fn run(settings: &Settings, seconds: u64) -> Result<Vec<Peer>, TransferError> {
    let socket = discovery::bind_broadcast_socket(settings.discovery_port)
        .await
        .map_err(|e| TransferError::protocol(e.to_string()))?;
    let broadcast_addr = SocketAddr::from(([255, 255, 255, 255], settings.discovery_port));
    let directory = PeerDirectory::new();

    let device_id = settings.device_id.clone();
    let transfer_port = settings.transfer_port;
    let announce = run_announcer(
        &socket,
        broadcast_addr,
        move || DiscoveryMessage::announce(device_id.clone(), transfer_port, 0, None),
        ANNOUNCE_INTERVAL,
    );
    let listen = run_listener(&socket, directory.clone());

    let _ = tokio::time::timeout(Duration::from_secs(seconds), async {
        tokio::join!(announce, listen)
    })
    .await;

    Ok(directory.snapshot())
}
