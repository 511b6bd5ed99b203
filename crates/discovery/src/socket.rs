//! Binding the UDP socket discovery runs over.

use std::net::SocketAddr;

use tokio::net::UdpSocket;

use crate::error::DiscoveryError;

/// Binds a UDP socket to `0.0.0.0:port` with broadcast datagrams enabled.
///
/// # Errors
///
/// Returns [`DiscoveryError::Io`] if the port cannot be bound or the
/// broadcast socket option cannot be set.
pub async fn bind_broadcast_socket(port: u16) -> Result<UdpSocket, DiscoveryError> {
    let socket = UdpSocket::bind(("0.0.0.0", port)).await?;
    socket.set_broadcast(true)?;
    Ok(socket)
}

/// Sends a single discovery message to `to`, which may be a broadcast
/// address (e.g. `255.255.255.255:27050`) or a specific peer's address for
/// a targeted `TransferRequest`/`TransferAccept`/`TransferReject`.
///
/// # Errors
///
/// Returns [`DiscoveryError::Io`] if the datagram cannot be sent.
pub async fn send_message(
    socket: &UdpSocket,
    to: SocketAddr,
    message: &crate::message::DiscoveryMessage,
) -> Result<(), DiscoveryError> {
    let bytes = serde_json::to_vec(message).expect("DiscoveryMessage always serializes");
    socket.send_to(&bytes, to).await?;
    Ok(())
}
