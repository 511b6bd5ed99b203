//! The periodic `Announce` broadcast loop (§6.3: "Announce cadence: every 5 s").

use std::convert::Infallible;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::UdpSocket;

use crate::error::DiscoveryError;
use crate::message::DiscoveryMessage;
use crate::socket::send_message;

/// Broadcasts the message produced by `message_factory` to `broadcast_addr`
/// every `interval`, forever.
///
/// `message_factory` is called fresh on every tick rather than once up
/// front, so a changing `packaged_game_count` (a library scan finishing
/// mid-run) is reflected in the next announcement without restarting this
/// task.
///
/// A single send failure is logged and does not end the loop — an
/// unreachable broadcast address on one tick does not imply the next tick
/// will fail too. Run this inside `tokio::spawn` and abort the handle to
/// stop announcing.
///
/// # Errors
///
/// This function only returns on an error from the socket's internal
/// state becoming unusable; it otherwise loops forever.
pub async fn run_announcer(
    socket: &UdpSocket,
    broadcast_addr: SocketAddr,
    mut message_factory: impl FnMut() -> DiscoveryMessage,
    interval: Duration,
) -> Result<Infallible, DiscoveryError> {
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        let message = message_factory();
        if let Err(error) = send_message(socket, broadcast_addr, &message).await {
            tracing::warn!(%error, %broadcast_addr, "discovery announce send failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::socket::bind_broadcast_socket;

    #[tokio::test]
    async fn announcer_sends_repeated_announcements() {
        let announcer_socket = bind_broadcast_socket(0).await.unwrap();
        let listener_socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let listener_addr = listener_socket.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            run_announcer(
                &announcer_socket,
                listener_addr,
                || DiscoveryMessage::announce("desktop", 27051, 0, None),
                Duration::from_millis(10),
            )
            .await
        });

        let mut buf = [0_u8; 2048];
        for _ in 0..2 {
            let (len, _) = listener_socket.recv_from(&mut buf).await.unwrap();
            let message: DiscoveryMessage = serde_json::from_slice(&buf[..len]).unwrap();
            assert!(message.is_valid_magic());
        }

        handle.abort();
    }
}
