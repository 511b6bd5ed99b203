//! Receiving and recording discovery datagrams.

use std::convert::Infallible;

use tokio::net::UdpSocket;

use crate::error::DiscoveryError;
use crate::message::DiscoveryMessage;
use crate::peer::{PeerDirectory, PEER_TIMEOUT};

/// Largest discovery datagram accepted; generously above any real
/// `DiscoveryMessage`'s JSON encoding.
const MAX_DATAGRAM_LEN: usize = 4096;

/// Receives datagrams on `socket` forever, recording `Announce` messages
/// into `directory` and periodically evicting stale entries.
///
/// Malformed JSON, an unrecognized magic, or a message type other than
/// `Announce` are logged at debug level and otherwise ignored — an
/// unauthenticated broadcast port routinely carries noise from unrelated
/// software, and a single bad datagram must never take down discovery for
/// the whole process.
///
/// # Errors
///
/// Returns [`DiscoveryError::Io`] if the socket itself fails (e.g. the
/// network interface goes away); this does end the loop, since there is no
/// useful recovery within this function.
pub async fn run_listener(
    socket: &UdpSocket,
    directory: PeerDirectory,
) -> Result<Infallible, DiscoveryError> {
    let mut buf = [0_u8; MAX_DATAGRAM_LEN];
    let mut eviction_ticker = tokio::time::interval(PEER_TIMEOUT / 3);

    loop {
        tokio::select! {
            received = socket.recv_from(&mut buf) => {
                let (len, from) = received?;
                match serde_json::from_slice::<DiscoveryMessage>(&buf[..len]) {
                    Ok(message) if message.is_valid_magic() => {
                        tracing::debug!(%from, host = %message.host_name, "discovery message received");
                        directory.observe(&message, from);
                    }
                    Ok(_) => {
                        tracing::debug!(%from, "ignoring discovery datagram with unexpected magic");
                    }
                    Err(error) => {
                        tracing::debug!(%from, %error, "ignoring malformed discovery datagram");
                    }
                }
            }
            _ = eviction_ticker.tick() => {
                directory.evict_stale(PEER_TIMEOUT);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::socket::{bind_broadcast_socket, send_message};
    use std::time::Duration;

    #[tokio::test]
    async fn listener_records_a_well_formed_announcement() {
        let listener_socket = bind_broadcast_socket(0).await.unwrap();
        let listener_addr = listener_socket.local_addr().unwrap();
        let directory = PeerDirectory::new();

        let directory_for_task = directory.clone();
        let handle =
            tokio::spawn(async move { run_listener(&listener_socket, directory_for_task).await });

        let sender_socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let message = DiscoveryMessage::announce("laptop", 27051, 5, Some(500_000));
        send_message(&sender_socket, listener_addr, &message)
            .await
            .unwrap();

        for _ in 0..50 {
            if !directory.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let snapshot = directory.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].host_name, "laptop");
        assert_eq!(snapshot[0].packaged_game_count, 5);
        assert_eq!(snapshot[0].advertised_upload_speed_bps, 500_000);

        handle.abort();
    }

    #[tokio::test]
    async fn listener_ignores_malformed_datagrams() {
        let listener_socket = bind_broadcast_socket(0).await.unwrap();
        let listener_addr = listener_socket.local_addr().unwrap();
        let directory = PeerDirectory::new();

        let directory_for_task = directory.clone();
        let handle =
            tokio::spawn(async move { run_listener(&listener_socket, directory_for_task).await });

        let sender_socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        sender_socket
            .send_to(b"not json at all", listener_addr)
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(directory.is_empty());

        handle.abort();
    }
}
