//! The peer directory: a TTL-evicted record of devices seen on the
//! discovery port (§3 `Peer`, §9 "Interior mutability in the peer directory").

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use crate::message::{DiscoveryMessage, MessageType};

/// How long a peer may go unseen before it is evicted (§6.3: "≥ 15 s
/// recommended").
pub const PEER_TIMEOUT: Duration = Duration::from_secs(15);

/// Cadence at which this process re-broadcasts its own presence (§6.3).
pub const ANNOUNCE_INTERVAL: Duration = Duration::from_secs(5);

/// Default discovery port (§6.4 `discovery_port`).
pub const DEFAULT_DISCOVERY_PORT: u16 = 27050;

/// A peer discovered by UDP announcement (§3).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Peer {
    /// Stable identifier for this peer: `"{address}:{transfer_port}"`.
    pub id: String,
    /// The peer's advertised display name.
    pub host_name: String,
    /// The peer's LAN address, taken from the announcement datagram's
    /// source address, never from a field inside the message itself.
    pub address: IpAddr,
    /// The TCP port the peer's transfer listener is bound to.
    pub transfer_port: u16,
    /// How many packages the peer advertised at last announcement.
    pub packaged_game_count: u32,
    /// The peer's advertised upload rate limit, if it published one.
    pub advertised_upload_speed_bps: u64,
    /// When this peer was last heard from. Compared against
    /// [`PEER_TIMEOUT`] to decide eviction; never serialized or exposed
    /// across a process boundary.
    pub last_seen: Instant,
}

impl Peer {
    /// The address a transfer session to this peer should connect to.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.address, self.transfer_port)
    }
}

/// A shared, TTL-evicted table of currently known peers.
///
/// Guarded by a single coarse [`RwLock`] rather than per-entry locks: the
/// directory is small (a LAN's worth of peers) and mutated only by the
/// listener task, so lock contention is not a concern. Readers always take
/// [`Self::snapshot`] — a clone of the current peer list — rather than
/// holding the lock while iterating, so a slow consumer never blocks the
/// listener from recording new announcements.
#[derive(Clone, Default)]
pub struct PeerDirectory {
    peers: Arc<RwLock<HashMap<String, Peer>>>,
}

impl PeerDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records or refreshes a peer from an `Announce` datagram received
    /// from `from`. Non-`Announce` message types are ignored; they carry
    /// no presence information to record.
    pub fn observe(&self, message: &DiscoveryMessage, from: SocketAddr) {
        if message.message_type != MessageType::Announce {
            return;
        }
        let id = format!("{}:{}", from.ip(), message.transfer_port);
        let peer = Peer {
            id: id.clone(),
            host_name: message.host_name.clone(),
            address: from.ip(),
            transfer_port: message.transfer_port,
            packaged_game_count: message.packaged_game_count,
            advertised_upload_speed_bps: message.advertised_upload_speed_bps.unwrap_or(0),
            last_seen: Instant::now(),
        };
        self.peers
            .write()
            .expect("peer directory lock is never poisoned")
            .insert(id, peer);
    }

    /// Returns a clone of every currently known peer, regardless of
    /// staleness. Callers that care about freshness call
    /// [`Self::evict_stale`] first, or filter the snapshot themselves.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Peer> {
        self.peers
            .read()
            .expect("peer directory lock is never poisoned")
            .values()
            .cloned()
            .collect()
    }

    /// Removes every peer not seen within `timeout`.
    pub fn evict_stale(&self, timeout: Duration) {
        let now = Instant::now();
        self.peers
            .write()
            .expect("peer directory lock is never poisoned")
            .retain(|_, peer| now.duration_since(peer.last_seen) < timeout);
    }

    /// Number of peers currently recorded, stale or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.peers
            .read()
            .expect("peer directory lock is never poisoned")
            .len()
    }

    /// Whether the directory currently holds no peers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn from_addr() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 9999)
    }

    #[test]
    fn observing_an_announce_adds_a_peer() {
        let directory = PeerDirectory::new();
        let message = DiscoveryMessage::announce("desktop", 27051, 2, None);
        directory.observe(&message, from_addr());

        let snapshot = directory.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].host_name, "desktop");
        assert_eq!(snapshot[0].transfer_port, 27051);
    }

    #[test]
    fn non_announce_messages_do_not_create_a_peer_entry() {
        let directory = PeerDirectory::new();
        let message = DiscoveryMessage::transfer_request("desktop", 27051, "Game", 1024);
        directory.observe(&message, from_addr());
        assert!(directory.is_empty());
    }

    #[test]
    fn repeated_announcements_refresh_rather_than_duplicate() {
        let directory = PeerDirectory::new();
        let message = DiscoveryMessage::announce("desktop", 27051, 1, None);
        directory.observe(&message, from_addr());
        directory.observe(&message, from_addr());
        assert_eq!(directory.len(), 1);
    }

    #[test]
    fn stale_peers_are_evicted() {
        let directory = PeerDirectory::new();
        let message = DiscoveryMessage::announce("desktop", 27051, 1, None);
        directory.observe(&message, from_addr());

        directory.evict_stale(Duration::from_secs(0));
        assert!(directory.is_empty());
    }

    #[test]
    fn fresh_peers_survive_eviction() {
        let directory = PeerDirectory::new();
        let message = DiscoveryMessage::announce("desktop", 27051, 1, None);
        directory.observe(&message, from_addr());

        directory.evict_stale(Duration::from_secs(3600));
        assert_eq!(directory.len(), 1);
    }
}
