//! The JSON message exchanged over the discovery UDP port (§6.3).

use serde::{Deserialize, Serialize};

/// Fixed magic string stamped on every discovery datagram, checked before a
/// message is otherwise trusted, so stray broadcast traffic from unrelated
/// software on the same LAN is silently ignored rather than logged as an
/// error.
pub const DISCOVERY_MAGIC: &str = "STEAMROLL_DISCOVERY_V1";

/// What kind of discovery message a datagram carries.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum MessageType {
    /// Periodic presence broadcast.
    Announce,
    /// A request that the peer begin sending us a package.
    TransferRequest,
    /// Acceptance of a previously sent [`MessageType::TransferRequest`].
    TransferAccept,
    /// Rejection of a previously sent [`MessageType::TransferRequest`].
    TransferReject,
}

/// One discovery datagram's payload.
///
/// `game_name`/`game_size` are only meaningful on `TransferRequest` (the
/// specific package being requested); they are omitted from `Announce`
/// datagrams to keep the broadcast payload small.
///
/// **[ADDED]** `advertised_upload_speed_bps` populates the corresponding
/// [`crate::Peer`] field, which §3's data model lists but §6.3's wire
/// fields do not; omitted by peers that do not advertise a speed limit.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DiscoveryMessage {
    /// Must equal [`DISCOVERY_MAGIC`] for the message to be trusted.
    pub magic: String,
    /// The kind of message this is.
    #[serde(rename = "type")]
    pub message_type: MessageType,
    /// The sending device's display name.
    pub host_name: String,
    /// The TCP port the sender's transfer listener is bound to.
    pub transfer_port: u16,
    /// How many packages the sender currently has available to share.
    pub packaged_game_count: u32,
    /// Name of the requested package (`TransferRequest` only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_name: Option<String>,
    /// Size in bytes of the requested package (`TransferRequest` only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_size: Option<u64>,
    /// The sender's advertised upload rate limit, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advertised_upload_speed_bps: Option<u64>,
}

impl DiscoveryMessage {
    /// Builds an `Announce` message.
    #[must_use]
    pub fn announce(
        host_name: impl Into<String>,
        transfer_port: u16,
        packaged_game_count: u32,
        advertised_upload_speed_bps: Option<u64>,
    ) -> Self {
        Self {
            magic: DISCOVERY_MAGIC.to_owned(),
            message_type: MessageType::Announce,
            host_name: host_name.into(),
            transfer_port,
            packaged_game_count,
            game_name: None,
            game_size: None,
            advertised_upload_speed_bps,
        }
    }

    /// Builds a `TransferRequest` message naming the package wanted.
    #[must_use]
    pub fn transfer_request(
        host_name: impl Into<String>,
        transfer_port: u16,
        game_name: impl Into<String>,
        game_size: u64,
    ) -> Self {
        Self {
            magic: DISCOVERY_MAGIC.to_owned(),
            message_type: MessageType::TransferRequest,
            host_name: host_name.into(),
            transfer_port,
            packaged_game_count: 0,
            game_name: Some(game_name.into()),
            game_size: Some(game_size),
            advertised_upload_speed_bps: None,
        }
    }

    /// Builds a `TransferAccept` reply.
    #[must_use]
    pub fn accept(host_name: impl Into<String>, transfer_port: u16) -> Self {
        Self {
            magic: DISCOVERY_MAGIC.to_owned(),
            message_type: MessageType::TransferAccept,
            host_name: host_name.into(),
            transfer_port,
            packaged_game_count: 0,
            game_name: None,
            game_size: None,
            advertised_upload_speed_bps: None,
        }
    }

    /// Builds a `TransferReject` reply.
    #[must_use]
    pub fn reject(host_name: impl Into<String>, transfer_port: u16) -> Self {
        Self {
            magic: DISCOVERY_MAGIC.to_owned(),
            message_type: MessageType::TransferReject,
            host_name: host_name.into(),
            transfer_port,
            packaged_game_count: 0,
            game_name: None,
            game_size: None,
            advertised_upload_speed_bps: None,
        }
    }

    /// Whether this message carries the expected magic string.
    #[must_use]
    pub fn is_valid_magic(&self) -> bool {
        self.magic == DISCOVERY_MAGIC
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn announce_round_trips_through_json() {
        let message = DiscoveryMessage::announce("desktop", 27051, 3, Some(1_000_000));
        let json = serde_json::to_string(&message).unwrap();
        let decoded: DiscoveryMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.host_name, "desktop");
        assert_eq!(decoded.message_type, MessageType::Announce);
        assert!(decoded.is_valid_magic());
    }

    #[test]
    fn announce_omits_request_only_fields_from_json() {
        let message = DiscoveryMessage::announce("desktop", 27051, 0, None);
        let json = serde_json::to_string(&message).unwrap();
        assert!(!json.contains("game_name"));
        assert!(!json.contains("game_size"));
        assert!(!json.contains("advertised_upload_speed_bps"));
    }

    #[test]
    fn wrong_magic_is_detected() {
        let mut message = DiscoveryMessage::announce("desktop", 27051, 0, None);
        message.magic = "SOMETHING_ELSE".to_owned();
        assert!(!message.is_valid_magic());
    }
}
