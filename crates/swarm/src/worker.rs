//! Fetching a single swarm block from a source peer (§4.10).
//!
//! Each block request opens its own connection: the receiver's
//! `BlockRequest` handler (`receiver::session::handle_block_request`)
//! serves exactly one block per accepted connection, mirroring every other
//! lightweight `TransferType` in the wire protocol.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time::timeout;

use crypto::PairingStore;
use protocol::wire::{BlockRequestDetails, Compression, Magic, TransferHeader, TransferType};
use protocol::TransferError;

use crate::job::BlockJob;
use crate::transport::Session;

/// Ceiling on establishing the per-block TCP connection, matching the
/// sender's connect deadline (§5).
const CONNECT_DEADLINE: Duration = Duration::from_secs(5);

/// What a block-fetch needs to know about the session it is about to
/// open, independent of which block is being requested.
pub struct PeerEndpoint {
    /// Address to connect to for this peer.
    pub addr: SocketAddr,
    /// Whether the connection must be `V3`-encrypted.
    pub require_encryption: bool,
    /// This device's id, used in the `V3` handshake.
    pub device_id: String,
}

/// Connects to `endpoint`, requests `job`'s byte range of `relative_path`
/// within `game_name`'s package, and returns the block's bytes.
///
/// # Errors
///
/// Returns [`TransferError`] on connect failure, handshake failure, or any
/// protocol/I/O error while exchanging the request and reading the
/// response.
pub async fn fetch_block(
    endpoint: &PeerEndpoint,
    pairing: &dyn PairingStore,
    game_name: &str,
    relative_path: &str,
    job: &BlockJob,
) -> Result<Vec<u8>, TransferError> {
    let stream = timeout(CONNECT_DEADLINE, TcpStream::connect(endpoint.addr))
        .await
        .map_err(|_| TransferError::protocol(format!("connect to {} timed out", endpoint.addr)))?
        .map_err(TransferError::from)?;

    let magic = Magic::select(false, endpoint.require_encryption);
    let mut session = establish_session(stream, endpoint, pairing, magic).await?;

    let header = TransferHeader {
        magic,
        game_name: game_name.to_owned(),
        total_files: 1,
        total_size: u64::from(job.length),
        transfer_type: TransferType::BlockRequest,
        compression: Compression::None,
        supports_delta: false,
        is_received: false,
    };
    session.send_frame(&header).await?;
    session
        .send_frame(&BlockRequestDetails {
            relative_path: relative_path.to_owned(),
            offset: job.offset,
            length: job.length,
        })
        .await?;

    let mut bytes = vec![0_u8; job.length as usize];
    session.read_exact(&mut bytes).await?;
    Ok(bytes)
}

async fn establish_session(
    stream: TcpStream,
    endpoint: &PeerEndpoint,
    pairing: &dyn PairingStore,
    magic: Magic,
) -> Result<Session, TransferError> {
    if !magic.is_encrypted() {
        return Ok(Session::Plain(stream));
    }
    let shared_key = pairing.get(endpoint.addr).ok_or_else(|| TransferError::Auth {
        peer: Some(endpoint.addr),
        message: "no paired key for this peer".to_owned(),
    })?;
    let (channel, _responder_id) =
        crypto::handshake_initiator(stream, &shared_key, &endpoint.device_id).await?;
    Ok(Session::Encrypted(channel))
}
