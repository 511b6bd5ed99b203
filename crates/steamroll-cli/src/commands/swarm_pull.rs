//! The `swarm-pull` subcommand: downloads one file from several peers at
//! once (§4.10).

use std::path::PathBuf;
use std::sync::Arc;

use protocol::progress::SessionOutcome;
use protocol::TransferError;
use swarm::{PullRequest, SwarmPeer};

use crate::settings::Settings;

/// Arguments specific to the `swarm-pull` subcommand.
pub struct SwarmPullArgs {
    /// Source peers as `id@address:port` strings.
    pub peers: Vec<String>,
    /// Display name of the package the file belongs to.
    pub game_name: String,
    /// Forward-slash relative path of the file within the package.
    pub relative_path: String,
    /// Where to write the reconstructed file.
    pub destination: PathBuf,
    /// Total size of the file in bytes.
    pub size: u64,
    /// Expected `XxHash64` hex digest of the reconstructed file.
    pub expected_hash: String,
}

/// Parses a `"{id}@{address}:{port}"` peer descriptor.
fn parse_peer(spec: &str) -> Result<SwarmPeer, TransferError> {
    let (id, addr) = spec
        .split_once('@')
        .ok_or_else(|| TransferError::protocol(format!("peer {spec:?} is missing an '@id@address:port' separator")))?;
    let addr = addr
        .parse()
        .map_err(|_| TransferError::protocol(format!("peer {spec:?} has an invalid address")))?;
    Ok(SwarmPeer { id: id.to_owned(), addr })
}

/// Runs the `swarm-pull` subcommand to completion.
///
/// # Errors
///
/// Returns [`TransferError`] if a peer descriptor cannot be parsed; a
/// download failure (block abandonment, hash mismatch) is reported as
/// `Ok(SessionOutcome::Failed { .. })` per [`swarm::pull`].
pub async fn run(
    settings: &Settings,
    args: SwarmPullArgs,
    pairing: Arc<dyn crypto::PairingStore>,
) -> Result<SessionOutcome, TransferError> {
    let peers = args
        .peers
        .iter()
        .map(|spec| parse_peer(spec))
        .collect::<Result<Vec<_>, _>>()?;

    let request = PullRequest {
        peers,
        game_name: args.game_name,
        relative_path: args.relative_path,
        declared_size: args.size,
        destination: args.destination,
        expected_hash: args.expected_hash,
        require_encryption: settings.require_encryption,
        device_id: settings.device_id.clone(),
    };

    swarm::pull(request, pairing).await
}
