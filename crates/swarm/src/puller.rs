//! The swarm "General": spawns up to [`MAX_CONCURRENT_PEERS`] block workers
//! against several source peers and runs a work-stealing loop alongside
//! them (§4.10).

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crypto::PairingStore;
use protocol::progress::SessionOutcome;
use protocol::TransferError;

use crate::coordinator::BlockCoordinator;
use crate::error::SwarmError;
use crate::speed::SpeedTracker;
use crate::worker::{fetch_block, PeerEndpoint};
use crate::writer::RandomAccessWriter;

/// Maximum number of peer workers run concurrently for one swarm download
/// (§4.10 `MAX_CONCURRENT_PEERS`).
pub const MAX_CONCURRENT_PEERS: usize = 8;

/// Cadence at which the work-stealing loop examines stalled blocks
/// (§4.10: "every 5 s").
pub const WORK_STEALING_INTERVAL: Duration = Duration::from_secs(5);

/// One candidate source for a swarm download.
#[derive(Clone)]
pub struct SwarmPeer {
    /// Stable id used in coordinator bookkeeping and speed tracking.
    pub id: String,
    /// Address to connect to when requesting a block from this peer.
    pub addr: SocketAddr,
}

/// Everything a swarm pull needs: which peers to draw blocks from, which
/// file to reconstruct, and where to write it.
pub struct PullRequest {
    /// Candidate source peers, up to [`MAX_CONCURRENT_PEERS`] of which run
    /// concurrently.
    pub peers: Vec<SwarmPeer>,
    /// Display name of the package the file belongs to (forwarded as the
    /// `BlockRequest` header's `game_name`, which the receiver uses to
    /// locate the package root).
    pub game_name: String,
    /// Forward-slash relative path of the file within the package.
    pub relative_path: String,
    /// Declared total size of the file in bytes.
    pub declared_size: u64,
    /// Destination path the reconstructed file is written to.
    pub destination: PathBuf,
    /// The sender-declared integrity hash the reconstructed file must
    /// match, lowercase hex XxHash64.
    pub expected_hash: String,
    /// Whether connections to peers must be `V3`-encrypted.
    pub require_encryption: bool,
    /// This device's id, used in the `V3` handshake.
    pub device_id: String,
}

/// Runs a complete swarm download, returning a [`SessionOutcome`].
///
/// Spawns one worker task per peer (capped at [`MAX_CONCURRENT_PEERS`])
/// plus a work-stealing task that reassigns stalled blocks to the fastest
/// other connected peer every [`WORK_STEALING_INTERVAL`]. Returns
/// `Ok(SessionOutcome::Failed)` rather than `Err` when the swarm cannot
/// make progress (no peers, a permanently abandoned block, a size or hash
/// mismatch) so callers handle every outcome through one channel.
///
/// # Errors
///
/// Returns [`TransferError`] only for failures outside the swarm's own
/// recoverable-retry model (e.g. the output file could not be created).
pub async fn pull(
    request: PullRequest,
    pairing: Arc<dyn PairingStore>,
) -> Result<SessionOutcome, TransferError> {
    if request.peers.is_empty() {
        return Ok(SessionOutcome::Failed {
            message: SwarmError::NoPeersAvailable.to_string(),
        });
    }

    let coordinator = BlockCoordinator::create_jobs(request.declared_size);
    let writer = Arc::new(RandomAccessWriter::create(
        &request.destination,
        request.declared_size,
    )?);
    let speed = Arc::new(SpeedTracker::new());

    let endpoints: HashMap<String, PeerEndpoint> = request
        .peers
        .iter()
        .map(|peer| {
            (
                peer.id.clone(),
                PeerEndpoint {
                    addr: peer.addr,
                    require_encryption: request.require_encryption,
                    device_id: request.device_id.clone(),
                },
            )
        })
        .collect();
    let peer_ids: Vec<String> = request.peers.iter().map(|p| p.id.clone()).collect();

    let active_peers = request.peers.iter().take(MAX_CONCURRENT_PEERS);
    let mut workers = Vec::new();
    for peer in active_peers {
        let coordinator = coordinator.clone();
        let writer = Arc::clone(&writer);
        let speed = Arc::clone(&speed);
        let pairing = Arc::clone(&pairing);
        let endpoint_addr = endpoints
            .get(&peer.id)
            .expect("endpoint built from the same peer list")
            .addr;
        let game_name = request.game_name.clone();
        let relative_path = request.relative_path.clone();
        let peer_id = peer.id.clone();
        let require_encryption = request.require_encryption;
        let device_id = request.device_id.clone();

        workers.push(tokio::spawn(async move {
            run_worker(
                &coordinator,
                &writer,
                &speed,
                pairing.as_ref(),
                &PeerEndpoint {
                    addr: endpoint_addr,
                    require_encryption,
                    device_id,
                },
                &peer_id,
                &game_name,
                &relative_path,
            )
            .await;
        }));
    }

    let stealing = tokio::spawn(work_stealing_loop(
        coordinator.clone(),
        Arc::clone(&speed),
        peer_ids,
    ));

    for worker in workers {
        let _ = worker.await;
    }
    stealing.abort();

    let counts = coordinator.counts();
    if !counts.is_complete() {
        let message = match coordinator.first_abandoned_block() {
            Some(job) => SwarmError::BlockAbandoned {
                index: job.index,
                attempts: job.failed_attempts,
            }
            .to_string(),
            None => format!(
                "swarm download incomplete: {} of {} blocks abandoned",
                counts.abandoned, counts.total_blocks
            ),
        };
        return Ok(SessionOutcome::Failed { message });
    }

    writer.finish()?;

    let path = writer.path().to_owned();
    let actual_hash = tokio::task::spawn_blocking(move || verify_hash(&path))
        .await
        .map_err(|e| std::io::Error::other(e.to_string()))??;
    if actual_hash != request.expected_hash {
        return Ok(SessionOutcome::Failed {
            message: format!(
                "swarm download hash mismatch: expected {}, got {actual_hash}",
                request.expected_hash
            ),
        });
    }

    Ok(SessionOutcome::Success {
        files_transferred: 1,
        bytes_transferred: request.declared_size,
        files_skipped: 0,
    })
}

async fn run_worker(
    coordinator: &BlockCoordinator,
    writer: &RandomAccessWriter,
    speed: &SpeedTracker,
    pairing: &dyn PairingStore,
    endpoint: &PeerEndpoint,
    peer_id: &str,
    game_name: &str,
    relative_path: &str,
) {
    while let Some(job) = coordinator.dequeue(peer_id) {
        let started = Instant::now();
        match fetch_block(endpoint, pairing, game_name, relative_path, &job).await {
            Ok(bytes) => match writer.write_at(job.offset, &bytes) {
                Ok(()) => {
                    coordinator.mark_complete(job.index);
                    speed.record(peer_id, u64::from(job.length), started.elapsed());
                }
                Err(err) => {
                    tracing::warn!(block = job.index, %err, "failed writing swarm block to disk");
                    coordinator.mark_failed(job.index, &err.to_string());
                }
            },
            Err(err) => {
                tracing::warn!(peer = peer_id, block = job.index, %err, "swarm block request failed");
                coordinator.mark_failed(job.index, &err.to_string());
            }
        }
    }
}

async fn work_stealing_loop(
    coordinator: BlockCoordinator,
    speed: Arc<SpeedTracker>,
    peer_ids: Vec<String>,
) {
    let mut ticker = tokio::time::interval(WORK_STEALING_INTERVAL);
    loop {
        ticker.tick().await;
        for stalled in coordinator.stalled() {
            let Some(original) = stalled.assigned_peer.clone() else {
                continue;
            };
            if let Some(thief) = speed.fastest_other_than(&peer_ids, &original) {
                tracing::debug!(block = stalled.index, from = %original, to = %thief, "work-stealing reassignment");
                coordinator.reassign(stalled.index, &thief);
            }
        }
    }
}

fn verify_hash(path: &std::path::Path) -> Result<String, std::io::Error> {
    let digest = checksums::hash_file::<checksums::strong::Xxh64>(path)
        .map_err(|e| std::io::Error::other(e.to_string()))?;
    Ok(hex_encode(&digest))
}

fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write as _;
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(&mut out, "{byte:02x}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crypto::InMemoryPairingStore;
    use protocol::wire::{BlockRequestDetails, TransferHeader};
    use tokio::net::TcpListener;

    /// Serves every connection a peer receives by answering with the exact
    /// byte range the `BlockRequestDetails` frame asks for, so the mock
    /// peer is agnostic to which block any particular worker happens to
    /// dequeue (the coordinator's FIFO queue does not guarantee any fixed
    /// block-to-peer mapping).
    async fn serve_blocks(listener: TcpListener, content: std::sync::Arc<Vec<u8>>) {
        loop {
            let Ok((stream, _addr)) = listener.accept().await else {
                return;
            };
            let content = std::sync::Arc::clone(&content);
            tokio::spawn(async move {
                let mut session = crate::transport::Session::Plain(stream);
                let _header: TransferHeader = session
                    .receive_frame()
                    .await
                    .expect("receive header")
                    .expect("header present");
                let details: BlockRequestDetails = session
                    .receive_frame()
                    .await
                    .expect("receive details")
                    .expect("details present");
                let start = details.offset as usize;
                let end = start + details.length as usize;
                session
                    .write_all(&content[start..end])
                    .await
                    .expect("write block bytes");
            });
        }
    }

    #[tokio::test]
    async fn swarm_of_two_peers_reconstructs_the_full_file() {
        let file_size = 12 * 1024 * 1024; // 3 blocks of 4 MiB
        let content: Vec<u8> = (0..file_size).map(|i| (i % 251) as u8).collect();
        let content = std::sync::Arc::new(content);

        let listener_a = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr_a = listener_a.local_addr().unwrap();
        let listener_b = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr_b = listener_b.local_addr().unwrap();

        let server_a = tokio::spawn(serve_blocks(listener_a, std::sync::Arc::clone(&content)));
        let server_b = tokio::spawn(serve_blocks(listener_b, std::sync::Arc::clone(&content)));

        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("out.bin");
        let expected_hash = hex_encode(&checksums::strong::Xxh64::digest(0, &content));

        let request = PullRequest {
            peers: vec![
                SwarmPeer {
                    id: "peer-a".to_owned(),
                    addr: addr_a,
                },
                SwarmPeer {
                    id: "peer-b".to_owned(),
                    addr: addr_b,
                },
            ],
            game_name: "Example Game".to_owned(),
            relative_path: "large.bin".to_owned(),
            declared_size: file_size as u64,
            destination: destination.clone(),
            expected_hash,
            require_encryption: false,
            device_id: "device-a".to_owned(),
        };

        let pairing: Arc<dyn crypto::PairingStore> = Arc::new(InMemoryPairingStore::new());
        let outcome = pull(request, pairing).await.expect("pull completes");

        server_a.abort();
        server_b.abort();

        match outcome {
            SessionOutcome::Success {
                bytes_transferred, ..
            } => assert_eq!(bytes_transferred, file_size as u64),
            SessionOutcome::Failed { message } => panic!("expected success, got: {message}"),
        }

        let written = std::fs::read(&destination).unwrap();
        assert_eq!(written, content);
    }

    #[tokio::test]
    async fn pull_with_no_peers_fails_without_creating_the_output_file() {
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("out.bin");
        let request = PullRequest {
            peers: Vec::new(),
            game_name: "Example Game".to_owned(),
            relative_path: "large.bin".to_owned(),
            declared_size: 1024,
            destination: destination.clone(),
            expected_hash: "deadbeef".to_owned(),
            require_encryption: false,
            device_id: "device-a".to_owned(),
        };
        let pairing: Arc<dyn crypto::PairingStore> = Arc::new(InMemoryPairingStore::new());
        let outcome = pull(request, pairing).await.expect("pull returns a failed outcome");
        assert!(!outcome.is_success());
        assert!(!destination.exists());
    }
}
