//! Scenario 6 ("swarm of two") from the transfer core's end-to-end seed
//! list: a single 12 MiB file (three 4 MiB blocks) is pulled concurrently
//! from two peers, each independently serving `BlockRequest` sessions
//! against its own copy of the file.

use std::net::SocketAddr;

use checksums::strong::Xxh64;
use crypto::InMemoryPairingStore;
use receiver::{ReceiveContext, ReceiverOptions};
use resume::DestinationLocks;
use swarm::{PullRequest, SwarmPeer};
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Runs a block-serving peer that answers `BlockRequest` sessions against
/// files under `game_dir`, for as long as the returned task stays alive.
async fn spawn_block_peer(game_dir: std::path::PathBuf) -> (SocketAddr, tokio::task::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind peer listener");
    let addr = listener.local_addr().expect("read local addr");
    let library_root = game_dir.parent().unwrap().to_owned();

    let handle = tokio::spawn(async move {
        let options = ReceiverOptions {
            library_root,
            require_encryption: false,
            device_id: format!("peer-{addr}"),
        };
        let limiter = bandwidth::Limiter::new(|| 0);
        let locks = DestinationLocks::new();
        let pairing = InMemoryPairingStore::new();

        loop {
            let Ok((stream, peer_addr)) = listener.accept().await else {
                return;
            };
            let ctx = ReceiveContext {
                options: &options,
                pairing: &pairing,
                limiter: &limiter,
                locks: &locks,
                progress: None,
                approvals: None,
                library: None,
                cancel: receiver::CancellationToken::new(),
            };
            let _ = receiver::handle_connection(stream, peer_addr, &ctx).await;
        }
    });

    (addr, handle)
}

#[tokio::test]
async fn swarm_of_two_peers_reconstructs_the_full_file() {
    const BLOCK: usize = 4 * 1024 * 1024;
    let file_bytes: Vec<u8> = (0..(3 * BLOCK)).map(|i| (i % 256) as u8).collect();
    let expected_hash = Xxh64::to_hex(Xxh64::digest(0, &file_bytes));

    let peer_a_root = TempDir::new().expect("create peer a library root");
    let peer_a_game = peer_a_root.path().join("Swarm Game");
    std::fs::create_dir_all(&peer_a_game).unwrap();
    std::fs::write(peer_a_game.join("big.bin"), &file_bytes).unwrap();

    let peer_b_root = TempDir::new().expect("create peer b library root");
    let peer_b_game = peer_b_root.path().join("Swarm Game");
    std::fs::create_dir_all(&peer_b_game).unwrap();
    std::fs::write(peer_b_game.join("big.bin"), &file_bytes).unwrap();

    let (addr_a, handle_a) = spawn_block_peer(peer_a_game).await;
    let (addr_b, handle_b) = spawn_block_peer(peer_b_game).await;

    let destination = TempDir::new().expect("create swarm destination");
    let output_path = destination.path().join("big.bin");

    let request = PullRequest {
        peers: vec![
            SwarmPeer { id: "peer-a".to_owned(), addr: addr_a },
            SwarmPeer { id: "peer-b".to_owned(), addr: addr_b },
        ],
        game_name: "Swarm Game".to_owned(),
        relative_path: "big.bin".to_owned(),
        declared_size: file_bytes.len() as u64,
        destination: output_path.clone(),
        expected_hash,
        require_encryption: false,
        device_id: "swarm-requester".to_owned(),
    };

    let pairing = std::sync::Arc::new(InMemoryPairingStore::new());
    let outcome = swarm::pull(request, pairing).await.expect("swarm pull should not error");

    handle_a.abort();
    handle_b.abort();

    assert!(outcome.is_success(), "{outcome:?}");
    let written = std::fs::read(&output_path).unwrap();
    assert_eq!(written.len(), file_bytes.len());
    assert_eq!(written, file_bytes);
}
