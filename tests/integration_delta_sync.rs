//! Scenario 3 ("delta reduction") from the transfer core's end-to-end seed
//! list: the destination already holds a similar-but-not-identical file,
//! so the receiver offers block signatures and the sender reconstructs the
//! file via a delta payload rather than retransmitting it whole.

use std::net::SocketAddr;

use protocol::progress::SessionOutcome;
use protocol::wire::TransferType;
use receiver::{ReceiveContext, ReceiverOptions};
use resume::DestinationLocks;
use sender::SendRequest;
use tempfile::TempDir;
use test_support::PackageTree;
use tokio::net::TcpListener;

const BLOCK: usize = 64 * 1024;

#[tokio::test]
async fn delta_reduction_reconstructs_a_modified_file_byte_for_byte() {
    // Four 64 KiB blocks: the first three are shared with the existing
    // destination copy, the last is freshly modified content.
    let shared_a: Vec<u8> = (0..BLOCK).map(|i| (i % 251) as u8).collect();
    let shared_b: Vec<u8> = (0..BLOCK).map(|i| ((i * 3) % 251) as u8).collect();
    let shared_c: Vec<u8> = (0..BLOCK).map(|i| ((i * 7) % 251) as u8).collect();
    let source_tail: Vec<u8> = (0..BLOCK).map(|i| ((i * 13 + 5) % 251) as u8).collect();
    let target_tail: Vec<u8> = vec![0xAB_u8; BLOCK];

    let mut source_bytes = Vec::with_capacity(4 * BLOCK);
    source_bytes.extend_from_slice(&shared_a);
    source_bytes.extend_from_slice(&shared_b);
    source_bytes.extend_from_slice(&shared_c);
    source_bytes.extend_from_slice(&source_tail);

    let mut target_bytes = Vec::with_capacity(4 * BLOCK);
    target_bytes.extend_from_slice(&shared_a);
    target_bytes.extend_from_slice(&shared_b);
    target_bytes.extend_from_slice(&shared_c);
    target_bytes.extend_from_slice(&target_tail);

    let source = PackageTree::build(&[("big.bin", &source_bytes)]);

    let destination = TempDir::new().expect("create destination dir");
    let game_dir = destination.path().join("Delta Game");
    std::fs::create_dir_all(&game_dir).unwrap();
    std::fs::write(game_dir.join("big.bin"), &target_bytes).unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind receiver listener");
    let addr: SocketAddr = listener.local_addr().expect("read local addr");

    let options = ReceiverOptions {
        library_root: destination.path().to_owned(),
        require_encryption: false,
        device_id: "receiver-device".to_owned(),
    };
    let limiter_recv = bandwidth::Limiter::new(|| 0);
    let locks = DestinationLocks::new();
    let pairing_recv = crypto::InMemoryPairingStore::new();

    let receiver_task = tokio::spawn(async move {
        let (stream, peer_addr) = listener.accept().await.expect("accept inbound connection");
        let ctx = ReceiveContext {
            options: &options,
            pairing: &pairing_recv,
            limiter: &limiter_recv,
            locks: &locks,
            progress: None,
            approvals: None,
            library: None,
            cancel: receiver::CancellationToken::new(),
        };
        receiver::handle_connection(stream, peer_addr, &ctx).await
    });

    let pairing_send = crypto::InMemoryPairingStore::new();
    let limiter_send = bandwidth::Limiter::new(|| 0);
    let request = SendRequest {
        package_root: source.root().to_owned(),
        game_name: "Delta Game".to_owned(),
        metadata: None,
        transfer_type: TransferType::Package,
        enable_compression: false,
        require_encryption: false,
        device_id: "sender-device".to_owned(),
        is_received: false,
        dry_run: false,
    };

    let send_outcome = sender::send(addr, request, &pairing_send, &limiter_send, None)
        .await
        .expect("sender session should not error");
    let recv_outcome = receiver_task
        .await
        .expect("receiver task should not panic")
        .expect("receiver session should not error");

    assert!(send_outcome.is_success(), "{send_outcome:?}");
    match recv_outcome {
        SessionOutcome::Success { files_transferred, files_skipped, .. } => {
            assert_eq!(files_transferred, 1);
            assert_eq!(files_skipped, 0);
        }
        other => panic!("expected success, got {other:?}"),
    }

    let reconstructed = std::fs::read(game_dir.join("big.bin")).unwrap();
    assert_eq!(reconstructed, source_bytes, "reconstructed file must equal the source byte-for-byte");
}
