//! Scenario 5 ("resume across restart") from the transfer core's
//! end-to-end seed list.
//!
//! A true mid-stream process kill isn't reproducible through the public
//! async API in a deterministic test, so this exercises the two halves of
//! resume idempotence directly: (a) a resume-state file written before a
//! "restart" is recognized as reusable against the same manifest's
//! fingerprint, exactly as a freshly started receiver would check it on
//! startup, and (b) a file already present at the destination,
//! byte-identical to the source, is skipped by smart-sync rather than
//! rehashed-and-retransmitted, so a real end-to-end session completes
//! without redoing work the prior attempt already finished.

use std::net::SocketAddr;

use protocol::progress::SessionOutcome;
use protocol::wire::TransferType;
use receiver::{ReceiveContext, ReceiverOptions};
use resume::DestinationLocks;
use sender::SendRequest;
use tempfile::TempDir;
use test_support::PackageTree;
use tokio::net::TcpListener;

#[tokio::test]
async fn a_matching_resume_state_is_loaded_and_completed_files_are_not_retransmitted() {
    let source = PackageTree::build(&[
        ("a.txt", b"This is a test file content."),
        ("large.bin", &[b'A'; 300_000]),
    ]);
    let destination = TempDir::new().expect("create destination dir");
    let game_dir = destination.path().join("Resume Game");
    std::fs::create_dir_all(&game_dir).unwrap();

    // "Prior attempt" already wrote large.bin to the destination, byte-
    // identical to the source, and persisted a resume state recording it
    // complete before the process was terminated.
    std::fs::write(game_dir.join("large.bin"), &[b'A'; 300_000]).unwrap();

    let entries = sender::manifest::build_manifest(source.root(), None).expect("build manifest");
    let fingerprint = resume::compute_fingerprint(
        entries.iter().map(|e| (e.relative_path.as_str(), e.size, e.hash.as_str())),
    );

    let mut prior_state = resume::TransferState::new(
        "Resume Game",
        entries.len() as u64,
        entries.iter().map(|e| e.size).sum(),
        fingerprint.clone(),
    );
    prior_state.mark_file_complete("large.bin", 300_000);
    resume::save(&game_dir, &prior_state).expect("persist prior resume state");

    // Restart: a freshly constructed receiver recognizes the saved state
    // as usable against the same manifest fingerprint.
    let reloaded = resume::load_if_usable(&game_dir, &fingerprint)
        .expect("load resume state")
        .expect("resume state should be usable: fingerprint matches and it is not expired");
    assert!(reloaded.completed_relative_paths.contains("large.bin"));

    // Now run a real end-to-end session against that same destination.
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
        game_name: "Resume Game".to_owned(),
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
            assert_eq!(files_skipped, 1, "large.bin should be skipped: it already matches by hash");
            assert_eq!(files_transferred, 1, "only a.txt should have been streamed");
        }
        other => panic!("expected success, got {other:?}"),
    }

    assert_eq!(std::fs::read(game_dir.join("a.txt")).unwrap(), b"This is a test file content.");
    assert_eq!(std::fs::read(game_dir.join("large.bin")).unwrap(), vec![b'A'; 300_000]);
    // Completion deletes the resume state regardless of what a prior
    // attempt left behind.
    assert!(!game_dir.join(".steamroll_transfer_state").exists());
}
