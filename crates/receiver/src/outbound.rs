//! Driving an outbound `Package` send back over an already-accepted
//! connection, for `PullRequest` sessions (§4.9).
//!
//! A `PullRequest` arrives on a connection this process *accepted*, so
//! there is no separate outbound socket to open back to the requester —
//! the requester is waiting on the same connection for us to become the
//! sender. This module replays the sender's `SEND_HEADER -> SEND_MANIFEST
//! -> RECV_ACK -> SEND_FILES -> RECV_COMPLETE` sequence (`sender::session`)
//! over [`Session`] instead of `sender::transport::Session`, since the two
//! transport types are intentionally distinct (`protocol` cannot depend on
//! `crypto`, so neither endpoint can share one transport type with the
//! other).

use std::path::Path;

use protocol::wire::{Ack, Compression, DeltaInstruction, Magic, TransferComplete, TransferHeader, TransferType};
use protocol::TransferError;

use crate::transport::Session;

const STREAM_CHUNK_LEN: usize = 64 * 1024;

/// Builds the manifest for `package_root`, sends the header and manifest
/// over `session`, waits for the peer's ACK, and — if accepted — streams
/// every non-skipped file before waiting for the completion frame.
///
/// # Errors
///
/// Returns [`TransferError`] on any encode, I/O, or protocol failure. A
/// peer rejection is reported as `Ok` with a rejection reason available to
/// the caller via the returned [`Ack`], not as an `Err`.
pub async fn send_package(
    session: &mut Session,
    package_root: &Path,
    game_name: String,
    magic: Magic,
    limiter: &bandwidth::Limiter,
) -> Result<(u32, u64), TransferError> {
    let root = package_root.to_owned();
    let entries = tokio::task::spawn_blocking(move || sender::manifest::build_manifest(&root, None))
        .await
        .map_err(|e| TransferError::protocol(format!("manifest task panicked: {e}")))??;

    let total_size: u64 = entries.iter().map(|e| e.size).sum();
    let header = TransferHeader {
        magic,
        game_name,
        total_files: u32::try_from(entries.len())
            .map_err(|_| TransferError::protocol("manifest exceeds u32::MAX files"))?,
        total_size,
        transfer_type: TransferType::Package,
        compression: Compression::None,
        supports_delta: true,
        is_received: false,
    };

    session.send_frame(&header).await?;
    session.send_frame(&entries).await?;

    let ack: Ack = session
        .receive_frame()
        .await?
        .ok_or_else(|| TransferError::protocol("connection closed before the ACK frame"))?;

    if !ack.accepted {
        return Ok((0, 0));
    }

    for entry in &entries {
        if ack.skipped_paths.iter().any(|p| p == &entry.relative_path) {
            continue;
        }
        let absolute = package_root.join(&entry.relative_path);

        if let Some(signatures) = ack.delta_signatures.get(&entry.relative_path) {
            let source = tokio::fs::read(&absolute).await.map_err(TransferError::from)?;
            let signatures = signatures.clone();
            let (instructions, literal) = tokio::task::spawn_blocking(move || {
                delta::calculate_delta(&source, &signatures)
            })
            .await
            .map_err(|e| TransferError::protocol(format!("delta task panicked: {e}")))?;

            let instructions_bytes = serde_json::to_vec(&instructions).map_err(|e| {
                TransferError::protocol(format!("failed to encode delta instructions: {e}"))
            })?;
            if delta::meets_savings_threshold(
                (instructions_bytes.len() + literal.len()) as u64,
                entry.size,
            ) {
                send_delta(session, limiter, &instructions, &literal).await?;
            } else {
                session.write_all(&[protocol::wire::DELTA_MODE_WHOLE_FILE]).await?;
                send_whole_file(session, limiter, &absolute).await?;
            }
        } else {
            send_whole_file(session, limiter, &absolute).await?;
        }
    }

    let complete: TransferComplete = session
        .receive_frame()
        .await?
        .ok_or_else(|| TransferError::protocol("connection closed before the completion frame"))?;

    Ok((complete.files_transferred, complete.bytes_transferred))
}

async fn send_whole_file(
    session: &mut Session,
    limiter: &bandwidth::Limiter,
    path: &Path,
) -> Result<(), TransferError> {
    let raw = tokio::fs::read(path).await.map_err(TransferError::from)?;
    stream_rate_limited(session, limiter, &raw).await
}

async fn send_delta(
    session: &mut Session,
    limiter: &bandwidth::Limiter,
    instructions: &[DeltaInstruction],
    literal: &[u8],
) -> Result<(), TransferError> {
    let instructions_bytes = serde_json::to_vec(instructions)
        .map_err(|e| TransferError::protocol(format!("failed to encode delta instructions: {e}")))?;

    session.write_all(&[protocol::wire::DELTA_MODE_DELTA]).await?;
    session
        .write_all(&u32::try_from(instructions.len()).unwrap_or(u32::MAX).to_le_bytes())
        .await?;
    session
        .write_all(&u32::try_from(literal.len()).unwrap_or(u32::MAX).to_le_bytes())
        .await?;
    session
        .write_all(&u32::try_from(instructions_bytes.len()).unwrap_or(u32::MAX).to_le_bytes())
        .await?;
    stream_rate_limited(session, limiter, &instructions_bytes).await?;
    stream_rate_limited(session, limiter, literal).await
}

async fn stream_rate_limited(
    session: &mut Session,
    limiter: &bandwidth::Limiter,
    bytes: &[u8],
) -> Result<(), TransferError> {
    for chunk in bytes.chunks(STREAM_CHUNK_LEN) {
        let _ = limiter
            .await_tokens_async(chunk.len() as u64)
            .await
            .map_err(|_| TransferError::Cancelled)?;
        session.write_all(chunk).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use protocol::wire::{FileEntry, TransferComplete};

    #[tokio::test]
    async fn send_package_streams_every_file_and_reports_the_peers_completion_frame() {
        let package = test_support::canonical_package();
        let pair = test_support::loopback_pair().await;
        let mut outbound_session = Session::Plain(pair.acceptor);
        let mut peer_session = Session::Plain(pair.initiator);
        let limiter = bandwidth::Limiter::new(|| 0);

        let package_root = package.root().to_owned();
        let sender_task = tokio::spawn(async move {
            send_package(
                &mut outbound_session,
                &package_root,
                "Example Game".to_owned(),
                Magic::V1,
                &limiter,
            )
            .await
        });

        let _header: TransferHeader = peer_session
            .receive_frame()
            .await
            .expect("receive header")
            .expect("header present");
        let entries: Vec<FileEntry> = peer_session
            .receive_frame()
            .await
            .expect("receive manifest")
            .expect("manifest present");
        peer_session
            .send_frame(&Ack::accept())
            .await
            .expect("send ack");

        let mut received_bytes = 0_u64;
        for entry in &entries {
            let mut buf = vec![0_u8; entry.size as usize];
            peer_session
                .read_exact(&mut buf)
                .await
                .expect("read whole file payload");
            received_bytes += buf.len() as u64;
        }

        peer_session
            .send_frame(&TransferComplete {
                files_transferred: u32::try_from(entries.len()).unwrap(),
                bytes_transferred: received_bytes,
            })
            .await
            .expect("send completion frame");

        let (files_transferred, bytes_transferred) =
            sender_task.await.expect("sender task").expect("send succeeds");
        assert_eq!(files_transferred as usize, entries.len());
        assert_eq!(bytes_transferred, received_bytes);
    }
}
