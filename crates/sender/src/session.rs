//! The sender's state machine: `CONNECT -> SEND_HEADER -> SEND_MANIFEST ->
//! RECV_ACK -> [ABORT|SEND_FILES] -> RECV_COMPLETE -> DONE` (§4.8).

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::timeout;

use crypto::PairingStore;
use protocol::progress::{ProgressEvent, SessionOutcome};
use protocol::wire::{Ack, Compression, Magic, TransferHeader, TransferType};
use protocol::{FileEntry, PackageMetadata, TransferError};

use crate::manifest::build_manifest;
use crate::payload;
use crate::transport::Session;

/// The 5 second ceiling on establishing the TCP connection (§5).
pub const CONNECT_DEADLINE: Duration = Duration::from_secs(5);

/// How often progress events are emitted at most, while streaming file
/// bytes (§9 "throttled progress").
const PROGRESS_INTERVAL: Duration = Duration::from_millis(100);

/// Everything the sender needs to know to drive one outbound session,
/// independent of the connection itself.
pub struct SendRequest<'a> {
    /// Root directory of the package (or save) being sent.
    pub package_root: PathBuf,
    /// Display name advertised in the header.
    pub game_name: String,
    /// Parsed `steamroll.json`, if present, for smart hashing.
    pub metadata: Option<&'a PackageMetadata>,
    /// What kind of session this is.
    pub transfer_type: TransferType,
    /// Whether to request in-stream GZip compression of file payloads.
    pub enable_compression: bool,
    /// Whether this session must be encrypted (`V3`).
    pub require_encryption: bool,
    /// This device's id, advertised during the `V3` handshake.
    pub device_id: String,
    /// Whether a prior attempt's marker file indicates the destination
    /// already has this package (informational for the receiver).
    pub is_received: bool,
    /// When set, the manifest and ACK exchange run normally but the
    /// `SEND_FILES` step is skipped entirely (§4.8 `[ADDED]`).
    pub dry_run: bool,
}

/// Connects to `addr` and drives one full sender session to completion.
///
/// # Errors
///
/// Returns [`TransferError`] on any failure reaching, authenticating
/// with, or exchanging frames with the peer. A receiver-side rejection of
/// the transfer is reported as `Ok(SessionOutcome::Failed { .. })`, not an
/// `Err`.
pub async fn send(
    addr: std::net::SocketAddr,
    request: SendRequest<'_>,
    pairing: &dyn PairingStore,
    limiter: &bandwidth::Limiter,
    progress: Option<mpsc::Sender<ProgressEvent>>,
) -> Result<SessionOutcome, TransferError> {
    let stream = timeout(CONNECT_DEADLINE, TcpStream::connect(addr))
        .await
        .map_err(|_| TransferError::protocol(format!("connect to {addr} timed out")))?
        .map_err(TransferError::from)?;

    let magic = Magic::select(request.enable_compression, request.require_encryption);
    let mut session = establish_session(stream, addr, magic, &request, pairing).await?;

    let package_root = request.package_root.clone();
    let metadata_owned = request.metadata.cloned();
    let entries = tokio::task::spawn_blocking(move || {
        build_manifest(&package_root, metadata_owned.as_ref())
    })
    .await
    .map_err(|e| TransferError::protocol(format!("manifest task panicked: {e}")))??;

    let total_size: u64 = entries.iter().map(|e| e.size).sum();
    let header = TransferHeader {
        magic,
        game_name: request.game_name.clone(),
        total_files: u32::try_from(entries.len())
            .map_err(|_| TransferError::protocol("manifest exceeds u32::MAX files"))?,
        total_size,
        transfer_type: request.transfer_type,
        compression: if request.enable_compression {
            Compression::GZip
        } else {
            Compression::None
        },
        supports_delta: true,
        is_received: request.is_received,
    };

    session.send_frame(&header).await?;
    session.send_frame(&entries).await?;

    let ack: Ack = session
        .receive_frame()
        .await?
        .ok_or_else(|| TransferError::protocol("connection closed before the ACK frame"))?;

    if !ack.accepted {
        return Ok(SessionOutcome::Failed {
            message: ack
                .reason
                .unwrap_or_else(|| "transfer rejected by peer".to_owned()),
        });
    }

    let files_skipped = u32::try_from(ack.skipped_paths.len()).unwrap_or(u32::MAX);

    if request.dry_run {
        tracing::info!(
            game_name = %request.game_name,
            total_files = entries.len(),
            total_size,
            "dry run complete; no file bytes sent"
        );
        return Ok(SessionOutcome::Success {
            files_transferred: 0,
            bytes_transferred: 0,
            files_skipped,
        });
    }

    send_files(
        &mut session,
        &request.package_root,
        &entries,
        &ack,
        header.compression,
        limiter,
        total_size,
        progress,
    )
    .await?;

    let complete: protocol::wire::TransferComplete = session
        .receive_frame()
        .await?
        .ok_or_else(|| TransferError::protocol("connection closed before the completion frame"))?;

    Ok(SessionOutcome::Success {
        files_transferred: complete.files_transferred,
        bytes_transferred: complete.bytes_transferred,
        files_skipped,
    })
}

async fn establish_session(
    stream: TcpStream,
    addr: std::net::SocketAddr,
    magic: Magic,
    request: &SendRequest<'_>,
    pairing: &dyn PairingStore,
) -> Result<Session, TransferError> {
    if !magic.is_encrypted() {
        return Ok(Session::Plain(stream));
    }
    let shared_key = pairing.get(addr).ok_or_else(|| TransferError::Auth {
        peer: Some(addr),
        message: "no paired key for this peer".to_owned(),
    })?;
    let (channel, _responder_id) =
        crypto::handshake_initiator(stream, &shared_key, &request.device_id).await?;
    Ok(Session::Encrypted(channel))
}

#[allow(clippy::too_many_arguments)]
async fn send_files(
    session: &mut Session,
    package_root: &Path,
    entries: &[FileEntry],
    ack: &Ack,
    compression: Compression,
    limiter: &bandwidth::Limiter,
    total_size: u64,
    progress: Option<mpsc::Sender<ProgressEvent>>,
) -> Result<(), TransferError> {
    let total_files = entries.len();
    let mut files_done = 0_u32;
    let mut bytes_done = 0_u64;
    let mut last_emit = Instant::now() - PROGRESS_INTERVAL;

    for entry in entries {
        if ack.skipped_paths.iter().any(|p| p == &entry.relative_path) {
            continue;
        }

        let absolute = package_root.join(&entry.relative_path);

        if let Some(signatures) = ack.delta_signatures.get(&entry.relative_path) {
            let source = payload::read_whole_file(&absolute).await?;
            let signatures = signatures.clone();
            let (instructions, literal) = tokio::task::spawn_blocking(move || {
                delta::calculate_delta(&source, &signatures)
            })
            .await
            .map_err(|e| TransferError::protocol(format!("delta task panicked: {e}")))?;

            let instructions_bytes = serde_json::to_vec(&instructions).map_err(|e| {
                TransferError::protocol(format!("failed to encode delta instructions: {e}"))
            })?;
            let delta_payload_len = instructions_bytes.len() + literal.len();

            if delta::meets_savings_threshold(delta_payload_len as u64, entry.size) {
                payload::send_delta_payload(session, limiter, &instructions, &literal).await?;
            } else {
                payload::send_whole_file_after_delta_decline(
                    session,
                    limiter,
                    &absolute,
                    compression,
                )
                .await?;
            }
        } else {
            payload::send_whole_file(session, limiter, &absolute, compression).await?;
        }

        files_done += 1;
        bytes_done += entry.size;

        let is_last = files_done as usize == total_files;
        if let Some(sender) = &progress {
            if is_last || last_emit.elapsed() >= PROGRESS_INTERVAL {
                last_emit = Instant::now();
                let _ = sender
                    .send(ProgressEvent {
                        bytes_total: total_size,
                        bytes_done,
                        files_total: u32::try_from(total_files).unwrap_or(u32::MAX),
                        files_done,
                        current_file: Some(entry.relative_path.clone()),
                        bytes_per_second: 0.0,
                    })
                    .await;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_deadline_matches_the_documented_ceiling() {
        assert_eq!(CONNECT_DEADLINE, Duration::from_secs(5));
    }
}
