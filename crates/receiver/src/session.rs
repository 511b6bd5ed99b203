//! The receiver's connection-handling state machine (§4.9): negotiates the
//! session, reads the header, and dispatches per [`TransferType`].
//!
//! `Package` and `SaveSync` carry a manifest frame and run the full
//! `RECV_HEADER -> RECV_MANIFEST -> [approve] -> SEND_ACK -> RECV_FILES ->
//! SEND_COMPLETE` sequence mirrored from `sender::session`. The remaining
//! four transfer types are lightweight requests that never carry a
//! manifest: each reads its own small frame (or none) directly after the
//! header.

use std::net::SocketAddr;
use std::path::Path;
use std::time::{Duration, Instant};

use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::time::timeout;

use protocol::progress::{ApprovalRequest, ProgressEvent, SessionOutcome};
use protocol::wire::{
    Ack, BlockRequestDetails, FileEntry, Magic, TransferComplete, TransferHeader, TransferType,
    DELTA_MODE_DELTA, SWARM_BLOCK_SIZE,
};
use protocol::TransferError;

use crate::context::ReceiveContext;
use crate::library::PackageListing;
use crate::options::sanitize_path_component;
use crate::transport::Session;
use crate::{disk, marker, outbound, payload, smart_sync};

/// Ceiling on how long the receiver waits for an external collaborator to
/// approve or reject an incoming `Package` transfer before defaulting to
/// rejection (§4.9 `[ADDED]`).
pub const APPROVAL_TIMEOUT: Duration = Duration::from_secs(60);

/// How often progress events are emitted at most, while streaming file
/// bytes, matching `sender`'s throttle.
const PROGRESS_INTERVAL: Duration = Duration::from_millis(100);

/// Drives one accepted connection from the `V3` handshake (if required)
/// through to a [`SessionOutcome`].
///
/// # Errors
///
/// Returns [`TransferError`] for any failure the connection cannot recover
/// from. A peer-side rejection (of a `Package`/`SaveSync` manifest, or of
/// an approval prompt) is reported as `Ok(SessionOutcome::Failed { .. })`.
pub async fn handle_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    ctx: &ReceiveContext<'_>,
) -> Result<SessionOutcome, TransferError> {
    let mut session = establish_session(stream, peer_addr, ctx).await?;

    let header: TransferHeader = session
        .receive_frame()
        .await?
        .ok_or_else(|| TransferError::protocol("connection closed before the header frame"))?;

    if header.magic.is_encrypted() != matches!(session, Session::Encrypted(_)) {
        return Err(TransferError::protocol(
            "header magic does not match the negotiated session encryption",
        ));
    }

    tracing::debug!(peer = %peer_addr, transfer_type = ?header.transfer_type, "session header received");

    match header.transfer_type {
        TransferType::Package | TransferType::SaveSync => {
            let entries: Vec<FileEntry> = session.receive_frame().await?.ok_or_else(|| {
                TransferError::protocol("connection closed before the manifest frame")
            })?;

            let declared_total: u64 = entries.iter().map(|e| e.size).sum();
            if declared_total != header.total_size {
                let ack = Ack::reject(format!(
                    "header declared {} total bytes but the manifest sums to {declared_total}",
                    header.total_size
                ));
                session.send_frame(&ack).await?;
                return Err(TransferError::protocol(
                    "manifest total size does not match the header",
                ));
            }

            if header.transfer_type == TransferType::Package {
                handle_package(&mut session, peer_addr, &header, entries, ctx).await
            } else {
                handle_save_sync(&mut session, &header, entries, ctx).await
            }
        }
        TransferType::ListRequest => handle_list_request(&mut session, ctx).await,
        TransferType::PullRequest => handle_pull_request(&mut session, &header, ctx).await,
        TransferType::SpeedTest => handle_speed_test(&mut session, &header, ctx).await,
        TransferType::BlockRequest => handle_block_request(&mut session, &header, ctx).await,
    }
}

async fn establish_session(
    stream: TcpStream,
    peer_addr: SocketAddr,
    ctx: &ReceiveContext<'_>,
) -> Result<Session, TransferError> {
    if !ctx.options.require_encryption {
        return Ok(Session::Plain(stream));
    }
    let shared_key = ctx.pairing.get(peer_addr).ok_or_else(|| TransferError::Auth {
        peer: Some(peer_addr),
        message: "no paired key for this peer".to_owned(),
    })?;
    let (channel, _initiator_id) =
        crypto::handshake_responder(stream, &shared_key, &ctx.options.device_id).await?;
    Ok(Session::Encrypted(channel))
}

enum Approval {
    Approved,
    Rejected,
    TimedOut,
}

async fn request_approval(
    ctx: &ReceiveContext<'_>,
    header: &TransferHeader,
    peer_addr: SocketAddr,
) -> Approval {
    let Some(approvals) = &ctx.approvals else {
        return Approval::Approved;
    };

    let (respond, receive_decision) = oneshot::channel();
    let request = ApprovalRequest {
        game_name: header.game_name.clone(),
        total_size: header.total_size,
        from_peer: peer_addr,
        respond,
    };
    if approvals.send(request).await.is_err() {
        return Approval::TimedOut;
    }

    match timeout(APPROVAL_TIMEOUT, receive_decision).await {
        Ok(Ok(true)) => Approval::Approved,
        Ok(Ok(false)) => Approval::Rejected,
        Ok(Err(_)) | Err(_) => Approval::TimedOut,
    }
}

async fn handle_package(
    session: &mut Session,
    peer_addr: SocketAddr,
    header: &TransferHeader,
    entries: Vec<FileEntry>,
    ctx: &ReceiveContext<'_>,
) -> Result<SessionOutcome, TransferError> {
    let destination_root = ctx
        .options
        .library_root
        .join(sanitize_path_component(&header.game_name));

    let _destination_lock = ctx
        .locks
        .acquire(&destination_root)
        .await
        .map_err(resume_error)?;

    if let Err(error) = disk::ensure_sufficient_space(&destination_root, header.total_size) {
        session.send_frame(&Ack::reject(error.to_string())).await?;
        return Ok(SessionOutcome::from_error(&error));
    }

    match request_approval(ctx, header, peer_addr).await {
        Approval::Approved => {}
        Approval::Rejected => {
            let message = "transfer rejected by peer";
            session.send_frame(&Ack::reject(message)).await?;
            return Ok(SessionOutcome::Failed {
                message: message.to_owned(),
            });
        }
        Approval::TimedOut => {
            let message = "approval timed out";
            session.send_frame(&Ack::reject(message)).await?;
            return Ok(SessionOutcome::Failed {
                message: message.to_owned(),
            });
        }
    }

    tokio::fs::create_dir_all(&destination_root)
        .await
        .map_err(TransferError::from)?;

    let plan = smart_sync::analyze(&destination_root, &entries, &ctx.cancel).await?;

    session
        .send_frame(&Ack {
            accepted: true,
            reason: None,
            skipped_paths: plan.skipped_paths.clone(),
            supports_delta: true,
            delta_signatures: plan.delta_signatures.clone(),
        })
        .await?;

    let fingerprint = resume::compute_fingerprint(
        entries
            .iter()
            .map(|e| (e.relative_path.as_str(), e.size, e.hash.as_str())),
    );
    let mut state = resume::load_if_usable(&destination_root, &fingerprint)
        .map_err(resume_error)?
        .unwrap_or_else(|| {
            resume::TransferState::new(
                header.game_name.clone(),
                u64::try_from(entries.len()).unwrap_or(u64::MAX),
                header.total_size,
                fingerprint.clone(),
            )
        });

    let total_files = entries.len();
    let mut files_written = 0_u32;
    let mut bytes_written = 0_u64;
    let mut last_emit = Instant::now() - PROGRESS_INTERVAL;
    let mut last_save = Instant::now();

    for entry in &entries {
        if plan.skipped_paths.iter().any(|p| p == &entry.relative_path) {
            continue;
        }

        pathguard::ensure_safe_relative_path(&entry.relative_path)
            .map_err(|_| TransferError::path(entry.relative_path.clone()))?;

        let absolute = destination_root.join(&entry.relative_path);
        if let Some(parent) = absolute.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(TransferError::from)?;
        }
        let tmp_path = absolute.with_extension("steamroll-tmp");

        if plan.delta_signatures.contains_key(&entry.relative_path) {
            let mut mode_byte = [0_u8; 1];
            session.read_exact(&mut mode_byte).await?;
            if mode_byte[0] == DELTA_MODE_DELTA {
                let (instructions, literal) = payload::receive_delta_payload(session, ctx.limiter).await?;
                apply_delta_to(&absolute, &tmp_path, &instructions, &literal, &entry.hash, &entry.relative_path)
                    .await?;
            } else {
                payload::receive_whole_file(session, ctx.limiter, &tmp_path, entry.size, header.compression)
                    .await?;
                verify_hash(&tmp_path, &entry.hash, &entry.relative_path).await?;
            }
        } else {
            payload::receive_whole_file(session, ctx.limiter, &tmp_path, entry.size, header.compression)
                .await?;
            verify_hash(&tmp_path, &entry.hash, &entry.relative_path).await?;
        }

        tokio::fs::rename(&tmp_path, &absolute)
            .await
            .map_err(TransferError::from)?;

        files_written += 1;
        bytes_written += entry.size;
        state.mark_file_complete(entry.relative_path.clone(), entry.size);

        if last_save.elapsed() >= resume::RESUME_SAVE_INTERVAL {
            resume::save(&destination_root, &state).map_err(resume_error)?;
            last_save = Instant::now();
        }

        let is_last = files_written as usize + plan.skipped_paths.len() == total_files;
        if let Some(sender) = ctx.progress.as_ref() {
            if is_last || last_emit.elapsed() >= PROGRESS_INTERVAL {
                last_emit = Instant::now();
                let _ = sender
                    .send(ProgressEvent {
                        bytes_total: header.total_size,
                        bytes_done: bytes_written,
                        files_total: u32::try_from(total_files).unwrap_or(u32::MAX),
                        files_done: files_written,
                        current_file: Some(entry.relative_path.clone()),
                        bytes_per_second: 0.0,
                    })
                    .await;
            }
        }
    }

    session
        .send_frame(&TransferComplete {
            files_transferred: files_written,
            bytes_transferred: bytes_written,
        })
        .await?;

    resume::delete(&destination_root).map_err(resume_error)?;
    marker::write(
        &destination_root,
        &marker::ReceivedMarker::now(peer_addr, header.magic),
    )?;

    Ok(SessionOutcome::Success {
        files_transferred: files_written,
        bytes_transferred: bytes_written,
        files_skipped: u32::try_from(plan.skipped_paths.len()).unwrap_or(u32::MAX),
    })
}

async fn handle_save_sync(
    session: &mut Session,
    header: &TransferHeader,
    entries: Vec<FileEntry>,
    ctx: &ReceiveContext<'_>,
) -> Result<SessionOutcome, TransferError> {
    session.send_frame(&Ack::accept()).await?;

    let incoming_root = ctx.options.library_root.join("saves-incoming");
    tokio::fs::create_dir_all(&incoming_root)
        .await
        .map_err(TransferError::from)?;

    let mut bytes_written = 0_u64;
    for entry in &entries {
        pathguard::ensure_safe_relative_path(&entry.relative_path)
            .map_err(|_| TransferError::path(entry.relative_path.clone()))?;

        let destination = incoming_root.join(sanitize_path_component(&entry.relative_path));
        let tmp_path = destination.with_extension("steamroll-tmp");
        payload::receive_whole_file(session, ctx.limiter, &tmp_path, entry.size, header.compression).await?;
        verify_hash(&tmp_path, &entry.hash, &entry.relative_path).await?;
        tokio::fs::rename(&tmp_path, &destination)
            .await
            .map_err(TransferError::from)?;
        bytes_written += entry.size;
    }

    let files_transferred = u32::try_from(entries.len()).unwrap_or(u32::MAX);
    session
        .send_frame(&TransferComplete {
            files_transferred,
            bytes_transferred: bytes_written,
        })
        .await?;

    Ok(SessionOutcome::Success {
        files_transferred,
        bytes_transferred: bytes_written,
        files_skipped: 0,
    })
}

async fn handle_list_request(
    session: &mut Session,
    ctx: &ReceiveContext<'_>,
) -> Result<SessionOutcome, TransferError> {
    let listings: Vec<PackageListing> = ctx
        .library
        .map(|library| library.list_packages())
        .unwrap_or_default();
    let count = u32::try_from(listings.len()).unwrap_or(u32::MAX);
    session.send_frame(&listings).await?;

    Ok(SessionOutcome::Success {
        files_transferred: count,
        bytes_transferred: 0,
        files_skipped: 0,
    })
}

async fn handle_pull_request(
    session: &mut Session,
    header: &TransferHeader,
    ctx: &ReceiveContext<'_>,
) -> Result<SessionOutcome, TransferError> {
    let package_root = ctx
        .options
        .library_root
        .join(sanitize_path_component(&header.game_name));
    if !package_root.is_dir() {
        return Err(TransferError::protocol(format!(
            "no local package named {:?} available to fulfil the pull request",
            header.game_name
        )));
    }

    let (files_transferred, bytes_transferred) =
        outbound::send_package(session, &package_root, header.game_name.clone(), header.magic, ctx.limiter)
            .await?;

    Ok(SessionOutcome::Success {
        files_transferred,
        bytes_transferred,
        files_skipped: 0,
    })
}

async fn handle_speed_test(
    session: &mut Session,
    header: &TransferHeader,
    ctx: &ReceiveContext<'_>,
) -> Result<SessionOutcome, TransferError> {
    const CHUNK_LEN: usize = 64 * 1024;
    let mut remaining = header.total_size;
    let mut buf = [0_u8; CHUNK_LEN];
    while remaining > 0 {
        let take = remaining.min(buf.len() as u64) as usize;
        let _ = ctx
            .limiter
            .await_tokens_async(take as u64)
            .await
            .map_err(|_| TransferError::Cancelled)?;
        session.read_exact(&mut buf[..take]).await?;
        remaining -= take as u64;
    }
    session.send_frame(&Ack::accept()).await?;

    Ok(SessionOutcome::Success {
        files_transferred: 0,
        bytes_transferred: header.total_size,
        files_skipped: 0,
    })
}

async fn handle_block_request(
    session: &mut Session,
    header: &TransferHeader,
    ctx: &ReceiveContext<'_>,
) -> Result<SessionOutcome, TransferError> {
    let details: BlockRequestDetails = session.receive_frame().await?.ok_or_else(|| {
        TransferError::protocol("connection closed before the block request details frame")
    })?;

    pathguard::ensure_safe_relative_path(&details.relative_path)
        .map_err(|_| TransferError::path(details.relative_path.clone()))?;
    if u64::from(details.length) > SWARM_BLOCK_SIZE {
        return Err(TransferError::protocol(format!(
            "block request for {} bytes exceeds the {SWARM_BLOCK_SIZE} byte swarm block size",
            details.length
        )));
    }

    let package_root = ctx
        .options
        .library_root
        .join(sanitize_path_component(&header.game_name));
    let absolute = package_root.join(&details.relative_path);
    let offset = details.offset;
    let length = details.length;

    let bytes = tokio::task::spawn_blocking(move || read_block(&absolute, offset, length))
        .await
        .map_err(|e| TransferError::protocol(format!("block read task panicked: {e}")))?
        .map_err(TransferError::from)?;

    session.write_all(&bytes).await?;

    Ok(SessionOutcome::Success {
        files_transferred: 0,
        bytes_transferred: u64::from(length),
        files_skipped: 0,
    })
}

fn read_block(path: &Path, offset: u64, length: u32) -> std::io::Result<Vec<u8>> {
    use std::io::{Read, Seek, SeekFrom};
    let mut file = std::fs::File::open(path)?;
    file.seek(SeekFrom::Start(offset))?;
    let mut buf = vec![0_u8; length as usize];
    file.read_exact(&mut buf)?;
    Ok(buf)
}

async fn apply_delta_to(
    target_path: &Path,
    tmp_path: &Path,
    instructions: &[protocol::wire::DeltaInstruction],
    literal: &[u8],
    expected_hash: &str,
    relative_path: &str,
) -> Result<(), TransferError> {
    let target_path = target_path.to_owned();
    let instructions = instructions.to_vec();
    let literal = literal.to_vec();
    let expected_hash = expected_hash.to_owned();
    let reconstructed = tokio::task::spawn_blocking(move || {
        delta::apply_delta(&target_path, &instructions, &literal, &expected_hash)
    })
    .await
    .map_err(|e| TransferError::protocol(format!("delta apply task panicked: {e}")))?
    .map_err(|e| delta_error(e, relative_path))?;

    tokio::fs::write(tmp_path, reconstructed)
        .await
        .map_err(TransferError::from)
}

async fn verify_hash(path: &Path, expected: &str, relative_path: &str) -> Result<(), TransferError> {
    let owned = path.to_owned();
    let actual = tokio::task::spawn_blocking(move || {
        checksums::hash_file::<checksums::strong::Xxh64>(&owned).map(checksums::strong::Xxh64::to_hex)
    })
    .await
    .map_err(|e| TransferError::protocol(format!("hash verify task panicked: {e}")))?
    .map_err(|e| TransferError::io_at(path, std::io::Error::other(e)))?;

    if !actual.eq_ignore_ascii_case(expected) {
        return Err(TransferError::Integrity {
            path: relative_path.to_owned(),
            expected: expected.to_owned(),
            actual,
        });
    }
    Ok(())
}

fn delta_error(error: delta::DeltaError, relative_path: &str) -> TransferError {
    match error {
        delta::DeltaError::IntegrityMismatch { expected, actual } => TransferError::Integrity {
            path: relative_path.to_owned(),
            expected,
            actual,
        },
        delta::DeltaError::Io { path, source } => TransferError::io_at(path, source),
        delta::DeltaError::InstructionOutOfRange { offset, length } => TransferError::protocol(format!(
            "delta instruction for {relative_path} referenced offset {offset} + length {length} past the target end"
        )),
    }
}

fn resume_error(error: resume::ResumeError) -> TransferError {
    match error {
        resume::ResumeError::DestinationBusy { path } => TransferError::resource(format!(
            "destination {} is busy: another transfer holds its lock",
            path.display()
        )),
        resume::ResumeError::Io(source) => TransferError::Io { path: None, source },
        resume::ResumeError::Malformed(source) => {
            TransferError::protocol(format!("resume state file was malformed: {source}"))
        }
    }
}
