//! Per-file payload transmission: whole-file streaming, optionally
//! GZip-compressed, and delta-mode byte emission (§4.8, §6.2).

use std::io::Read;
use std::path::Path;

use protocol::wire::{Compression, DeltaPayloadHeader, DELTA_MODE_DELTA, DELTA_MODE_WHOLE_FILE};
use protocol::TransferError;

use crate::transport::Session;

const STREAM_CHUNK_LEN: usize = 64 * 1024;

/// Streams `path`'s entire contents to `session`, rate-limited through
/// `limiter`, with no preceding mode byte — used when no delta signature
/// was exchanged for this file.
///
/// When `compression` is [`Compression::GZip`] the whole file is
/// compressed into memory first (bounded by `size`, already checked
/// against the manifest) and sent as a `u32`-prefixed compressed block;
/// otherwise exactly `size` raw bytes are streamed.
///
/// # Errors
///
/// Returns [`TransferError::Io`] on a read or write failure.
pub async fn send_whole_file(
    session: &mut Session,
    limiter: &bandwidth::Limiter,
    path: &Path,
    compression: Compression,
) -> Result<(), TransferError> {
    let path = path.to_owned();
    let raw = tokio::task::spawn_blocking(move || std::fs::read(&path))
        .await
        .expect("blocking read task does not panic")
        .map_err(TransferError::from)?;

    match compression {
        Compression::None => stream_rate_limited(session, limiter, &raw).await,
        Compression::GZip => {
            let compressed = compress_blocking(raw).await?;
            let len = u32::try_from(compressed.len())
                .map_err(|_| TransferError::protocol("compressed payload exceeds u32::MAX"))?;
            session.write_all(&len.to_le_bytes()).await?;
            stream_rate_limited(session, limiter, &compressed).await
        }
    }
}

/// Emits a delta-mode payload: mode byte `0x01`, the fixed
/// [`DeltaPayloadHeader`], then the serialized instructions and the
/// literal byte buffer.
///
/// # Errors
///
/// Returns [`TransferError::Io`]/[`TransferError::Protocol`] on
/// encode or write failure.
pub async fn send_delta_payload(
    session: &mut Session,
    limiter: &bandwidth::Limiter,
    instructions: &[protocol::wire::DeltaInstruction],
    literal: &[u8],
) -> Result<(), TransferError> {
    let instructions_bytes = serde_json::to_vec(instructions)
        .map_err(|e| TransferError::protocol(format!("failed to encode delta instructions: {e}")))?;
    let header = DeltaPayloadHeader {
        instruction_count: u32::try_from(instructions.len())
            .map_err(|_| TransferError::protocol("too many delta instructions for one file"))?,
        literal_len: u32::try_from(literal.len())
            .map_err(|_| TransferError::protocol("literal buffer exceeds u32::MAX"))?,
        instructions_len: u32::try_from(instructions_bytes.len())
            .map_err(|_| TransferError::protocol("instruction buffer exceeds u32::MAX"))?,
    };

    session.write_all(&[DELTA_MODE_DELTA]).await?;
    session.write_all(&header.instruction_count.to_le_bytes()).await?;
    session.write_all(&header.literal_len.to_le_bytes()).await?;
    session.write_all(&header.instructions_len.to_le_bytes()).await?;
    stream_rate_limited(session, limiter, &instructions_bytes).await?;
    stream_rate_limited(session, limiter, literal).await
}

/// Emits the `0x00` whole-file-fallback mode byte followed by the file's
/// raw bytes, for a file that was offered delta signatures but whose
/// computed savings fell below the eligibility threshold.
///
/// # Errors
///
/// Mirrors [`send_whole_file`].
pub async fn send_whole_file_after_delta_decline(
    session: &mut Session,
    limiter: &bandwidth::Limiter,
    path: &Path,
    compression: Compression,
) -> Result<(), TransferError> {
    session.write_all(&[DELTA_MODE_WHOLE_FILE]).await?;
    send_whole_file(session, limiter, path, compression).await
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
    session.flush().await
}

async fn compress_blocking(raw: Vec<u8>) -> Result<Vec<u8>, TransferError> {
    tokio::task::spawn_blocking(move || {
        compress::gzip::compress_to_vec(&raw, compress::gzip::CompressionLevel::Default)
    })
    .await
    .expect("blocking compress task does not panic")
    .map_err(TransferError::from)
}

/// Reads a whole file from disk on the blocking pool, for the case (delta
/// calculation) where the full source buffer must be held in memory.
///
/// # Errors
///
/// Returns [`TransferError::Io`] on read failure.
pub async fn read_whole_file(path: &Path) -> Result<Vec<u8>, TransferError> {
    let path = path.to_owned();
    tokio::task::spawn_blocking(move || std::fs::read(&path))
        .await
        .expect("blocking read task does not panic")
        .map_err(TransferError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_chunk_len_is_nonzero() {
        assert!(STREAM_CHUNK_LEN > 0);
    }

    #[allow(dead_code)]
    fn read_trait_in_scope(mut r: impl Read) -> std::io::Result<usize> {
        let mut buf = [0_u8; 1];
        r.read(&mut buf)
    }
}
