//! Per-file payload reception: whole-file streaming (optionally
//! GZip-compressed) and delta-mode parsing, the receiving mirror of
//! `sender`'s `payload` module (§4.8, §6.2).

use std::path::Path;

use protocol::wire::{Compression, DeltaInstruction};
use protocol::TransferError;

use crate::transport::Session;

const STREAM_CHUNK_LEN: usize = 64 * 1024;

/// Reads exactly `size` (uncompressed) bytes of a whole-file payload from
/// `session` and writes them to `tmp_path`, rate-limited through `limiter`.
///
/// # Errors
///
/// Returns [`TransferError::Io`] on a read, decompress, or write failure.
pub async fn receive_whole_file(
    session: &mut Session,
    limiter: &bandwidth::Limiter,
    tmp_path: &Path,
    size: u64,
    compression: Compression,
) -> Result<(), TransferError> {
    let raw = match compression {
        Compression::None => read_rate_limited(session, limiter, size).await?,
        Compression::GZip => {
            let mut len_bytes = [0_u8; 4];
            session.read_exact(&mut len_bytes).await?;
            let compressed_len = u32::from_le_bytes(len_bytes);
            let compressed = read_rate_limited(session, limiter, u64::from(compressed_len)).await?;
            decompress_blocking(compressed).await?
        }
    };

    let tmp_path = tmp_path.to_owned();
    tokio::task::spawn_blocking(move || std::fs::write(&tmp_path, raw))
        .await
        .map_err(|e| TransferError::protocol(format!("write task panicked: {e}")))?
        .map_err(TransferError::from)
}

/// Reads a delta payload's fixed header and variable-length sections
/// (instructions then literal data) following the `0x01` mode byte, which
/// the caller has already consumed.
///
/// # Errors
///
/// Returns [`TransferError::Protocol`] if the instruction section does not
/// decode, and [`TransferError::Io`] on a read failure.
pub async fn receive_delta_payload(
    session: &mut Session,
    limiter: &bandwidth::Limiter,
) -> Result<(Vec<DeltaInstruction>, Vec<u8>), TransferError> {
    let mut header_bytes = [0_u8; 12];
    session.read_exact(&mut header_bytes).await?;
    let instruction_count = u32::from_le_bytes(header_bytes[0..4].try_into().unwrap());
    let literal_len = u32::from_le_bytes(header_bytes[4..8].try_into().unwrap());
    let instructions_len = u32::from_le_bytes(header_bytes[8..12].try_into().unwrap());

    let instructions_bytes = read_rate_limited(session, limiter, u64::from(instructions_len)).await?;
    let instructions: Vec<DeltaInstruction> = serde_json::from_slice(&instructions_bytes)
        .map_err(|e| TransferError::protocol(format!("failed to decode delta instructions: {e}")))?;
    if instructions.len() != instruction_count as usize {
        return Err(TransferError::protocol(format!(
            "delta header declared {instruction_count} instructions but {} decoded",
            instructions.len()
        )));
    }

    let literal = read_rate_limited(session, limiter, u64::from(literal_len)).await?;
    Ok((instructions, literal))
}

async fn read_rate_limited(
    session: &mut Session,
    limiter: &bandwidth::Limiter,
    total: u64,
) -> Result<Vec<u8>, TransferError> {
    let mut out = vec![0_u8; total as usize];
    let mut filled = 0_usize;
    while filled < out.len() {
        let take = (out.len() - filled).min(STREAM_CHUNK_LEN);
        let _ = limiter
            .await_tokens_async(take as u64)
            .await
            .map_err(|_| TransferError::Cancelled)?;
        session.read_exact(&mut out[filled..filled + take]).await?;
        filled += take;
    }
    Ok(out)
}

async fn decompress_blocking(compressed: Vec<u8>) -> Result<Vec<u8>, TransferError> {
    tokio::task::spawn_blocking(move || compress::gzip::decompress_to_vec(&compressed))
        .await
        .map_err(|e| TransferError::protocol(format!("decompress task panicked: {e}")))?
        .map_err(TransferError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_chunk_len_is_nonzero() {
        assert!(STREAM_CHUNK_LEN > 0);
    }
}
