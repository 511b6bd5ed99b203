//! A session's byte stream, either plain or wrapped in the `V3` encrypted
//! record layer, mirroring `sender`'s transport (no shared crate is
//! possible here since `protocol` cannot depend on `crypto`).

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

use crypto::EncryptedChannel;
use protocol::wire::MAX_FRAME_LEN;
use protocol::TransferError;

/// The connection a receiver session drives: a plain socket, or one wrapped
/// in an [`EncryptedChannel`] after the `V3` handshake completes.
pub enum Session {
    /// No encryption (`V1`/`V2`).
    Plain(TcpStream),
    /// `V3`: AES-256-GCM record layer atop the socket.
    Encrypted(EncryptedChannel<TcpStream>),
}

impl Session {
    /// Sends one length-prefixed JSON frame.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError`] on encode or I/O failure.
    pub async fn send_frame<T: Serialize>(&mut self, value: &T) -> Result<(), TransferError> {
        match self {
            Self::Plain(stream) => protocol::send_frame(stream, value).await,
            Self::Encrypted(channel) => send_frame_encrypted(channel, value).await,
        }
    }

    /// Receives one length-prefixed JSON frame.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError`] on decode or I/O failure.
    pub async fn receive_frame<T: DeserializeOwned>(&mut self) -> Result<Option<T>, TransferError> {
        match self {
            Self::Plain(stream) => protocol::receive_frame(stream).await,
            Self::Encrypted(channel) => receive_frame_encrypted(channel).await,
        }
    }

    /// Reads exactly `buf.len()` raw bytes (a file payload chunk or
    /// delta-mode byte).
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::Io`] on failure or early EOF.
    pub async fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), TransferError> {
        match self {
            Self::Plain(stream) => stream
                .read_exact(buf)
                .await
                .map(|_| ())
                .map_err(TransferError::from),
            Self::Encrypted(channel) => channel.read_plain(buf).await.map_err(Into::into),
        }
    }

    /// Writes raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::Io`] on failure.
    pub async fn write_all(&mut self, buf: &[u8]) -> Result<(), TransferError> {
        match self {
            Self::Plain(stream) => stream.write_all(buf).await.map_err(TransferError::from),
            Self::Encrypted(channel) => channel.write_plain(buf).await.map_err(Into::into),
        }
    }
}

async fn send_frame_encrypted<T: Serialize>(
    channel: &mut EncryptedChannel<impl AsyncRead + AsyncWrite + Unpin>,
    value: &T,
) -> Result<(), TransferError> {
    let payload = serde_json::to_vec(value)
        .map_err(|e| TransferError::protocol(format!("failed to encode frame: {e}")))?;
    let len = u32::try_from(payload.len())
        .map_err(|_| TransferError::protocol("frame payload exceeds u32::MAX"))?;
    if len > MAX_FRAME_LEN {
        return Err(TransferError::protocol(format!(
            "frame payload of {len} bytes exceeds the {MAX_FRAME_LEN} byte ceiling"
        )));
    }
    channel.write_plain(&len.to_le_bytes()).await?;
    channel.write_plain(&payload).await?;
    Ok(())
}

async fn receive_frame_encrypted<T: DeserializeOwned>(
    channel: &mut EncryptedChannel<impl AsyncRead + AsyncWrite + Unpin>,
) -> Result<Option<T>, TransferError> {
    let mut len_bytes = [0_u8; 4];
    channel.read_plain(&mut len_bytes).await?;
    let len = u32::from_le_bytes(len_bytes);
    if len == 0 || len > MAX_FRAME_LEN {
        return Ok(None);
    }
    let mut payload = vec![0_u8; len as usize];
    channel.read_plain(&mut payload).await?;
    let value = serde_json::from_slice(&payload)
        .map_err(|e| TransferError::protocol(format!("failed to decode frame: {e}")))?;
    Ok(Some(value))
}
