//! Length-prefixed JSON framing over any `AsyncRead`/`AsyncWrite` pair.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;

use crate::error::TransferError;
use crate::wire::MAX_FRAME_LEN;

/// Deadline bounding a single frame send or receive (§5: "per-frame deadline is 60 s").
pub const FRAME_DEADLINE: Duration = Duration::from_secs(60);

/// Serializes `value` to JSON, prefixes it with a little-endian `u32`
/// length, and writes both to `writer`.
///
/// # Errors
///
/// Returns [`TransferError::Protocol`] if serialization fails or the
/// encoded length exceeds [`MAX_FRAME_LEN`], and [`TransferError::Io`] on
/// any write failure or deadline expiry.
pub async fn send_frame<W, T>(writer: &mut W, value: &T) -> Result<(), TransferError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let payload = serde_json::to_vec(value)
        .map_err(|e| TransferError::protocol(format!("failed to encode frame: {e}")))?;
    let len = u32::try_from(payload.len())
        .map_err(|_| TransferError::protocol("frame payload exceeds u32::MAX"))?;
    if len > MAX_FRAME_LEN {
        return Err(TransferError::protocol(format!(
            "frame payload of {len} bytes exceeds the {MAX_FRAME_LEN} byte ceiling"
        )));
    }

    timeout(FRAME_DEADLINE, async {
        writer.write_all(&len.to_le_bytes()).await?;
        writer.write_all(&payload).await?;
        writer.flush().await
    })
    .await
    .map_err(|_| TransferError::protocol("timed out sending frame"))??;
    Ok(())
}

/// Reads one length-prefixed JSON frame from `reader`.
///
/// Returns `Ok(None)` if the length prefix is `0` or exceeds
/// [`MAX_FRAME_LEN`] — the caller treats this as "no frame available"
/// without the body ever being read, per the bounded-reader contract that
/// prevents a malicious peer from driving unbounded memory use.
///
/// # Errors
///
/// Returns [`TransferError::Protocol`] if the payload cannot be
/// deserialized as `T`, and [`TransferError::Io`] on any read failure or
/// deadline expiry.
pub async fn receive_frame<R, T>(reader: &mut R) -> Result<Option<T>, TransferError>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let result = timeout(FRAME_DEADLINE, async {
        let mut len_bytes = [0_u8; 4];
        reader.read_exact(&mut len_bytes).await?;
        let len = u32::from_le_bytes(len_bytes);
        if len == 0 || len > MAX_FRAME_LEN {
            return Ok::<_, std::io::Error>(None);
        }

        let mut bounded = BoundedReader::new(&mut *reader, u64::from(len));
        let mut payload = vec![0_u8; len as usize];
        bounded.read_exact(&mut payload).await?;
        Ok(Some(payload))
    })
    .await
    .map_err(|_| TransferError::protocol("timed out receiving frame"))??;

    let Some(payload) = result else {
        return Ok(None);
    };
    let value = serde_json::from_slice(&payload)
        .map_err(|e| TransferError::protocol(format!("failed to decode frame: {e}")))?;
    Ok(Some(value))
}

/// An `AsyncRead` adapter that refuses to yield more than a fixed number of
/// bytes, regardless of how much the underlying reader would otherwise
/// produce.
///
/// This is the defense named in §4.1: without it, a peer that claims a
/// length of `L` but keeps streaming bytes past `L` could be read
/// indefinitely by a careless caller. [`BoundedReader`] is a thin wrapper
/// over [`tokio::io::Take`] so the cap is enforced by the same adapter
/// tokio itself ships, kept as a named type because callers (framing here,
/// and the synchronous hashing path elsewhere in the workspace) want to
/// talk about "a reader bounded to N bytes" as a concept rather than
/// reach for `.take()` ad hoc at every call site.
pub struct BoundedReader<R> {
    inner: tokio::io::Take<R>,
}

impl<R> BoundedReader<R>
where
    R: AsyncRead + Unpin,
{
    /// Wraps `inner`, allowing at most `limit` further bytes to be read
    /// through this adapter.
    pub fn new(inner: R, limit: u64) -> Self {
        Self {
            inner: AsyncReadExt::take(inner, limit),
        }
    }

    /// Returns the number of bytes still permitted.
    #[must_use]
    pub const fn remaining(&self) -> u64 {
        self.inner.limit()
    }
}

impl<R> AsyncRead for BoundedReader<R>
where
    R: AsyncRead + Unpin,
{
    fn poll_read(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
        buf: &mut tokio::io::ReadBuf<'_>,
    ) -> std::task::Poll<std::io::Result<()>> {
        let this = self.get_mut();
        std::pin::Pin::new(&mut this.inner).poll_read(cx, buf)
    }
}
