//! The AES-256-GCM record layer that makes an encrypted session's bytes
//! look like plain I/O to everything above it (§4.5, §9 "Polymorphic
//! 'magic' dispatch").

use std::collections::VecDeque;

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::CryptoError;
use crate::keys::DirectionalKey;

/// Default size of a single plaintext chunk before it is encrypted into one
/// record (§4.5: "Write path chunks plaintext into records of bounded size
/// (default 64 KiB)").
pub const DEFAULT_RECORD_LEN: usize = 64 * 1024;

/// Ceiling on a record's declared ciphertext length, rejected before any
/// allocation: one plaintext chunk plus the 16-byte GCM tag, with headroom.
const MAX_RECORD_CIPHERTEXT_LEN: u32 = (DEFAULT_RECORD_LEN + 16 + 4096) as u32;

/// Per-direction AES-256-GCM state: the cipher plus a monotonic record
/// counter that becomes the nonce, so the same key never encrypts two
/// records under the same nonce.
struct DirectionalCipher {
    cipher: Aes256Gcm,
    counter: u64,
}

impl DirectionalCipher {
    fn new(key: &DirectionalKey) -> Self {
        let key = Key::<Aes256Gcm>::from_slice(key.as_bytes());
        Self {
            cipher: Aes256Gcm::new(key),
            counter: 0,
        }
    }

    fn next_nonce(&mut self) -> [u8; 12] {
        let mut nonce = [0_u8; 12];
        nonce[4..].copy_from_slice(&self.counter.to_be_bytes());
        self.counter += 1;
        nonce
    }

    fn encrypt(&mut self, plaintext: &[u8]) -> ([u8; 12], Vec<u8>) {
        let nonce = self.next_nonce();
        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .expect("AES-256-GCM encryption does not fail for in-memory buffers");
        (nonce, ciphertext)
    }

    /// Decrypts `ciphertext` under `nonce`, rejecting any nonce that is not
    /// strictly greater than the last one this side accepted.
    fn decrypt(&mut self, nonce: [u8; 12], ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let counter = u64::from_be_bytes(nonce[4..].try_into().expect("8 bytes"));
        if nonce[..4] != [0_u8; 4] || counter < self.counter {
            return Err(CryptoError::ReplayDetected);
        }
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(&nonce), ciphertext)
            .map_err(|_| CryptoError::DecryptionFailed)?;
        self.counter = counter + 1;
        Ok(plaintext)
    }
}

/// A bidirectional encrypted channel over an inner byte stream `S`.
///
/// Writes are chunked into [`DEFAULT_RECORD_LEN`]-byte plaintext pieces,
/// each becoming one wire record: a 12-byte nonce, a 4-byte little-endian
/// ciphertext length, then the ciphertext (whose trailing 16 bytes are the
/// GCM authentication tag). Reads reassemble records transparently,
/// presenting a plain byte stream to callers via [`Self::read_plain`] /
/// [`Self::write_plain`].
pub struct EncryptedChannel<S> {
    stream: S,
    writer: DirectionalCipher,
    reader: DirectionalCipher,
    pending: VecDeque<u8>,
}

impl<S> EncryptedChannel<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wraps `stream`, encrypting outgoing bytes with `write_key` and
    /// decrypting incoming bytes with `read_key`. The two keys must be the
    /// complementary halves of a [`crate::derive_directional_keys`] split —
    /// passing the same key for both directions would let this side's own
    /// writes collide with reads under the shared nonce space.
    pub(crate) fn new(stream: S, write_key: &DirectionalKey, read_key: &DirectionalKey) -> Self {
        Self {
            stream,
            writer: DirectionalCipher::new(write_key),
            reader: DirectionalCipher::new(read_key),
            pending: VecDeque::new(),
        }
    }

    /// Encrypts and writes `plaintext`, chunking it into records of at most
    /// [`DEFAULT_RECORD_LEN`] bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::Io`] on any write failure.
    pub async fn write_plain(&mut self, plaintext: &[u8]) -> Result<(), CryptoError> {
        for chunk in plaintext.chunks(DEFAULT_RECORD_LEN) {
            let (nonce, ciphertext) = self.writer.encrypt(chunk);
            let len = u32::try_from(ciphertext.len())
                .expect("one record's ciphertext fits in a u32");
            self.stream.write_all(&nonce).await?;
            self.stream.write_all(&len.to_le_bytes()).await?;
            self.stream.write_all(&ciphertext).await?;
        }
        self.stream.flush().await?;
        Ok(())
    }

    /// Fills `buf` entirely, pulling and decrypting further records from
    /// the inner stream as needed.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::DecryptionFailed`] if any record's
    /// authentication tag does not verify, [`CryptoError::ReplayDetected`]
    /// if a record's nonce counter is not strictly increasing,
    /// [`CryptoError::RecordTooLarge`] if a record's declared length
    /// exceeds the configured ceiling, and [`CryptoError::Io`] on any read
    /// failure (including an unexpected EOF partway through `buf`).
    pub async fn read_plain(&mut self, buf: &mut [u8]) -> Result<(), CryptoError> {
        let mut filled = 0;
        while filled < buf.len() {
            if self.pending.is_empty() {
                self.pull_record().await?;
            }
            let take = (buf.len() - filled).min(self.pending.len());
            for slot in &mut buf[filled..filled + take] {
                *slot = self.pending.pop_front().expect("take <= pending.len()");
            }
            filled += take;
        }
        Ok(())
    }

    async fn pull_record(&mut self) -> Result<(), CryptoError> {
        let mut nonce = [0_u8; 12];
        self.stream.read_exact(&mut nonce).await?;

        let mut len_bytes = [0_u8; 4];
        self.stream.read_exact(&mut len_bytes).await?;
        let len = u32::from_le_bytes(len_bytes);
        if len > MAX_RECORD_CIPHERTEXT_LEN {
            return Err(CryptoError::RecordTooLarge {
                len,
                max: MAX_RECORD_CIPHERTEXT_LEN,
            });
        }

        let mut ciphertext = vec![0_u8; len as usize];
        self.stream.read_exact(&mut ciphertext).await?;

        let plaintext = self.reader.decrypt(nonce, &ciphertext)?;
        self.pending.extend(plaintext);
        Ok(())
    }

    /// Consumes the channel, returning the inner stream. Used once a
    /// session's encrypted portion is finished and the caller wants the
    /// raw socket back (e.g. to close it).
    pub fn into_inner(self) -> S {
        self.stream
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{derive_directional_keys, derive_pairing_key};

    fn channel_pair(
        stream_a: tokio::net::TcpStream,
        stream_b: tokio::net::TcpStream,
    ) -> (
        EncryptedChannel<tokio::net::TcpStream>,
        EncryptedChannel<tokio::net::TcpStream>,
    ) {
        let shared = derive_pairing_key("123456", "alpha", "bravo");
        let (i2r, r2i) = derive_directional_keys(&shared);
        let initiator = EncryptedChannel::new(stream_a, &i2r, &r2i);
        let responder = EncryptedChannel::new(stream_b, &r2i, &i2r);
        (initiator, responder)
    }

    #[tokio::test]
    async fn round_trips_a_payload_across_multiple_records() {
        let pair = test_support::loopback_pair().await;
        let (mut initiator, mut responder) = channel_pair(pair.initiator, pair.acceptor);

        let payload: Vec<u8> = (0..(DEFAULT_RECORD_LEN * 3 + 777))
            .map(|i| (i % 256) as u8)
            .collect();
        let payload_clone = payload.clone();

        let writer = tokio::spawn(async move {
            initiator.write_plain(&payload_clone).await.unwrap();
        });

        let mut received = vec![0_u8; payload.len()];
        responder.read_plain(&mut received).await.unwrap();
        writer.await.unwrap();

        assert_eq!(received, payload);
    }

    #[tokio::test]
    async fn wrong_key_fails_to_decrypt_the_first_record() {
        let pair = test_support::loopback_pair().await;
        let shared_good = derive_pairing_key("123456", "alpha", "bravo");
        let shared_bad = derive_pairing_key("000000", "alpha", "bravo");
        let (good_i2r, good_r2i) = derive_directional_keys(&shared_good);
        let (bad_i2r, bad_r2i) = derive_directional_keys(&shared_bad);

        let mut initiator = EncryptedChannel::new(pair.initiator, &good_i2r, &good_r2i);
        let mut responder = EncryptedChannel::new(pair.acceptor, &bad_r2i, &bad_i2r);

        let writer = tokio::spawn(async move {
            let _ = initiator.write_plain(b"top secret").await;
        });

        let mut buf = [0_u8; 10];
        let result = responder.read_plain(&mut buf).await;
        let _ = writer.await;
        assert!(matches!(result, Err(CryptoError::DecryptionFailed)));
    }

    #[tokio::test]
    async fn replayed_record_is_rejected() {
        let shared = derive_pairing_key("123456", "alpha", "bravo");
        let (i2r, r2i) = derive_directional_keys(&shared);
        let mut writer_cipher = DirectionalCipher::new(&i2r);
        let mut reader_cipher = DirectionalCipher::new(&r2i);

        let (nonce, ciphertext) = writer_cipher.encrypt(b"first");
        reader_cipher
            .decrypt(nonce, &ciphertext)
            .expect("first record decrypts");

        let result = reader_cipher.decrypt(nonce, &ciphertext);
        assert!(matches!(result, Err(CryptoError::ReplayDetected)));
    }
}
