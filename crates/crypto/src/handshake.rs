//! The `V3` challenge/response handshake that establishes an
//! [`EncryptedChannel`] atop a freshly connected or accepted socket (§4.5).

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use rand::RngCore;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::CryptoError;
use crate::keys::{derive_directional_keys, SharedKey};
use crate::record::EncryptedChannel;

const CHALLENGE_LEN: usize = 32;

/// Runs the initiating side of the handshake: sends a random challenge,
/// verifies the responder's encrypted echo, and replies with our own
/// encrypted id.
///
/// On success returns the established [`EncryptedChannel`] plus the
/// responder's advertised id string.
///
/// # Errors
///
/// Returns [`CryptoError::HandshakeFailed`] if the responder's reply does
/// not decrypt or does not echo our challenge, and [`CryptoError::Io`] on
/// any I/O failure.
pub async fn handshake_initiator<S>(
    mut stream: S,
    shared_key: &SharedKey,
    initiator_id: &str,
) -> Result<(EncryptedChannel<S>, String), CryptoError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(shared_key.as_bytes()));

    let mut challenge = [0_u8; CHALLENGE_LEN];
    rand::thread_rng().fill_bytes(&mut challenge);
    write_plain_frame(&mut stream, &challenge).await?;

    let reply = read_encrypted_frame(&mut stream, &cipher, 0).await?;
    if reply.len() < CHALLENGE_LEN || reply[..CHALLENGE_LEN] != challenge {
        return Err(CryptoError::HandshakeFailed {
            reason: "responder did not echo our challenge".to_owned(),
        });
    }
    let responder_id = String::from_utf8(reply[CHALLENGE_LEN..].to_vec()).map_err(|_| {
        CryptoError::HandshakeFailed {
            reason: "responder id was not valid UTF-8".to_owned(),
        }
    })?;

    write_encrypted_frame(&mut stream, &cipher, 1, initiator_id.as_bytes()).await?;

    let (i2r, r2i) = derive_directional_keys(shared_key);
    Ok((EncryptedChannel::new(stream, &i2r, &r2i), responder_id))
}

/// Runs the accepting side of the handshake: reads the initiator's
/// challenge, replies with an encrypted echo plus our id, then verifies
/// the initiator's encrypted id.
///
/// On success returns the established [`EncryptedChannel`] plus the
/// initiator's advertised id string.
///
/// # Errors
///
/// Returns [`CryptoError::HandshakeFailed`] if the initiator's final
/// message does not decrypt, and [`CryptoError::Io`] on any I/O failure.
pub async fn handshake_responder<S>(
    mut stream: S,
    shared_key: &SharedKey,
    responder_id: &str,
) -> Result<(EncryptedChannel<S>, String), CryptoError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(shared_key.as_bytes()));

    let challenge = read_plain_frame(&mut stream).await?;

    let mut reply = Vec::with_capacity(challenge.len() + responder_id.len());
    reply.extend_from_slice(&challenge);
    reply.extend_from_slice(responder_id.as_bytes());
    write_encrypted_frame(&mut stream, &cipher, 0, &reply).await?;

    let initiator_id_bytes = read_encrypted_frame(&mut stream, &cipher, 1).await?;
    let initiator_id = String::from_utf8(initiator_id_bytes).map_err(|_| {
        CryptoError::HandshakeFailed {
            reason: "initiator id was not valid UTF-8".to_owned(),
        }
    })?;

    let (i2r, r2i) = derive_directional_keys(shared_key);
    Ok((EncryptedChannel::new(stream, &r2i, &i2r), initiator_id))
}

async fn write_plain_frame<S: AsyncWrite + Unpin>(
    stream: &mut S,
    bytes: &[u8],
) -> Result<(), CryptoError> {
    let len = u32::try_from(bytes.len()).expect("handshake frames are small");
    stream.write_all(&len.to_le_bytes()).await?;
    stream.write_all(bytes).await?;
    stream.flush().await?;
    Ok(())
}

async fn read_plain_frame<S: AsyncRead + Unpin>(stream: &mut S) -> Result<Vec<u8>, CryptoError> {
    let mut len_bytes = [0_u8; 4];
    stream.read_exact(&mut len_bytes).await?;
    let len = u32::from_le_bytes(len_bytes) as usize;
    let mut buf = vec![0_u8; len];
    stream.read_exact(&mut buf).await?;
    Ok(buf)
}

/// Builds the fixed 12-byte handshake nonce for message `index` (0 or 1):
/// the first two messages of the session, before the directional record
/// counters exist.
fn handshake_nonce(index: u8) -> [u8; 12] {
    let mut nonce = [0_u8; 12];
    nonce[11] = index;
    nonce
}

async fn write_encrypted_frame<S: AsyncWrite + Unpin>(
    stream: &mut S,
    cipher: &Aes256Gcm,
    nonce_index: u8,
    plaintext: &[u8],
) -> Result<(), CryptoError> {
    let nonce = handshake_nonce(nonce_index);
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .expect("AES-256-GCM encryption does not fail for in-memory buffers");
    write_plain_frame(stream, &ciphertext).await
}

async fn read_encrypted_frame<S: AsyncRead + Unpin>(
    stream: &mut S,
    cipher: &Aes256Gcm,
    nonce_index: u8,
) -> Result<Vec<u8>, CryptoError> {
    let ciphertext = read_plain_frame(stream).await?;
    let nonce = handshake_nonce(nonce_index);
    cipher
        .decrypt(Nonce::from_slice(&nonce), ciphertext.as_slice())
        .map_err(|_| CryptoError::HandshakeFailed {
            reason: "failed to decrypt handshake message".to_owned(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::derive_pairing_key;

    #[tokio::test]
    async fn handshake_establishes_matching_channels_on_both_sides() {
        let pair = test_support::loopback_pair().await;
        let shared = derive_pairing_key("123456", "laptop", "desktop");

        let shared_for_responder = shared.clone();
        let responder_task = tokio::spawn(async move {
            handshake_responder(pair.acceptor, &shared_for_responder, "desktop").await
        });

        let (mut initiator_channel, responder_id) =
            handshake_initiator(pair.initiator, &shared, "laptop")
                .await
                .expect("initiator handshake succeeds");
        let (mut responder_channel, initiator_id) =
            responder_task.await.unwrap().expect("responder handshake succeeds");

        assert_eq!(responder_id, "desktop");
        assert_eq!(initiator_id, "laptop");

        initiator_channel.write_plain(b"hello").await.unwrap();
        let mut buf = [0_u8; 5];
        responder_channel.read_plain(&mut buf).await.unwrap();
        assert_eq!(&buf, b"hello");
    }

    #[tokio::test]
    async fn mismatched_keys_fail_the_handshake() {
        let pair = test_support::loopback_pair().await;
        let good = derive_pairing_key("123456", "laptop", "desktop");
        let bad = derive_pairing_key("000000", "laptop", "desktop");

        let responder_task =
            tokio::spawn(async move { handshake_responder(pair.acceptor, &bad, "desktop").await });

        let result = handshake_initiator(pair.initiator, &good, "laptop").await;
        let _ = responder_task.await;
        assert!(matches!(result, Err(CryptoError::HandshakeFailed { .. })));
    }
}
