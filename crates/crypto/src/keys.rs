//! Pairing-code key derivation and the per-direction subkeys spun off a
//! shared pairing key for the record layer.

use hkdf::Hkdf;
use pbkdf2::pbkdf2_hmac;
use rand::Rng;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Number of PBKDF2 iterations used to stretch a pairing code into a key
/// (§4.5).
pub const PBKDF2_ITERATIONS: u32 = 100_000;

/// A 256-bit key shared by two paired devices, derived from a pairing code.
/// Zeroized on drop so a dropped key does not linger in process memory.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SharedKey([u8; 32]);

impl SharedKey {
    /// Wraps a raw 32-byte key, e.g. one loaded back from a [`crate::store::PairingStore`].
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Returns the raw key bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Debug for SharedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SharedKey(..)")
    }
}

/// Generates a six-digit pairing code, uniformly at random, as a
/// zero-padded decimal string (e.g. `"042917"`).
#[must_use]
pub fn generate_pairing_code() -> String {
    let code = rand::thread_rng().gen_range(0..1_000_000_u32);
    format!("{code:06}")
}

/// Derives the shared 256-bit key both devices in a pairing agree on.
///
/// The salt is `concat(min(device_a, device_b), max(device_a, device_b))`
/// — order-independent so both ends derive the same key without an
/// additional exchange of who-is-who. `device_a`/`device_b` are the two
/// devices' opaque id strings (`Settings::device_id`, §6.4).
///
/// # Examples
///
/// ```
/// use crypto::derive_pairing_key;
///
/// let a = derive_pairing_key("042917", "device-1", "device-2");
/// let b = derive_pairing_key("042917", "device-2", "device-1");
/// assert_eq!(a.as_bytes(), b.as_bytes());
/// ```
#[must_use]
pub fn derive_pairing_key(code: &str, device_a: &str, device_b: &str) -> SharedKey {
    let (lo, hi) = if device_a <= device_b {
        (device_a, device_b)
    } else {
        (device_b, device_a)
    };
    let mut salt = Vec::with_capacity(lo.len() + hi.len());
    salt.extend_from_slice(lo.as_bytes());
    salt.extend_from_slice(hi.as_bytes());

    let mut out = [0_u8; 32];
    pbkdf2_hmac::<Sha256>(code.as_bytes(), &salt, PBKDF2_ITERATIONS, &mut out);
    SharedKey(out)
}

/// One of the two independent keys spun off a [`SharedKey`] for a single
/// direction of an encrypted channel, so the initiator-to-responder and
/// responder-to-initiator byte streams never reuse a (key, nonce) pair
/// even though both sides share one pairing key.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct DirectionalKey([u8; 32]);

impl DirectionalKey {
    /// Returns the raw key bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Debug for DirectionalKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DirectionalKey(..)")
    }
}

/// Splits `shared` into the initiator-to-responder and responder-to-initiator
/// subkeys via HKDF-SHA256, each labelled with a distinct `info` string.
#[must_use]
pub fn derive_directional_keys(shared: &SharedKey) -> (DirectionalKey, DirectionalKey) {
    let hk = Hkdf::<Sha256>::new(None, shared.as_bytes());
    (
        expand_subkey(&hk, b"steamroll-v3-initiator-to-responder"),
        expand_subkey(&hk, b"steamroll-v3-responder-to-initiator"),
    )
}

fn expand_subkey(hk: &Hkdf<Sha256>, info: &[u8]) -> DirectionalKey {
    let mut out = [0_u8; 32];
    hk.expand(info, &mut out)
        .expect("32-byte output is within HKDF-SHA256's expansion limit");
    DirectionalKey(out)
}
