//! XXH64 streaming and one-shot digests.
//!
//! XxHash64 is the integrity hash used throughout the wire protocol: it
//! appears as `FileEntry::hash` and is recomputed by the receiver to verify
//! each reconstructed file (whole-file or delta-reassembled) before the
//! session is allowed to complete.

use super::StrongDigest;

/// Streaming XXH64 hasher.
///
/// # Examples
///
/// One-shot hashing with a seed:
///
/// ```
/// use checksums::strong::Xxh64;
///
/// let seed: u64 = 0;
/// let digest = Xxh64::digest(seed, b"data to hash");
/// assert_eq!(digest.len(), 8);
/// ```
///
/// Incremental hashing:
///
/// ```
/// use checksums::strong::Xxh64;
///
/// let seed: u64 = 0;
///
/// let mut hasher = Xxh64::new(seed);
/// hasher.update(b"chunk 1");
/// hasher.update(b"chunk 2");
/// let digest = hasher.finalize();
///
/// assert_eq!(digest, Xxh64::digest(seed, b"chunk 1chunk 2"));
/// ```
#[derive(Clone)]
pub struct Xxh64 {
    inner: xxhash_rust::xxh64::Xxh64,
}

impl Xxh64 {
    /// Creates a hasher with the supplied seed. SteamRoll always seeds with `0`.
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self {
            inner: xxhash_rust::xxh64::Xxh64::new(seed),
        }
    }

    /// Feeds additional bytes into the digest state.
    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    /// Finalises the digest and returns the little-endian XXH64 output.
    #[must_use]
    pub fn finalize(self) -> [u8; 8] {
        self.inner.digest().to_le_bytes()
    }

    /// Convenience helper that computes the XXH64 digest for `data` in one shot.
    #[must_use]
    pub fn digest(seed: u64, data: &[u8]) -> [u8; 8] {
        xxhash_rust::xxh64::xxh64(data, seed).to_le_bytes()
    }

    /// Renders a digest as lowercase hex, the encoding used on the wire
    /// (`FileEntry::hash`, manifest fingerprints).
    #[must_use]
    pub fn to_hex(digest: [u8; 8]) -> String {
        super::to_hex(&digest)
    }
}

impl StrongDigest for Xxh64 {
    type Seed = u64;
    type Digest = [u8; 8];
    const DIGEST_LEN: usize = 8;

    fn with_seed(seed: Self::Seed) -> Self {
        Xxh64::new(seed)
    }

    fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    fn finalize(self) -> Self::Digest {
        self.inner.digest().to_le_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xxh64_matches_reference_values() {
        let vectors = [
            (0, b"".as_slice()),
            (0, b"a".as_slice()),
            (0, b"The quick brown fox jumps over the lazy dog".as_slice()),
            (123, b"steamroll".as_slice()),
        ];

        for (seed, input) in vectors {
            let mut hasher = Xxh64::new(seed);
            let mid = input.len() / 2;
            hasher.update(&input[..mid]);
            hasher.update(&input[mid..]);
            let digest = hasher.finalize();
            let expected = xxhash_rust::xxh64::xxh64(input, seed).to_le_bytes();
            assert_eq!(digest, expected);

            let one_shot = Xxh64::digest(seed, input);
            assert_eq!(one_shot, expected);
        }
    }

    #[test]
    fn zero_seed_matches_empty_input_digest() {
        let digest = Xxh64::digest(0, b"");
        assert_eq!(digest, xxhash_rust::xxh64::xxh64(b"", 0).to_le_bytes());
    }

    #[test]
    fn hex_rendering_is_lowercase_and_fixed_width() {
        let digest = Xxh64::digest(0, b"steamroll");
        let hex = Xxh64::to_hex(digest);
        assert_eq!(hex.len(), 16);
        assert!(
            hex.chars()
                .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
        );
    }
}
