//! Strong checksum implementations used for integrity verification and
//! manifest compatibility.
//!
//! SteamRoll only negotiates two strong digests: [`Xxh64`] for wire-level
//! file integrity (`FileEntry::hash`, block signatures) and [`Sha256`] for
//! compatibility with the `steamroll.json` package metadata's `FileHashes`
//! map. Both implement [`StrongDigest`] so the hasher (`crate::hashing`) can
//! stream either algorithm through the same streamed/mmap code path.

mod sha256;
mod xxhash;

pub use sha256::Sha256;
pub use xxhash::Xxh64;

/// Trait implemented by the strong checksum algorithms SteamRoll negotiates.
///
/// Implementors provide a streaming interface: callers feed data
/// incrementally via [`Self::update`] and then obtain the final digest
/// through [`Self::finalize`]. [`DIGEST_LEN`](Self::DIGEST_LEN) exposes the
/// byte width of the resulting hash so callers can size buffers without
/// hard-coding algorithm-specific knowledge.
///
/// # Examples
///
/// ```
/// use checksums::strong::{Sha256, StrongDigest};
///
/// let mut hasher = Sha256::new();
/// hasher.update(b"example");
/// let digest = hasher.finalize();
/// assert_eq!(digest.as_ref().len(), Sha256::DIGEST_LEN);
/// ```
pub trait StrongDigest: Sized {
    /// Type used to parameterise a new digest instance.
    type Seed: Default;

    /// Type returned when finalising the digest.
    type Digest: AsRef<[u8]> + Copy;

    /// Length of the final digest in bytes.
    const DIGEST_LEN: usize;

    /// Creates a new hasher with an empty state.
    fn new() -> Self {
        Self::with_seed(Default::default())
    }

    /// Creates a new hasher using the provided seed value.
    fn with_seed(seed: Self::Seed) -> Self;

    /// Feeds additional bytes into the digest state.
    fn update(&mut self, data: &[u8]);

    /// Finalises the digest and returns the resulting hash.
    fn finalize(self) -> Self::Digest;

    /// Convenience helper that hashes `data` in a single call.
    fn digest(data: &[u8]) -> Self::Digest {
        Self::digest_with_seed(Default::default(), data)
    }

    /// Convenience helper that hashes `data` using an explicit seed value.
    fn digest_with_seed(seed: Self::Seed, data: &[u8]) -> Self::Digest {
        let mut hasher = Self::with_seed(seed);
        hasher.update(data);
        hasher.finalize()
    }
}

/// Renders a digest as lowercase hex, the encoding used everywhere a hash
/// crosses the wire (`FileEntry::hash`, `PackageMetadata::file_hashes`).
#[must_use]
pub(crate) fn to_hex(bytes: &[u8]) -> String {
    use std::fmt::Write as _;

    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(&mut out, "{byte:02x}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{Sha256, StrongDigest, Xxh64};

    #[test]
    fn sha256_trait_round_trip_matches_inherent_api() {
        let input = b"trait-check";

        let mut via_trait = Sha256::new();
        via_trait.update(input);
        let trait_digest = via_trait.finalize();

        assert_eq!(trait_digest.as_ref(), Sha256::digest(input).as_ref());
    }

    #[test]
    fn xxh64_trait_supports_seeds() {
        let seed = 123_u64;
        let input = b"seeded";

        let digest = Xxh64::digest(seed, input);
        assert_eq!(
            digest.as_ref(),
            <Xxh64 as StrongDigest>::digest_with_seed(seed, input).as_ref()
        );
    }
}
