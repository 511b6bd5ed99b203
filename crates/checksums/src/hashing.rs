//! Whole-file strong digests.
//!
//! Files below [`MMAP_THRESHOLD`] are hashed through a buffered streaming
//! reader; larger files are memory-mapped and hashed in fixed-size chunks so
//! the working set stays bounded regardless of file size. On platforms
//! without `memmap2` support the streaming path is used unconditionally.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use tokio_util::sync::CancellationToken;

use crate::strong::StrongDigest;

/// Files at or above this size are hashed via `mmap` instead of a buffered
/// read loop.
pub const MMAP_THRESHOLD: u64 = 100 * 1024 * 1024;

/// Buffer size used by the streaming reader for files below
/// [`MMAP_THRESHOLD`].
const STREAM_BUFFER_LEN: usize = 80 * 1024;

/// Chunk size used when hashing a memory-mapped file, keeping any single
/// `update` call's working set small even though the mapping itself spans
/// the whole file.
const MMAP_CHUNK_LEN: usize = 16 * 1024 * 1024;

/// Failures encountered while hashing a file from disk.
#[derive(Debug, thiserror::Error)]
pub enum HashError {
    /// The file could not be opened, read, or mapped.
    #[error("failed to hash {path}: {source}")]
    Io {
        /// Path that was being hashed.
        path: std::path::PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// [`hash_file_cancellable`]'s token was cancelled before the hash
    /// finished.
    #[error("hash of {path} cancelled")]
    Cancelled {
        /// Path that was being hashed when cancellation was observed.
        path: std::path::PathBuf,
    },
}

impl HashError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Hashes the file at `path` with digest algorithm `D`, returning the
/// finalised digest.
///
/// Small and medium files (below [`MMAP_THRESHOLD`]) are read through an
/// 80 KiB buffer. Large files are memory-mapped and walked in 16 MiB chunks,
/// which keeps resident memory bounded for multi-gigabyte game packages
/// without the syscall overhead of many small reads.
///
/// # Errors
///
/// Returns [`HashError`] if the file cannot be opened, its metadata cannot be
/// read, or an I/O error occurs while streaming its contents.
pub fn hash_file<D: StrongDigest>(path: &Path) -> Result<D::Digest, HashError> {
    hash_file_inner::<D>(path, None)
}

/// Cancellable counterpart to [`hash_file`], checking `cancel` once per
/// [`STREAM_BUFFER_LEN`]/[`MMAP_CHUNK_LEN`] chunk so a long-running hash of a
/// large existing file can be abandoned without reading it to completion.
///
/// Used by smart-sync's large-file hashing path, run inside a blocking task
/// that would otherwise be uncancellable for as long as the hash takes.
///
/// # Errors
///
/// Returns [`HashError::Cancelled`] as soon as a chunk boundary is reached
/// after `cancel` is triggered, in addition to every error [`hash_file`] can
/// return.
pub fn hash_file_cancellable<D: StrongDigest>(
    path: &Path,
    cancel: &CancellationToken,
) -> Result<D::Digest, HashError> {
    hash_file_inner::<D>(path, Some(cancel))
}

fn hash_file_inner<D: StrongDigest>(
    path: &Path,
    cancel: Option<&CancellationToken>,
) -> Result<D::Digest, HashError> {
    let file = File::open(path).map_err(|e| HashError::io(path, e))?;
    let len = file
        .metadata()
        .map_err(|e| HashError::io(path, e))?
        .len();

    if len >= MMAP_THRESHOLD {
        hash_mmap::<D>(path, file, cancel)
    } else {
        hash_stream::<D>(path, file, cancel)
    }
}

fn hash_stream<D: StrongDigest>(
    path: &Path,
    mut file: File,
    cancel: Option<&CancellationToken>,
) -> Result<D::Digest, HashError> {
    let mut hasher = D::new();
    let mut buf = vec![0_u8; STREAM_BUFFER_LEN];
    loop {
        if cancel.is_some_and(CancellationToken::is_cancelled) {
            return Err(HashError::Cancelled { path: path.to_path_buf() });
        }
        let n = file.read(&mut buf).map_err(|e| HashError::io(path, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize())
}

#[cfg(unix)]
#[allow(unsafe_code)]
fn hash_mmap<D: StrongDigest>(
    path: &Path,
    file: File,
    cancel: Option<&CancellationToken>,
) -> Result<D::Digest, HashError> {
    // SAFETY: the mapping is read-only and the backing file is not mutated by
    // this process for the duration of the hash; concurrent external
    // modification is the caller's concern, same as any other read of the
    // file's bytes.
    let map = match unsafe { memmap2::Mmap::map(&file) } {
        Ok(map) => map,
        Err(err) => return hash_stream_fallback::<D>(path, file, cancel, err),
    };

    let mut hasher = D::new();
    for chunk in map.chunks(MMAP_CHUNK_LEN) {
        if cancel.is_some_and(CancellationToken::is_cancelled) {
            return Err(HashError::Cancelled { path: path.to_path_buf() });
        }
        hasher.update(chunk);
    }
    Ok(hasher.finalize())
}

#[cfg(not(unix))]
fn hash_mmap<D: StrongDigest>(
    path: &Path,
    file: File,
    cancel: Option<&CancellationToken>,
) -> Result<D::Digest, HashError> {
    hash_stream::<D>(path, file, cancel)
}

#[cfg(unix)]
fn hash_stream_fallback<D: StrongDigest>(
    path: &Path,
    file: File,
    cancel: Option<&CancellationToken>,
    _mmap_err: io::Error,
) -> Result<D::Digest, HashError> {
    hash_stream::<D>(path, file, cancel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strong::{Sha256, Xxh64};
    use std::io::Write;

    #[test]
    fn empty_file_hashes_to_empty_input_digest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.bin");
        File::create(&path).unwrap();

        let digest = hash_file::<Sha256>(&path).unwrap();
        assert_eq!(digest, Sha256::digest(b""));
    }

    #[test]
    fn streamed_digest_matches_in_memory_digest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("small.bin");
        let data: Vec<u8> = (0..200_000).map(|i| (i % 251) as u8).collect();
        std::fs::write(&path, &data).unwrap();

        let digest = hash_file::<Xxh64>(&path).unwrap();
        assert_eq!(digest, Xxh64::digest(0, &data));
    }

    #[test]
    fn already_cancelled_token_is_observed_before_any_chunk_is_hashed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cancel-me.bin");
        std::fs::write(&path, vec![0_u8; STREAM_BUFFER_LEN * 3]).unwrap();

        let token = CancellationToken::new();
        token.cancel();

        let err = hash_file_cancellable::<Sha256>(&path, &token).unwrap_err();
        assert!(matches!(err, HashError::Cancelled { .. }));
    }

    #[test]
    fn an_uncancelled_token_hashes_exactly_like_the_plain_variant() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no-cancel.bin");
        let data: Vec<u8> = (0..200_000).map(|i| (i % 251) as u8).collect();
        std::fs::write(&path, &data).unwrap();

        let token = CancellationToken::new();
        let digest = hash_file_cancellable::<Sha256>(&path, &token).unwrap();
        assert_eq!(digest, Sha256::digest(&data));
    }

    #[test]
    fn missing_file_reports_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("does-not-exist.bin");
        let err = hash_file::<Sha256>(&path).unwrap_err();
        assert!(matches!(err, HashError::Io { .. }));
    }

    #[test]
    fn chunk_boundary_does_not_affect_digest() {
        // Exercise a buffer-sized boundary for the streaming path even
        // though the real mmap threshold is far larger than test data.
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("boundary.bin");
        let mut f = File::create(&path).unwrap();
        let data = vec![0xab_u8; STREAM_BUFFER_LEN + 17];
        f.write_all(&data).unwrap();
        drop(f);

        let digest = hash_file::<Sha256>(&path).unwrap();
        assert_eq!(digest, Sha256::digest(&data));
    }
}
