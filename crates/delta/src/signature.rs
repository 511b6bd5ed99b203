//! Signature generation over an existing target file.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use checksums::strong::Xxh64;
use checksums::RollingChecksum;
use protocol::wire::{BlockSignature, DELTA_BLOCK_SIZE};

use crate::error::DeltaError;

/// Reads `path` sequentially in [`DELTA_BLOCK_SIZE`] chunks and emits one
/// [`BlockSignature`] per chunk, in file order. The final chunk may be
/// shorter than [`DELTA_BLOCK_SIZE`].
///
/// # Errors
///
/// Returns [`DeltaError::Io`] if the file cannot be opened or read.
pub fn generate_signatures(path: &Path) -> Result<Vec<BlockSignature>, DeltaError> {
    let file = File::open(path).map_err(|e| DeltaError::io(path, e))?;
    let mut reader = BufReader::new(file);

    let mut signatures = Vec::new();
    let mut buf = vec![0_u8; DELTA_BLOCK_SIZE as usize];
    let mut offset: u64 = 0;
    let mut index: u32 = 0;

    loop {
        let n = read_full(&mut reader, &mut buf).map_err(|e| DeltaError::io(path, e))?;
        if n == 0 {
            break;
        }
        let chunk = &buf[..n];

        let mut weak = RollingChecksum::new();
        weak.update(chunk);
        let strong = u64::from_le_bytes(Xxh64::digest(0, chunk));

        signatures.push(BlockSignature {
            offset,
            length: n as u32,
            weak: weak.value(),
            strong,
            index,
        });

        offset += n as u64;
        index += 1;

        if n < buf.len() {
            break;
        }
    }

    Ok(signatures)
}

/// Fills `buf` from `reader`, stopping short only at EOF (unlike
/// `Read::read`, which may return fewer bytes than requested even mid-stream).
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_file_yields_no_signatures() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.bin");
        File::create(&path).unwrap();

        let signatures = generate_signatures(&path).unwrap();
        assert!(signatures.is_empty());
    }

    #[test]
    fn file_shorter_than_one_block_yields_a_single_short_signature() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.bin");
        std::fs::write(&path, b"hello world").unwrap();

        let signatures = generate_signatures(&path).unwrap();
        assert_eq!(signatures.len(), 1);
        assert_eq!(signatures[0].offset, 0);
        assert_eq!(signatures[0].length, 11);
        assert_eq!(signatures[0].index, 0);
    }

    #[test]
    fn file_spanning_two_blocks_yields_two_signatures_with_correct_offsets() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("two-blocks.bin");
        let mut f = File::create(&path).unwrap();
        let first = vec![0xab_u8; DELTA_BLOCK_SIZE as usize];
        let second = vec![0xcd_u8; 100];
        f.write_all(&first).unwrap();
        f.write_all(&second).unwrap();
        drop(f);

        let signatures = generate_signatures(&path).unwrap();
        assert_eq!(signatures.len(), 2);
        assert_eq!(signatures[0].offset, 0);
        assert_eq!(signatures[0].length, DELTA_BLOCK_SIZE);
        assert_eq!(signatures[1].offset, u64::from(DELTA_BLOCK_SIZE));
        assert_eq!(signatures[1].length, 100);
        assert_eq!(signatures[1].index, 1);
    }

    #[test]
    fn identical_chunks_produce_identical_weak_and_strong_hashes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("repeated.bin");
        let chunk = vec![0x42_u8; DELTA_BLOCK_SIZE as usize];
        let mut f = File::create(&path).unwrap();
        f.write_all(&chunk).unwrap();
        f.write_all(&chunk).unwrap();
        drop(f);

        let signatures = generate_signatures(&path).unwrap();
        assert_eq!(signatures.len(), 2);
        assert_eq!(signatures[0].weak, signatures[1].weak);
        assert_eq!(signatures[0].strong, signatures[1].strong);
    }
}
