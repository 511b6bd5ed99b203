//! Delta application: reconstructing a source file from an existing target
//! file plus a reconstruction program and literal byte buffer.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use checksums::strong::Xxh64;
use protocol::wire::DeltaInstruction;

use crate::error::DeltaError;

/// Replays `instructions` against `target_path`, copying bytes either from
/// the existing target file or from `literal`, and verifies the
/// reconstructed output against `expected_hash` (lowercase hex XxHash64,
/// as carried by the manifest's `FileEntry`).
///
/// # Errors
///
/// Returns [`DeltaError::Io`] if the target file cannot be opened, seeked,
/// or read; [`DeltaError::InstructionOutOfRange`] if a `CopyFromTarget`
/// instruction references bytes past the target file's end;
/// [`DeltaError::LiteralOutOfRange`] if a `LiteralData` instruction
/// references bytes past the literal buffer's end; and
/// [`DeltaError::IntegrityMismatch`] if the reconstructed bytes do not hash
/// to `expected_hash`.
pub fn apply_delta(
    target_path: &Path,
    instructions: &[DeltaInstruction],
    literal: &[u8],
    expected_hash: &str,
) -> Result<Vec<u8>, DeltaError> {
    let mut target = File::open(target_path).map_err(|e| DeltaError::io(target_path, e))?;
    let target_len = target
        .metadata()
        .map_err(|e| DeltaError::io(target_path, e))?
        .len();

    let mut out = Vec::new();
    for instruction in instructions {
        match *instruction {
            DeltaInstruction::CopyFromTarget { offset, length, .. } => {
                let end = offset
                    .checked_add(u64::from(length))
                    .filter(|&end| end <= target_len);
                if end.is_none() {
                    return Err(DeltaError::InstructionOutOfRange { offset, length });
                }

                target
                    .seek(SeekFrom::Start(offset))
                    .map_err(|e| DeltaError::io(target_path, e))?;
                let mut buf = vec![0_u8; length as usize];
                target
                    .read_exact(&mut buf)
                    .map_err(|e| DeltaError::io(target_path, e))?;
                out.extend_from_slice(&buf);
            }
            DeltaInstruction::LiteralData {
                stream_offset,
                length,
            } => {
                let start = stream_offset as usize;
                let end = start
                    .checked_add(length as usize)
                    .filter(|&end| end <= literal.len());
                let Some(end) = end else {
                    return Err(DeltaError::LiteralOutOfRange {
                        stream_offset,
                        length,
                    });
                };

                out.extend_from_slice(&literal[start..end]);
            }
        }
    }

    let actual = Xxh64::to_hex(Xxh64::digest(0, &out));
    if actual != expected_hash.to_ascii_lowercase() {
        return Err(DeltaError::IntegrityMismatch {
            expected: expected_hash.to_owned(),
            actual,
        });
    }

    Ok(out)
}
