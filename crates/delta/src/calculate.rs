//! Delta calculation: diffing a source buffer against a set of signatures
//! taken from an existing target file.

use rustc_hash::FxHashMap;

use checksums::strong::Xxh64;
use checksums::RollingChecksum;
use protocol::wire::{BlockSignature, DeltaInstruction, DELTA_BLOCK_SIZE};

/// Diffs `source` against `signatures`, returning the reconstruction
/// program and the literal byte stream it references.
///
/// Builds a weak-hash multimap from `signatures`, then slides a
/// `DELTA_BLOCK_SIZE`-wide window across `source` one byte at a time. A weak
/// hash hit is verified with the strong hash before being trusted; on a
/// confirmed match the window jumps forward by its own length instead of one
/// byte, which is what gives the algorithm its speed on mostly-unchanged
/// files.
#[must_use]
pub fn calculate_delta(
    source: &[u8],
    signatures: &[BlockSignature],
) -> (Vec<DeltaInstruction>, Vec<u8>) {
    let mut by_weak: FxHashMap<u32, Vec<&BlockSignature>> = FxHashMap::default();
    for signature in signatures {
        by_weak.entry(signature.weak).or_default().push(signature);
    }

    let mut instructions = Vec::new();
    let mut literal = Vec::new();

    if source.is_empty() {
        return (instructions, literal);
    }

    let block_size = DELTA_BLOCK_SIZE as usize;
    let mut pending_start: u32 = 0;
    let mut i = 0_usize;
    let mut window_len = block_size.min(source.len());
    let mut rolling = RollingChecksum::new();
    rolling.update(&source[i..i + window_len]);

    loop {
        let weak = rolling.value();
        let matched = by_weak.get(&weak).and_then(|candidates| {
            let strong = u64::from_le_bytes(Xxh64::digest(0, &source[i..i + window_len]));
            candidates
                .iter()
                .find(|c| usize::try_from(c.length).unwrap_or(0) == window_len && c.strong == strong)
                .copied()
        });

        if let Some(signature) = matched {
            flush_literal(&mut instructions, &literal, &mut pending_start);
            instructions.push(DeltaInstruction::CopyFromTarget {
                target_block_index: signature.index,
                offset: signature.offset,
                length: signature.length,
            });

            i += window_len;
            if i >= source.len() {
                break;
            }
            window_len = block_size.min(source.len() - i);
            rolling = RollingChecksum::new();
            rolling.update(&source[i..i + window_len]);
            continue;
        }

        literal.push(source[i]);
        i += 1;
        if i >= source.len() {
            break;
        }

        let window_end = i + window_len;
        if window_end > source.len() {
            window_len = source.len() - i;
            rolling = RollingChecksum::new();
            rolling.update(&source[i..i + window_len]);
        } else {
            let outgoing = source[i - 1];
            let incoming = source[window_end - 1];
            // The window length is fixed between resets, so this can only
            // fail if `window_len` is zero, which the loop structure above
            // never allows.
            rolling
                .roll(outgoing, incoming)
                .expect("window length is nonzero between resets");
        }
    }

    flush_literal(&mut instructions, &literal, &mut pending_start);
    (instructions, literal)
}

fn flush_literal(instructions: &mut Vec<DeltaInstruction>, literal: &[u8], pending_start: &mut u32) {
    let end = literal.len() as u32;
    if end > *pending_start {
        instructions.push(DeltaInstruction::LiteralData {
            stream_offset: *pending_start,
            length: end - *pending_start,
        });
        *pending_start = end;
    }
}

/// Minimum source file size (§4.6) below which delta-sync is never
/// attempted.
pub const MIN_DELTA_SOURCE_SIZE: u64 = 256 * 1024;

/// Minimum delta savings (§4.6), measured against a whole-file transfer of
/// the same content, for a delta payload to be preferred.
pub const MIN_DELTA_SAVINGS_RATIO: f64 = 0.20;

/// Returns whether `source_size` and `target_size` satisfy the size-based
/// eligibility rules: the source must be large enough to bother, and the two
/// sizes must not differ by more than 2x in either direction.
#[must_use]
pub fn is_size_eligible(source_size: u64, target_size: u64) -> bool {
    if source_size < MIN_DELTA_SOURCE_SIZE || target_size == 0 {
        return false;
    }
    let smaller = source_size.min(target_size) as f64;
    let larger = source_size.max(target_size) as f64;
    smaller / larger >= 0.5
}

/// Returns whether a computed delta payload saves at least
/// [`MIN_DELTA_SAVINGS_RATIO`] relative to sending `whole_file_len` bytes.
#[must_use]
pub fn meets_savings_threshold(delta_payload_len: u64, whole_file_len: u64) -> bool {
    if whole_file_len == 0 {
        return false;
    }
    let savings = 1.0 - (delta_payload_len as f64 / whole_file_len as f64);
    savings >= MIN_DELTA_SAVINGS_RATIO
}
