//! `BlockJob` and its lifecycle (§3 `BlockJob`, §4.10).

use std::time::Instant;

use protocol::wire::SWARM_BLOCK_SIZE;

/// Maximum number of times a failed block is requeued before being
/// permanently abandoned (§4.10 `MAX_RETRY_ATTEMPTS`).
pub const MAX_RETRY_ATTEMPTS: u32 = 3;

/// How long an in-flight block may go without completing before
/// [`crate::coordinator::BlockCoordinator::stalled`] reports it as a
/// candidate for work-stealing (§4.10 `stalled()`).
pub const STALL_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

/// One 4 MiB (or shorter, for the final block) region of a swarm-downloaded
/// file, the unit of assignment to peers.
#[derive(Clone, Debug)]
pub struct BlockJob {
    /// Zero-based index of this block within the file.
    pub index: u32,
    /// Byte offset of this block within the file.
    pub offset: u64,
    /// Length of this block in bytes; at most [`SWARM_BLOCK_SIZE`].
    pub length: u32,
    /// Peer id currently assigned to this block, if in flight.
    pub assigned_peer: Option<String>,
    /// When the current assignment was made, if in flight.
    pub assignment_time: Option<Instant>,
    /// Number of failed attempts so far.
    pub failed_attempts: u32,
}

impl BlockJob {
    /// Partitions `size` bytes into `BlockJob`s of [`SWARM_BLOCK_SIZE`]
    /// each, with a possibly-shorter final block (§4.10 `create_jobs`).
    ///
    /// # Panics
    ///
    /// Panics if `size` is `0`; a zero-length file has no blocks to
    /// schedule and callers should not attempt a swarm download of one.
    #[must_use]
    pub fn partition(size: u64) -> Vec<Self> {
        assert!(size > 0, "cannot partition a zero-length file into blocks");
        let block_size = SWARM_BLOCK_SIZE;
        let total_blocks = size.div_ceil(block_size);
        (0..total_blocks)
            .map(|index| {
                let offset = index * block_size;
                let length = (size - offset).min(block_size);
                Self {
                    index: u32::try_from(index).expect("block count fits in u32"),
                    offset,
                    length: u32::try_from(length).expect("block length fits in u32"),
                    assigned_peer: None,
                    assignment_time: None,
                    failed_attempts: 0,
                }
            })
            .collect()
    }

    /// Whether this block has exhausted its retry budget and must be
    /// permanently abandoned rather than requeued.
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.failed_attempts >= MAX_RETRY_ATTEMPTS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_divides_evenly_sized_files_exactly() {
        let jobs = BlockJob::partition(SWARM_BLOCK_SIZE * 3);
        assert_eq!(jobs.len(), 3);
        for (i, job) in jobs.iter().enumerate() {
            assert_eq!(job.length, u32::try_from(SWARM_BLOCK_SIZE).unwrap());
            assert_eq!(job.offset, i as u64 * SWARM_BLOCK_SIZE);
        }
    }

    #[test]
    fn partition_shortens_the_final_block() {
        let jobs = BlockJob::partition(SWARM_BLOCK_SIZE * 2 + 100);
        assert_eq!(jobs.len(), 3);
        assert_eq!(jobs[2].length, 100);
        assert_eq!(jobs[2].offset, SWARM_BLOCK_SIZE * 2);
    }

    #[test]
    fn partition_handles_a_single_short_file() {
        let jobs = BlockJob::partition(12_000_000);
        assert_eq!(jobs.len(), 3);
        assert_eq!(jobs[0].offset, 0);
        assert_eq!(jobs[0].length, u32::try_from(SWARM_BLOCK_SIZE).unwrap());
    }

    #[test]
    #[should_panic(expected = "zero-length")]
    fn partition_rejects_zero_length_files() {
        let _ = BlockJob::partition(0);
    }

    #[test]
    fn exhaustion_is_reported_only_at_the_retry_ceiling() {
        let mut job = BlockJob::partition(1024).remove(0);
        assert!(!job.is_exhausted());
        job.failed_attempts = MAX_RETRY_ATTEMPTS - 1;
        assert!(!job.is_exhausted());
        job.failed_attempts = MAX_RETRY_ATTEMPTS;
        assert!(job.is_exhausted());
    }
}
