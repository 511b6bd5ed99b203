//! The block coordinator: pending queue, in-flight map, and completed map
//! for one swarm download (§4.10).
//!
//! The three collections live behind a single [`std::sync::Mutex`] rather
//! than one lock apiece: every real operation here (`dequeue`,
//! `mark_complete`, `mark_failed`, `reassign`) moves a block between two
//! of the three collections atomically, and guarding them separately would
//! only reintroduce the race the single lock exists to prevent. Critical
//! sections are a handful of `HashMap`/`VecDeque` operations, so contention
//! is not a concern even with [`crate::worker::MAX_CONCURRENT_PEERS`]
//! workers hammering the same coordinator.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use rustc_hash::FxHashMap;

use crate::job::{BlockJob, MAX_RETRY_ATTEMPTS, STALL_TIMEOUT};

struct Inner {
    pending: VecDeque<BlockJob>,
    in_flight: FxHashMap<u32, BlockJob>,
    completed: FxHashMap<u32, BlockJob>,
    abandoned: FxHashMap<u32, BlockJob>,
    total_blocks: usize,
}

/// Shared, concurrency-safe scheduler for one file's swarm blocks.
///
/// Cloning shares the same underlying state (it wraps an [`Arc`]), so every
/// peer worker task and the work-stealing loop can hold their own handle.
#[derive(Clone)]
pub struct BlockCoordinator {
    inner: Arc<Mutex<Inner>>,
}

/// Snapshot of how many blocks are in each state, satisfying the invariant
/// `completed + in_flight + pending + abandoned == total_blocks`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct BlockCounts {
    /// Blocks not yet dequeued by any worker.
    pub pending: usize,
    /// Blocks currently assigned to a worker.
    pub in_flight: usize,
    /// Blocks written and acknowledged.
    pub completed: usize,
    /// Blocks that exhausted their retry budget.
    pub abandoned: usize,
    /// Total blocks the file was partitioned into.
    pub total_blocks: usize,
}

impl BlockCounts {
    /// Whether every block has reached a terminal state: either completed
    /// or permanently abandoned.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.completed + self.abandoned == self.total_blocks
    }

    /// Whether the swarm succeeded: every block completed and none were
    /// abandoned (§4.10 "if any block is permanently abandoned, the whole
    /// swarm result is failure").
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.completed == self.total_blocks
    }
}

impl BlockCoordinator {
    /// Creates a coordinator over `size` bytes, partitioned into blocks of
    /// [`protocol::wire::SWARM_BLOCK_SIZE`] each, all starting in Pending
    /// (§4.10 `create_jobs`).
    #[must_use]
    pub fn create_jobs(size: u64) -> Self {
        let jobs = BlockJob::partition(size);
        let total_blocks = jobs.len();
        Self {
            inner: Arc::new(Mutex::new(Inner {
                pending: jobs.into(),
                in_flight: FxHashMap::default(),
                completed: FxHashMap::default(),
                abandoned: FxHashMap::default(),
                total_blocks,
            })),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner
            .lock()
            .expect("block coordinator lock is never poisoned")
    }

    /// Atomically pops the next pending block, stamps it with `peer` and
    /// the current time, and moves it to the in-flight map (§4.10
    /// `dequeue`). Returns `None` once the pending queue is empty.
    #[must_use]
    pub fn dequeue(&self, peer: &str) -> Option<BlockJob> {
        let mut inner = self.lock();
        let mut job = inner.pending.pop_front()?;
        job.assigned_peer = Some(peer.to_owned());
        job.assignment_time = Some(Instant::now());
        inner.in_flight.insert(job.index, job.clone());
        Some(job)
    }

    /// Moves `index` from in-flight to completed (§4.10 `mark_complete`).
    /// A no-op if the block is not currently in flight (e.g. it was
    /// already completed by a faster peer via work-stealing).
    pub fn mark_complete(&self, index: u32) {
        let mut inner = self.lock();
        if let Some(job) = inner.in_flight.remove(&index) {
            inner.completed.insert(index, job);
        }
    }

    /// Increments `index`'s failed-attempt count. Returns the block to
    /// Pending if it is still below [`MAX_RETRY_ATTEMPTS`]; otherwise
    /// moves it to the abandoned set permanently (§4.10 `mark_failed`).
    pub fn mark_failed(&self, index: u32, reason: &str) {
        let mut inner = self.lock();
        let Some(mut job) = inner.in_flight.remove(&index) else {
            return;
        };
        job.failed_attempts += 1;
        job.assigned_peer = None;
        job.assignment_time = None;
        tracing::warn!(block = index, attempts = job.failed_attempts, %reason, "swarm block failed");
        if job.failed_attempts >= MAX_RETRY_ATTEMPTS {
            inner.abandoned.insert(index, job);
        } else {
            inner.pending.push_back(job);
        }
    }

    /// Speculatively reassigns an in-flight block to `new_peer`, valid
    /// only while the block remains in flight. The original peer may still
    /// complete the block and win the race; [`Self::mark_complete`]
    /// accepts a completion regardless of which peer currently holds the
    /// assignment (§4.10 `reassign`).
    pub fn reassign(&self, index: u32, new_peer: &str) {
        let mut inner = self.lock();
        if let Some(job) = inner.in_flight.get_mut(&index) {
            job.assigned_peer = Some(new_peer.to_owned());
            job.assignment_time = Some(Instant::now());
        }
    }

    /// Returns every in-flight block whose assignment is older than
    /// [`STALL_TIMEOUT`] (§4.10 `stalled()`).
    #[must_use]
    pub fn stalled(&self) -> Vec<BlockJob> {
        let now = Instant::now();
        self.lock()
            .in_flight
            .values()
            .filter(|job| {
                job.assignment_time
                    .is_some_and(|at| now.duration_since(at) > STALL_TIMEOUT)
            })
            .cloned()
            .collect()
    }

    /// Any one permanently abandoned block, if the swarm has given up on
    /// one. Only the first (by index) is reported; a caller reporting
    /// failure does not need every abandoned block to explain why the
    /// download did not complete.
    #[must_use]
    pub fn first_abandoned_block(&self) -> Option<BlockJob> {
        self.lock()
            .abandoned
            .values()
            .min_by_key(|job| job.index)
            .cloned()
    }

    /// Snapshot of block counts across all four states.
    #[must_use]
    pub fn counts(&self) -> BlockCounts {
        let inner = self.lock();
        BlockCounts {
            pending: inner.pending.len(),
            in_flight: inner.in_flight.len(),
            completed: inner.completed.len(),
            abandoned: inner.abandoned.len(),
            total_blocks: inner.total_blocks,
        }
    }
}
