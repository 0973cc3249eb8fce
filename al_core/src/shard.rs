use std::num::NonZeroUsize;
use std::ops::Range;

/// Contiguous slice of the unlabeled pool assigned to one worker.
///
/// Shards are disjoint, cover the whole pool, and differ in size by at most
/// one. A sharded worker scores only its own slice: it resets its strategy
/// with [`crate::PoolStrategy::reset_at`] at the shard start so translated
/// indices land in the shard's global range, and the per-worker states are
/// reduced afterwards with [`crate::RunningTopK::combine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolShard {
    worker_id: usize,
    num_workers: NonZeroUsize,
}

impl PoolShard {
    /// Creates the shard spec for `worker_id` out of `num_workers`.
    ///
    /// # Panics
    /// If `worker_id` is not below `num_workers`.
    pub fn new(worker_id: usize, num_workers: NonZeroUsize) -> Self {
        assert!(worker_id < num_workers.get(), "worker_id out of range");
        Self { worker_id, num_workers }
    }

    /// Returns this worker's pool index range for a pool of `pool_size`.
    pub fn range(self, pool_size: usize) -> Range<usize> {
        let n = self.num_workers.get();
        let base = pool_size / n;
        let rem = pool_size % n;

        let start = self.worker_id * base + self.worker_id.min(rem);
        let extra = usize::from(self.worker_id < rem);
        start..start + base + extra
    }

    /// Returns the counter offset this worker resets at.
    #[inline]
    pub fn offset(self, pool_size: usize) -> usize {
        self.range(pool_size).start
    }
}
