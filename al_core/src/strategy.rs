use std::num::NonZeroUsize;

use log::{debug, warn};
use ndarray::{Array1, ArrayD, ArrayView1};

use crate::{
    AlError, Result,
    acquisition::Acquisition,
    inference::{Forward, PoolIndex},
    topk::RunningTopK,
};

/// Per-batch output of the scoring pipeline.
///
/// `indices` are batch-local; `pool_step_end` translates them into global
/// pool indices before merging.
#[derive(Debug, Clone)]
pub struct BatchTopK {
    /// Top-k acquisition scores for this batch, best-first.
    pub values: Array1<f32>,
    /// Batch-local positions parallel to `values`.
    pub indices: Array1<i64>,
    /// Number of examples in the batch the scores were computed from.
    pub batch_size: usize,
}

struct Bound {
    model: Box<dyn Forward>,
    pool: Box<dyn PoolIndex>,
    query_size: NonZeroUsize,
}

/// Streaming top-k acquisition strategy over an unlabeled pool.
///
/// Scores the pool batch by batch and keeps only the running best
/// `query_size` (score, pool index) pairs, so memory stays O(query_size)
/// instead of O(pool_size) and a round costs one pass over the pool.
///
/// Call sequence per labelling round: `reset`, then for each pool batch
/// `pool_step` followed by `pool_step_end`, then read `indices`/`selected`.
/// `connect` must run once before the first round. One instance owns one
/// merge stream; sharded workers each run their own instance (see
/// [`crate::PoolShard`]) and reduce with [`RunningTopK::combine`].
pub struct PoolStrategy<A: Acquisition> {
    acquisition: A,
    bound: Option<Bound>,
    counter: usize,
    state: Option<RunningTopK>,
}

impl<A: Acquisition> PoolStrategy<A> {
    /// Creates a disconnected strategy around an acquisition policy.
    pub fn new(acquisition: A) -> Self {
        Self { acquisition, bound: None, counter: 0, state: None }
    }

    /// Deferred initialization.
    ///
    /// Binds the inference callable, the pool-size provider, and the number
    /// of examples to select per round. Must be called before the first
    /// `reset`; calling it again rebinds and discards any open round.
    pub fn connect(
        &mut self,
        model: Box<dyn Forward>,
        pool: Box<dyn PoolIndex>,
        query_size: NonZeroUsize,
    ) {
        debug!(query_size = query_size.get(); "strategy connected");
        self.bound = Some(Bound { model, pool, query_size });
        self.counter = 0;
        self.state = None;
    }

    /// Opens a fresh labelling round.
    ///
    /// Must be called exactly once per round, before that round's first
    /// batch. Always yields a zero counter and an all-sentinel state,
    /// regardless of prior state.
    ///
    /// # Errors
    /// Returns `AlError::NotConnected` if `connect` has not run.
    pub fn reset(&mut self) -> Result<()> {
        self.reset_at(0)
    }

    /// Opens a fresh round with the counter at a shard's first pool index.
    ///
    /// Sharded workers score disjoint contiguous slices of the pool; each
    /// worker resets at its shard start so translated indices land in the
    /// shard's own global range.
    ///
    /// # Errors
    /// Returns `AlError::NotConnected` if `connect` has not run.
    pub fn reset_at(&mut self, offset: usize) -> Result<()> {
        let bound = self.bound.as_ref().ok_or(AlError::NotConnected)?;
        self.counter = offset;
        self.state = Some(RunningTopK::new(bound.query_size, self.acquisition.direction()));
        debug!(offset = offset; "labelling round reset");
        Ok(())
    }

    /// Scores one pool batch.
    ///
    /// Runs the scoring pipeline: forward pass, `pre_objective`,
    /// `objective`, `post_objective`, then batch-level top-k selection.
    /// Pure with respect to the round state; pass the result to
    /// `pool_step_end` to commit it.
    ///
    /// # Errors
    /// Returns `AlError::NotConnected` before `connect`,
    /// `AlError::InvalidInput` for an empty batch, and propagates pipeline
    /// failures.
    pub fn pool_step(&mut self, batch: &ArrayD<f32>) -> Result<BatchTopK> {
        let bound = self.bound.as_ref().ok_or(AlError::NotConnected)?;

        let logits = bound.model.forward(batch)?;
        let batch_size = logits.shape().first().copied().unwrap_or(0);
        if batch_size == 0 {
            return Err(AlError::InvalidInput("batch produced no logits"));
        }

        let logits = self.acquisition.pre_objective(logits)?;
        let raw = self.acquisition.objective(&logits)?;
        let scores = self.acquisition.post_objective(raw, batch_size)?;

        let (values, indices) = self.acquisition.select_batch_topk(&scores, bound.query_size.get());
        Ok(BatchTopK { values, indices, batch_size })
    }

    /// Commits one batch's top-k into the running round state.
    ///
    /// Translates batch-local indices by the running counter, advances the
    /// counter by `batch_size`, bounds-checks it against the pool size, and
    /// merges the candidates.
    ///
    /// # Errors
    /// Returns `AlError::NotReset` if no round is open and
    /// `AlError::PoolOverflow` if this batch pushes the accumulated example
    /// count past `pool_size`. Overflow is fatal for the round; the counter
    /// is never clamped.
    pub fn pool_step_end(&mut self, output: BatchTopK) -> Result<()> {
        let bound = self.bound.as_ref().ok_or(AlError::NotConnected)?;
        let state = self.state.as_mut().ok_or(AlError::NotReset)?;

        let BatchTopK { values, mut indices, batch_size } = output;
        indices += self.counter as i64;
        self.counter += batch_size;

        let pool_size = bound.pool.pool_size();
        if self.counter > pool_size {
            warn!(counter = self.counter, pool_size = pool_size; "pool overflow");
            return Err(AlError::PoolOverflow { counter: self.counter, pool_size });
        }

        state.merge(values.view(), indices.view())
    }

    /// Returns the global pool offset of the next unseen example.
    pub fn counter(&self) -> usize {
        self.counter
    }

    /// Returns the acquisition policy.
    pub fn acquisition(&self) -> &A {
        &self.acquisition
    }

    /// Returns the round state, if a round is open.
    pub fn state(&self) -> Option<&RunningTopK> {
        self.state.as_ref()
    }

    /// Returns the current best-known scores (sentinel 0.0 for unfilled slots).
    ///
    /// # Errors
    /// Returns `AlError::NotReset` if no round is open.
    pub fn values(&self) -> Result<ArrayView1<'_, f32>> {
        Ok(self.state.as_ref().ok_or(AlError::NotReset)?.values())
    }

    /// Returns the global indices parallel to `values` (sentinel −1).
    ///
    /// # Errors
    /// Returns `AlError::NotReset` if no round is open.
    pub fn indices(&self) -> Result<ArrayView1<'_, i64>> {
        Ok(self.state.as_ref().ok_or(AlError::NotReset)?.indices())
    }

    /// Returns the pool indices to label: the filled slots of the state.
    ///
    /// # Errors
    /// Returns `AlError::NotReset` if no round is open.
    pub fn selected(&self) -> Result<Vec<usize>> {
        Ok(self.state.as_ref().ok_or(AlError::NotReset)?.selected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::IxDyn;

    use crate::topk::Direction;

    /// Forwards each example's single feature unchanged.
    struct IdentityModel;

    impl Forward for IdentityModel {
        fn forward(&self, batch: &ArrayD<f32>) -> Result<ArrayD<f32>> {
            Ok(batch.clone())
        }
    }

    struct FixedPool(usize);

    impl PoolIndex for FixedPool {
        fn pool_size(&self) -> usize {
            self.0
        }
    }

    struct RawScore;

    impl Acquisition for RawScore {
        fn objective(&self, logits: &ArrayD<f32>) -> Result<ArrayD<f32>> {
            Ok(logits.clone())
        }
    }

    fn batch(scores: &[f32]) -> ArrayD<f32> {
        ArrayD::from_shape_vec(IxDyn(&[scores.len()]), scores.to_vec()).unwrap()
    }

    fn connected(pool_size: usize, query_size: usize) -> PoolStrategy<RawScore> {
        let mut strategy = PoolStrategy::new(RawScore);
        strategy.connect(
            Box::new(IdentityModel),
            Box::new(FixedPool(pool_size)),
            NonZeroUsize::new(query_size).unwrap(),
        );
        strategy
    }

    fn run_batch(strategy: &mut PoolStrategy<RawScore>, scores: &[f32]) -> Result<()> {
        let output = strategy.pool_step(&batch(scores))?;
        strategy.pool_step_end(output)
    }

    #[test]
    fn test_use_before_connect_fails() {
        let mut strategy = PoolStrategy::new(RawScore);
        assert!(matches!(strategy.reset(), Err(AlError::NotConnected)));
        assert!(matches!(strategy.pool_step(&batch(&[0.1])), Err(AlError::NotConnected)));
    }

    #[test]
    fn test_finalize_before_reset_fails() {
        let mut strategy = connected(4, 2);
        let output = strategy.pool_step(&batch(&[0.1, 0.2])).unwrap();
        assert!(matches!(strategy.pool_step_end(output), Err(AlError::NotReset)));
    }

    #[test]
    fn test_reset_is_idempotent() {
        let mut strategy = connected(5, 2);
        strategy.reset().unwrap();
        run_batch(&mut strategy, &[0.1, 0.9]).unwrap();

        strategy.reset().unwrap();
        assert_eq!(strategy.counter(), 0);
        assert_eq!(strategy.values().unwrap().as_slice().unwrap(), &[0.0, 0.0]);
        assert_eq!(strategy.indices().unwrap().as_slice().unwrap(), &[-1, -1]);
    }

    #[test]
    fn test_counter_tracks_batch_sizes_exactly() {
        let mut strategy = connected(6, 2);
        strategy.reset().unwrap();

        run_batch(&mut strategy, &[0.1]).unwrap();
        run_batch(&mut strategy, &[0.2, 0.3, 0.4]).unwrap();
        run_batch(&mut strategy, &[0.5, 0.6]).unwrap();

        assert_eq!(strategy.counter(), 6);
    }

    #[test]
    fn test_two_batch_round_selects_global_best() {
        // pool of 5 scored in batches of 2 then 3
        let mut strategy = connected(5, 2);
        strategy.reset().unwrap();

        run_batch(&mut strategy, &[0.1, 0.9]).unwrap();
        run_batch(&mut strategy, &[0.3, 0.2, 0.95]).unwrap();

        let mut selected = strategy.selected().unwrap();
        selected.sort_unstable();
        assert_eq!(selected, vec![1, 4]);

        let mut values: Vec<f32> = strategy.values().unwrap().to_vec();
        values.sort_by(f32::total_cmp);
        assert_eq!(values, vec![0.9, 0.95]);
    }

    #[test]
    fn test_overflow_raised_on_offending_batch_only() {
        let mut strategy = connected(3, 2);
        strategy.reset().unwrap();

        run_batch(&mut strategy, &[0.1, 0.2]).unwrap();
        run_batch(&mut strategy, &[0.3]).unwrap();

        // a fourth example exceeds the pool
        let err = run_batch(&mut strategy, &[0.4]).unwrap_err();
        assert!(matches!(err, AlError::PoolOverflow { counter: 4, pool_size: 3 }));
    }

    #[test]
    fn test_round_without_reset_overflows() {
        let mut strategy = connected(2, 1);
        strategy.reset().unwrap();
        run_batch(&mut strategy, &[0.1, 0.2]).unwrap();

        // second round without reset replays the pool
        let err = run_batch(&mut strategy, &[0.3, 0.4]).unwrap_err();
        assert!(matches!(err, AlError::PoolOverflow { .. }));
    }

    #[test]
    fn test_underfilled_round_keeps_sentinel_slots() {
        let mut strategy = connected(10, 5);
        strategy.reset().unwrap();
        run_batch(&mut strategy, &[0.3, 0.1, 0.2]).unwrap();

        let indices = strategy.indices().unwrap();
        let sentinels = indices.iter().filter(|&&i| i == -1).count();
        assert_eq!(sentinels, 2);

        let mut selected = strategy.selected().unwrap();
        selected.sort_unstable();
        assert_eq!(selected, vec![0, 1, 2]);
    }

    #[test]
    fn test_minimize_direction_selects_smallest() {
        struct NegRaw;

        impl Acquisition for NegRaw {
            fn objective(&self, logits: &ArrayD<f32>) -> Result<ArrayD<f32>> {
                Ok(logits.clone())
            }

            fn direction(&self) -> Direction {
                Direction::Minimize
            }
        }

        let mut strategy = PoolStrategy::new(NegRaw);
        strategy.connect(
            Box::new(IdentityModel),
            Box::new(FixedPool(4)),
            NonZeroUsize::new(2).unwrap(),
        );
        strategy.reset().unwrap();

        let output = strategy.pool_step(&batch(&[0.4, 0.1, 0.3, 0.2])).unwrap();
        strategy.pool_step_end(output).unwrap();

        let mut selected = strategy.selected().unwrap();
        selected.sort_unstable();
        assert_eq!(selected, vec![1, 3]);
    }
}
