use std::num::NonZeroUsize;

use log::debug;
use ndarray::{Array1, ArrayView1, aview1};

use crate::{AlError, Result};

/// Optimization direction of an acquisition objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Higher scores are better (e.g. uncertainty-style objectives).
    Maximize,
    /// Lower scores are better.
    Minimize,
}

/// Selects the `k` best entries of `scores` and their positions.
///
/// Ties are broken by position: the sort is stable, so among equal scores the
/// earlier entry wins. Callers must not rely on a particular tie winner
/// beyond value equality. NaN is ordered via `total_cmp` so selection is
/// deterministic and never panics.
///
/// # Args
/// * `scores` - Candidate scores.
/// * `k` - Number of entries to select; must be ≤ `scores.len()`.
/// * `direction` - Whether the best entries are the largest or the smallest.
///
/// # Returns
/// `(values, positions)` of length `k`, ordered best-first.
pub fn top_k(scores: ArrayView1<f32>, k: usize, direction: Direction) -> (Array1<f32>, Array1<i64>) {
    debug_assert!(k <= scores.len());

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| {
        let ord = scores[a].total_cmp(&scores[b]);
        match direction {
            Direction::Maximize => ord.reverse(),
            Direction::Minimize => ord,
        }
    });
    order.truncate(k);

    let values = order.iter().map(|&i| scores[i]).collect();
    let positions = order.iter().map(|&i| i as i64).collect();
    (values, positions)
}

/// Running top-k (score, pool index) state for one labelling round.
///
/// `values` and `indices` always have length `query_size`. Slots that were
/// never filled hold the sentinel pair `(0.0, -1)`; sentinel slots never
/// compete with real candidates during a merge, so the state stays the true
/// top-k even when real scores are negative.
///
/// Merging is associative and commutative for a fixed direction, which is
/// what allows per-worker partial states to be reduced pairwise or in any
/// tree order.
#[derive(Debug, Clone)]
pub struct RunningTopK {
    direction: Direction,
    values: Array1<f32>,
    indices: Array1<i64>,
}

impl RunningTopK {
    /// Creates an empty state sized to `query_size`.
    pub fn new(query_size: NonZeroUsize, direction: Direction) -> Self {
        Self {
            direction,
            values: Array1::zeros(query_size.get()),
            indices: Array1::from_elem(query_size.get(), -1),
        }
    }

    /// Returns the number of examples this state selects per round.
    pub fn query_size(&self) -> usize {
        self.values.len()
    }

    /// Returns the optimization direction this state selects under.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Returns the current best-known scores (sentinel 0.0 for unfilled slots).
    pub fn values(&self) -> ArrayView1<'_, f32> {
        self.values.view()
    }

    /// Returns the global pool indices parallel to `values` (sentinel −1).
    pub fn indices(&self) -> ArrayView1<'_, i64> {
        self.indices.view()
    }

    /// Returns the global pool indices of the filled slots.
    pub fn selected(&self) -> Vec<usize> {
        self.indices
            .iter()
            .filter(|&&i| i >= 0)
            .map(|&i| i as usize)
            .collect()
    }

    /// Folds one batch's candidates into the state, in place.
    ///
    /// `indices` must already be global pool indices. After the call the
    /// state holds the top-`query_size` pairs among everything merged so far,
    /// independent of the order batches arrive in.
    ///
    /// # Errors
    /// Returns `AlError::ShapeMismatch` if `values` and `indices` differ in
    /// length, `AlError::InvalidInput` if a candidate carries a sentinel
    /// index.
    pub fn merge(&mut self, values: ArrayView1<f32>, indices: ArrayView1<i64>) -> Result<()> {
        if values.len() != indices.len() {
            return Err(AlError::ShapeMismatch {
                what: "merge candidates",
                got: values.len(),
                expected: indices.len(),
            });
        }
        if indices.iter().any(|&i| i < 0) {
            return Err(AlError::InvalidInput("candidate pool index is negative"));
        }

        let query_size = self.query_size();

        // candidates: filled slots first, then the incoming batch
        let mut cand_values = Vec::with_capacity(query_size + values.len());
        let mut cand_indices = Vec::with_capacity(query_size + values.len());
        for (&v, &i) in self.values.iter().zip(self.indices.iter()) {
            if i >= 0 {
                cand_values.push(v);
                cand_indices.push(i);
            }
        }
        cand_values.extend(values.iter());
        cand_indices.extend(indices.iter());

        let k = query_size.min(cand_values.len());
        let (top_values, top_positions) = top_k(aview1(&cand_values), k, self.direction);

        for slot in 0..query_size {
            if slot < k {
                self.values[slot] = top_values[slot];
                self.indices[slot] = cand_indices[top_positions[slot] as usize];
            } else {
                self.values[slot] = 0.0;
                self.indices[slot] = -1;
            }
        }

        debug!(filled = k; "merged batch candidates into running top-k");
        Ok(())
    }

    /// Folds another worker's partial state into this one.
    ///
    /// Used by distributed aggregation to reduce per-shard states; valid in
    /// any reduction order.
    ///
    /// # Errors
    /// Returns `AlError::InvalidInput` if the directions differ.
    pub fn combine(&mut self, other: &RunningTopK) -> Result<()> {
        if other.direction != self.direction {
            return Err(AlError::InvalidInput(
                "cannot combine states with different directions",
            ));
        }

        let mut values = Vec::with_capacity(other.query_size());
        let mut indices = Vec::with_capacity(other.query_size());
        for (&v, &i) in other.values.iter().zip(other.indices.iter()) {
            if i >= 0 {
                values.push(v);
                indices.push(i);
            }
        }

        self.merge(aview1(&values), aview1(&indices))
    }
}
