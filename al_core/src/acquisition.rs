use ndarray::{Array1, ArrayD};

use crate::{
    AlError, Result,
    topk::{Direction, top_k},
};

/// Abstraction over an acquisition function evaluated on pool batches.
///
/// This trait represents the *acquisition policy boundary*: it is the only
/// interface the scoring pipeline requires to rank pool examples. How the
/// score is derived from the logits (entropy, margin, a learned critic, …)
/// is intentionally outside of the pipeline and lives behind implementations
/// of this trait.
///
/// `objective` is the one required method. The remaining methods are
/// extension points with defaults that cover the common case of one scalar
/// score per example.
pub trait Acquisition: Send {
    /// Computes the acquisition score for each example in the batch.
    ///
    /// # Args
    /// * `logits` - Output of the model forward pass, leading batch dimension.
    ///
    /// # Returns
    /// One value per example along the leading axis. By default this output
    /// is then flattened by `post_objective`.
    ///
    /// # Errors
    /// Implementations should return `AlError::InvalidInput` or
    /// `AlError::ShapeMismatch` rather than panic.
    fn objective(&self, logits: &ArrayD<f32>) -> Result<ArrayD<f32>>;

    /// Whether this acquisition selects the largest or the smallest scores.
    fn direction(&self) -> Direction {
        Direction::Maximize
    }

    /// Runs before the scores are computed. By default it returns its input.
    fn pre_objective(&self, logits: ArrayD<f32>) -> Result<ArrayD<f32>> {
        Ok(logits)
    }

    /// Runs after the scores are computed. By default it flattens them to one
    /// score per example and validates the length against `batch_size`.
    ///
    /// Override for objectives that need a multi-dimensional reduction.
    ///
    /// # Errors
    /// Returns `AlError::ShapeMismatch` if the flattened scores do not have
    /// exactly one entry per example.
    fn post_objective(&self, scores: ArrayD<f32>, batch_size: usize) -> Result<Array1<f32>> {
        let flat: Array1<f32> = scores.iter().copied().collect();
        if flat.len() != batch_size {
            return Err(AlError::ShapeMismatch {
                what: "scores",
                got: flat.len(),
                expected: batch_size,
            });
        }
        Ok(flat)
    }

    /// Selects the batch-level top-k candidates from the per-example scores.
    ///
    /// The default keeps `min(batch_size, query_size)` entries in this
    /// acquisition's direction, with stable first-seen-wins tie-breaking.
    ///
    /// # Returns
    /// `(values, batch_local_indices)`, both of length ≤ `query_size`.
    fn select_batch_topk(&self, scores: &Array1<f32>, query_size: usize) -> (Array1<f32>, Array1<i64>) {
        let k = scores.len().min(query_size);
        top_k(scores.view(), k, self.direction())
    }
}
