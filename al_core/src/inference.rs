use ndarray::ArrayD;

use crate::Result;

/// Opaque inference callable producing logits from a pool batch.
///
/// Implementations wrap whatever model or forward-modification layer the
/// embedding application uses (plain forward pass, MC-dropout wrapper, …).
/// The strategy only requires that the output carries a leading batch
/// dimension.
pub trait Forward: Send {
    /// Computes logits for one batch.
    ///
    /// # Errors
    /// Returns `AlError` if the model cannot evaluate the batch.
    fn forward(&self, batch: &ArrayD<f32>) -> Result<ArrayD<f32>>;
}

/// Provider of the unlabeled-pool size for the current labelling round.
///
/// Queried by the strategy's bounds check on every finalized batch, so
/// implementations backed by a shrinking pool stay correct across rounds.
pub trait PoolIndex: Send {
    /// Returns the total number of unlabeled examples in the current round.
    fn pool_size(&self) -> usize;
}
