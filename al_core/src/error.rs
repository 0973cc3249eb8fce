use std::{error::Error, fmt};

/// The result type used in the entire active-learning core.
pub type Result<T> = std::result::Result<T, AlError>;

/// Failures surfaced by the pool-scoring pipeline.
#[derive(Debug)]
pub enum AlError {
    /// The strategy was used before `connect` bound a model and a pool.
    NotConnected,

    /// A batch was finalized before `reset` opened a labelling round.
    NotReset,

    /// More examples were consumed than the pool contains.
    ///
    /// This is an integration bug, not a transient condition: either two
    /// rounds ran without an intervening `reset`, or the same batch was
    /// processed twice. The round must be aborted.
    PoolOverflow {
        /// Accumulated example count after the offending batch.
        counter: usize,
        /// Size of the unlabeled pool for the current round.
        pool_size: usize,
    },

    /// A length invariant was violated (e.g. scores vs. batch size).
    ShapeMismatch {
        /// Human-readable context for the mismatch (e.g. "scores").
        what: &'static str,
        /// Observed value.
        got: usize,
        /// Expected value.
        expected: usize,
    },

    /// An input is invalid for semantic or domain reasons.
    InvalidInput(&'static str),
}

impl fmt::Display for AlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlError::NotConnected => {
                write!(f, "strategy is not connected: call connect before use")
            }
            AlError::NotReset => {
                write!(f, "no open labelling round: call reset before processing batches")
            }
            AlError::PoolOverflow { counter, pool_size } => write!(
                f,
                "consumed {counter} examples from a pool of {pool_size}: \
                 strategy state must be reset at the end of each labelling round"
            ),
            AlError::ShapeMismatch { what, got, expected } => {
                write!(f, "shape mismatch for {what}: got {got}, expected {expected}")
            }
            AlError::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
        }
    }
}

impl Error for AlError {}
