mod acquisition;
mod error;
mod inference;
mod shard;
mod strategy;
mod topk;

pub use acquisition::Acquisition;
pub use error::{AlError, Result};
pub use inference::{Forward, PoolIndex};
pub use shard::PoolShard;
pub use strategy::{BatchTopK, PoolStrategy};
pub use topk::{Direction, RunningTopK, top_k};
