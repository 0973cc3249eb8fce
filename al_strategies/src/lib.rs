//! Runtime-selectable acquisition strategies.
//!
//! Orchestration layers pick a strategy through a serde-encoded
//! [`AcquisitionSpec`] resolved by [`from_spec`]; the result is an
//! [`Acquirer`] that plugs into `al_core::PoolStrategy`.
//!
//! Only wiring-level strategies live here: a raw-score pass-through and a
//! random baseline. Information-theoretic objectives (entropy, margin, …)
//! belong to the applications that define them.

mod spec;

use std::sync::Mutex;

use log::warn;
use ndarray::ArrayD;
use rand::{Rng, SeedableRng, rngs::StdRng};

use al_core::{Acquisition, AlError, Direction, Result};

pub use spec::AcquisitionSpec;

/// Builds an acquisition strategy from a configuration-level spec.
///
/// # Args
/// * `spec` - Strategy selection received from the orchestration layer.
///
/// # Errors
/// Returns `AlError::InvalidInput` if the requested kind is unknown or its
/// params are malformed.
pub fn from_spec(spec: &AcquisitionSpec) -> Result<Acquirer> {
    Ok(match spec.kind.as_str() {
        "raw_score" => Acquirer::RawScore(RawScoreAcquisition::new(parse_direction(spec)?)),
        "random" => {
            let rng = match spec.params.get("seed").and_then(serde_json::Value::as_u64) {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_os_rng(),
            };
            Acquirer::Random(RandomAcquisition::with_rng(rng))
        }
        other => {
            warn!(kind = other; "unknown acquisition kind");
            return Err(AlError::InvalidInput("unknown acquisition kind"));
        }
    })
}

fn parse_direction(spec: &AcquisitionSpec) -> Result<Direction> {
    match spec.params.get("direction").and_then(serde_json::Value::as_str) {
        None | Some("maximize") => Ok(Direction::Maximize),
        Some("minimize") => Ok(Direction::Minimize),
        Some(_) => Err(AlError::InvalidInput("direction must be maximize or minimize")),
    }
}

/// Acquisition strategy selected at runtime.
///
/// This type provides a runtime-selectable implementation of `Acquisition`
/// derived from an [`AcquisitionSpec`].
#[derive(Debug)]
pub enum Acquirer {
    RawScore(RawScoreAcquisition),
    Random(RandomAcquisition),
}

impl Acquirer {
    /// Returns a stable identifier for the strategy kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Acquirer::RawScore(_) => "raw_score",
            Acquirer::Random(_) => "random",
        }
    }
}

impl Acquisition for Acquirer {
    fn objective(&self, logits: &ArrayD<f32>) -> Result<ArrayD<f32>> {
        match self {
            Acquirer::RawScore(s) => s.objective(logits),
            Acquirer::Random(s) => s.objective(logits),
        }
    }

    fn direction(&self) -> Direction {
        match self {
            Acquirer::RawScore(s) => s.direction(),
            Acquirer::Random(s) => s.direction(),
        }
    }
}

/// Uses the model output itself as the acquisition score.
///
/// Expects one logit per example (e.g. a scored regression head or an
/// externally computed criterion). Useful for wiring tests and for models
/// that already emit a scalar informativeness score.
#[derive(Debug)]
pub struct RawScoreAcquisition {
    direction: Direction,
}

impl RawScoreAcquisition {
    pub fn new(direction: Direction) -> Self {
        Self { direction }
    }
}

impl Acquisition for RawScoreAcquisition {
    fn objective(&self, logits: &ArrayD<f32>) -> Result<ArrayD<f32>> {
        Ok(logits.clone())
    }

    fn direction(&self) -> Direction {
        self.direction
    }
}

/// Random-baseline acquisition: scores every example uniformly at random.
///
/// The standard control strategy active-learning results are compared
/// against. Seedable for reproducible experiment runs.
#[derive(Debug)]
pub struct RandomAcquisition {
    rng: Mutex<StdRng>,
}

impl RandomAcquisition {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }

    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self { rng: Mutex::new(rng) }
    }
}

impl Default for RandomAcquisition {
    fn default() -> Self {
        Self::new()
    }
}

impl Acquisition for RandomAcquisition {
    fn objective(&self, logits: &ArrayD<f32>) -> Result<ArrayD<f32>> {
        let batch_size = logits
            .shape()
            .first()
            .copied()
            .ok_or(AlError::InvalidInput("logits have no batch dimension"))?;

        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        let scores: Vec<f32> = (0..batch_size).map(|_| rng.random()).collect();
        ArrayD::from_shape_vec(ndarray::IxDyn(&[batch_size]), scores)
            .map_err(|_| AlError::InvalidInput("failed to shape random scores"))
    }
}
