use serde::{Deserialize, Serialize};

/// The specification for selecting and configuring an acquisition strategy.
///
/// This is a configuration-level contract used when an orchestration layer
/// wires up a labelling round. It intentionally avoids referencing concrete
/// strategy types so that orchestration code does not depend on this crate's
/// implementations.
///
/// `kind` is an opaque identifier (e.g. "raw_score", "random") resolved by
/// [`crate::from_spec`]. `params` carries arbitrary JSON configuration for
/// that strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcquisitionSpec {
    pub kind: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

impl AcquisitionSpec {
    /// Creates a spec with empty params.
    pub fn new(kind: impl Into<String>) -> Self {
        Self { kind: kind.into(), params: serde_json::Value::Null }
    }
}
