//! Directed typed edge between two nodes.

use serde::{Deserialize, Serialize};

/// A directed edge `(source)-[predicate]->(target)`.
///
/// `id` is the database-assigned row identifier. `qualifiers` carries
/// edge-level properties (weight, confidence, provenance) as a JSON object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: i64,
    pub source: String,
    pub predicate: String,
    pub target: String,
    pub qualifiers: Option<serde_json::Value>,
}

impl Edge {
    pub fn new(
        id: i64,
        source: impl Into<String>,
        predicate: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            id,
            source: source.into(),
            predicate: predicate.into(),
            target: target.into(),
            qualifiers: None,
        }
    }

    /// Read a qualifier value by key, if the qualifier object has it.
    pub fn qualifier(&self, key: &str) -> Option<&serde_json::Value> {
        self.qualifiers.as_ref().and_then(|q| q.get(key))
    }
}
