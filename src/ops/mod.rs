//! # Hybrid Retrieval Operators
//!
//! KNN vector search, BM25 text search, Reciprocal Rank Fusion,
//! personalised PageRank, and BFS traversal. Each operator issues
//! parameterised SQL through the executor; fusion and iteration logic runs
//! in-process. The translator composes the same SQL shapes; the engine
//! exposes these directly as typed API.

pub mod knn;
pub mod text;
pub mod rrf;
pub mod pagerank;
pub mod traverse;

pub use knn::VectorHit;
pub use rrf::FusedHit;
pub use text::TextHit;
pub use traverse::Step;

use crate::model::Value;
use crate::{Error, Result};

/// A `(node_id, score)` pair returned by a retrieval operator.
pub type ScoredId = (String, f64);

// ============================================================================
// Row extraction helpers
// ============================================================================

pub(crate) fn row_str(row: &[Value], idx: usize) -> Result<String> {
    match row.get(idx) {
        Some(Value::String(s)) => Ok(s.clone()),
        other => Err(Error::Internal(format!(
            "expected string in result column {idx}, got {:?}",
            other.map(Value::type_name)
        ))),
    }
}

pub(crate) fn row_f64(row: &[Value], idx: usize) -> Result<f64> {
    row.get(idx)
        .and_then(Value::as_float)
        .ok_or_else(|| Error::Internal(format!("expected number in result column {idx}")))
}

pub(crate) fn row_i64(row: &[Value], idx: usize) -> Result<i64> {
    row.get(idx)
        .and_then(Value::as_int)
        .ok_or_else(|| Error::Internal(format!("expected integer in result column {idx}")))
}

/// JSON-encode an embedding for `TO_VECTOR(?)`.
pub(crate) fn vector_json(vector: &[f32]) -> Value {
    let rendered = serde_json::to_string(vector).unwrap_or_else(|_| "[]".into());
    Value::String(rendered)
}
