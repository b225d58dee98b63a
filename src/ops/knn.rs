//! K-nearest-neighbour vector search.
//!
//! `ORDER BY VECTOR_COSINE(emb, TO_VECTOR(?)) DESC LIMIT ?` — the host's
//! HNSW index serves the ANN path; this operator only shapes the statement.

use tracing::debug;

use crate::engine::SqlExecutor;
use crate::model::Value;
use crate::sql::{self, SqlBuilder};
use crate::validate::{self, Similarity};
use crate::Result;

use super::{row_f64, row_str, vector_json};

/// A scored vector-search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorHit {
    pub id: String,
    pub score: f64,
}

/// Build the KNN statement. `k` is already sanitised by the caller and is
/// bound, never interpolated.
pub fn build_knn(
    query_vector: &[f32],
    label: Option<&str>,
    k: i64,
    similarity: Similarity,
) -> Result<SqlBuilder> {
    let mut b = SqlBuilder::new();
    b.push("SELECT e.id, ")
        .push(similarity.sql_fn())
        .push("(e.emb, ")
        .push(sql::FN_TO_VECTOR)
        .push("(")
        .bind(vector_json(query_vector))
        .push(")) AS score FROM ")
        .push(sql::T_EMBEDDINGS)
        .push(" e");
    if let Some(label) = label {
        validate::validate_label(label)?;
        b.push(" JOIN ")
            .push(sql::T_LABELS)
            .push(" l ON l.s = e.id AND l.label = ")
            .bind(Value::from(label));
    }
    b.push(" ORDER BY score DESC LIMIT ").bind(Value::Int(k));
    Ok(b)
}

/// Run a KNN search, returning up to `k` `(node_id, score)` hits in
/// descending score order.
pub async fn knn<E: SqlExecutor>(
    exec: &E,
    query_vector: &[f32],
    label: Option<&str>,
    k: i64,
    similarity: Similarity,
) -> Result<Vec<VectorHit>> {
    let (stmt, params) = build_knn(query_vector, label, k, similarity)?.finish();
    debug!(sql = %stmt, params = params.len(), "knn");
    let rows = exec.query(&stmt, &params).await?;
    rows.iter()
        .map(|row| {
            Ok(VectorHit {
                id: row_str(row, 0)?,
                score: row_f64(row, 1)?,
            })
        })
        .collect()
}
