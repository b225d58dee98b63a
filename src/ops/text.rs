//! BM25 full-text search over the document corpus.

use tracing::debug;

use crate::engine::SqlExecutor;
use crate::model::Value;
use crate::sql::{self, SqlBuilder};
use crate::validate;
use crate::Result;

use super::{row_f64, row_str};

/// A scored text-search hit. `id` joins back to `nodes.node_id`.
#[derive(Debug, Clone, PartialEq)]
pub struct TextHit {
    pub id: String,
    pub text: String,
    pub score: f64,
}

/// Build the text-search statement. `k` rides in `TOP ?` — parameterised,
/// never spliced.
pub fn build_text(query: &str, k: i64) -> SqlBuilder {
    let mut b = SqlBuilder::new();
    b.push("SELECT TOP ");
    b.bind(Value::Int(k));
    b.push(" d.id, d.text, ")
        .push(sql::FN_BM25_SCORE)
        .push("(d.text, ")
        .bind(Value::from(query))
        .push(") AS score FROM ")
        .push(sql::T_DOCS)
        .push(" d ORDER BY score DESC");
    b
}

/// Run a BM25 search. `k` may arrive as an integer or numeric string and is
/// coerced by the validator; non-numeric input raises before any SQL runs.
pub async fn text_search<E: SqlExecutor>(
    exec: &E,
    query: &str,
    k: Option<&Value>,
    k_default: i64,
    k_max: i64,
) -> Result<Vec<TextHit>> {
    let k = validate::coerce_k(k, k_default, k_max)?;
    let (stmt, params) = build_text(query, k).finish();
    debug!(sql = %stmt, params = params.len(), "text search");
    let rows = exec.query(&stmt, &params).await?;
    rows.iter()
        .map(|row| {
            Ok(TextHit {
                id: row_str(row, 0)?,
                text: row_str(row, 1)?,
                score: row_f64(row, 2)?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_sql_shape() {
        let b = build_text("malaria", 10);
        assert_eq!(
            b.sql(),
            "SELECT TOP ? d.id, d.text, BM25_SCORE(d.text, ?) AS score \
             FROM docs d ORDER BY score DESC"
        );
        assert_eq!(b.params(), &[Value::Int(10), Value::String("malaria".into())]);
    }
}
