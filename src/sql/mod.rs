//! # SQL Assembly
//!
//! Two things live here:
//!
//! 1. The **host dialect**: the table, column, and function names the host
//!    database exposes. This is the entire SQL surface the crate depends on;
//!    a different host is supported by editing this one place.
//! 2. The **fragment builder**: accumulates SQL text and bound parameters
//!    together, so a statement can never be produced with mismatched
//!    placeholders. `push` only accepts `&'static str` — dynamic text can
//!    only enter a statement as a bound parameter or through the
//!    crate-internal identifier path, which the validator guards.

use crate::model::Value;

// ============================================================================
// Host dialect: tables
// ============================================================================

/// The identity table. Every other table references `nodes(node_id)`.
pub const T_NODES: &str = "nodes";
/// `(s, label)` — node label assignments.
pub const T_LABELS: &str = "rdf_labels";
/// `(s, key, val)` — node properties, values stored as strings.
pub const T_PROPS: &str = "rdf_props";
/// `(id, s, p, o_id, qualifiers)` — directed typed edges.
pub const T_EDGES: &str = "rdf_edges";
/// `(id, emb, meta)` — one embedding per node, HNSW-indexed.
pub const T_EMBEDDINGS: &str = "kg_NodeEmbeddings";
/// `(id, text)` — BM25 corpus; `id` matches `node_id` by convention.
pub const T_DOCS: &str = "docs";

// ============================================================================
// Host dialect: functions
// ============================================================================

pub const FN_VECTOR_COSINE: &str = "VECTOR_COSINE";
pub const FN_VECTOR_DOT_PRODUCT: &str = "VECTOR_DOT_PRODUCT";
pub const FN_TO_VECTOR: &str = "TO_VECTOR";
pub const FN_EMBEDDING: &str = "EMBEDDING";
pub const FN_BM25_SCORE: &str = "BM25_SCORE";
pub const FN_JSON_ARRAYAGG: &str = "JSON_ARRAYAGG";
pub const FN_JSON_OBJECT: &str = "JSON_OBJECT";
pub const FN_JSON_VALUE: &str = "JSON_VALUE";

/// Safe numeric cast: evaluates to NULL instead of erroring on
/// non-numeric input, so rows failing the cast drop out of comparisons.
pub fn safe_number(expr: &str) -> String {
    format!("TRY_CAST({expr} AS DOUBLE)")
}

// ============================================================================
// Fragment builder
// ============================================================================

/// Accumulates SQL text and its bound parameters together.
///
/// Invariant: the number of `?` placeholders in `sql` always equals
/// `params.len()`, because a placeholder can only be written by `bind`.
#[derive(Debug, Default, Clone)]
pub struct SqlBuilder {
    sql: String,
    params: Vec<Value>,
}

impl SqlBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a static SQL fragment.
    pub fn push(&mut self, fragment: &'static str) -> &mut Self {
        debug_assert!(!fragment.contains('?'), "placeholders must go through bind()");
        self.sql.push_str(fragment);
        self
    }

    /// Append an identifier or internally generated name (CTE names,
    /// whitelisted tables/columns). Callers outside this crate cannot reach
    /// this; the validator vets everything routed here.
    pub(crate) fn push_name(&mut self, name: &str) -> &mut Self {
        debug_assert!(
            name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.'),
            "identifier contains non-identifier characters"
        );
        self.sql.push_str(name);
        self
    }

    /// Append a `?` placeholder and record its parameter.
    pub fn bind(&mut self, value: Value) -> &mut Self {
        self.sql.push('?');
        self.params.push(value);
        self
    }

    /// Splice a finished sub-fragment, keeping text and parameters aligned.
    pub fn append(&mut self, other: SqlBuilder) -> &mut Self {
        self.sql.push_str(&other.sql);
        self.params.extend(other.params);
        self
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }

    /// Number of `?` placeholders in the accumulated text.
    pub fn placeholder_count(&self) -> usize {
        self.sql.matches('?').count()
    }

    pub fn finish(self) -> (String, Vec<Value>) {
        (self.sql, self.params)
    }
}
