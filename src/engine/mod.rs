//! # Engine
//!
//! Orchestrates the pipeline: parse → translate → execute → hydrate. Owns
//! the statement gate (a bounded semaphore standing in front of the
//! executor's connection pool), per-instance capability probes, and the
//! typed write helpers that replace Cypher's write clauses.

pub mod result;
pub(crate) mod hydrate;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Deserialize;
use tokio::sync::Semaphore;
use tracing::{debug, info};

use crate::cypher::{self, ast::CypherQuery};
use crate::model::{Node, Params, PropertyMap, Value};
use crate::model::node::MAX_NODE_ID_LEN;
use crate::ops::{self, FusedHit, Step, TextHit, VectorHit};
use crate::ops::pagerank::PprOptions;
use crate::schema::SchemaManager;
use crate::sql::{self, SqlBuilder};
use crate::translate::{self, TranslateOptions, Translation};
use crate::validate::{self, Similarity};
use crate::{Error, Result};

pub use result::{FromValue, QueryResult, ResultRow};

// ============================================================================
// Executor contract
// ============================================================================

/// One row of raw SQL output.
pub type SqlRow = Vec<Value>;

/// The contract between the engine and any database driver.
///
/// Implementations own connection management and map driver errors onto
/// this crate's error kinds: constraint violations become
/// [`Error::Integrity`], unreachable hosts become [`Error::Connection`],
/// everything else [`Error::Internal`]. Statement text only ever contains
/// whitelisted identifiers; all dynamic values arrive in `params`.
#[async_trait]
pub trait SqlExecutor: Send + Sync + 'static {
    /// Run a statement returning rows.
    async fn query(&self, statement: &str, params: &[Value]) -> Result<Vec<SqlRow>>;

    /// Run a statement returning an affected-row count.
    async fn execute(&self, statement: &str, params: &[Value]) -> Result<u64>;

    /// Run several statements in one transaction, all-or-nothing.
    async fn execute_batch(&self, statements: &[(String, Vec<Value>)]) -> Result<()>;
}

// ============================================================================
// Configuration
// ============================================================================

/// Engine configuration. Connection fields describe the host for executor
/// constructors; the rest tune the pipeline.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub host: String,
    pub port: u16,
    pub namespace: String,
    pub user: String,
    pub password: String,

    /// Deployment-wide vector dimension; mismatched writes are rejected.
    pub embedding_dimension: usize,
    pub k_default: i64,
    pub k_max: i64,

    pub ppr_damping: f64,
    pub ppr_eps: f64,
    pub ppr_max_iters: usize,
    pub rrf_damping_c: f64,
    pub traversal_max_hops: i64,

    /// Concurrent statements allowed through the gate.
    pub pool_size: usize,
    /// Per-statement deadline; timed-out writes roll back with their batch.
    pub statement_timeout_ms: Option<u64>,

    /// Default `EMBEDDING()` configuration for text-mode vector search.
    pub embedding_config: Option<String>,
    /// Allow vector search to proceed without the HNSW index (full scan).
    pub allow_brute_force_scan: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 1972,
            namespace: "USER".into(),
            user: String::new(),
            password: String::new(),
            embedding_dimension: 768,
            k_default: 50,
            k_max: 1000,
            ppr_damping: 0.85,
            ppr_eps: 1e-4,
            ppr_max_iters: 100,
            rrf_damping_c: 60.0,
            traversal_max_hops: 5,
            pool_size: 8,
            statement_timeout_ms: None,
            embedding_config: None,
            allow_brute_force_scan: false,
        }
    }
}

// ============================================================================
// Capability probes
// ============================================================================

/// Lazily probed host capabilities, cached per engine instance. Each probe
/// runs one benign statement and classifies the outcome; connection
/// failures propagate instead of being cached as "unavailable".
#[derive(Debug, Default)]
struct Probes {
    embedding: Mutex<Option<bool>>,
    ppr_function: Mutex<Option<bool>>,
    functional_index: Mutex<Option<bool>>,
}

// ============================================================================
// Engine
// ============================================================================

/// The primary entry point. An `Engine` wraps a SQL executor and provides
/// Cypher execution, hybrid retrieval, and typed writes.
pub struct Engine<E: SqlExecutor> {
    exec: E,
    cfg: EngineConfig,
    gate: Arc<Semaphore>,
    probes: Probes,
}

impl<E: SqlExecutor> Engine<E> {
    pub fn new(exec: E, cfg: EngineConfig) -> Self {
        let gate = Arc::new(Semaphore::new(cfg.pool_size.max(1)));
        Self {
            exec,
            cfg,
            gate,
            probes: Probes::default(),
        }
    }

    /// Access the underlying executor (for advanced use).
    pub fn executor(&self) -> &E {
        &self.exec
    }

    pub fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    /// Run a future under the statement gate with the configured deadline.
    /// The permit is released on every exit path.
    async fn guarded<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let _permit = self
            .gate
            .acquire()
            .await
            .map_err(|_| Error::Internal("statement gate closed".into()))?;
        match self.cfg.statement_timeout_ms {
            Some(ms) => match tokio::time::timeout(Duration::from_millis(ms), fut).await {
                Ok(result) => result,
                Err(_) => Err(Error::Timeout),
            },
            None => fut.await,
        }
    }

    // ========================================================================
    // Cypher pipeline
    // ========================================================================

    /// Execute a Cypher query with parameters.
    pub async fn execute_cypher(&self, query: &str, params: Params) -> Result<QueryResult> {
        // Phase 1+2: Parse and translate (pure, fails before any SQL)
        let translation = self.translate(query, &params).await?;

        // Phase 3+4: Execute and hydrate
        self.guarded(async {
            let rows = self.exec.query(&translation.sql, &translation.params).await?;
            hydrate::hydrate(&self.exec, &translation.columns, rows).await
        })
        .await
    }

    /// Parse and translate without executing; useful for inspection.
    pub async fn translate(&self, query: &str, params: &Params) -> Result<Translation> {
        let ast = cypher::parse(query)?;

        if let Some(vector) = call_vector_input(&ast, params) {
            self.check_dimension(&vector)?;
        }
        let embedding_available = if call_wants_text_embedding(&ast, params) {
            Some(self.embedding_available().await?)
        } else {
            None
        };

        let opts = TranslateOptions {
            k_default: self.cfg.k_default,
            k_max: self.cfg.k_max,
            max_hops: self.cfg.traversal_max_hops.max(0) as usize,
            embedding_available,
            default_embedding_config: self.cfg.embedding_config.clone(),
        };
        translate::translate(&ast, params, &opts)
    }

    // ========================================================================
    // Capability probes
    // ========================================================================

    /// Does the host provide `EMBEDDING(text, config)`?
    pub async fn embedding_available(&self) -> Result<bool> {
        if let Some(cached) = *self.probes.embedding.lock() {
            return Ok(cached);
        }
        let stmt = "SELECT EMBEDDING(?, ?)";
        let config = self.cfg.embedding_config.clone().unwrap_or_default();
        let available = self
            .classify_probe(stmt, &[Value::from("probe"), Value::String(config)])
            .await?;
        debug!(available, "embedding probe");
        *self.probes.embedding.lock() = Some(available);
        Ok(available)
    }

    /// Does the host provide a native PPR table function?
    pub async fn ppr_function_available(&self) -> Result<bool> {
        if let Some(cached) = *self.probes.ppr_function.lock() {
            return Ok(cached);
        }
        let stmt = "SELECT node_id, score FROM kg_PERSONALIZED_PAGERANK(?, ?, ?, ?, ?) \
                    WHERE 1 = 0";
        let params = [
            Value::from("[]"),
            Value::Float(self.cfg.ppr_damping),
            Value::Float(self.cfg.ppr_eps),
            Value::Int(1),
            Value::Int(0),
        ];
        let available = self.classify_probe(stmt, &params).await?;
        debug!(available, "ppr function probe");
        *self.probes.ppr_function.lock() = Some(available);
        Ok(available)
    }

    /// Does the host accept functional (expression) indexes? Decides
    /// whether the schema manager adds the numeric-cast index.
    pub async fn functional_index_available(&self) -> Result<bool> {
        if let Some(cached) = *self.probes.functional_index.lock() {
            return Ok(cached);
        }
        let available = self
            .classify_probe("SELECT TRY_CAST(? AS DOUBLE)", &[Value::from("1")])
            .await?;
        debug!(available, "functional index probe");
        *self.probes.functional_index.lock() = Some(available);
        Ok(available)
    }

    /// Run a benign probe statement; a host error other than a connection
    /// failure means "capability absent".
    async fn classify_probe(&self, stmt: &str, params: &[Value]) -> Result<bool> {
        match self.guarded(self.exec.query(stmt, params)).await {
            Ok(_) => Ok(true),
            Err(Error::Connection(msg)) => Err(Error::Connection(msg)),
            Err(Error::Timeout) => Err(Error::Timeout),
            Err(_) => Ok(false),
        }
    }

    // ========================================================================
    // Schema
    // ========================================================================

    /// Idempotently create tables and indexes, honouring the brute-force
    /// fallback flag for the vector index.
    pub async fn ensure_schema(&self) -> Result<()> {
        let manager = SchemaManager::new(&self.exec, self.cfg.embedding_dimension)
            .allow_missing_vector_index(self.cfg.allow_brute_force_scan);
        self.guarded(manager.ensure_schema()).await?;
        if self.functional_index_available().await? {
            self.guarded(manager.ensure_functional_indexes()).await?;
        }
        Ok(())
    }

    /// Run the NodePK migration (idempotent).
    pub async fn migrate_node_pk(&self) -> Result<()> {
        let manager = SchemaManager::new(&self.exec, self.cfg.embedding_dimension);
        self.guarded(manager.migrate_node_pk()).await
    }

    /// Roll the NodePK migration back.
    pub async fn rollback_node_pk(&self) -> Result<()> {
        let manager = SchemaManager::new(&self.exec, self.cfg.embedding_dimension);
        self.guarded(manager.rollback_node_pk()).await
    }

    // ========================================================================
    // Typed reads
    // ========================================================================

    /// Fetch one node; `None` when the id is unknown.
    pub async fn get_node(&self, id: &str) -> Result<Option<Node>> {
        let mut nodes = self
            .guarded(hydrate::load_nodes(&self.exec, &[id.to_string()]))
            .await?;
        Ok(nodes.pop().flatten())
    }

    /// Batch fetch, aligned with the input ids.
    pub async fn get_nodes(&self, ids: &[String]) -> Result<Vec<Option<Node>>> {
        self.guarded(hydrate::load_nodes(&self.exec, ids)).await
    }

    // ========================================================================
    // Typed writes (single transaction each)
    // ========================================================================

    /// Insert a node with its labels and properties atomically. The node
    /// row goes first so dependent rows never violate the identity FK.
    pub async fn create_node(
        &self,
        id: &str,
        labels: &[&str],
        props: &PropertyMap,
    ) -> Result<()> {
        validate_node_id(id)?;
        for label in labels {
            validate::validate_label(label)?;
        }
        let mut keys: Vec<&String> = props.keys().collect();
        keys.sort();
        for key in &keys {
            validate::validate_property_key(key)?;
        }

        let mut statements = Vec::with_capacity(1 + labels.len() + keys.len());
        let mut b = SqlBuilder::new();
        b.push("INSERT INTO ").push(sql::T_NODES).push(" (node_id) VALUES (");
        b.bind(Value::from(id));
        b.push(")");
        statements.push(b.finish());

        for label in labels {
            let mut b = SqlBuilder::new();
            b.push("INSERT INTO ").push(sql::T_LABELS).push(" (s, label) VALUES (");
            b.bind(Value::from(id));
            b.push(", ");
            b.bind(Value::from(*label));
            b.push(")");
            statements.push(b.finish());
        }
        for key in keys {
            let mut b = SqlBuilder::new();
            b.push("INSERT INTO ").push(sql::T_PROPS).push(" (s, key, val) VALUES (");
            b.bind(Value::from(id));
            b.push(", ");
            b.bind(Value::from(key.as_str()));
            b.push(", ");
            b.bind(Value::from(props[key].as_str()));
            b.push(")");
            statements.push(b.finish());
        }

        self.guarded(self.exec.execute_batch(&statements)).await
    }

    /// Insert a directed typed edge. Both endpoints must already exist;
    /// the FK surfaces a missing endpoint as an integrity error.
    pub async fn create_edge(
        &self,
        source: &str,
        predicate: &str,
        target: &str,
        qualifiers: Option<&serde_json::Value>,
    ) -> Result<()> {
        validate_node_id(source)?;
        validate_node_id(target)?;
        validate::validate_predicate(predicate)?;

        let mut b = SqlBuilder::new();
        b.push("INSERT INTO ")
            .push(sql::T_EDGES)
            .push(" (s, p, o_id, qualifiers) VALUES (");
        b.bind(Value::from(source));
        b.push(", ");
        b.bind(Value::from(predicate));
        b.push(", ");
        b.bind(Value::from(target));
        b.push(", ");
        match qualifiers {
            Some(q) => b.bind(Value::String(
                serde_json::to_string(q).map_err(|e| Error::Internal(e.to_string()))?,
            )),
            None => b.bind(Value::Null),
        };
        b.push(")");
        let (stmt, params) = b.finish();
        self.guarded(async { self.exec.execute(&stmt, &params).await.map(|_| ()) })
            .await
    }

    /// Insert or replace a node's embedding.
    pub async fn store_embedding(
        &self,
        id: &str,
        vector: &[f32],
        meta: Option<&serde_json::Value>,
    ) -> Result<()> {
        let statements = self.embedding_statements(id, vector, meta)?;
        self.guarded(self.exec.execute_batch(&statements)).await
    }

    /// Atomic batch of embeddings: every item validates before any SQL
    /// runs, and any failure rolls the whole batch back.
    pub async fn store_embeddings(
        &self,
        items: &[(String, Vec<f32>, Option<serde_json::Value>)],
    ) -> Result<()> {
        let mut statements = Vec::with_capacity(items.len() * 2);
        for (id, vector, meta) in items {
            statements.extend(self.embedding_statements(id, vector, meta.as_ref())?);
        }
        if statements.is_empty() {
            return Ok(());
        }
        self.guarded(self.exec.execute_batch(&statements)).await
    }

    fn embedding_statements(
        &self,
        id: &str,
        vector: &[f32],
        meta: Option<&serde_json::Value>,
    ) -> Result<Vec<(String, Vec<Value>)>> {
        validate_node_id(id)?;
        self.check_dimension(vector)?;

        let mut delete = SqlBuilder::new();
        delete.push("DELETE FROM ").push(sql::T_EMBEDDINGS).push(" WHERE id = ");
        delete.bind(Value::from(id));

        let mut insert = SqlBuilder::new();
        insert
            .push("INSERT INTO ")
            .push(sql::T_EMBEDDINGS)
            .push(" (id, emb, meta) VALUES (");
        insert.bind(Value::from(id));
        insert.push(", ").push(sql::FN_TO_VECTOR).push("(");
        insert.bind(Value::String(
            serde_json::to_string(vector).map_err(|e| Error::Internal(e.to_string()))?,
        ));
        insert.push("), ");
        match meta {
            Some(m) => insert.bind(Value::String(
                serde_json::to_string(m).map_err(|e| Error::Internal(e.to_string()))?,
            )),
            None => insert.bind(Value::Null),
        };
        insert.push(")");

        Ok(vec![delete.finish(), insert.finish()])
    }

    /// Insert or replace a document in the BM25 corpus. By convention
    /// `id` matches a `node_id` so text hits join back to nodes.
    pub async fn store_document(&self, id: &str, text: &str) -> Result<()> {
        let statements = document_statements(id, text)?;
        self.guarded(self.exec.execute_batch(&statements)).await
    }

    pub async fn store_documents(&self, items: &[(String, String)]) -> Result<()> {
        let mut statements = Vec::with_capacity(items.len() * 2);
        for (id, text) in items {
            statements.extend(document_statements(id, text)?);
        }
        if statements.is_empty() {
            return Ok(());
        }
        self.guarded(self.exec.execute_batch(&statements)).await
    }

    /// Administrative cascade: delete a node and everything referencing
    /// it, in one transaction. Ordinary deletes are blocked by
    /// `ON DELETE RESTRICT`; this is the explicit escape hatch.
    pub async fn cascade_delete_node(&self, id: &str) -> Result<()> {
        validate_node_id(id)?;
        let mut statements = Vec::with_capacity(6);

        for (table, column) in [
            (sql::T_LABELS, "s"),
            (sql::T_PROPS, "s"),
            (sql::T_EMBEDDINGS, "id"),
            (sql::T_DOCS, "id"),
        ] {
            let mut b = SqlBuilder::new();
            b.push("DELETE FROM ").push(table).push(" WHERE ");
            b.push_name(column);
            b.push(" = ");
            b.bind(Value::from(id));
            statements.push(b.finish());
        }
        let mut edges = SqlBuilder::new();
        edges.push("DELETE FROM ").push(sql::T_EDGES).push(" WHERE s = ");
        edges.bind(Value::from(id));
        edges.push(" OR o_id = ");
        edges.bind(Value::from(id));
        statements.push(edges.finish());

        let mut node = SqlBuilder::new();
        node.push("DELETE FROM ").push(sql::T_NODES).push(" WHERE node_id = ");
        node.bind(Value::from(id));
        statements.push(node.finish());

        info!(id, "cascade delete");
        self.guarded(self.exec.execute_batch(&statements)).await
    }

    // ========================================================================
    // Hybrid retrieval
    // ========================================================================

    /// Top-k vector similarity search.
    pub async fn knn_search(
        &self,
        query_vector: &[f32],
        label: Option<&str>,
        k: Option<&Value>,
    ) -> Result<Vec<VectorHit>> {
        self.check_dimension(query_vector)?;
        let k = validate::coerce_k(k, self.cfg.k_default, self.cfg.k_max)?;
        self.guarded(ops::knn::knn(
            &self.exec,
            query_vector,
            label,
            k,
            Similarity::Cosine,
        ))
        .await
    }

    /// Top-k BM25 text search.
    pub async fn text_search(&self, query: &str, k: Option<&Value>) -> Result<Vec<TextHit>> {
        self.guarded(ops::text::text_search(
            &self.exec,
            query,
            k,
            self.cfg.k_default,
            self.cfg.k_max,
        ))
        .await
    }

    /// Hybrid search: KNN and BM25, fused by reciprocal rank.
    pub async fn rrf_search(
        &self,
        query_vector: &[f32],
        text_query: &str,
        k: Option<&Value>,
    ) -> Result<Vec<FusedHit>> {
        self.check_dimension(query_vector)?;
        let k = validate::coerce_k(k, self.cfg.k_default, self.cfg.k_max)?;
        let c = self.cfg.rrf_damping_c;
        self.guarded(async {
            let vector_hits =
                ops::knn::knn(&self.exec, query_vector, None, k, Similarity::Cosine).await?;
            let text_hits = ops::text::text_search(
                &self.exec,
                text_query,
                Some(&Value::Int(k)),
                self.cfg.k_default,
                self.cfg.k_max,
            )
            .await?;

            let vector_ranked: Vec<(String, f64)> =
                vector_hits.into_iter().map(|h| (h.id, h.score)).collect();
            let text_ranked: Vec<(String, f64)> =
                text_hits.into_iter().map(|h| (h.id, h.score)).collect();
            Ok(ops::rrf::fuse(&vector_ranked, &text_ranked, c, k as usize))
        })
        .await
    }

    /// Personalised PageRank seeded at `seeds`. Uses the host's native
    /// table function when the probe finds one, the in-process power
    /// iteration otherwise; the contract is identical.
    pub async fn personalized_pagerank(
        &self,
        seeds: &[String],
        bidirectional: bool,
    ) -> Result<hashbrown::HashMap<String, f64>> {
        if seeds.is_empty() {
            return Ok(hashbrown::HashMap::new());
        }
        for seed in seeds {
            validate_node_id(seed)?;
        }

        if self.ppr_function_available().await? {
            let stmt = "SELECT node_id, score FROM kg_PERSONALIZED_PAGERANK(?, ?, ?, ?, ?)";
            let params = [
                Value::String(
                    serde_json::to_string(seeds).map_err(|e| Error::Internal(e.to_string()))?,
                ),
                Value::Float(self.cfg.ppr_damping),
                Value::Float(self.cfg.ppr_eps),
                Value::Int(self.cfg.ppr_max_iters as i64),
                Value::Int(i64::from(bidirectional)),
            ];
            let rows = self.guarded(self.exec.query(stmt, &params)).await?;
            let mut scores = hashbrown::HashMap::with_capacity(rows.len());
            for row in &rows {
                let id = match row.first() {
                    Some(Value::String(id)) => id.clone(),
                    _ => return Err(Error::Internal("pagerank row missing node id".into())),
                };
                let score = row
                    .get(1)
                    .and_then(Value::as_float)
                    .ok_or_else(|| Error::Internal("pagerank row missing score".into()))?;
                scores.insert(id, score);
            }
            return Ok(scores);
        }

        let opts = PprOptions {
            damping: self.cfg.ppr_damping,
            eps: self.cfg.ppr_eps,
            max_iters: self.cfg.ppr_max_iters,
            bidirectional,
        };
        self.guarded(ops::pagerank::personalized_pagerank(&self.exec, seeds, &opts))
            .await
    }

    /// BFS traversal from `start`, optionally predicate-filtered per hop.
    pub async fn bfs(
        &self,
        start: &str,
        predicates: Option<&[String]>,
        max_hops: Option<i64>,
    ) -> Result<Vec<Step>> {
        let max_hops = max_hops.unwrap_or(self.cfg.traversal_max_hops);
        self.guarded(ops::traverse::bfs(&self.exec, start, predicates, max_hops))
            .await
    }

    // ========================================================================
    // Shared checks
    // ========================================================================

    fn check_dimension(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.cfg.embedding_dimension {
            return Err(Error::Dimension {
                expected: self.cfg.embedding_dimension,
                got: vector.len(),
            });
        }
        Ok(())
    }
}

// ============================================================================
// Free helpers
// ============================================================================

fn validate_node_id(id: &str) -> Result<()> {
    if id.is_empty() || id.len() > MAX_NODE_ID_LEN {
        return Err(Error::Validation(format!(
            "node id must be 1-{MAX_NODE_ID_LEN} characters"
        )));
    }
    Ok(())
}

fn document_statements(id: &str, text: &str) -> Result<Vec<(String, Vec<Value>)>> {
    validate_node_id(id)?;

    let mut delete = SqlBuilder::new();
    delete.push("DELETE FROM ").push(sql::T_DOCS).push(" WHERE id = ");
    delete.bind(Value::from(id));

    let mut insert = SqlBuilder::new();
    insert.push("INSERT INTO ").push(sql::T_DOCS).push(" (id, text) VALUES (");
    insert.bind(Value::from(id));
    insert.push(", ");
    insert.bind(Value::from(text));
    insert.push(")");

    Ok(vec![delete.finish(), insert.finish()])
}

/// Does the query's CALL stage take a text input (and therefore need the
/// `EMBEDDING()` probe before translation)?
fn call_wants_text_embedding(ast: &CypherQuery, params: &Params) -> bool {
    let Some(call) = &ast.call else { return false };
    match call.args.get(2) {
        Some(crate::cypher::ast::Expr::Literal(crate::cypher::ast::Literal::String(_))) => true,
        Some(crate::cypher::ast::Expr::Parameter(name)) => {
            matches!(params.get(name), Some(Value::String(_)))
        }
        _ => false,
    }
}

/// The query's CALL vector input, when it has one (for dimension checks).
fn call_vector_input(ast: &CypherQuery, params: &Params) -> Option<Vec<f32>> {
    let call = ast.call.as_ref()?;
    match call.args.get(2)? {
        crate::cypher::ast::Expr::Parameter(name) => params.get(name)?.as_vector(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults_match_contract() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.embedding_dimension, 768);
        assert_eq!(cfg.k_default, 50);
        assert_eq!(cfg.k_max, 1000);
        assert_eq!(cfg.ppr_damping, 0.85);
        assert_eq!(cfg.ppr_eps, 1e-4);
        assert_eq!(cfg.ppr_max_iters, 100);
        assert_eq!(cfg.rrf_damping_c, 60.0);
        assert_eq!(cfg.traversal_max_hops, 5);
        assert_eq!(cfg.pool_size, 8);
        assert!(cfg.statement_timeout_ms.is_none());
        assert!(!cfg.allow_brute_force_scan);
    }

    #[test]
    fn test_config_deserializes_partial() {
        let cfg: EngineConfig =
            serde_json::from_str(r#"{"host": "db.internal", "embedding_dimension": 3}"#).unwrap();
        assert_eq!(cfg.host, "db.internal");
        assert_eq!(cfg.embedding_dimension, 3);
        assert_eq!(cfg.k_default, 50);
    }

    #[test]
    fn test_node_id_bounds() {
        assert!(validate_node_id("TP53").is_ok());
        assert!(validate_node_id("").is_err());
        assert!(validate_node_id(&"x".repeat(257)).is_err());
        assert!(validate_node_id(&"x".repeat(256)).is_ok());
    }
}
