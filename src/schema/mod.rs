//! # Schema Manager
//!
//! Owns the `nodes` identity table and everything anchored to it: labels,
//! properties, edges, embeddings, documents, and their indexes. All DDL is
//! idempotent — existence is probed with a benign SELECT, and
//! "already exists" responses from the host are classified by message and
//! swallowed, so running any of this twice is a no-op.

use tracing::{debug, info, warn};

use crate::engine::SqlExecutor;
use crate::{Error, Result};

// ============================================================================
// DDL
// ============================================================================

const CREATE_NODES: &str = "CREATE TABLE nodes (\
     node_id VARCHAR(256) NOT NULL, \
     CONSTRAINT pk_nodes PRIMARY KEY (node_id))";

const CREATE_LABELS: &str = "CREATE TABLE rdf_labels (\
     s VARCHAR(256) NOT NULL, \
     label VARCHAR(128) NOT NULL, \
     CONSTRAINT pk_rdf_labels PRIMARY KEY (s, label))";

const CREATE_PROPS: &str = "CREATE TABLE rdf_props (\
     s VARCHAR(256) NOT NULL, \
     key VARCHAR(128) NOT NULL, \
     val VARCHAR(4096) NOT NULL, \
     CONSTRAINT pk_rdf_props PRIMARY KEY (s, key, val))";

const CREATE_EDGES: &str = "CREATE TABLE rdf_edges (\
     id BIGINT IDENTITY, \
     s VARCHAR(256) NOT NULL, \
     p VARCHAR(128) NOT NULL, \
     o_id VARCHAR(256) NOT NULL, \
     qualifiers VARCHAR(8192), \
     CONSTRAINT pk_rdf_edges PRIMARY KEY (id), \
     CONSTRAINT uq_rdf_edges UNIQUE (s, p, o_id))";

const CREATE_DOCS: &str = "CREATE TABLE docs (\
     id VARCHAR(256) NOT NULL, \
     text VARCHAR(32000), \
     CONSTRAINT pk_docs PRIMARY KEY (id))";

/// Embeddings DDL depends on the deployment-wide vector dimension.
fn create_embeddings(dimension: usize) -> String {
    format!(
        "CREATE TABLE kg_NodeEmbeddings (\
         id VARCHAR(256) NOT NULL, \
         emb VECTOR(DOUBLE, {dimension}), \
         meta VARCHAR(8192), \
         CONSTRAINT pk_kg_NodeEmbeddings PRIMARY KEY (id))"
    )
}

/// B-tree indexes on the frequent join/filter keys, plus the text index on
/// the document corpus.
const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX idx_rdf_edges_s_p ON rdf_edges (s, p)",
    "CREATE INDEX idx_rdf_edges_p_o ON rdf_edges (p, o_id)",
    "CREATE INDEX idx_rdf_labels_label_s ON rdf_labels (label, s)",
    "CREATE INDEX idx_rdf_props_s_key ON rdf_props (s, key)",
    "CREATE INDEX idx_rdf_props_key_val ON rdf_props (key, val)",
    "CREATE INDEX idx_docs_text ON docs (text) AS TEXT",
];

/// ANN index serving KNN; its absence is only tolerated when the engine
/// explicitly opts into brute-force scans.
const CREATE_VECTOR_INDEX: &str = "CREATE INDEX idx_kg_NodeEmbeddings_emb \
     ON kg_NodeEmbeddings (emb) AS HNSW(Distance = 'Cosine')";

/// Expression index accelerating numeric property comparisons; created
/// only when the host's functional-index probe succeeds.
const CREATE_FUNCTIONAL_INDEXES: &[&str] =
    &["CREATE INDEX idx_rdf_props_val_num ON rdf_props (TRY_CAST(val AS DOUBLE))"];

/// Discovery of every node id referenced anywhere, in one pass.
const DISCOVER_NODE_IDS: &str = "\
    SELECT DISTINCT src.node_id FROM (\
     SELECT s AS node_id FROM rdf_labels \
     UNION SELECT s FROM rdf_props \
     UNION SELECT s FROM rdf_edges \
     UNION SELECT o_id FROM rdf_edges \
     UNION SELECT id FROM kg_NodeEmbeddings) src \
    WHERE src.node_id IS NOT NULL";

/// Dependent-table FK anchors, in the order they are added. Rollback walks
/// this list in reverse.
const FOREIGN_KEYS: &[(&str, &str, &str)] = &[
    ("rdf_labels", "fk_rdf_labels_s", "s"),
    ("rdf_props", "fk_rdf_props_s", "s"),
    ("rdf_edges", "fk_rdf_edges_s", "s"),
    ("rdf_edges", "fk_rdf_edges_o", "o_id"),
    ("kg_NodeEmbeddings", "fk_kg_NodeEmbeddings_id", "id"),
];

// ============================================================================
// Manager
// ============================================================================

/// Idempotent schema creation and the NodePK migration.
pub struct SchemaManager<'e, E> {
    exec: &'e E,
    embedding_dimension: usize,
    allow_missing_vector_index: bool,
}

impl<'e, E: SqlExecutor> SchemaManager<'e, E> {
    pub fn new(exec: &'e E, embedding_dimension: usize) -> Self {
        Self {
            exec,
            embedding_dimension,
            allow_missing_vector_index: false,
        }
    }

    /// Tolerate a host that cannot build the HNSW index; KNN then runs as
    /// a full scan. Off unless the engine's configuration enables it.
    pub fn allow_missing_vector_index(mut self, allow: bool) -> Self {
        self.allow_missing_vector_index = allow;
        self
    }

    /// Create the six tables and all indexes. Safe to run repeatedly.
    pub async fn ensure_schema(&self) -> Result<()> {
        let embeddings_ddl = create_embeddings(self.embedding_dimension);
        let tables: &[(&str, &str)] = &[
            ("nodes", CREATE_NODES),
            ("rdf_labels", CREATE_LABELS),
            ("rdf_props", CREATE_PROPS),
            ("rdf_edges", CREATE_EDGES),
            ("kg_NodeEmbeddings", &embeddings_ddl),
            ("docs", CREATE_DOCS),
        ];
        for (table, ddl) in tables {
            if !self.table_exists(table).await? {
                info!(table, "creating table");
                self.exec.execute(ddl, &[]).await?;
            }
        }
        for ddl in CREATE_INDEXES {
            if let Err(e) = self.exec.execute(ddl, &[]).await {
                if !benign_exists_error(&e) {
                    return Err(e);
                }
            }
        }
        if let Err(e) = self.exec.execute(CREATE_VECTOR_INDEX, &[]).await {
            if benign_exists_error(&e) {
                // fine, present already
            } else if self.allow_missing_vector_index {
                warn!(error = %e, "vector index unavailable; KNN will scan");
            } else {
                return Err(e);
            }
        }
        Ok(())
    }

    /// Expression indexes, added only after the engine's functional-index
    /// probe succeeds.
    pub async fn ensure_functional_indexes(&self) -> Result<()> {
        for ddl in CREATE_FUNCTIONAL_INDEXES {
            if let Err(e) = self.exec.execute(ddl, &[]).await {
                if !benign_exists_error(&e) {
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    /// Probe for a table with a benign SELECT; a host error means absent.
    pub async fn table_exists(&self, table: &str) -> Result<bool> {
        let table = crate::validate::whitelisted_table(table)?;
        let probe = format!("SELECT 1 FROM {table} WHERE 1 = 0");
        match self.exec.query(&probe, &[]).await {
            Ok(_) => Ok(true),
            Err(Error::Connection(msg)) => Err(Error::Connection(msg)),
            Err(e) => {
                debug!(table, error = %e, "table probe negative");
                Ok(false)
            }
        }
    }

    /// The NodePK migration.
    ///
    /// 1. Create `nodes` if missing.
    /// 2. Discover every node id referenced by labels, properties, edge
    ///    endpoints, or embeddings and insert the missing ones.
    /// 3. Validate that no referenced id is still absent — a leftover
    ///    orphan means the discovery union missed a corrupt row, and the
    ///    migration fails loudly rather than masking it.
    /// 4. Only then add the FK constraints (`ON DELETE RESTRICT`).
    pub async fn migrate_node_pk(&self) -> Result<()> {
        if !self.table_exists("nodes").await? {
            self.exec.execute(CREATE_NODES, &[]).await?;
        }

        let backfill = format!(
            "INSERT INTO nodes (node_id) {DISCOVER_NODE_IDS} \
             AND src.node_id NOT IN (SELECT node_id FROM nodes)"
        );
        let inserted = self.exec.execute(&backfill, &[]).await?;
        info!(inserted, "node identity backfill");

        let orphan_check = format!(
            "SELECT COUNT(*) FROM ({DISCOVER_NODE_IDS} \
             AND src.node_id NOT IN (SELECT node_id FROM nodes)) missing"
        );
        let rows = self.exec.query(&orphan_check, &[]).await?;
        let orphans = rows
            .first()
            .and_then(|row| row.first())
            .and_then(crate::model::Value::as_int)
            .unwrap_or(-1);
        if orphans != 0 {
            return Err(Error::Integrity(
                "node identity backfill left unreferenced ids; migration aborted".into(),
            ));
        }

        for (table, constraint, column) in FOREIGN_KEYS {
            let ddl = format!(
                "ALTER TABLE {table} ADD CONSTRAINT {constraint} \
                 FOREIGN KEY ({column}) REFERENCES nodes (node_id) ON DELETE RESTRICT"
            );
            if let Err(e) = self.exec.execute(&ddl, &[]).await {
                if !benign_exists_error(&e) {
                    return Err(e);
                }
            }
        }
        info!("node identity migration complete");
        Ok(())
    }

    /// Undo the NodePK migration: drop the FKs in reverse order, then the
    /// `nodes` table itself.
    pub async fn rollback_node_pk(&self) -> Result<()> {
        for (table, constraint, _) in FOREIGN_KEYS.iter().rev() {
            let ddl = format!("ALTER TABLE {table} DROP CONSTRAINT {constraint}");
            if let Err(e) = self.exec.execute(&ddl, &[]).await {
                if !benign_missing_error(&e) {
                    return Err(e);
                }
            }
        }
        if self.table_exists("nodes").await? {
            self.exec.execute("DROP TABLE nodes", &[]).await?;
        }
        info!("node identity migration rolled back");
        Ok(())
    }
}

// ============================================================================
// Host error classification
// ============================================================================

fn message_of(e: &Error) -> Option<&str> {
    match e {
        Error::Internal(msg) | Error::Integrity(msg) => Some(msg),
        _ => None,
    }
}

/// "Already exists" responses make repeated DDL a no-op.
fn benign_exists_error(e: &Error) -> bool {
    message_of(e).is_some_and(|msg| {
        let msg = msg.to_ascii_lowercase();
        msg.contains("already exists") || msg.contains("duplicate")
    })
}

/// "Does not exist" responses make repeated rollback a no-op.
fn benign_missing_error(e: &Error) -> bool {
    message_of(e).is_some_and(|msg| {
        let msg = msg.to_ascii_lowercase();
        msg.contains("does not exist") || msg.contains("not found")
    })
}
