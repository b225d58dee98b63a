//! # vgraph — Knowledge-Graph Query Layer over SQL
//!
//! An RDF-style property graph (nodes, labels, string properties, directed
//! typed edges, per-node embeddings) stored in plain SQL tables, queried
//! through Cypher. Queries are lowered to a single parameterised SQL
//! statement — a chain of CTEs — and executed by the host database, which
//! supplies the vector (HNSW) and text (BM25) indexes.
//!
//! ## Design Principles
//!
//! 1. **Trait-first**: `SqlExecutor` is the contract between the engine and
//!    any database driver
//! 2. **Clean DTOs**: `Node`, `Edge`, `Value` cross all boundaries
//! 3. **Parser owns nothing**: Cypher → AST is a pure function
//! 4. **Nothing interpolated**: every caller-supplied value is bound; SQL
//!    text only ever contains whitelisted identifiers
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use vgraph::{Engine, EngineConfig, Params, Value};
//!
//! # async fn example<E: vgraph::SqlExecutor>(executor: E) -> vgraph::Result<()> {
//! let engine = Engine::new(executor, EngineConfig::default());
//!
//! let mut params = Params::new();
//! params.insert("v".into(), Value::from(vec![1.0_f64, 0.0, 0.0]));
//! let result = engine.execute_cypher(
//!     "CALL ivg.vector.search('Protein', 'embedding', $v, 10) \
//!      YIELD node, score RETURN node.id, score",
//!     params,
//! ).await?;
//!
//! for row in &result.rows {
//!     println!("{:?}", row.get_value("node.id"));
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Pipeline
//!
//! ```text
//! Cypher text → Lexer → Parser → AST → Translator → (SQL, params) → DB → Hydrator → rows
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod cypher;
pub mod sql;
pub mod validate;
pub mod schema;
pub mod translate;
pub mod ops;
pub mod engine;

// ============================================================================
// Re-exports: Model (the DTOs)
// ============================================================================

pub use model::{Node, Edge, Value, PropertyMap, Params};

// ============================================================================
// Re-exports: Engine
// ============================================================================

pub use engine::{Engine, EngineConfig, SqlExecutor, SqlRow, QueryResult, ResultRow};

// ============================================================================
// Re-exports: Operators and schema
// ============================================================================

pub use ops::{FusedHit, Step, TextHit, VectorHit};
pub use schema::SchemaManager;

// ============================================================================
// Re-exports: Translation
// ============================================================================

pub use translate::{Translation, OutputColumn, ColumnKind};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Cypher syntax error at position {position}: {message}")]
    Syntax { position: usize, message: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Integrity error: {0}")]
    Integrity(String),

    #[error("Vector dimension mismatch: expected {expected}, got {got}")]
    Dimension { expected: usize, got: usize },

    #[error("Deadline exceeded")]
    Timeout,

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;
