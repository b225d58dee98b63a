//! End-to-end tests for the Cypher pipeline: parse → translate → execute →
//! hydrate, driven through a scripted executor.

#[macro_use]
mod common;

use common::FakeExecutor;
use vgraph::{Engine, EngineConfig, Error, Node, Params, Value};

fn engine_3d(exec: FakeExecutor) -> Engine<FakeExecutor> {
    let cfg = EngineConfig {
        embedding_dimension: 3,
        ..EngineConfig::default()
    };
    Engine::new(exec, cfg)
}

fn vector_params() -> Params {
    let mut params = Params::new();
    params.insert("v".into(), Value::from(vec![1.0_f64, 0.0, 0.0]));
    params
}

// ============================================================================
// 1. MATCH query, hydrated node
// ============================================================================

#[tokio::test]
async fn test_match_hydrates_node() {
    let exec = FakeExecutor::new();
    // main statement → one node id
    exec.push_rows(vec![row!["TP53"]]);
    // hydrator batch lookups: labels, then properties
    exec.push_rows(vec![row!["TP53", "Gene"], row!["TP53", "Protein"]]);
    exec.push_rows(vec![row!["TP53", "name", "p53"]]);

    let engine = engine_3d(exec);
    let result = engine
        .execute_cypher("MATCH (n:Gene) RETURN n", Params::new())
        .await
        .unwrap();

    assert_eq!(result.columns, vec!["n"]);
    assert_eq!(result.rows.len(), 1);
    let node: Node = result.rows[0].get("n").unwrap();
    assert_eq!(node.id, "TP53");
    assert!(node.has_label("Gene"));
    assert!(node.has_label("Protein"));
    assert_eq!(node.get("name"), Some("p53"));

    // parse/translate never interpolated: the label rode as a parameter
    let statements = engine.executor().statements();
    assert!(statements[0].0.starts_with("WITH m0 AS ("));
    assert!(statements[0].1.contains(&Value::String("Gene".into())));
}

// ============================================================================
// 2. Parameterised KNN through CALL
// ============================================================================

#[tokio::test]
async fn test_vector_search_rows_in_score_order() {
    let exec = FakeExecutor::new();
    exec.push_rows(vec![row!["A", 1.0], row!["B", 0.9937]]);

    let engine = engine_3d(exec);
    let result = engine
        .execute_cypher(
            "CALL ivg.vector.search('Protein', 'embedding', $v, 2) \
             YIELD node, score RETURN node.id, score",
            vector_params(),
        )
        .await
        .unwrap();

    assert_eq!(result.columns, vec!["node.id", "score"]);
    assert_eq!(result.rows.len(), 2);
    assert_eq!(result.rows[0].get::<String>("node.id").unwrap(), "A");
    assert!((result.rows[0].get::<f64>("score").unwrap() - 1.0).abs() < 1e-9);
    assert_eq!(result.rows[1].get::<String>("node.id").unwrap(), "B");
    assert!((result.rows[1].get::<f64>("score").unwrap() - 0.9937).abs() < 1e-9);

    let statements = engine.executor().statements();
    assert_eq!(statements.len(), 1, "scalar projection needs no hydration round-trips");
    assert_eq!(statements[0].1.len(), 3); // k, vector, label
}

// ============================================================================
// 3. CALL composed with MATCH
// ============================================================================

#[tokio::test]
async fn test_vector_search_composed_with_match() {
    let exec = FakeExecutor::new();
    exec.push_rows(vec![row!["A", "X"], row!["B", "Y"]]);

    let engine = engine_3d(exec);
    let result = engine
        .execute_cypher(
            "CALL ivg.vector.search('Protein', 'embedding', $v, 2) YIELD node, score \
             MATCH (node)-[:INTERACTS]->(p) RETURN node.id, p.id",
            vector_params(),
        )
        .await
        .unwrap();

    let pairs: Vec<(String, String)> = result
        .rows
        .iter()
        .map(|row| {
            (
                row.get::<String>("node.id").unwrap(),
                row.get::<String>("p.id").unwrap(),
            )
        })
        .collect();
    assert_eq!(pairs, vec![("A".into(), "X".into()), ("B".into(), "Y".into())]);

    // one statement end-to-end: the CALL became a CTE, not a second query
    let statements = engine.executor().statements();
    assert_eq!(statements.len(), 1);
    assert!(statements[0].0.contains("VecSearch"));
    assert!(statements[0].0.contains("ORDER BY q.score DESC"));
}

// ============================================================================
// 4. labels()/properties() hydration from JSON
// ============================================================================

#[tokio::test]
async fn test_json_projections_parse() {
    let exec = FakeExecutor::new();
    exec.push_rows(vec![row![
        r#"["Gene","Protein"]"#,
        r#"[{"k":"name","v":"p53"},{"k":"chrom","v":"17"}]"#
    ]]);

    let engine = engine_3d(exec);
    let result = engine
        .execute_cypher("MATCH (n:Gene) RETURN labels(n), properties(n)", Params::new())
        .await
        .unwrap();

    let labels: Vec<Value> = result.rows[0].get("labels(n)").unwrap();
    assert_eq!(
        labels,
        vec![Value::String("Gene".into()), Value::String("Protein".into())]
    );
    let props: std::collections::HashMap<String, Value> =
        result.rows[0].get("properties(n)").unwrap();
    assert_eq!(props.get("name"), Some(&Value::String("p53".into())));
    assert_eq!(props.get("chrom"), Some(&Value::String("17".into())));
}

#[tokio::test]
async fn test_empty_labels_and_properties_hydrate_empty() {
    let exec = FakeExecutor::new();
    exec.push_rows(vec![vec![Value::Null, Value::Null]]);

    let engine = engine_3d(exec);
    let result = engine
        .execute_cypher("MATCH (n) RETURN labels(n), properties(n)", Params::new())
        .await
        .unwrap();

    assert_eq!(
        result.rows[0].get::<Vec<Value>>("labels(n)").unwrap(),
        Vec::<Value>::new()
    );
    assert!(result.rows[0]
        .get::<std::collections::HashMap<String, Value>>("properties(n)")
        .unwrap()
        .is_empty());
}

// ============================================================================
// 5. Errors surface before SQL
// ============================================================================

#[tokio::test]
async fn test_parse_error_before_any_sql() {
    let exec = FakeExecutor::new();
    let engine = engine_3d(exec);
    let err = engine
        .execute_cypher("MATCH (n RETURN n", Params::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Syntax { .. }));
    assert!(engine.executor().statements().is_empty());
}

#[tokio::test]
async fn test_write_clause_rejected() {
    let exec = FakeExecutor::new();
    let engine = engine_3d(exec);
    let err = engine
        .execute_cypher("CREATE (n:Person) RETURN n", Params::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Unsupported(_)));
    assert!(engine.executor().statements().is_empty());
}

#[tokio::test]
async fn test_dimension_mismatch_rejected_before_sql() {
    let exec = FakeExecutor::new();
    let engine = engine_3d(exec);
    let mut params = Params::new();
    params.insert("v".into(), Value::from(vec![1.0_f64, 0.0])); // 2-d into a 3-d deployment
    let err = engine
        .execute_cypher(
            "CALL ivg.vector.search('Protein', 'embedding', $v, 2) \
             YIELD node, score RETURN node",
            params,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Dimension { expected: 3, got: 2 }));
    assert!(engine.executor().statements().is_empty());
}

// ============================================================================
// 6. Deadlines
// ============================================================================

#[tokio::test]
async fn test_statement_timeout_surfaces_timeout_kind() {
    let exec = FakeExecutor::new();
    exec.set_delay_ms(200);
    let cfg = EngineConfig {
        embedding_dimension: 3,
        statement_timeout_ms: Some(10),
        ..EngineConfig::default()
    };
    let engine = Engine::new(exec, cfg);
    let err = engine
        .execute_cypher("MATCH (n) RETURN n", Params::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Timeout));
}

// ============================================================================
// 7. Capability probe caching
// ============================================================================

#[tokio::test]
async fn test_embedding_probe_runs_once() {
    let exec = FakeExecutor::new();
    exec.push_fail(Error::Internal("EMBEDDING function not found".into()));

    let engine = engine_3d(exec);
    assert!(!engine.embedding_available().await.unwrap());
    assert!(!engine.embedding_available().await.unwrap());

    let probes = engine
        .executor()
        .statements()
        .iter()
        .filter(|(stmt, _)| stmt.contains("EMBEDDING"))
        .count();
    assert_eq!(probes, 1);
}

#[tokio::test]
async fn test_connection_error_not_cached_as_missing_capability() {
    let exec = FakeExecutor::new();
    exec.push_fail(Error::Connection("host unreachable".into()));
    exec.push_rows(vec![row![0.0]]);

    let engine = engine_3d(exec);
    assert!(matches!(
        engine.embedding_available().await,
        Err(Error::Connection(_))
    ));
    // next attempt re-probes and succeeds
    assert!(engine.embedding_available().await.unwrap());
}
