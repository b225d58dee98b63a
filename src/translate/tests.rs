//! Translator tests: generated SQL text, parameter lists, result schemas.

use pretty_assertions::assert_eq;

use super::*;
use crate::cypher;
use crate::model::Params;

fn translate_str(query: &str, params: &Params, opts: &TranslateOptions) -> Result<Translation> {
    let ast = cypher::parse(query)?;
    translate(&ast, params, opts)
}

fn ok(query: &str) -> Translation {
    translate_str(query, &Params::new(), &TranslateOptions::default()).unwrap()
}

fn ok_with(query: &str, params: &Params) -> Translation {
    translate_str(query, params, &TranslateOptions::default()).unwrap()
}

fn vector_params() -> Params {
    let mut params = Params::new();
    params.insert("v".into(), Value::from(vec![1.0_f64, 0.0, 0.0]));
    params
}

// ============================================================================
// 1. Plain MATCH
// ============================================================================

#[test]
fn test_match_label_return_node() {
    let t = ok("MATCH (n:Protein) RETURN n");
    assert_eq!(
        t.sql,
        "WITH m0 AS (SELECT n0.node_id AS n FROM nodes n0 \
         WHERE EXISTS (SELECT 1 FROM rdf_labels l WHERE l.s = n0.node_id AND l.label = ?)) \
         SELECT q.n FROM m0 q"
    );
    assert_eq!(t.params, vec![Value::String("Protein".into())]);
    assert_eq!(t.columns.len(), 1);
    assert_eq!(t.columns[0].name, "n");
    assert_eq!(t.columns[0].kind, ColumnKind::NodeId);
}

#[test]
fn test_inline_property_filter() {
    let t = ok("MATCH (n:Gene {symbol: 'TP53'}) RETURN n.id");
    assert!(t.sql.contains(
        "EXISTS (SELECT 1 FROM rdf_props p WHERE p.s = n0.node_id AND p.key = ? AND p.val = ?)"
    ));
    assert_eq!(
        t.params,
        vec![
            Value::String("Gene".into()),
            Value::String("symbol".into()),
            Value::String("TP53".into()),
        ]
    );
}

#[test]
fn test_relationship_join() {
    let t = ok("MATCH (a:Gene)-[:PART_OF]->(b) RETURN a.id, b.id");
    assert_eq!(
        t.sql,
        "WITH m0 AS (SELECT n0.node_id AS a, n2.node_id AS b FROM nodes n0 \
         JOIN rdf_edges e1 ON e1.s = n0.node_id \
         JOIN nodes n2 ON n2.node_id = e1.o_id \
         WHERE EXISTS (SELECT 1 FROM rdf_labels l WHERE l.s = n0.node_id AND l.label = ?) \
         AND e1.p = ?) \
         SELECT q.a, q.b FROM m0 q"
    );
    assert_eq!(
        t.params,
        vec![Value::String("Gene".into()), Value::String("PART_OF".into())]
    );
}

#[test]
fn test_type_alternation_binds_each_type() {
    let t = ok("MATCH (a)-[r:PART_OF|CAUSED_BY]->(b) RETURN type(r)");
    assert!(t.sql.contains("e1.p IN (?, ?)"));
    assert!(t.params.contains(&Value::String("PART_OF".into())));
    assert!(t.params.contains(&Value::String("CAUSED_BY".into())));
    assert!(t.sql.contains("SELECT q.r__p FROM"));
}

#[test]
fn test_undirected_relationship() {
    let t = ok("MATCH (a)-[:KNOWS]-(b) RETURN b");
    assert!(t.sql.contains("e1.s = n0.node_id OR e1.o_id = n0.node_id"));
    assert!(t.sql.contains("CASE WHEN e1.s = n0.node_id THEN e1.o_id ELSE e1.s END"));
}

#[test]
fn test_left_direction_swaps_endpoints() {
    let t = ok("MATCH (a)<-[:REGULATES]-(b) RETURN b");
    assert!(t.sql.contains("ON e1.o_id = n0.node_id"));
    assert!(t.sql.contains("n2.node_id = e1.s"));
}

// ============================================================================
// 2. Procedure rewrite
// ============================================================================

#[test]
fn test_vector_search_cte() {
    let t = ok_with(
        "CALL ivg.vector.search('Protein', 'embedding', $v, 2) \
         YIELD node, score RETURN node.id, score",
        &vector_params(),
    );
    assert_eq!(
        t.sql,
        "WITH VecSearch AS (SELECT TOP ? n.node_id AS node, \
         VECTOR_COSINE(e.emb, TO_VECTOR(?)) AS score \
         FROM nodes n \
         JOIN rdf_labels l ON l.s = n.node_id \
         JOIN kg_NodeEmbeddings e ON e.id = n.node_id \
         WHERE l.label = ? ORDER BY score DESC) \
         SELECT q.node, q.score FROM VecSearch q ORDER BY q.score DESC"
    );
    assert_eq!(
        t.params,
        vec![
            Value::Int(2),
            Value::String("[1.0,0.0,0.0]".into()),
            Value::String("Protein".into()),
        ]
    );
    assert_eq!(t.columns[0].name, "node.id");
    assert_eq!(t.columns[0].kind, ColumnKind::Scalar);
    assert_eq!(t.columns[1].name, "score");
}

#[test]
fn test_vector_search_composes_with_match() {
    let t = ok_with(
        "CALL ivg.vector.search('Protein', 'embedding', $v, 5) YIELD node, score \
         MATCH (node)-[:INTERACTS]->(p) RETURN node.id, p.id",
        &vector_params(),
    );
    assert_eq!(
        t.sql,
        "WITH VecSearch AS (SELECT TOP ? n.node_id AS node, \
         VECTOR_COSINE(e.emb, TO_VECTOR(?)) AS score \
         FROM nodes n \
         JOIN rdf_labels l ON l.s = n.node_id \
         JOIN kg_NodeEmbeddings e ON e.id = n.node_id \
         WHERE l.label = ? ORDER BY score DESC), \
         m1 AS (SELECT prev.node, prev.score, n1.node_id AS p FROM VecSearch prev \
         JOIN rdf_edges e0 ON e0.s = prev.node \
         JOIN nodes n1 ON n1.node_id = e0.o_id \
         WHERE e0.p = ?) \
         SELECT q.node, q.p FROM m1 q ORDER BY q.score DESC"
    );
    assert_eq!(
        t.params,
        vec![
            Value::Int(5),
            Value::String("[1.0,0.0,0.0]".into()),
            Value::String("Protein".into()),
            Value::String("INTERACTS".into()),
        ]
    );
}

#[test]
fn test_dot_product_option() {
    let t = ok_with(
        "CALL ivg.vector.search('Protein', 'embedding', $v, 5, \
         {similarity: 'dot_product'}) YIELD node, score RETURN node, score",
        &vector_params(),
    );
    assert!(t.sql.contains("VECTOR_DOT_PRODUCT(e.emb, TO_VECTOR(?))"));
    assert_eq!(t.columns[0].kind, ColumnKind::NodeId);
}

#[test]
fn test_invalid_similarity_lists_valid_values() {
    let err = translate_str(
        "CALL ivg.vector.search('Protein', 'embedding', $v, 5, \
         {similarity: 'euclidean'}) YIELD node, score RETURN node",
        &vector_params(),
        &TranslateOptions::default(),
    )
    .unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("cosine") && msg.contains("dot_product"));
}

#[test]
fn test_unknown_procedure_rejected() {
    let err = translate_str(
        "CALL apoc.path.expand('x') YIELD node RETURN node",
        &Params::new(),
        &TranslateOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::Unsupported(_)));
}

#[test]
fn test_text_input_requires_probe_and_config() {
    let mut params = Params::new();
    params.insert("q".into(), Value::from("tumor suppressor"));

    // No embedding_config at all → validation error
    let err = translate_str(
        "CALL ivg.vector.search('Protein', 'embedding', $q, 5) \
         YIELD node, score RETURN node",
        &params,
        &TranslateOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    // Config present but host lacks EMBEDDING() → unsupported
    let opts = TranslateOptions {
        embedding_available: Some(false),
        default_embedding_config: Some("my-config".into()),
        ..TranslateOptions::default()
    };
    let err = translate_str(
        "CALL ivg.vector.search('Protein', 'embedding', $q, 5) \
         YIELD node, score RETURN node",
        &params,
        &opts,
    )
    .unwrap_err();
    assert!(matches!(err, Error::Unsupported(_)));

    // Both present → EMBEDDING(?, ?) path
    let opts = TranslateOptions {
        embedding_available: Some(true),
        default_embedding_config: Some("my-config".into()),
        ..TranslateOptions::default()
    };
    let t = translate_str(
        "CALL ivg.vector.search('Protein', 'embedding', $q, 5) \
         YIELD node, score RETURN node",
        &params,
        &opts,
    )
    .unwrap();
    assert!(t.sql.contains("EMBEDDING(?, ?)"));
    assert!(t.params.contains(&Value::String("tumor suppressor".into())));
    assert!(t.params.contains(&Value::String("my-config".into())));
}

#[test]
fn test_k_injection_string_raises() {
    let mut params = vector_params();
    params.insert("k".into(), Value::from("10; DROP TABLE nodes;--"));
    let err = translate_str(
        "CALL ivg.vector.search('Protein', 'embedding', $v, $k) \
         YIELD node, score RETURN node",
        &params,
        &TranslateOptions::default(),
    )
    .unwrap_err();
    assert_eq!(err.to_string(), "Validation error: k must be a positive integer");
}

#[test]
fn test_k_numeric_string_coerces() {
    let mut params = vector_params();
    params.insert("k".into(), Value::from("7"));
    let t = ok_with(
        "CALL ivg.vector.search('Protein', 'embedding', $v, $k) \
         YIELD node, score RETURN node",
        &params,
    );
    assert_eq!(t.params[0], Value::Int(7));
}

#[test]
fn test_k_clamped_to_max() {
    let t = ok_with(
        "CALL ivg.vector.search('Protein', 'embedding', $v, 99999) \
         YIELD node, score RETURN node",
        &vector_params(),
    );
    assert_eq!(t.params[0], Value::Int(1000));
}

// ============================================================================
// 3. WHERE lowering
// ============================================================================

#[test]
fn test_numeric_comparison_uses_safe_cast() {
    let t = ok("MATCH (n:Protein) WHERE n.mass > 30 RETURN n.name");
    assert_eq!(
        t.sql,
        "WITH m0 AS (SELECT n0.node_id AS n FROM nodes n0 \
         WHERE EXISTS (SELECT 1 FROM rdf_labels l WHERE l.s = n0.node_id AND l.label = ?)) \
         SELECT (SELECT p.val FROM rdf_props p WHERE p.s = q.n AND p.key = ?) FROM m0 q \
         WHERE EXISTS (SELECT 1 FROM rdf_props p WHERE p.s = q.n AND p.key = ? \
         AND TRY_CAST(p.val AS DOUBLE) > TRY_CAST(? AS DOUBLE))"
    );
    assert_eq!(
        t.params,
        vec![
            Value::String("Protein".into()),
            Value::String("name".into()),
            Value::String("mass".into()),
            Value::Int(30),
        ]
    );
    assert_eq!(t.columns[0].name, "n.name");
}

#[test]
fn test_equality_binds_stringified_value() {
    let t = ok("MATCH (n) WHERE n.count = 42 RETURN n");
    assert!(t.sql.contains("AND p.val = ?"));
    assert!(t.params.contains(&Value::String("42".into())));
}

#[test]
fn test_string_predicates_escape_wildcards() {
    let t = ok("MATCH (n) WHERE n.name CONTAINS '50%' RETURN n");
    assert!(t.sql.contains("p.val LIKE ? ESCAPE '\\'"));
    assert!(t.params.contains(&Value::String("%50\\%%".into())));

    let t = ok("MATCH (n) WHERE n.name STARTS WITH 'TP' RETURN n");
    assert!(t.params.contains(&Value::String("TP%".into())));

    let t = ok("MATCH (n) WHERE n.name ENDS WITH '53' RETURN n");
    assert!(t.params.contains(&Value::String("%53".into())));
}

#[test]
fn test_boolean_connectives_parenthesize() {
    let t = ok("MATCH (n) WHERE NOT (n.a = '1' OR n.b = '2') RETURN n");
    assert!(t.sql.contains("NOT (("));
    assert!(t.sql.contains(" OR "));
}

#[test]
fn test_where_on_yielded_score() {
    let t = ok_with(
        "CALL ivg.vector.search('Protein', 'embedding', $v, 10) YIELD node, score \
         MATCH (node)-[:INTERACTS]->(p) WHERE score >= 0.5 RETURN p",
        &vector_params(),
    );
    assert!(t.sql.contains("WHERE q.score >= TRY_CAST(? AS DOUBLE)"));
}

#[test]
fn test_unknown_variable_in_where() {
    let err = translate_str(
        "MATCH (n) WHERE m.x = '1' RETURN n",
        &Params::new(),
        &TranslateOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}

// ============================================================================
// 4. RETURN projection
// ============================================================================

#[test]
fn test_labels_and_properties_subqueries() {
    let t = ok("MATCH (n:Protein) RETURN labels(n) AS ls, properties(n) AS ps");
    assert!(t.sql.contains("(SELECT JSON_ARRAYAGG(l.label) FROM rdf_labels l WHERE l.s = q.n)"));
    assert!(t.sql.contains(
        "(SELECT JSON_ARRAYAGG(JSON_OBJECT('k' : p.key, 'v' : p.val)) \
         FROM rdf_props p WHERE p.s = q.n)"
    ));
    assert_eq!(t.columns[0].name, "ls");
    assert_eq!(t.columns[0].kind, ColumnKind::Labels);
    assert_eq!(t.columns[1].name, "ps");
    assert_eq!(t.columns[1].kind, ColumnKind::Properties);
}

#[test]
fn test_return_edge_projects_five_columns() {
    let t = ok("MATCH (a)-[r:INTERACTS]->(b) RETURN r");
    assert!(t.sql.contains("SELECT q.r__id, q.r__s, q.r__p, q.r__o, q.r__q FROM"));
    assert_eq!(t.columns[0].kind, ColumnKind::Edge);
    assert_eq!(t.columns[0].kind.arity(), 5);
}

#[test]
fn test_edge_qualifier_access_via_json() {
    let t = ok("MATCH (a)-[r:INTERACTS]->(b) WHERE r.weight > 0.5 RETURN r.weight");
    assert!(t.sql.contains("JSON_VALUE(q.r__q, ?)"));
    assert!(t.params.contains(&Value::String("$.weight".into())));
}

#[test]
fn test_count_groups_other_items() {
    let t = ok("MATCH (n:Protein)-[:INTERACTS]->(m) RETURN n.id, count(*) AS degree");
    assert!(t.sql.contains("COUNT(*)"));
    assert!(t.sql.contains("GROUP BY q.n"));
    assert_eq!(t.columns[1].name, "degree");
}

// ============================================================================
// 5. Ordering and limits
// ============================================================================

#[test]
fn test_order_by_property_numeric_then_lexical_nulls_last() {
    let t = ok("MATCH (n) RETURN n ORDER BY n.mass DESC");
    let subquery = "(SELECT p.val FROM rdf_props p WHERE p.s = q.n AND p.key = ?)";
    let expected = format!(
        "ORDER BY CASE WHEN {subquery} IS NULL THEN 1 ELSE 0 END, \
         TRY_CAST({subquery} AS DOUBLE) DESC, {subquery} DESC"
    );
    assert!(t.sql.contains(&expected));
    // the sort key binds its property name three times
    assert_eq!(t.params.iter().filter(|p| **p == Value::String("mass".into())).count(), 3);
}

#[test]
fn test_limit_and_skip_bind() {
    let t = ok("MATCH (n) RETURN n SKIP 5 LIMIT 10");
    assert!(t.sql.ends_with("LIMIT ? OFFSET ?"));
    assert_eq!(t.params, vec![Value::Int(10), Value::Int(5)]);
}

#[test]
fn test_limit_clamps() {
    let t = ok("MATCH (n) RETURN n LIMIT 100000");
    assert_eq!(t.params, vec![Value::Int(1000)]);
}

// ============================================================================
// 6. Variable-length patterns
// ============================================================================

#[test]
fn test_var_length_recursive_cte() {
    let t = ok("MATCH (a:Gene)-[:PART_OF*1..2]->(b) RETURN b.id");
    assert!(t.sql.starts_with("WITH RECURSIVE "));
    assert!(t.sql.contains(
        "w1 AS (SELECT a, a AS hop_node, 0 AS hop_depth FROM m0 \
         UNION ALL SELECT r.a, e.o_id, r.hop_depth + 1 FROM w1 r \
         JOIN rdf_edges e ON e.s = r.hop_node AND e.p = ? WHERE r.hop_depth < ?)"
    ));
    assert!(t.sql.contains(
        "m2 AS (SELECT DISTINCT r.a, r.hop_node AS b FROM w1 r WHERE r.hop_depth >= ?)"
    ));
    assert!(t.sql.ends_with("SELECT q.b FROM m2 q"));
    assert_eq!(
        t.params,
        vec![
            Value::String("Gene".into()),
            Value::String("PART_OF".into()),
            Value::Int(2),
            Value::Int(1),
        ]
    );
}

#[test]
fn test_var_length_open_bound_defaults_to_max() {
    let t = ok("MATCH (a)-[:PART_OF*]->(b) RETURN b");
    // default traversal maximum of 5 bounds the walk
    assert!(t.params.contains(&Value::Int(5)));
}

#[test]
fn test_var_length_beyond_max_rejected() {
    let err = translate_str(
        "MATCH (a)-[:PART_OF*1..9]->(b) RETURN b",
        &Params::new(),
        &TranslateOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}

// ============================================================================
// 7. Global properties
// ============================================================================

#[test]
fn test_translation_is_deterministic() {
    let params = vector_params();
    let query = "CALL ivg.vector.search('Protein', 'embedding', $v, 5) YIELD node, score \
                 MATCH (node)-[:INTERACTS]->(p) WHERE p.name CONTAINS 'kinase' \
                 RETURN node.id, p.id, score ORDER BY score DESC LIMIT 10";
    let a = ok_with(query, &params);
    let b = ok_with(query, &params);
    assert_eq!(a.sql, b.sql);
    assert_eq!(a.params, b.params);
}

#[test]
fn test_placeholders_always_match_params() {
    let params = vector_params();
    let queries = [
        "MATCH (n:Protein) RETURN n",
        "MATCH (n:Gene {symbol: 'TP53'})-[:PART_OF|CAUSED_BY]->(b) \
         WHERE b.name STARTS WITH 'x' RETURN b, labels(b) ORDER BY b.name LIMIT 3",
        "CALL ivg.vector.search('Protein', 'embedding', $v, 5) YIELD node, score \
         MATCH (node)-[r:INTERACTS]->(p) RETURN node.id, type(r), score",
        "MATCH (a)-[:PART_OF*2..3]->(b) RETURN b.id",
    ];
    for query in queries {
        let t = ok_with(query, &params);
        assert_eq!(
            t.sql.matches('?').count(),
            t.params.len(),
            "placeholder mismatch for: {query}"
        );
    }
}

#[test]
fn test_missing_parameter_raises_before_sql() {
    let err = translate_str(
        "MATCH (n {name: $missing}) RETURN n",
        &Params::new(),
        &TranslateOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert!(err.to_string().contains("$missing"));
}
