//! Hydration: raw SQL rows → node/edge values.
//!
//! Driven entirely by the translator's result schema. Node ids are looked
//! up in batches (`IN (…)` over `rdf_labels` and `rdf_props`); JSON arrays
//! produced by correlated subqueries are parsed in-process.

use std::collections::HashMap;

use crate::model::{Edge, Node, PropertyMap, Value};
use crate::sql::{self, SqlBuilder};
use crate::translate::{ColumnKind, OutputColumn};
use crate::{Error, Result};

use super::{QueryResult, ResultRow, SqlExecutor, SqlRow};

/// Ids per `IN (…)` batch lookup.
const LOOKUP_BATCH: usize = 500;

/// Hydrate raw rows into a `QueryResult` following the result schema.
pub(crate) async fn hydrate<E: SqlExecutor>(
    exec: &E,
    columns: &[OutputColumn],
    raw_rows: Vec<SqlRow>,
) -> Result<QueryResult> {
    // Pass 1: collect every node id that needs label/property lookup.
    let mut ids: Vec<String> = Vec::new();
    for row in &raw_rows {
        let mut offset = 0;
        for col in columns {
            if col.kind == ColumnKind::NodeId {
                if let Some(Value::String(id)) = row.get(offset) {
                    ids.push(id.clone());
                }
            }
            offset += col.kind.arity();
        }
    }
    ids.sort();
    ids.dedup();
    let (labels, props) = fetch_labels_and_props(exec, &ids).await?;

    // Pass 2: assemble rows in declared column order.
    let mut rows = Vec::with_capacity(raw_rows.len());
    for raw in &raw_rows {
        let mut values = Vec::with_capacity(columns.len());
        let mut offset = 0;
        for col in columns {
            let value = match col.kind {
                ColumnKind::Scalar => raw.get(offset).cloned().unwrap_or(Value::Null),
                ColumnKind::NodeId => match raw.get(offset) {
                    Some(Value::String(id)) => {
                        Value::Node(Box::new(assemble_node(id, &labels, &props)))
                    }
                    _ => Value::Null,
                },
                ColumnKind::Labels => parse_labels(raw.get(offset))?,
                ColumnKind::Properties => parse_properties(raw.get(offset))?,
                ColumnKind::Edge => assemble_edge(raw, offset)?,
            };
            values.push((col.name.clone(), value));
            offset += col.kind.arity();
        }
        rows.push(ResultRow { values });
    }

    Ok(QueryResult {
        columns: columns.iter().map(|c| c.name.clone()).collect(),
        rows,
    })
}

/// Batch lookup of nodes by id. The result aligns with the input: ids not
/// present in the identity table come back as `None`; present nodes with
/// no labels or properties come back empty.
pub(crate) async fn load_nodes<E: SqlExecutor>(
    exec: &E,
    ids: &[String],
) -> Result<Vec<Option<Node>>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let mut unique: Vec<String> = ids.to_vec();
    unique.sort();
    unique.dedup();

    let mut existing: HashMap<String, bool> = HashMap::new();
    for chunk in unique.chunks(LOOKUP_BATCH) {
        let mut b = SqlBuilder::new();
        b.push("SELECT node_id FROM ").push(sql::T_NODES).push(" WHERE node_id IN (");
        bind_ids(&mut b, chunk);
        b.push(")");
        let (stmt, params) = b.finish();
        for row in exec.query(&stmt, &params).await? {
            if let Some(Value::String(id)) = row.first() {
                existing.insert(id.clone(), true);
            }
        }
    }

    let (labels, props) = fetch_labels_and_props(exec, &unique).await?;
    Ok(ids
        .iter()
        .map(|id| {
            existing
                .contains_key(id)
                .then(|| assemble_node(id, &labels, &props))
        })
        .collect())
}

// ============================================================================
// Internals
// ============================================================================

type LabelMap = HashMap<String, Vec<String>>;
type PropMap = HashMap<String, PropertyMap>;

async fn fetch_labels_and_props<E: SqlExecutor>(
    exec: &E,
    ids: &[String],
) -> Result<(LabelMap, PropMap)> {
    let mut labels: LabelMap = HashMap::new();
    let mut props: PropMap = HashMap::new();
    for chunk in ids.chunks(LOOKUP_BATCH) {
        if chunk.is_empty() {
            continue;
        }

        let mut b = SqlBuilder::new();
        b.push("SELECT s, label FROM ").push(sql::T_LABELS).push(" WHERE s IN (");
        bind_ids(&mut b, chunk);
        b.push(") ORDER BY s, label");
        let (stmt, params) = b.finish();
        for row in exec.query(&stmt, &params).await? {
            if let (Some(Value::String(s)), Some(Value::String(label))) =
                (row.first(), row.get(1))
            {
                labels.entry(s.clone()).or_default().push(label.clone());
            }
        }

        let mut b = SqlBuilder::new();
        b.push("SELECT s, key, val FROM ").push(sql::T_PROPS).push(" WHERE s IN (");
        bind_ids(&mut b, chunk);
        b.push(") ORDER BY s, key");
        let (stmt, params) = b.finish();
        for row in exec.query(&stmt, &params).await? {
            if let (Some(Value::String(s)), Some(Value::String(key)), Some(Value::String(val))) =
                (row.first(), row.get(1), row.get(2))
            {
                props.entry(s.clone()).or_default().insert(key.clone(), val.clone());
            }
        }
    }
    Ok((labels, props))
}

fn bind_ids(b: &mut SqlBuilder, ids: &[String]) {
    for (i, id) in ids.iter().enumerate() {
        if i > 0 {
            b.push(", ");
        }
        b.bind(Value::from(id.as_str()));
    }
}

fn assemble_node(id: &str, labels: &LabelMap, props: &PropMap) -> Node {
    Node {
        id: id.to_string(),
        labels: labels.get(id).map(|ls| ls.iter().cloned().collect()).unwrap_or_default(),
        properties: props.get(id).cloned().unwrap_or_default(),
    }
}

/// `labels(n)` arrives as a JSON array of strings; a node with no labels
/// arrives as SQL NULL and hydrates to `[]`.
fn parse_labels(raw: Option<&Value>) -> Result<Value> {
    match raw {
        None | Some(Value::Null) => Ok(Value::List(Vec::new())),
        Some(Value::String(json)) => {
            let parsed: Vec<String> = serde_json::from_str(json)
                .map_err(|e| Error::Internal(format!("malformed label array: {e}")))?;
            Ok(Value::List(parsed.into_iter().map(Value::String).collect()))
        }
        Some(other) => Err(Error::Internal(format!(
            "expected a JSON label array, got {}",
            other.type_name()
        ))),
    }
}

/// `properties(n)` arrives as a JSON array of `{k, v}` objects and
/// hydrates to a map; no properties hydrates to `{}`.
fn parse_properties(raw: Option<&Value>) -> Result<Value> {
    #[derive(serde::Deserialize)]
    struct Pair {
        k: String,
        v: String,
    }

    match raw {
        None | Some(Value::Null) => Ok(Value::Map(HashMap::new())),
        Some(Value::String(json)) => {
            let parsed: Vec<Pair> = serde_json::from_str(json)
                .map_err(|e| Error::Internal(format!("malformed property array: {e}")))?;
            Ok(Value::Map(
                parsed.into_iter().map(|p| (p.k, Value::String(p.v))).collect(),
            ))
        }
        Some(other) => Err(Error::Internal(format!(
            "expected a JSON property array, got {}",
            other.type_name()
        ))),
    }
}

/// An edge occupies five raw columns: `id, s, p, o_id, qualifiers`.
fn assemble_edge(row: &[Value], offset: usize) -> Result<Value> {
    let id = match row.get(offset) {
        Some(Value::Null) | None => return Ok(Value::Null),
        Some(v) => v
            .as_int()
            .ok_or_else(|| Error::Internal("edge id is not an integer".into()))?,
    };
    let source = match row.get(offset + 1) {
        Some(Value::String(s)) => s.clone(),
        _ => return Err(Error::Internal("edge source is not a string".into())),
    };
    let predicate = match row.get(offset + 2) {
        Some(Value::String(s)) => s.clone(),
        _ => return Err(Error::Internal("edge predicate is not a string".into())),
    };
    let target = match row.get(offset + 3) {
        Some(Value::String(s)) => s.clone(),
        _ => return Err(Error::Internal("edge target is not a string".into())),
    };
    let qualifiers = match row.get(offset + 4) {
        Some(Value::String(json)) if !json.is_empty() => Some(
            serde_json::from_str(json)
                .map_err(|e| Error::Internal(format!("malformed edge qualifiers: {e}")))?,
        ),
        _ => None,
    };

    Ok(Value::Edge(Box::new(Edge {
        id,
        source,
        predicate,
        target,
        qualifiers,
    })))
}
