//! BFS graph traversal.
//!
//! Expands outward from a start node one hop per round-trip. The
//! predicate-filtered path (one predicate per hop) and the any-predicate
//! path share the frontier representation; a triple seen-set guarantees no
//! `(s, p, o)` step repeats within one invocation, and an expansion
//! seen-set stops revisited nodes from being reopened.

use hashbrown::HashSet;
use tracing::debug;

use crate::engine::SqlExecutor;
use crate::model::Value;
use crate::sql::SqlBuilder;
use crate::validate;
use crate::Result;

use super::{row_i64, row_str};

/// One traversal step: the edge row id, the 1-based hop number, and the
/// `(s, p, o)` triple walked.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Step {
    pub id: i64,
    pub step: usize,
    pub s: String,
    pub p: String,
    pub o: String,
}

/// Breadth-first traversal from `start`.
///
/// With `predicates`, hop `i` follows only `predicates[i]` and traversal
/// stops after `predicates.len()` hops (or `max_hops`, whichever is
/// smaller). Without, any predicate is followed up to `max_hops`.
/// Empty start or `max_hops <= 0` produce an empty sequence.
pub async fn bfs<E: SqlExecutor>(
    exec: &E,
    start: &str,
    predicates: Option<&[String]>,
    max_hops: i64,
) -> Result<Vec<Step>> {
    if start.is_empty() || max_hops <= 0 {
        return Ok(Vec::new());
    }
    if let Some(preds) = predicates {
        for pred in preds {
            validate::validate_predicate(pred)?;
        }
    }

    let hop_limit = match predicates {
        Some(preds) => preds.len().min(max_hops as usize),
        None => max_hops as usize,
    };

    let mut steps = Vec::new();
    let mut seen_triples: HashSet<(String, String, String)> = HashSet::new();
    let mut expanded: HashSet<String> = HashSet::new();
    let mut frontier: Vec<String> = vec![start.to_string()];

    for hop in 0..hop_limit {
        if frontier.is_empty() {
            break;
        }
        for node in &frontier {
            expanded.insert(node.clone());
        }

        let predicate = predicates.map(|preds| preds[hop].as_str());
        let rows = expand_frontier(exec, &frontier, predicate).await?;
        debug!(hop = hop + 1, frontier = frontier.len(), edges = rows.len(), "bfs expand");

        let mut next: Vec<String> = Vec::new();
        let mut next_set: HashSet<String> = HashSet::new();
        for (id, s, p, o) in rows {
            let triple = (s.clone(), p.clone(), o.clone());
            if !seen_triples.insert(triple) {
                continue;
            }
            if !expanded.contains(&o) && next_set.insert(o.clone()) {
                next.push(o.clone());
            }
            steps.push(Step { id, step: hop + 1, s, p, o });
        }
        frontier = next;
    }

    Ok(steps)
}

/// One hop: all out-edges of the frontier, optionally predicate-filtered.
async fn expand_frontier<E: SqlExecutor>(
    exec: &E,
    frontier: &[String],
    predicate: Option<&str>,
) -> Result<Vec<(i64, String, String, String)>> {
    let mut b = SqlBuilder::new();
    b.push("SELECT id, s, p, o_id FROM ")
        .push(crate::sql::T_EDGES)
        .push(" WHERE s IN (");
    for (i, node) in frontier.iter().enumerate() {
        if i > 0 {
            b.push(", ");
        }
        b.bind(Value::from(node.as_str()));
    }
    b.push(")");
    if let Some(pred) = predicate {
        b.push(" AND p = ").bind(Value::from(pred));
    }
    b.push(" ORDER BY id");

    let (stmt, params) = b.finish();
    let rows = exec.query(&stmt, &params).await?;
    rows.iter()
        .map(|row| {
            Ok((
                row_i64(row, 0)?,
                row_str(row, 1)?,
                row_str(row, 2)?,
                row_str(row, 3)?,
            ))
        })
        .collect()
}
