//! Personalised PageRank.
//!
//! Power iteration over the graph induced by `rdf_edges`, seeded at a set
//! of node ids. Adjacency is read through the executor in id-ordered
//! batches and iterated in memory with a bounded frontier; the host's
//! optional PPR SQL function (probed by the engine) shares this contract.

use hashbrown::{HashMap, HashSet};
use tracing::{debug, info};

use crate::engine::SqlExecutor;
use crate::model::Value;
use crate::sql::SqlBuilder;
use crate::Result;

use super::{row_i64, row_str};

/// Tuning knobs; the engine fills these from its configuration.
#[derive(Debug, Clone, Copy)]
pub struct PprOptions {
    pub damping: f64,
    pub eps: f64,
    pub max_iters: usize,
    pub bidirectional: bool,
}

/// Out-adjacency plus the full node set (nodes without out-edges matter:
/// their mass teleports back to the seeds).
#[derive(Debug, Default)]
pub struct Adjacency {
    pub out: HashMap<String, Vec<String>>,
    pub nodes: HashSet<String>,
}

impl Adjacency {
    pub fn add_edge(&mut self, source: String, target: String) {
        self.nodes.insert(source.clone());
        self.nodes.insert(target.clone());
        self.out.entry(source).or_default().push(target);
    }
}

/// Edges fetched per round-trip while loading adjacency.
const ADJACENCY_BATCH: i64 = 50_000;

/// Load the edge list in id-ordered batches.
pub async fn load_adjacency<E: SqlExecutor>(exec: &E, bidirectional: bool) -> Result<Adjacency> {
    let mut adj = Adjacency::default();
    let mut last_id = 0i64;
    loop {
        let mut b = SqlBuilder::new();
        b.push("SELECT TOP ");
        b.bind(Value::Int(ADJACENCY_BATCH));
        b.push(" id, s, o_id FROM ")
            .push(crate::sql::T_EDGES)
            .push(" WHERE id > ")
            .bind(Value::Int(last_id))
            .push(" ORDER BY id");
        let (stmt, params) = b.finish();
        let rows = exec.query(&stmt, &params).await?;
        let fetched = rows.len();
        for row in &rows {
            last_id = last_id.max(row_i64(row, 0)?);
            let s = row_str(row, 1)?;
            let o = row_str(row, 2)?;
            if bidirectional {
                adj.add_edge(o.clone(), s.clone());
            }
            adj.add_edge(s, o);
        }
        if fetched < ADJACENCY_BATCH as usize {
            break;
        }
    }
    debug!(nodes = adj.nodes.len(), "adjacency loaded");
    Ok(adj)
}

/// Power iteration with teleport to the seed set.
///
/// Scores are a probability distribution (they sum to 1): dangling mass is
/// re-teleported to the seeds each step, so every score stays finite and
/// non-negative. Returns the empty map for an empty seed set.
pub fn power_iteration(
    adj: &Adjacency,
    seeds: &[String],
    opts: &PprOptions,
) -> HashMap<String, f64> {
    if seeds.is_empty() {
        return HashMap::new();
    }

    let mut nodes: HashSet<String> = adj.nodes.clone();
    for seed in seeds {
        nodes.insert(seed.clone());
    }

    let teleport = 1.0 / seeds.len() as f64;
    let seed_set: HashSet<&str> = seeds.iter().map(String::as_str).collect();

    let mut scores: HashMap<String, f64> = nodes
        .iter()
        .map(|n| {
            let init = if seed_set.contains(n.as_str()) { teleport } else { 0.0 };
            (n.clone(), init)
        })
        .collect();

    for iteration in 0..opts.max_iters {
        let mut next: HashMap<String, f64> = scores.keys().map(|n| (n.clone(), 0.0)).collect();

        let mut dangling = 0.0;
        for (node, score) in &scores {
            match adj.out.get(node) {
                Some(targets) if !targets.is_empty() => {
                    let share = score / targets.len() as f64;
                    for target in targets {
                        if let Some(slot) = next.get_mut(target) {
                            *slot += share;
                        }
                    }
                }
                _ => dangling += score,
            }
        }

        let mut delta: f64 = 0.0;
        for (node, slot) in next.iter_mut() {
            let base = if seed_set.contains(node.as_str()) {
                (1.0 - opts.damping) * teleport + opts.damping * dangling * teleport
            } else {
                0.0
            };
            *slot = base + opts.damping * *slot;
            delta = delta.max((*slot - scores[node]).abs());
        }

        scores = next;
        if delta < opts.eps {
            info!(iterations = iteration + 1, "pagerank converged");
            break;
        }
    }

    scores
}

/// Load adjacency and iterate: the bounded-memory PPR path.
pub async fn personalized_pagerank<E: SqlExecutor>(
    exec: &E,
    seeds: &[String],
    opts: &PprOptions,
) -> Result<HashMap<String, f64>> {
    if seeds.is_empty() {
        return Ok(HashMap::new());
    }
    let adj = load_adjacency(exec, opts.bidirectional).await?;
    Ok(power_iteration(&adj, seeds, opts))
}
