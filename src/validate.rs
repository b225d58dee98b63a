//! Identifier whitelisting and input sanitisation.
//!
//! Everything caller-supplied that could steer SQL goes through here before
//! the translator or an operator touches a builder. Labels and predicates
//! are always *bound* — validation is an extra gate, not a substitute for
//! binding. Error messages never echo SQL or schema names.

use crate::model::Value;
use crate::sql;
use crate::{Error, Result};

/// Tables the translator may name, with the columns it may reference.
pub const WHITELIST: &[(&str, &[&str])] = &[
    (sql::T_NODES, &["node_id"]),
    (sql::T_LABELS, &["s", "label"]),
    (sql::T_PROPS, &["s", "key", "val"]),
    (sql::T_EDGES, &["id", "s", "p", "o_id", "qualifiers"]),
    (sql::T_EMBEDDINGS, &["id", "emb", "meta"]),
    (sql::T_DOCS, &["id", "text"]),
];

/// Check a table name against the whitelist.
pub fn whitelisted_table(name: &str) -> Result<&'static str> {
    WHITELIST
        .iter()
        .find(|(table, _)| *table == name)
        .map(|(table, _)| *table)
        .ok_or_else(|| Error::Validation("unknown table identifier".into()))
}

/// Check a column name against the whitelist for any table.
pub fn whitelisted_column(name: &str) -> Result<&'static str> {
    WHITELIST
        .iter()
        .flat_map(|(_, cols)| cols.iter())
        .find(|col| **col == name)
        .copied()
        .ok_or_else(|| Error::Validation("unknown column identifier".into()))
}

/// Labels and predicates come from a small vocabulary: identifier-like,
/// bounded length. They are bound as parameters regardless.
pub fn validate_label(label: &str) -> Result<()> {
    validate_vocab_term(label, "label")
}

pub fn validate_predicate(predicate: &str) -> Result<()> {
    validate_vocab_term(predicate, "relationship type")
}

fn validate_vocab_term(term: &str, what: &str) -> Result<()> {
    if term.is_empty() || term.len() > 128 {
        return Err(Error::Validation(format!("{what} must be 1-128 characters")));
    }
    let mut chars = term.chars();
    let head_ok = chars.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if !head_ok || !term.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(Error::Validation(format!(
            "{what} may only contain letters, digits, and underscores"
        )));
    }
    Ok(())
}

/// Property keys obey the same vocabulary rule as labels.
pub fn validate_property_key(key: &str) -> Result<()> {
    validate_vocab_term(key, "property key")
}

/// Coerce a caller-supplied `k` (result limit).
///
/// Absent or empty-string values fall back to `default`; integers and
/// numeric strings are accepted; anything else raises. The result is
/// clamped to `[1, max]`, with non-positive input treated as invalid.
pub fn coerce_k(value: Option<&Value>, default: i64, max: i64) -> Result<i64> {
    let k = match value {
        None | Some(Value::Null) => default,
        Some(Value::String(s)) if s.trim().is_empty() => default,
        Some(Value::Int(i)) => *i,
        Some(Value::Float(f)) if f.fract() == 0.0 => *f as i64,
        Some(Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| Error::Validation("k must be a positive integer".into()))?,
        Some(_) => return Err(Error::Validation("k must be a positive integer".into())),
    };
    if k <= 0 {
        return Err(Error::Validation("k must be a positive integer".into()));
    }
    Ok(k.min(max))
}

/// Similarity function selector for vector search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Similarity {
    Cosine,
    DotProduct,
}

impl Similarity {
    pub fn sql_fn(self) -> &'static str {
        match self {
            Similarity::Cosine => sql::FN_VECTOR_COSINE,
            Similarity::DotProduct => sql::FN_VECTOR_DOT_PRODUCT,
        }
    }
}

/// Parse the `similarity` option; anything unknown is rejected with the
/// valid values listed.
pub fn parse_similarity(value: Option<&str>) -> Result<Similarity> {
    match value {
        None | Some("cosine") => Ok(Similarity::Cosine),
        Some("dot_product") => Ok(Similarity::DotProduct),
        Some(other) => Err(Error::Validation(format!(
            "invalid similarity '{other}': expected 'cosine' or 'dot_product'"
        ))),
    }
}

/// Escape SQL LIKE wildcards in a user-supplied substring.
/// The emitted patterns use `ESCAPE '\'`.
pub fn escape_like(fragment: &str) -> String {
    let mut out = String::with_capacity(fragment.len());
    for c in fragment.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
