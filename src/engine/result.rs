//! Query results.
//!
//! Tabular rows with preserved column order, plus typed accessors.

use std::collections::HashMap;

use crate::model::{Edge, Node, Value};
use crate::{Error, Result};

/// Result of executing a Cypher query.
#[derive(Debug, Clone)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<ResultRow>,
}

/// A single row in the result set. Preserves column order declared by
/// RETURN.
#[derive(Debug, Clone)]
pub struct ResultRow {
    pub values: Vec<(String, Value)>,
}

impl ResultRow {
    /// Get a typed value from the row by column name.
    pub fn get<T: FromValue>(&self, key: &str) -> Result<T> {
        let val = self
            .values
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
            .ok_or_else(|| Error::Internal(format!("no column '{key}' in result row")))?;
        T::from_value(val)
    }

    /// Get a raw Value reference by column name.
    pub fn get_value(&self, key: &str) -> Option<&Value> {
        self.values.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }
}

/// Convert from Value to concrete types.
pub trait FromValue: Sized {
    fn from_value(val: &Value) -> Result<Self>;
}

fn type_error<T>(expected: &str, got: &Value) -> Result<T> {
    Err(Error::Internal(format!(
        "expected {expected}, got {}",
        got.type_name()
    )))
}

impl FromValue for Node {
    fn from_value(val: &Value) -> Result<Self> {
        match val {
            Value::Node(n) => Ok(*n.clone()),
            other => type_error("NODE", other),
        }
    }
}

impl FromValue for Edge {
    fn from_value(val: &Value) -> Result<Self> {
        match val {
            Value::Edge(e) => Ok(*e.clone()),
            other => type_error("EDGE", other),
        }
    }
}

impl FromValue for String {
    fn from_value(val: &Value) -> Result<Self> {
        match val {
            Value::String(s) => Ok(s.clone()),
            other => type_error("STRING", other),
        }
    }
}

impl FromValue for i64 {
    fn from_value(val: &Value) -> Result<Self> {
        match val.as_int() {
            Some(i) => Ok(i),
            None => type_error("INTEGER", val),
        }
    }
}

impl FromValue for f64 {
    fn from_value(val: &Value) -> Result<Self> {
        match val.as_float() {
            Some(f) => Ok(f),
            None => type_error("FLOAT", val),
        }
    }
}

impl FromValue for bool {
    fn from_value(val: &Value) -> Result<Self> {
        match val {
            Value::Bool(b) => Ok(*b),
            other => type_error("BOOLEAN", other),
        }
    }
}

impl FromValue for Value {
    fn from_value(val: &Value) -> Result<Self> {
        Ok(val.clone())
    }
}

impl FromValue for Vec<Value> {
    fn from_value(val: &Value) -> Result<Self> {
        match val {
            Value::List(l) => Ok(l.clone()),
            other => type_error("LIST", other),
        }
    }
}

impl FromValue for HashMap<String, Value> {
    fn from_value(val: &Value) -> Result<Self> {
        match val {
            Value::Map(m) => Ok(m.clone()),
            other => type_error("MAP", other),
        }
    }
}
