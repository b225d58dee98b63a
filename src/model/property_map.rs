//! Property and parameter maps.
//!
//! Node property values are stored as strings in `rdf_props`; numeric
//! predicates coerce at query time via a safe cast in SQL. Query parameters
//! carry full `Value`s (vectors, numbers, strings) and are bound, never
//! interpolated.

use std::collections::HashMap;

use super::Value;

/// A map of property names to string values, as stored on a node.
pub type PropertyMap = HashMap<String, String>;

/// A map of Cypher parameter names (`$name`) to bound values.
pub type Params = HashMap<String, Value>;
