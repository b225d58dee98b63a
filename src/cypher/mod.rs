//! # Cypher Language
//!
//! Lexer and recursive-descent parser for the supported Cypher subset.
//! Pure functions — no I/O, no state, no SQL dependency.

pub mod ast;
pub mod lexer;
pub mod parser;

use crate::Result;
use ast::CypherQuery;

/// Parse a Cypher query string into an AST.
pub fn parse(query: &str) -> Result<CypherQuery> {
    let tokens = lexer::tokenize(query)?;
    parser::parse_query(&tokens)
}
