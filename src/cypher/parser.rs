//! Cypher recursive descent parser.
//!
//! Parses token streams into AST nodes. Supports:
//! - CALL ns.proc(args) YIELD cols
//! - MATCH with node/relationship patterns, alternation, variable length
//! - WHERE with AND/OR/NOT, comparisons, CONTAINS / STARTS WITH / ENDS WITH
//! - RETURN with labels()/properties()/type()/count() and AS aliases
//! - ORDER BY, SKIP, LIMIT
//!
//! Write clauses (CREATE, MERGE, DELETE) and pipeline clauses (WITH, UNWIND,
//! OPTIONAL MATCH) are recognised and rejected — callers use the typed
//! write helpers instead.

use crate::{Error, Result};
use super::ast::*;
use super::lexer::{Token, TokenKind};

/// Token cursor. Holds the unconsumed tail of the token slice; consuming a
/// token shrinks the tail, and the returned reference stays tied to the
/// original slice rather than the cursor borrow.
struct Cursor<'t> {
    rest: &'t [Token],
    last_end: usize,
}

impl<'t> Cursor<'t> {
    fn new(tokens: &'t [Token]) -> Self {
        Self { rest: tokens, last_end: 0 }
    }

    /// Kind of the next token; an exhausted slice reads as EOF.
    fn kind(&self) -> TokenKind {
        self.rest.first().map(|t| t.kind).unwrap_or(TokenKind::Eof)
    }

    fn is(&self, kind: TokenKind) -> bool {
        self.kind() == kind
    }

    fn done(&self) -> bool {
        self.is(TokenKind::Eof)
    }

    /// Consume the next token unconditionally.
    fn shift(&mut self) -> Option<&'t Token> {
        let (first, tail) = self.rest.split_first()?;
        self.last_end = first.span.end;
        self.rest = tail;
        Some(first)
    }

    /// Consume the next token only if it has the wanted kind.
    fn take(&mut self, kind: TokenKind) -> Option<&'t Token> {
        if self.is(kind) { self.shift() } else { None }
    }

    /// Consume the next token, failing with a positioned hint otherwise.
    fn require(&mut self, kind: TokenKind) -> Result<&'t Token> {
        match self.take(kind) {
            Some(token) => Ok(token),
            None => Err(self.fail(format!("Expected {:?}, found {}", kind, self.describe()))),
        }
    }

    fn describe(&self) -> String {
        match self.rest.first() {
            Some(token) => format!("{:?} '{}'", token.kind, token.text),
            None => "end of input".into(),
        }
    }

    fn position(&self) -> usize {
        self.rest.first().map(|t| t.span.start).unwrap_or(self.last_end)
    }

    fn fail(&self, message: String) -> Error {
        Error::Syntax { position: self.position(), message }
    }

    fn unsupported(&self, what: &str) -> Error {
        Error::Unsupported(format!(
            "{what} is not supported; use the typed engine API instead"
        ))
    }
}

/// Parse a complete query from tokens.
pub fn parse_query(tokens: &[Token]) -> Result<CypherQuery> {
    let mut c = Cursor::new(tokens);

    match c.kind() {
        TokenKind::Create => return Err(c.unsupported("CREATE")),
        TokenKind::Merge => return Err(c.unsupported("MERGE")),
        TokenKind::Delete => return Err(c.unsupported("DELETE")),
        TokenKind::Unwind => return Err(c.unsupported("UNWIND")),
        TokenKind::Optional => return Err(c.unsupported("OPTIONAL MATCH")),
        TokenKind::With => return Err(c.unsupported("WITH pipelines")),
        _ => {}
    }

    // Optional leading CALL
    let call = if c.is(TokenKind::Call) {
        Some(parse_call_clause(&mut c)?)
    } else {
        None
    };

    // MATCH clauses
    let mut patterns = Vec::new();
    let mut where_clause = None;
    while c.take(TokenKind::Match).is_some() {
        patterns.push(parse_pattern(&mut c)?);
        while c.take(TokenKind::Comma).is_some() {
            patterns.push(parse_pattern(&mut c)?);
        }
        if c.take(TokenKind::Where).is_some() {
            let expr = parse_expr(&mut c)?;
            where_clause = Some(match where_clause.take() {
                None => expr,
                Some(prev) => Expr::BinaryOp {
                    left: Box::new(prev),
                    op: BinaryOp::And,
                    right: Box::new(expr),
                },
            });
        }
    }

    if call.is_none() && patterns.is_empty() {
        return Err(c.fail("Expected CALL or MATCH at start of query".into()));
    }

    if c.is(TokenKind::With) {
        return Err(c.unsupported("WITH pipelines"));
    }

    // RETURN
    if c.take(TokenKind::Return).is_none() {
        return Err(c.fail("Expected RETURN clause".into()));
    }
    let mut return_items = Vec::new();
    return_items.push(parse_return_item(&mut c)?);
    while c.take(TokenKind::Comma).is_some() {
        return_items.push(parse_return_item(&mut c)?);
    }

    // ORDER BY
    let mut order_by = Vec::new();
    if c.take(TokenKind::Order).is_some() {
        c.require(TokenKind::By)?;
        order_by.push(parse_order_expr(&mut c)?);
        while c.take(TokenKind::Comma).is_some() {
            order_by.push(parse_order_expr(&mut c)?);
        }
    }

    // SKIP
    let skip = if c.take(TokenKind::Skip).is_some() {
        Some(parse_value(&mut c)?)
    } else {
        None
    };

    // LIMIT
    let limit = if c.take(TokenKind::Limit).is_some() {
        Some(parse_value(&mut c)?)
    } else {
        None
    };

    c.take(TokenKind::Semicolon);
    if !c.done() {
        return Err(c.fail(format!("Unexpected token after query: {:?}", c.kind())));
    }

    Ok(CypherQuery {
        call,
        patterns,
        where_clause,
        return_items,
        order_by,
        skip,
        limit,
    })
}

// ============================================================================
// CALL ... YIELD
// ============================================================================

fn parse_call_clause(c: &mut Cursor) -> Result<CallClause> {
    c.require(TokenKind::Call)?;

    // Procedure name: name or name.name.name
    let mut procedure = c.require(TokenKind::Identifier)?.text.clone();
    while c.take(TokenKind::Dot).is_some() {
        let part = c.require(TokenKind::Identifier)?;
        procedure = format!("{procedure}.{}", part.text);
    }

    // Arguments
    c.require(TokenKind::LParen)?;
    let mut args = Vec::new();
    if !c.is(TokenKind::RParen) {
        args.push(parse_call_arg(c)?);
        while c.take(TokenKind::Comma).is_some() {
            args.push(parse_call_arg(c)?);
        }
    }
    c.require(TokenKind::RParen)?;

    // A trailing map literal is the options map
    let options = match args.last() {
        Some(Expr::MapLiteral(_)) => {
            let Some(Expr::MapLiteral(opts)) = args.pop() else { unreachable!() };
            opts
        }
        _ => Vec::new(),
    };

    // YIELD
    c.require(TokenKind::Yield)?;
    let mut yields = Vec::new();
    yields.push(c.require(TokenKind::Identifier)?.text.clone());
    while c.take(TokenKind::Comma).is_some() {
        yields.push(c.require(TokenKind::Identifier)?.text.clone());
    }

    Ok(CallClause { procedure, args, options, yields })
}

fn parse_call_arg(c: &mut Cursor) -> Result<Expr> {
    if c.is(TokenKind::LBrace) {
        let map = parse_map_literal(c)?;
        return Ok(Expr::MapLiteral(map));
    }
    parse_value(c)
}

fn parse_map_literal(c: &mut Cursor) -> Result<Vec<(String, Expr)>> {
    c.require(TokenKind::LBrace)?;
    let mut map = Vec::new();
    if !c.is(TokenKind::RBrace) {
        loop {
            let key = c.require(TokenKind::Identifier)?.text.clone();
            c.require(TokenKind::Colon)?;
            let value = parse_value(c)?;
            map.push((key, value));
            if c.take(TokenKind::Comma).is_none() {
                break;
            }
        }
    }
    c.require(TokenKind::RBrace)?;
    Ok(map)
}

// ============================================================================
// Pattern parsing
// ============================================================================

fn parse_pattern(c: &mut Cursor) -> Result<Pattern> {
    let start = parse_node_pattern(c)?;

    let mut steps = Vec::new();
    while c.is(TokenKind::Dash) || c.is(TokenKind::LeftArrow) {
        let rel = parse_rel_pattern(c)?;
        let node = parse_node_pattern(c)?;
        steps.push((rel, node));
    }

    Ok(Pattern { start, steps })
}

fn parse_node_pattern(c: &mut Cursor) -> Result<NodePattern> {
    c.require(TokenKind::LParen)?;

    let alias = c.take(TokenKind::Identifier).map(|t| t.text.clone());

    // Labels: :Label1:Label2
    let mut labels = Vec::new();
    while c.take(TokenKind::Colon).is_some() {
        labels.push(c.require(TokenKind::Identifier)?.text.clone());
    }

    // Properties: {key: value, ...}
    let properties = if c.is(TokenKind::LBrace) {
        parse_map_literal(c)?
    } else {
        Vec::new()
    };

    c.require(TokenKind::RParen)?;

    Ok(NodePattern { alias, labels, properties })
}

fn parse_rel_pattern(c: &mut Cursor) -> Result<RelPattern> {
    // <-[...]- or -[...]-> or -[...]-
    let left_arrow = c.take(TokenKind::LeftArrow).is_some();
    if !left_arrow {
        c.require(TokenKind::Dash)?;
    }

    let mut alias = None;
    let mut rel_types = Vec::new();
    let mut var_length = None;

    // Optional [details]
    if c.take(TokenKind::LBracket).is_some() {
        alias = c.take(TokenKind::Identifier).map(|t| t.text.clone());

        // Rel types: :TYPE1|TYPE2
        if c.take(TokenKind::Colon).is_some() {
            rel_types.push(c.require(TokenKind::Identifier)?.text.clone());
            while c.take(TokenKind::Pipe).is_some() {
                rel_types.push(c.require(TokenKind::Identifier)?.text.clone());
            }
        }

        // Variable length: *min..max
        if c.take(TokenKind::Star).is_some() {
            let min = if c.is(TokenKind::Integer) {
                Some(parse_usize(c)?)
            } else {
                None
            };
            if c.take(TokenKind::DotDot).is_some() {
                let max = if c.is(TokenKind::Integer) {
                    Some(parse_usize(c)?)
                } else {
                    None
                };
                var_length = Some(VarLength { min, max });
            } else if let Some(n) = min {
                var_length = Some(VarLength { min: Some(n), max: Some(n) });
            } else {
                var_length = Some(VarLength { min: None, max: None });
            }
        }

        c.require(TokenKind::RBracket)?;
    }

    // Determine direction
    let direction = if left_arrow {
        c.require(TokenKind::Dash)?;
        PatternDirection::Left
    } else if c.take(TokenKind::Arrow).is_some() {
        PatternDirection::Right
    } else if c.take(TokenKind::Dash).is_some() {
        PatternDirection::Both
    } else {
        return Err(c.fail("Expected '->' or '-' to close relationship pattern".into()));
    };

    Ok(RelPattern { alias, rel_types, direction, var_length })
}

fn parse_usize(c: &mut Cursor) -> Result<usize> {
    let token = c.require(TokenKind::Integer)?;
    token.text.parse::<usize>().map_err(|_| Error::Syntax {
        position: token.span.start,
        message: "Invalid integer".into(),
    })
}

// ============================================================================
// RETURN / ORDER BY
// ============================================================================

fn parse_return_item(c: &mut Cursor) -> Result<ReturnItem> {
    let expr = parse_return_expr(c)?;
    let alias = if c.take(TokenKind::As).is_some() {
        Some(c.require(TokenKind::Identifier)?.text.clone())
    } else {
        None
    };
    Ok(ReturnItem { expr, alias })
}

/// RETURN items: variable, property access, or one of the built-in
/// functions `labels()`, `properties()`, `type()`, `count()`.
fn parse_return_expr(c: &mut Cursor) -> Result<Expr> {
    let name = c.require(TokenKind::Identifier)?.text.clone();

    if c.take(TokenKind::LParen).is_some() {
        let func = match name.to_lowercase().as_str() {
            "labels" => Func::Labels,
            "properties" => Func::Properties,
            "type" => Func::Type,
            "count" => Func::Count,
            other => {
                return Err(c.fail(format!(
                    "Unknown function '{other}' — expected labels, properties, type, or count"
                )));
            }
        };
        let arg = if c.take(TokenKind::Star).is_some() {
            FuncArg::Star
        } else {
            FuncArg::Variable(c.require(TokenKind::Identifier)?.text.clone())
        };
        c.require(TokenKind::RParen)?;
        return Ok(Expr::FunctionCall { func, arg });
    }

    if c.take(TokenKind::Dot).is_some() {
        let key = c.require(TokenKind::Identifier)?.text.clone();
        return Ok(Expr::Property { variable: name, key });
    }

    Ok(Expr::Variable(name))
}

fn parse_order_expr(c: &mut Cursor) -> Result<OrderExpr> {
    let expr = parse_return_expr(c)?;
    let ascending = if c.take(TokenKind::Desc).is_some() {
        false
    } else {
        c.take(TokenKind::Asc);
        true
    };
    Ok(OrderExpr { expr, ascending })
}

// ============================================================================
// Expression parsing (precedence climbing)
// ============================================================================

fn parse_expr(c: &mut Cursor) -> Result<Expr> {
    parse_or_expr(c)
}

fn parse_or_expr(c: &mut Cursor) -> Result<Expr> {
    let mut left = parse_and_expr(c)?;
    while c.take(TokenKind::Or).is_some() {
        let right = parse_and_expr(c)?;
        left = Expr::BinaryOp { left: Box::new(left), op: BinaryOp::Or, right: Box::new(right) };
    }
    Ok(left)
}

fn parse_and_expr(c: &mut Cursor) -> Result<Expr> {
    let mut left = parse_not_expr(c)?;
    while c.take(TokenKind::And).is_some() {
        let right = parse_not_expr(c)?;
        left = Expr::BinaryOp { left: Box::new(left), op: BinaryOp::And, right: Box::new(right) };
    }
    Ok(left)
}

fn parse_not_expr(c: &mut Cursor) -> Result<Expr> {
    if c.take(TokenKind::Not).is_some() {
        let expr = parse_not_expr(c)?;
        Ok(Expr::Not(Box::new(expr)))
    } else {
        parse_comparison(c)
    }
}

fn parse_comparison(c: &mut Cursor) -> Result<Expr> {
    // Parenthesized boolean sub-expression
    if c.take(TokenKind::LParen).is_some() {
        let expr = parse_expr(c)?;
        c.require(TokenKind::RParen)?;
        return Ok(expr);
    }

    let left = parse_value(c)?;

    // Comparison operators
    let op = match c.kind() {
        TokenKind::Eq => Some(BinaryOp::Eq),
        TokenKind::Neq => Some(BinaryOp::Neq),
        TokenKind::Lt => Some(BinaryOp::Lt),
        TokenKind::Lte => Some(BinaryOp::Lte),
        TokenKind::Gt => Some(BinaryOp::Gt),
        TokenKind::Gte => Some(BinaryOp::Gte),
        _ => None,
    };
    if let Some(op) = op {
        c.shift();
        let right = parse_value(c)?;
        return Ok(Expr::BinaryOp { left: Box::new(left), op, right: Box::new(right) });
    }

    // String predicates
    if c.take(TokenKind::Contains).is_some() {
        let right = parse_value(c)?;
        return Ok(Expr::StringOp {
            left: Box::new(left),
            op: StringOp::Contains,
            right: Box::new(right),
        });
    }
    if c.take(TokenKind::Starts).is_some() {
        c.require(TokenKind::With)?;
        let right = parse_value(c)?;
        return Ok(Expr::StringOp {
            left: Box::new(left),
            op: StringOp::StartsWith,
            right: Box::new(right),
        });
    }
    if c.take(TokenKind::Ends).is_some() {
        c.require(TokenKind::With)?;
        let right = parse_value(c)?;
        return Ok(Expr::StringOp {
            left: Box::new(left),
            op: StringOp::EndsWith,
            right: Box::new(right),
        });
    }

    Ok(left)
}

/// value := literal | parameter | variable | property_ref
fn parse_value(c: &mut Cursor) -> Result<Expr> {
    match c.kind() {
        TokenKind::Integer => {
            let token = c.require(TokenKind::Integer)?;
            let value = token.text.parse::<i64>().map_err(|_| Error::Syntax {
                position: token.span.start,
                message: "Invalid integer".into(),
            })?;
            Ok(Expr::Literal(Literal::Int(value)))
        }
        TokenKind::Float => {
            let token = c.require(TokenKind::Float)?;
            let value = token.text.parse::<f64>().map_err(|_| Error::Syntax {
                position: token.span.start,
                message: "Invalid float".into(),
            })?;
            Ok(Expr::Literal(Literal::Float(value)))
        }
        TokenKind::StringLiteral => {
            let token = c.require(TokenKind::StringLiteral)?;
            Ok(Expr::Literal(Literal::String(token.text.clone())))
        }
        TokenKind::Parameter => {
            let token = c.require(TokenKind::Parameter)?;
            Ok(Expr::Parameter(token.text.clone()))
        }
        TokenKind::Dash => {
            // Negative number literal
            c.shift();
            match c.kind() {
                TokenKind::Integer => {
                    let token = c.require(TokenKind::Integer)?;
                    let value = token.text.parse::<i64>().map_err(|_| Error::Syntax {
                        position: token.span.start,
                        message: "Invalid integer".into(),
                    })?;
                    Ok(Expr::Literal(Literal::Int(-value)))
                }
                TokenKind::Float => {
                    let token = c.require(TokenKind::Float)?;
                    let value = token.text.parse::<f64>().map_err(|_| Error::Syntax {
                        position: token.span.start,
                        message: "Invalid float".into(),
                    })?;
                    Ok(Expr::Literal(Literal::Float(-value)))
                }
                _ => Err(c.fail("Expected number after '-'".into())),
            }
        }
        TokenKind::Identifier => {
            let name = c.require(TokenKind::Identifier)?.text.clone();
            // NULL / TRUE / FALSE read as identifiers; normalise here
            match name.to_uppercase().as_str() {
                "NULL" => return Ok(Expr::Literal(Literal::Null)),
                "TRUE" => return Ok(Expr::Literal(Literal::Bool(true))),
                "FALSE" => return Ok(Expr::Literal(Literal::Bool(false))),
                _ => {}
            }
            if c.take(TokenKind::Dot).is_some() {
                let key = c.require(TokenKind::Identifier)?.text.clone();
                Ok(Expr::Property { variable: name, key })
            } else {
                Ok(Expr::Variable(name))
            }
        }
        _ => Err(c.fail(format!(
            "Unexpected token in expression: {}",
            c.describe()
        ))),
    }
}

// ============================================================================
// Tests
// ============================================================================
