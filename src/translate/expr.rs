//! Expression lowering: WHERE predicates, RETURN projections, ORDER BY.
//!
//! Every AST expression form is matched exhaustively — a new variant is a
//! compile error here until it is handled. Property predicates lower to
//! EXISTS subqueries against `rdf_props`; ordering comparisons wrap the
//! stored string value in a safe numeric cast so non-numeric rows drop out
//! silently; string predicates lower to LIKE with wildcard escaping.

use crate::cypher::ast::*;
use crate::model::Value;
use crate::sql::{self, SqlBuilder};
use crate::validate;
use crate::{Error, Result};

use super::{stringified, BindKind, ColumnKind, Translator};

// ============================================================================
// RETURN projection
// ============================================================================

/// A planned RETURN item: the SELECT fragment, a re-emittable copy for
/// GROUP BY, the output name, and its hydration kind.
pub(super) struct ReturnPlan {
    pub fragment: SqlBuilder,
    pub group_fragment: SqlBuilder,
    pub name: String,
    pub kind: ColumnKind,
    pub aggregate: bool,
}

pub(super) fn plan_return(t: &Translator, items: &[ReturnItem]) -> Result<Vec<ReturnPlan>> {
    items.iter().map(|item| plan_return_item(t, item)).collect()
}

fn plan_return_item(t: &Translator, item: &ReturnItem) -> Result<ReturnPlan> {
    let (fragment, derived_name, kind, aggregate) = match &item.expr {
        Expr::Variable(var) => match t.env.get(var) {
            Some(BindKind::Node) => (column(var), var.clone(), ColumnKind::NodeId, false),
            Some(BindKind::Scalar) => (column(var), var.clone(), ColumnKind::Scalar, false),
            Some(BindKind::Rel) => {
                let mut b = SqlBuilder::new();
                for (i, suffix) in ["id", "s", "p", "o", "q"].iter().enumerate() {
                    if i > 0 {
                        b.push(", ");
                    }
                    b.push("q.");
                    b.push_name(&format!("{var}__{suffix}"));
                }
                (b, var.clone(), ColumnKind::Edge, false)
            }
            None => return Err(unknown_variable(var)),
        },

        Expr::Property { variable, key } => {
            let frag = property_fragment(t, variable, key)?;
            (frag, format!("{variable}.{key}"), ColumnKind::Scalar, false)
        }

        Expr::FunctionCall { func, arg } => match (func, arg) {
            (Func::Count, _) => {
                let mut b = SqlBuilder::new();
                b.push("COUNT(*)");
                (b, "count(*)".to_string(), ColumnKind::Scalar, true)
            }
            (Func::Labels, FuncArg::Variable(var)) => {
                require_kind(t, var, BindKind::Node)?;
                let mut b = SqlBuilder::new();
                b.push("(SELECT ")
                    .push(sql::FN_JSON_ARRAYAGG)
                    .push("(l.label) FROM ")
                    .push(sql::T_LABELS)
                    .push(" l WHERE l.s = q.");
                b.push_name(var);
                b.push(")");
                (b, format!("labels({var})"), ColumnKind::Labels, false)
            }
            (Func::Properties, FuncArg::Variable(var)) => {
                require_kind(t, var, BindKind::Node)?;
                let mut b = SqlBuilder::new();
                b.push("(SELECT ")
                    .push(sql::FN_JSON_ARRAYAGG)
                    .push("(")
                    .push(sql::FN_JSON_OBJECT)
                    .push("('k' : p.key, 'v' : p.val)) FROM ")
                    .push(sql::T_PROPS)
                    .push(" p WHERE p.s = q.");
                b.push_name(var);
                b.push(")");
                (b, format!("properties({var})"), ColumnKind::Properties, false)
            }
            (Func::Type, FuncArg::Variable(var)) => {
                require_kind(t, var, BindKind::Rel)?;
                let mut b = SqlBuilder::new();
                b.push("q.");
                b.push_name(&format!("{var}__p"));
                (b, format!("type({var})"), ColumnKind::Scalar, false)
            }
            (func, FuncArg::Star) => {
                return Err(Error::Validation(format!(
                    "{}() requires a variable argument",
                    func.name()
                )));
            }
        },

        Expr::Literal(_)
        | Expr::Parameter(_)
        | Expr::BinaryOp { .. }
        | Expr::Not(_)
        | Expr::StringOp { .. }
        | Expr::MapLiteral(_) => {
            return Err(Error::Validation(
                "RETURN items must be variables, property accesses, or \
                 labels/properties/type/count calls"
                    .into(),
            ));
        }
    };

    Ok(ReturnPlan {
        group_fragment: fragment.clone(),
        fragment,
        name: item.alias.clone().unwrap_or(derived_name),
        kind,
        aggregate,
    })
}

/// `q.<var>` column reference.
fn column(var: &str) -> SqlBuilder {
    let mut b = SqlBuilder::new();
    b.push("q.");
    b.push_name(var);
    b
}

/// Lower `var.key` to a value expression.
fn property_fragment(t: &Translator, variable: &str, key: &str) -> Result<SqlBuilder> {
    validate::validate_property_key(key)?;
    match t.env.get(variable) {
        Some(BindKind::Node) => {
            if key == "id" {
                return Ok(column(variable));
            }
            let mut b = SqlBuilder::new();
            b.push("(SELECT p.val FROM ")
                .push(sql::T_PROPS)
                .push(" p WHERE p.s = q.");
            b.push_name(variable);
            b.push(" AND p.key = ");
            b.bind(Value::from(key));
            b.push(")");
            Ok(b)
        }
        Some(BindKind::Rel) => {
            if key == "id" {
                let mut b = SqlBuilder::new();
                b.push("q.");
                b.push_name(&format!("{variable}__id"));
                return Ok(b);
            }
            // Edge-level properties live in the JSON qualifier object.
            let mut b = SqlBuilder::new();
            b.push(sql::FN_JSON_VALUE).push("(q.");
            b.push_name(&format!("{variable}__q"));
            b.push(", ");
            b.bind(Value::String(format!("$.{key}")));
            b.push(")");
            Ok(b)
        }
        Some(BindKind::Scalar) => Err(Error::Validation(format!(
            "variable '{variable}' has no properties"
        ))),
        None => Err(unknown_variable(variable)),
    }
}

fn require_kind(t: &Translator, var: &str, expected: BindKind) -> Result<()> {
    match t.env.get(var) {
        Some(kind) if kind == expected => Ok(()),
        Some(_) => Err(Error::Validation(format!(
            "variable '{var}' is the wrong kind of entity for this function"
        ))),
        None => Err(unknown_variable(var)),
    }
}

fn unknown_variable(var: &str) -> Error {
    Error::Validation(format!("unknown variable '{var}'"))
}

// ============================================================================
// WHERE predicates
// ============================================================================

pub(super) fn lower_bool(t: &Translator, expr: &Expr) -> Result<SqlBuilder> {
    match expr {
        Expr::BinaryOp { left, op: op @ (BinaryOp::And | BinaryOp::Or), right } => {
            let mut b = SqlBuilder::new();
            b.push("(");
            b.append(lower_bool(t, left)?);
            b.push(match op {
                BinaryOp::And => " AND ",
                _ => " OR ",
            });
            b.append(lower_bool(t, right)?);
            b.push(")");
            Ok(b)
        }
        Expr::Not(inner) => {
            let mut b = SqlBuilder::new();
            b.push("NOT (");
            b.append(lower_bool(t, inner)?);
            b.push(")");
            Ok(b)
        }
        Expr::BinaryOp { left, op, right } => lower_comparison(t, left, *op, right),
        Expr::StringOp { left, op, right } => lower_string_op(t, left, *op, right),
        Expr::Literal(Literal::Bool(true)) => {
            let mut b = SqlBuilder::new();
            b.push("1 = 1");
            Ok(b)
        }
        Expr::Literal(Literal::Bool(false)) => {
            let mut b = SqlBuilder::new();
            b.push("1 = 0");
            Ok(b)
        }
        Expr::Literal(_)
        | Expr::Variable(_)
        | Expr::Property { .. }
        | Expr::Parameter(_)
        | Expr::FunctionCall { .. }
        | Expr::MapLiteral(_) => Err(Error::Validation(
            "WHERE requires a boolean predicate".into(),
        )),
    }
}

/// One side of a comparison.
enum Side {
    NodeProp { var: String, key: String },
    RelProp { var: String, key: String },
    Column(String),
    Value(Value),
}

fn classify(t: &Translator, expr: &Expr) -> Result<Side> {
    match expr {
        Expr::Property { variable, key } => {
            validate::validate_property_key(key)?;
            match t.env.get(variable) {
                Some(BindKind::Node) => {
                    if key == "id" {
                        Ok(Side::Column(variable.clone()))
                    } else {
                        Ok(Side::NodeProp { var: variable.clone(), key: key.clone() })
                    }
                }
                Some(BindKind::Rel) => {
                    if key == "id" {
                        Ok(Side::Column(format!("{variable}__id")))
                    } else {
                        Ok(Side::RelProp { var: variable.clone(), key: key.clone() })
                    }
                }
                Some(BindKind::Scalar) => Err(Error::Validation(format!(
                    "variable '{variable}' has no properties"
                ))),
                None => Err(unknown_variable(variable)),
            }
        }
        Expr::Variable(var) => match t.env.get(var) {
            Some(BindKind::Node) | Some(BindKind::Scalar) => Ok(Side::Column(var.clone())),
            Some(BindKind::Rel) => Err(Error::Validation(
                "relationships cannot be compared directly; use type() or properties".into(),
            )),
            None => Err(unknown_variable(var)),
        },
        Expr::Literal(_) | Expr::Parameter(_) => Ok(Side::Value(t.resolve(expr)?)),
        _ => Err(Error::Validation("unsupported comparison operand".into())),
    }
}

fn lower_comparison(
    t: &Translator,
    left: &Expr,
    op: BinaryOp,
    right: &Expr,
) -> Result<SqlBuilder> {
    let lhs = classify(t, left)?;
    let rhs = classify(t, right)?;

    match (lhs, rhs) {
        // Property vs concrete value: the EXISTS form. A node without the
        // property fails the predicate, and ordering comparisons exclude
        // rows whose stored value is not numeric.
        (Side::NodeProp { var, key }, Side::Value(value)) => {
            Ok(prop_exists(&var, &key, op, value))
        }
        (Side::Value(value), Side::NodeProp { var, key }) => {
            Ok(prop_exists(&var, &key, flip(op), value))
        }

        // Everything else compares scalar expressions directly.
        (lhs, rhs) => {
            let mut b = SqlBuilder::new();
            b.append(scalar_side(lhs, op)?);
            b.push(op_sql(op));
            b.append(scalar_side(rhs, op)?);
            Ok(b)
        }
    }
}

fn prop_exists(var: &str, key: &str, op: BinaryOp, value: Value) -> SqlBuilder {
    let mut b = SqlBuilder::new();
    b.push("EXISTS (SELECT 1 FROM ")
        .push(sql::T_PROPS)
        .push(" p WHERE p.s = q.");
    b.push_name(var);
    b.push(" AND p.key = ");
    b.bind(Value::from(key));
    if op.is_ordering() {
        b.push(" AND TRY_CAST(p.val AS DOUBLE)");
        b.push(op_sql(op));
        b.push("TRY_CAST(");
        b.bind(value);
        b.push(" AS DOUBLE)");
    } else {
        b.push(" AND p.val");
        b.push(op_sql(op));
        b.bind(stringified(value));
    }
    b.push(")");
    b
}

/// Render one comparison operand as a scalar SQL expression.
fn scalar_side(side: Side, op: BinaryOp) -> Result<SqlBuilder> {
    let mut b = SqlBuilder::new();
    match side {
        Side::Column(col) => {
            b.push("q.");
            b.push_name(&col);
        }
        Side::NodeProp { var, key } => {
            if op.is_ordering() {
                b.push("TRY_CAST(");
            }
            b.push("(SELECT p.val FROM ")
                .push(sql::T_PROPS)
                .push(" p WHERE p.s = q.");
            b.push_name(&var);
            b.push(" AND p.key = ");
            b.bind(Value::from(key.as_str()));
            b.push(")");
            if op.is_ordering() {
                b.push(" AS DOUBLE)");
            }
        }
        Side::RelProp { var, key } => {
            if op.is_ordering() {
                b.push("TRY_CAST(");
            }
            b.push(sql::FN_JSON_VALUE).push("(q.");
            b.push_name(&format!("{var}__q"));
            b.push(", ");
            b.bind(Value::String(format!("$.{key}")));
            b.push(")");
            if op.is_ordering() {
                b.push(" AS DOUBLE)");
            }
        }
        Side::Value(value) => {
            if op.is_ordering() {
                b.push("TRY_CAST(");
                b.bind(value);
                b.push(" AS DOUBLE)");
            } else {
                b.bind(stringified(value));
            }
        }
    }
    Ok(b)
}

fn op_sql(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Eq => " = ",
        BinaryOp::Neq => " <> ",
        BinaryOp::Lt => " < ",
        BinaryOp::Lte => " <= ",
        BinaryOp::Gt => " > ",
        BinaryOp::Gte => " >= ",
        BinaryOp::And | BinaryOp::Or => unreachable!("handled as boolean connectives"),
    }
}

fn flip(op: BinaryOp) -> BinaryOp {
    match op {
        BinaryOp::Lt => BinaryOp::Gt,
        BinaryOp::Lte => BinaryOp::Gte,
        BinaryOp::Gt => BinaryOp::Lt,
        BinaryOp::Gte => BinaryOp::Lte,
        other => other,
    }
}

// ============================================================================
// String predicates
// ============================================================================

fn lower_string_op(
    t: &Translator,
    left: &Expr,
    op: StringOp,
    right: &Expr,
) -> Result<SqlBuilder> {
    let needle = t
        .resolve(right)?
        .as_str()
        .map(str::to_owned)
        .ok_or_else(|| Error::Validation("string predicates require a string value".into()))?;
    let escaped = validate::escape_like(&needle);
    let pattern = match op {
        StringOp::Contains => format!("%{escaped}%"),
        StringOp::StartsWith => format!("{escaped}%"),
        StringOp::EndsWith => format!("%{escaped}"),
    };

    match classify(t, left)? {
        Side::NodeProp { var, key } => {
            let mut b = SqlBuilder::new();
            b.push("EXISTS (SELECT 1 FROM ")
                .push(sql::T_PROPS)
                .push(" p WHERE p.s = q.");
            b.push_name(&var);
            b.push(" AND p.key = ");
            b.bind(Value::from(key.as_str()));
            b.push(" AND p.val LIKE ");
            b.bind(Value::String(pattern));
            b.push(" ESCAPE '\\')");
            Ok(b)
        }
        Side::Column(col) => {
            let mut b = SqlBuilder::new();
            b.push("q.");
            b.push_name(&col);
            b.push(" LIKE ");
            b.bind(Value::String(pattern));
            b.push(" ESCAPE '\\'");
            Ok(b)
        }
        Side::RelProp { var, key } => {
            let mut b = SqlBuilder::new();
            b.push(sql::FN_JSON_VALUE).push("(q.");
            b.push_name(&format!("{var}__q"));
            b.push(", ");
            b.bind(Value::String(format!("$.{key}")));
            b.push(") LIKE ");
            b.bind(Value::String(pattern));
            b.push(" ESCAPE '\\'");
            Ok(b)
        }
        Side::Value(_) => Err(Error::Validation(
            "string predicates require a property or variable on the left".into(),
        )),
    }
}

// ============================================================================
// ORDER BY
// ============================================================================

/// Lower one ORDER BY item.
///
/// Property references sort with three keys — null-flag, safe numeric
/// cast, raw text — giving numeric order when values parse, lexical order
/// otherwise, and missing values last in either direction.
pub(super) fn lower_order(t: &Translator, order: &OrderExpr) -> Result<SqlBuilder> {
    let dir = if order.ascending { " ASC" } else { " DESC" };

    match &order.expr {
        Expr::Property { variable, key } => {
            let value = property_fragment(t, variable, key)?;
            if matches!(t.env.get(variable), Some(BindKind::Node)) && key == "id" {
                let mut b = value;
                b.push(dir);
                return Ok(b);
            }
            let mut b = SqlBuilder::new();
            b.push("CASE WHEN ");
            b.append(value.clone());
            b.push(" IS NULL THEN 1 ELSE 0 END, TRY_CAST(");
            b.append(value.clone());
            b.push(" AS DOUBLE)");
            b.push(dir);
            b.push(", ");
            b.append(value);
            b.push(dir);
            Ok(b)
        }
        Expr::Variable(var) => match t.env.get(var) {
            Some(BindKind::Node) | Some(BindKind::Scalar) => {
                let mut b = column(var);
                b.push(dir);
                Ok(b)
            }
            Some(BindKind::Rel) => Err(Error::Validation(
                "cannot order by a relationship; use type() or a property".into(),
            )),
            None => Err(unknown_variable(var)),
        },
        Expr::FunctionCall { func: Func::Type, arg: FuncArg::Variable(var) } => {
            require_kind(t, var, BindKind::Rel)?;
            let mut b = SqlBuilder::new();
            b.push("q.");
            b.push_name(&format!("{var}__p"));
            b.push(dir);
            Ok(b)
        }
        _ => Err(Error::Validation("cannot order by this expression".into())),
    }
}
