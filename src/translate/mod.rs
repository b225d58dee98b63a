//! # Translator
//!
//! Lowers a Cypher AST into one parameterised SQL statement: a chain of
//! named CTEs (one per pattern stage, plus the `VecSearch` stage a leading
//! CALL prepends) and a final SELECT computing the RETURN projection.
//!
//! The translator carries an environment mapping each Cypher variable to
//! its column(s) in the current stage, and an appendable stage list. It
//! never interpolates caller-supplied values: labels, predicates, property
//! keys and values, vectors, and limits are all bound. Identifiers reaching
//! SQL text are either whitelisted schema names or generated stage/alias
//! names.
//!
//! Output is deterministic: the same query and parameters produce the same
//! SQL text, and the parameter list always matches the placeholder count
//! (the builder makes any drift impossible).

mod expr;

use tracing::debug;

use crate::cypher::ast::*;
use crate::model::{Params, Value};
use crate::sql::{self, SqlBuilder};
use crate::validate;
use crate::{Error, Result};

// ============================================================================
// Public surface
// ============================================================================

/// How the hydrator should treat a projected item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Plain value column — returned as-is.
    Scalar,
    /// A node id to hydrate into `{id, labels, properties}`.
    NodeId,
    /// JSON array of labels from a correlated subquery.
    Labels,
    /// JSON array of `{k, v}` objects from a correlated subquery.
    Properties,
    /// Five raw columns (`id, s, p, o_id, qualifiers`) forming an edge.
    Edge,
}

impl ColumnKind {
    /// Raw SQL columns this item occupies in a result row.
    pub fn arity(self) -> usize {
        match self {
            ColumnKind::Edge => 5,
            _ => 1,
        }
    }
}

/// One projected item of the result schema.
#[derive(Debug, Clone)]
pub struct OutputColumn {
    pub name: String,
    pub kind: ColumnKind,
}

/// A translated statement: SQL text, ordered parameters, result schema.
#[derive(Debug, Clone)]
pub struct Translation {
    pub sql: String,
    pub params: Vec<Value>,
    pub columns: Vec<OutputColumn>,
}

/// Knobs the engine passes down from its configuration.
#[derive(Debug, Clone)]
pub struct TranslateOptions {
    pub k_default: i64,
    pub k_max: i64,
    /// Upper bound for variable-length patterns; also the default when the
    /// pattern leaves the upper bound open.
    pub max_hops: usize,
    /// Result of the engine's `EMBEDDING()` probe; `None` when not probed.
    pub embedding_available: Option<bool>,
    /// Deployment-wide default for text-mode vector search.
    pub default_embedding_config: Option<String>,
}

impl Default for TranslateOptions {
    fn default() -> Self {
        Self {
            k_default: 50,
            k_max: 1000,
            max_hops: 5,
            embedding_available: None,
            default_embedding_config: None,
        }
    }
}

/// Translate a parsed query against a parameter map.
pub fn translate(
    query: &CypherQuery,
    params: &Params,
    opts: &TranslateOptions,
) -> Result<Translation> {
    let mut t = Translator::new(params, opts);

    if let Some(call) = &query.call {
        t.lower_call(call)?;
    }
    for pattern in &query.patterns {
        t.lower_pattern(pattern)?;
    }

    t.assemble(query)
}

// ============================================================================
// Environment
// ============================================================================

/// What a bound variable denotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BindKind {
    Node,
    Rel,
    Scalar,
}

/// Ordered variable environment: variable name → binding kind. Order is
/// introduction order, which keeps projection and carry lists stable.
#[derive(Debug, Default)]
pub(crate) struct Env {
    vars: Vec<(String, BindKind)>,
}

impl Env {
    pub(crate) fn get(&self, name: &str) -> Option<BindKind> {
        self.vars.iter().find(|(v, _)| v == name).map(|(_, k)| *k)
    }

    fn insert(&mut self, name: &str, kind: BindKind) -> Result<()> {
        match self.get(name) {
            None => {
                self.vars.push((name.to_string(), kind));
                Ok(())
            }
            Some(existing) if existing == kind => Ok(()),
            Some(_) => Err(Error::Validation(format!(
                "variable '{name}' is already bound to a different kind of entity"
            ))),
        }
    }

    /// Column names a variable occupies in a stage projection.
    pub(crate) fn columns_of(name: &str, kind: BindKind) -> Vec<String> {
        match kind {
            BindKind::Node | BindKind::Scalar => vec![name.to_string()],
            BindKind::Rel => ["id", "s", "p", "o", "q"]
                .iter()
                .map(|suffix| format!("{name}__{suffix}"))
                .collect(),
        }
    }

    fn iter(&self) -> impl Iterator<Item = (&str, BindKind)> {
        self.vars.iter().map(|(v, k)| (v.as_str(), *k))
    }
}

// ============================================================================
// Translator state
// ============================================================================

struct Stage {
    name: String,
    body: SqlBuilder,
    recursive: bool,
}

pub(crate) struct Translator<'a> {
    pub(crate) params: &'a Params,
    opts: &'a TranslateOptions,
    pub(crate) env: Env,
    stages: Vec<Stage>,
    counter: usize,
}

/// In-progress pattern stage: carried projection, joins, filters, and the
/// variables this stage introduces. `locals` maps variables bound *within*
/// this stage to their source column, so a pattern can close a cycle on a
/// variable it just introduced.
struct StageDraft {
    select: SqlBuilder,
    from: SqlBuilder,
    wheres: Vec<SqlBuilder>,
    new_vars: Vec<(String, BindKind)>,
    locals: Vec<(String, String)>,
    has_base: bool,
    select_items: usize,
    carried_items: usize,
}

impl StageDraft {
    fn add_select(&mut self, build: impl FnOnce(&mut SqlBuilder)) {
        if self.select_items > 0 {
            self.select.push(", ");
        }
        build(&mut self.select);
        self.select_items += 1;
    }

    /// True once the stage constrains or introduces anything beyond the
    /// carried projection.
    fn touched(&self) -> bool {
        self.select_items > self.carried_items || !self.wheres.is_empty()
    }
}

impl<'a> Translator<'a> {
    fn new(params: &'a Params, opts: &'a TranslateOptions) -> Self {
        Self {
            params,
            opts,
            env: Env::default(),
            stages: Vec::new(),
            counter: 0,
        }
    }

    fn fresh(&mut self, prefix: &str) -> String {
        let id = self.counter;
        self.counter += 1;
        format!("{prefix}{id}")
    }

    /// Resolve a literal-or-parameter expression to a concrete value.
    pub(crate) fn resolve(&self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Literal(lit) => Ok(literal_value(lit)),
            Expr::Parameter(name) => self
                .params
                .get(name)
                .cloned()
                .ok_or_else(|| Error::Validation(format!("missing parameter '${name}'"))),
            _ => Err(Error::Validation(
                "expected a literal or parameter value".into(),
            )),
        }
    }

    // ========================================================================
    // CALL lowering
    // ========================================================================

    /// Rewrite `CALL ivg.vector.search(label, property, input, limit
    /// [, options]) YIELD node, score` into the prepended `VecSearch` CTE.
    fn lower_call(&mut self, call: &CallClause) -> Result<()> {
        if call.procedure != "ivg.vector.search" {
            return Err(Error::Unsupported(format!(
                "unknown procedure '{}': expected ivg.vector.search",
                call.procedure
            )));
        }
        if call.args.len() != 4 {
            return Err(Error::Validation(
                "ivg.vector.search expects (label, property, query_input, limit) \
                 plus an optional options map"
                    .into(),
            ));
        }

        let label = self
            .resolve(&call.args[0])?
            .as_str()
            .map(str::to_owned)
            .ok_or_else(|| Error::Validation("label must be a string".into()))?;
        validate::validate_label(&label)?;

        let property = self
            .resolve(&call.args[1])?
            .as_str()
            .map(str::to_owned)
            .ok_or_else(|| Error::Validation("property must be a string".into()))?;
        validate::validate_property_key(&property)?;

        let input = self.resolve(&call.args[2])?;
        let limit = self.resolve(&call.args[3])?;
        let k = validate::coerce_k(Some(&limit), self.opts.k_default, self.opts.k_max)?;

        let mut similarity = None;
        let mut embedding_config = self.opts.default_embedding_config.clone();
        for (key, value) in &call.options {
            match key.as_str() {
                "similarity" => {
                    similarity = Some(
                        self.resolve(value)?
                            .as_str()
                            .map(str::to_owned)
                            .ok_or_else(|| {
                                Error::Validation("similarity must be a string".into())
                            })?,
                    );
                }
                "embedding_config" => {
                    embedding_config = Some(
                        self.resolve(value)?
                            .as_str()
                            .map(str::to_owned)
                            .ok_or_else(|| {
                                Error::Validation("embedding_config must be a string".into())
                            })?,
                    );
                }
                other => {
                    return Err(Error::Validation(format!("unknown option '{other}'")));
                }
            }
        }
        let similarity = validate::parse_similarity(similarity.as_deref())?;

        for name in &call.yields {
            if name != "node" && name != "score" {
                return Err(Error::Validation(format!(
                    "ivg.vector.search yields 'node' and 'score', not '{name}'"
                )));
            }
        }

        let mut body = SqlBuilder::new();
        body.push("SELECT TOP ");
        body.bind(Value::Int(k));
        body.push(" n.node_id AS node, ")
            .push(similarity.sql_fn())
            .push("(e.emb, ");

        match (&input, input.as_vector()) {
            (_, Some(vector)) => {
                body.push(sql::FN_TO_VECTOR).push("(");
                body.bind(Value::String(
                    serde_json::to_string(&vector).map_err(|e| Error::Internal(e.to_string()))?,
                ));
                body.push(")");
            }
            (Value::String(text), None) => {
                let config = embedding_config.ok_or_else(|| {
                    Error::Validation(
                        "text query input requires the embedding_config option".into(),
                    )
                })?;
                if self.opts.embedding_available != Some(true) {
                    return Err(Error::Unsupported(
                        "query-time text embedding is not available on this database".into(),
                    ));
                }
                body.push(sql::FN_EMBEDDING).push("(");
                body.bind(Value::String(text.clone()));
                body.push(", ");
                body.bind(Value::String(config));
                body.push(")");
            }
            _ => {
                return Err(Error::Validation(
                    "query input must be a vector or a text string".into(),
                ));
            }
        }

        body.push(") AS score FROM ")
            .push(sql::T_NODES)
            .push(" n JOIN ")
            .push(sql::T_LABELS)
            .push(" l ON l.s = n.node_id JOIN ")
            .push(sql::T_EMBEDDINGS)
            .push(" e ON e.id = n.node_id WHERE l.label = ");
        body.bind(Value::String(label));
        body.push(" ORDER BY score DESC");

        self.stages.push(Stage {
            name: "VecSearch".into(),
            body,
            recursive: false,
        });
        for name in &call.yields {
            let kind = if name == "node" { BindKind::Node } else { BindKind::Scalar };
            self.env.insert(name, kind)?;
        }
        Ok(())
    }

    // ========================================================================
    // Pattern lowering
    // ========================================================================

    fn lower_pattern(&mut self, pattern: &Pattern) -> Result<()> {
        let mut draft = self.open_draft();
        let mut left = self.place_start_node(&pattern.start, &mut draft)?;

        for (rel, right) in &pattern.steps {
            if let Some(var_length) = rel.var_length {
                // The recursive walk starts from a carried column, so the
                // left node needs a name even when the pattern leaves it
                // anonymous.
                let start_var = match left.var {
                    Some(var) => var,
                    None => {
                        let internal = self.fresh("hop");
                        let col = left.col.clone();
                        let name = internal.clone();
                        draft.add_select(move |b| {
                            b.push_name(&col);
                            b.push(" AS ");
                            b.push_name(&name);
                        });
                        draft.new_vars.push((internal.clone(), BindKind::Node));
                        internal
                    }
                };
                self.commit_draft(draft)?;
                left = self.lower_var_length(&start_var, rel, var_length, right)?;
                draft = self.open_draft();
            } else {
                left = self.join_step(&left, rel, right, &mut draft)?;
            }
        }

        self.commit_draft(draft)
    }

    /// Start a stage draft that carries every live binding forward.
    fn open_draft(&self) -> StageDraft {
        let mut draft = StageDraft {
            select: SqlBuilder::new(),
            from: SqlBuilder::new(),
            wheres: Vec::new(),
            new_vars: Vec::new(),
            locals: Vec::new(),
            has_base: false,
            select_items: 0,
            carried_items: 0,
        };
        if let Some(prev) = self.stages.last() {
            for (var, kind) in self.env.iter() {
                for col in Env::columns_of(var, kind) {
                    draft.add_select(|b| {
                        b.push("prev.");
                        b.push_name(&col);
                    });
                }
            }
            draft.carried_items = draft.select_items;
            draft.from.push("FROM ");
            draft.from.push_name(&prev.name);
            draft.from.push(" prev");
            draft.has_base = true;
        }
        draft
    }

    /// Close a draft into a named CTE stage and extend the environment.
    /// A draft that neither constrained nor introduced anything is dropped.
    fn commit_draft(&mut self, draft: StageDraft) -> Result<()> {
        if !draft.touched() && !self.stages.is_empty() {
            return Ok(());
        }
        let name = format!("m{}", self.stages.len());
        let mut body = SqlBuilder::new();
        body.push("SELECT ");
        if draft.select_items == 0 {
            // All-anonymous pattern: keep the stage shape with a marker.
            body.push("1 AS matched");
        } else {
            body.append(draft.select);
        }
        body.push(" ");
        body.append(draft.from);
        for (i, cond) in draft.wheres.into_iter().enumerate() {
            body.push(if i == 0 { " WHERE " } else { " AND " });
            body.append(cond);
        }
        for (var, kind) in draft.new_vars {
            self.env.insert(&var, kind)?;
        }
        self.stages.push(Stage { name, body, recursive: false });
        Ok(())
    }

    /// Look up a node variable: previously committed bindings read from the
    /// carried projection, stage-local ones from their source column.
    fn lookup_node(&self, draft: &StageDraft, alias: &str) -> Result<Option<NodeRef>> {
        if let Some((_, col)) = draft.locals.iter().find(|(v, _)| v == alias) {
            return Ok(Some(NodeRef { col: col.clone(), var: Some(alias.to_string()) }));
        }
        match self.env.get(alias) {
            None => Ok(None),
            Some(BindKind::Node) => Ok(Some(NodeRef {
                col: format!("prev.{alias}"),
                var: Some(alias.to_string()),
            })),
            Some(_) => Err(Error::Validation(format!("variable '{alias}' is not a node"))),
        }
    }

    /// Place the leading node of a pattern: reuse its binding when the
    /// variable is already live (e.g. `node` yielded by a CALL), otherwise
    /// scan `nodes`.
    fn place_start_node(
        &mut self,
        np: &NodePattern,
        draft: &mut StageDraft,
    ) -> Result<NodeRef> {
        if let Some(alias) = &np.alias {
            if let Some(node_ref) = self.lookup_node(draft, alias)? {
                self.apply_node_filters(np, &node_ref.col, draft)?;
                return Ok(node_ref);
            }
        }

        let table_alias = self.fresh("n");
        if draft.has_base {
            draft.from.push(" CROSS JOIN ");
        } else {
            draft.from.push("FROM ");
            draft.has_base = true;
        }
        draft.from.push(sql::T_NODES);
        draft.from.push(" ");
        draft.from.push_name(&table_alias);

        let col = format!("{table_alias}.node_id");
        let var = self.bind_node_var(np, &col, draft)?;
        Ok(NodeRef { col, var })
    }

    /// Project a (possibly anonymous) node variable and apply its filters.
    fn bind_node_var(
        &mut self,
        np: &NodePattern,
        col: &str,
        draft: &mut StageDraft,
    ) -> Result<Option<String>> {
        let mut bound = None;
        if let Some(alias) = &np.alias {
            if self.env.get(alias).is_some()
                || draft.new_vars.iter().any(|(v, _)| v == alias)
            {
                return Err(Error::Validation(format!(
                    "variable '{alias}' is bound more than once in this pattern"
                )));
            }
            let col_owned = col.to_string();
            let alias_owned = alias.clone();
            draft.add_select(move |b| {
                b.push_name(&col_owned);
                b.push(" AS ");
                b.push_name(&alias_owned);
            });
            draft.new_vars.push((alias.clone(), BindKind::Node));
            draft.locals.push((alias.clone(), col.to_string()));
            bound = Some(alias.clone());
        }
        self.apply_node_filters(np, col, draft)?;
        Ok(bound)
    }

    /// Label and inline-property filters as EXISTS subqueries.
    fn apply_node_filters(
        &mut self,
        np: &NodePattern,
        col: &str,
        draft: &mut StageDraft,
    ) -> Result<()> {
        for label in &np.labels {
            validate::validate_label(label)?;
            let mut cond = SqlBuilder::new();
            cond.push("EXISTS (SELECT 1 FROM ")
                .push(sql::T_LABELS)
                .push(" l WHERE l.s = ");
            cond.push_name(col);
            cond.push(" AND l.label = ");
            cond.bind(Value::from(label.as_str()));
            cond.push(")");
            draft.wheres.push(cond);
        }
        for (key, value_expr) in &np.properties {
            validate::validate_property_key(key)?;
            let value = self.resolve(value_expr)?;
            let mut cond = SqlBuilder::new();
            cond.push("EXISTS (SELECT 1 FROM ")
                .push(sql::T_PROPS)
                .push(" p WHERE p.s = ");
            cond.push_name(col);
            cond.push(" AND p.key = ");
            cond.bind(Value::from(key.as_str()));
            cond.push(" AND p.val = ");
            cond.bind(stringified(value));
            cond.push(")");
            draft.wheres.push(cond);
        }
        Ok(())
    }

    /// A single-hop relationship step: join `rdf_edges`, then the right
    /// node. Returns the right node's reference for chaining.
    fn join_step(
        &mut self,
        left: &NodeRef,
        rel: &RelPattern,
        right: &NodePattern,
        draft: &mut StageDraft,
    ) -> Result<NodeRef> {
        for rel_type in &rel.rel_types {
            validate::validate_predicate(rel_type)?;
        }

        let bound_right = match &right.alias {
            Some(alias) => self.lookup_node(draft, alias)?,
            None => None,
        };

        let edge = self.fresh("e");
        draft.from.push(" JOIN ");
        draft.from.push(sql::T_EDGES);
        draft.from.push(" ");
        draft.from.push_name(&edge);
        draft.from.push(" ON ");

        let right_ref: NodeRef;
        match (rel.direction, &bound_right) {
            (PatternDirection::Right, None) => {
                push_eq(&mut draft.from, &format!("{edge}.s"), &left.col);
                let node_alias = self.fresh("n");
                push_node_join(&mut draft.from, &node_alias, &format!("{edge}.o_id"));
                right_ref = NodeRef { col: format!("{node_alias}.node_id"), var: None };
            }
            (PatternDirection::Right, Some(bound)) => {
                push_eq(&mut draft.from, &format!("{edge}.s"), &left.col);
                draft.from.push(" AND ");
                push_eq(&mut draft.from, &format!("{edge}.o_id"), &bound.col);
                right_ref = bound.clone();
            }
            (PatternDirection::Left, None) => {
                push_eq(&mut draft.from, &format!("{edge}.o_id"), &left.col);
                let node_alias = self.fresh("n");
                push_node_join(&mut draft.from, &node_alias, &format!("{edge}.s"));
                right_ref = NodeRef { col: format!("{node_alias}.node_id"), var: None };
            }
            (PatternDirection::Left, Some(bound)) => {
                push_eq(&mut draft.from, &format!("{edge}.o_id"), &left.col);
                draft.from.push(" AND ");
                push_eq(&mut draft.from, &format!("{edge}.s"), &bound.col);
                right_ref = bound.clone();
            }
            (PatternDirection::Both, None) => {
                draft.from.push("(");
                push_eq(&mut draft.from, &format!("{edge}.s"), &left.col);
                draft.from.push(" OR ");
                push_eq(&mut draft.from, &format!("{edge}.o_id"), &left.col);
                draft.from.push(")");
                let node_alias = self.fresh("n");
                draft.from.push(" JOIN ");
                draft.from.push(sql::T_NODES);
                draft.from.push(" ");
                draft.from.push_name(&node_alias);
                draft.from.push(" ON ");
                draft.from.push_name(&node_alias);
                draft.from.push(".node_id = CASE WHEN ");
                push_eq(&mut draft.from, &format!("{edge}.s"), &left.col);
                draft.from.push(" THEN ");
                draft.from.push_name(&edge);
                draft.from.push(".o_id ELSE ");
                draft.from.push_name(&edge);
                draft.from.push(".s END");
                right_ref = NodeRef { col: format!("{node_alias}.node_id"), var: None };
            }
            (PatternDirection::Both, Some(bound)) => {
                draft.from.push("((");
                push_eq(&mut draft.from, &format!("{edge}.s"), &left.col);
                draft.from.push(" AND ");
                push_eq(&mut draft.from, &format!("{edge}.o_id"), &bound.col);
                draft.from.push(") OR (");
                push_eq(&mut draft.from, &format!("{edge}.s"), &bound.col);
                draft.from.push(" AND ");
                push_eq(&mut draft.from, &format!("{edge}.o_id"), &left.col);
                draft.from.push("))");
                right_ref = bound.clone();
            }
        }

        if !rel.rel_types.is_empty() {
            let mut cond = SqlBuilder::new();
            cond.push_name(&edge);
            if rel.rel_types.len() == 1 {
                cond.push(".p = ");
                cond.bind(Value::from(rel.rel_types[0].as_str()));
            } else {
                cond.push(".p IN (");
                for (i, rel_type) in rel.rel_types.iter().enumerate() {
                    if i > 0 {
                        cond.push(", ");
                    }
                    cond.bind(Value::from(rel_type.as_str()));
                }
                cond.push(")");
            }
            draft.wheres.push(cond);
        }

        if let Some(alias) = &rel.alias {
            if self.env.get(alias).is_some() || draft.new_vars.iter().any(|(v, _)| v == alias) {
                return Err(Error::Validation(format!(
                    "variable '{alias}' is bound more than once in this pattern"
                )));
            }
            for (suffix, column) in
                [("id", "id"), ("s", "s"), ("p", "p"), ("o", "o_id"), ("q", "qualifiers")]
            {
                let edge = edge.clone();
                let projected = format!("{alias}__{suffix}");
                draft.add_select(move |b| {
                    b.push_name(&edge);
                    b.push(".");
                    b.push_name(column);
                    b.push(" AS ");
                    b.push_name(&projected);
                });
            }
            draft.new_vars.push((alias.clone(), BindKind::Rel));
        }

        match bound_right {
            None => {
                let var = self.bind_node_var(right, &right_ref.col, draft)?;
                Ok(NodeRef { col: right_ref.col, var })
            }
            Some(bound) => {
                self.apply_node_filters(right, &bound.col, draft)?;
                Ok(bound)
            }
        }
    }

    // ========================================================================
    // Variable-length lowering
    // ========================================================================

    /// `-[:T*m..n]->` becomes a recursive CTE walking hop by hop, followed
    /// by a DISTINCT stage that applies the minimum depth and binds the far
    /// node. Unbounded walks are refused: an open upper bound defaults to
    /// the configured maximum, and an explicit bound above it is rejected.
    fn lower_var_length(
        &mut self,
        start_var: &str,
        rel: &RelPattern,
        var_length: VarLength,
        right: &NodePattern,
    ) -> Result<NodeRef> {
        if rel.alias.is_some() {
            return Err(Error::Unsupported(
                "variable-length relationships cannot bind a relationship variable".into(),
            ));
        }
        for rel_type in &rel.rel_types {
            validate::validate_predicate(rel_type)?;
        }
        let min = var_length.min.unwrap_or(1);
        let max = var_length.max.unwrap_or(self.opts.max_hops);
        if max > self.opts.max_hops {
            return Err(Error::Validation(format!(
                "variable-length upper bound {max} exceeds the configured maximum of {}",
                self.opts.max_hops
            )));
        }
        if min > max {
            return Err(Error::Validation(format!(
                "variable-length range {min}..{max} is empty"
            )));
        }

        let prev_name = self
            .stages
            .last()
            .map(|s| s.name.clone())
            .ok_or_else(|| Error::Internal("variable-length step without a stage".into()))?;
        let carried: Vec<String> = self
            .env
            .iter()
            .flat_map(|(var, kind)| Env::columns_of(var, kind))
            .collect();

        // Recursive hop stage
        let walk_name = format!("w{}", self.stages.len());
        let mut body = SqlBuilder::new();
        body.push("SELECT ");
        for col in &carried {
            body.push_name(col);
            body.push(", ");
        }
        body.push_name(start_var);
        body.push(" AS hop_node, 0 AS hop_depth FROM ");
        body.push_name(&prev_name);
        body.push(" UNION ALL SELECT ");
        for col in &carried {
            body.push("r.");
            body.push_name(col);
            body.push(", ");
        }
        match rel.direction {
            PatternDirection::Right => body.push("e.o_id"),
            PatternDirection::Left => body.push("e.s"),
            PatternDirection::Both => {
                body.push("CASE WHEN e.s = r.hop_node THEN e.o_id ELSE e.s END")
            }
        };
        body.push(", r.hop_depth + 1 FROM ");
        body.push_name(&walk_name);
        body.push(" r JOIN ");
        body.push(sql::T_EDGES);
        body.push(" e ON ");
        match rel.direction {
            PatternDirection::Right => body.push("e.s = r.hop_node"),
            PatternDirection::Left => body.push("e.o_id = r.hop_node"),
            PatternDirection::Both => body.push("(e.s = r.hop_node OR e.o_id = r.hop_node)"),
        };
        if !rel.rel_types.is_empty() {
            if rel.rel_types.len() == 1 {
                body.push(" AND e.p = ");
                body.bind(Value::from(rel.rel_types[0].as_str()));
            } else {
                body.push(" AND e.p IN (");
                for (i, rel_type) in rel.rel_types.iter().enumerate() {
                    if i > 0 {
                        body.push(", ");
                    }
                    body.bind(Value::from(rel_type.as_str()));
                }
                body.push(")");
            }
        }
        body.push(" WHERE r.hop_depth < ");
        body.bind(Value::Int(max as i64));
        self.stages.push(Stage { name: walk_name.clone(), body, recursive: true });

        // DISTINCT projection applying the minimum depth and binding the
        // far node (an internal name when the pattern leaves it anonymous).
        let far_var = match &right.alias {
            Some(alias) => {
                if self.env.get(alias).is_some() {
                    return Err(Error::Validation(format!(
                        "variable '{alias}' is bound more than once in this pattern"
                    )));
                }
                alias.clone()
            }
            None => self.fresh("hop"),
        };
        let stage_name = format!("m{}", self.stages.len());
        let mut dist = SqlBuilder::new();
        dist.push("SELECT DISTINCT ");
        for col in &carried {
            dist.push("r.");
            dist.push_name(col);
            dist.push(", ");
        }
        dist.push("r.hop_node AS ");
        dist.push_name(&far_var);
        dist.push(" FROM ");
        dist.push_name(&walk_name);
        dist.push(" r WHERE r.hop_depth >= ");
        dist.bind(Value::Int(min as i64));

        // Label/property filters on the far node ride in the same stage.
        let mut far_filters = StageDraft {
            select: SqlBuilder::new(),
            from: SqlBuilder::new(),
            wheres: Vec::new(),
            new_vars: Vec::new(),
            locals: Vec::new(),
            has_base: true,
            select_items: 0,
            carried_items: 0,
        };
        self.apply_node_filters(right, "r.hop_node", &mut far_filters)?;
        for cond in far_filters.wheres {
            dist.push(" AND ");
            dist.append(cond);
        }

        self.stages.push(Stage { name: stage_name, body: dist, recursive: false });
        self.env.insert(&far_var, BindKind::Node)?;
        Ok(NodeRef { col: format!("prev.{far_var}"), var: Some(far_var) })
    }

    // ========================================================================
    // Final assembly
    // ========================================================================

    fn assemble(&mut self, query: &CypherQuery) -> Result<Translation> {
        let last_stage = self
            .stages
            .last()
            .map(|s| s.name.clone())
            .ok_or_else(|| Error::Internal("no stages were produced".into()))?;

        let plans = expr::plan_return(self, &query.return_items)?;
        let has_aggregate = plans.iter().any(|p| p.aggregate);

        let mut out = SqlBuilder::new();
        out.push(if self.stages.iter().any(|s| s.recursive) {
            "WITH RECURSIVE "
        } else {
            "WITH "
        });
        let stages = std::mem::take(&mut self.stages);
        for (i, stage) in stages.into_iter().enumerate() {
            if i > 0 {
                out.push(", ");
            }
            out.push_name(&stage.name);
            out.push(" AS (");
            out.append(stage.body);
            out.push(")");
        }

        out.push(" SELECT ");
        let mut columns = Vec::new();
        for (i, plan) in plans.iter().enumerate() {
            if i > 0 {
                out.push(", ");
            }
            out.append(plan.fragment.clone());
            columns.push(OutputColumn { name: plan.name.clone(), kind: plan.kind });
        }
        out.push(" FROM ");
        out.push_name(&last_stage);
        out.push(" q");

        if let Some(where_expr) = &query.where_clause {
            out.push(" WHERE ");
            let cond = expr::lower_bool(self, where_expr)?;
            out.append(cond);
        }

        if has_aggregate {
            let group_keys: Vec<_> = plans.iter().filter(|p| !p.aggregate).collect();
            if !group_keys.is_empty() {
                out.push(" GROUP BY ");
                for (i, plan) in group_keys.iter().enumerate() {
                    if i > 0 {
                        out.push(", ");
                    }
                    out.append(plan.group_fragment.clone());
                }
            }
        }

        if !query.order_by.is_empty() {
            out.push(" ORDER BY ");
            for (i, order) in query.order_by.iter().enumerate() {
                if i > 0 {
                    out.push(", ");
                }
                let keys = expr::lower_order(self, order)?;
                out.append(keys);
            }
        } else if !has_aggregate
            && query.call.is_some()
            && self.env.get("score") == Some(BindKind::Scalar)
        {
            // Vector-search results stay score-ordered through downstream
            // MATCH stages unless the caller orders explicitly.
            out.push(" ORDER BY q.score DESC");
        }

        if let Some(limit) = &query.limit {
            let value = self.resolve(limit)?;
            let k = validate::coerce_k(Some(&value), self.opts.k_default, self.opts.k_max)?;
            out.push(" LIMIT ");
            out.bind(Value::Int(k));
        }
        if let Some(skip) = &query.skip {
            let value = self.resolve(skip)?;
            let offset = value
                .as_int()
                .filter(|n| *n >= 0)
                .ok_or_else(|| Error::Validation("SKIP must be a non-negative integer".into()))?;
            out.push(" OFFSET ");
            out.bind(Value::Int(offset));
        }

        debug_assert_eq!(out.placeholder_count(), out.params().len());
        let (sql, params) = out.finish();
        debug!(sql = %sql, params = params.len(), "translated");
        Ok(Translation { sql, params, columns })
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// A node's place in the current stage: its column expression plus the
/// variable it is bound to, when it has one.
#[derive(Debug, Clone)]
struct NodeRef {
    col: String,
    var: Option<String>,
}

fn push_eq(b: &mut SqlBuilder, left: &str, right: &str) {
    b.push_name(left);
    b.push(" = ");
    b.push_name(right);
}

fn push_node_join(b: &mut SqlBuilder, node_alias: &str, edge_col: &str) {
    b.push(" JOIN ");
    b.push(sql::T_NODES);
    b.push(" ");
    b.push_name(node_alias);
    b.push(" ON ");
    b.push_name(node_alias);
    b.push(".node_id = ");
    b.push_name(edge_col);
}

fn literal_value(lit: &Literal) -> Value {
    match lit {
        Literal::Null => Value::Null,
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Int(i) => Value::Int(*i),
        Literal::Float(f) => Value::Float(*f),
        Literal::String(s) => Value::String(s.clone()),
    }
}

/// Property values live in a string column; scalar comparands are rendered
/// to their canonical string form for equality tests.
pub(crate) fn stringified(value: Value) -> Value {
    match value {
        Value::String(_) => value,
        Value::Int(i) => Value::String(i.to_string()),
        Value::Float(f) => Value::String(f.to_string()),
        Value::Bool(b) => Value::String(b.to_string()),
        other => other,
    }
}

#[cfg(test)]
mod tests;
