use crate::expr::{only_reads, order_keys, term_equal, TermSql};
use crate::fragment::{
    column_alias, merge_tables, passthrough_columns, select_list, term_columns, Binding, Scope,
    SqlFragment, FIELDS,
};
use crate::params::SqlParameters;
use crate::sql_text::NULL_TEXT;
use kgsql_common::{unsupported_err, CompileResult};
use kgsql_encoding::{SchemaHandle, TableKind, TermCodec};
use kgsql_logical::{QueryPlanNode, SortKey};
use kgsql_model::{Term, Variable};
use rustc_hash::FxHashMap;

/// A statement ready to be sent to the database.
#[derive(Debug, Clone)]
pub struct CompiledQuery {
    pub sql: String,
    /// The values of `$1`, `$2`, ... in order. All of them are text.
    pub parameters: Vec<String>,
    /// The variables of the result. Variable `i` is read from the columns `3 * i` (value),
    /// `3 * i + 1` (datatype) and `3 * i + 2` (language).
    pub variables: Vec<Variable>,
    /// The statement can never produce a row and does not need to be executed.
    pub statically_empty: bool,
    /// The statement tables that are read.
    pub tables: Vec<TableKind>,
}

/// Compiles query plans of a single graph into SQL.
///
/// A compiler is used for exactly one statement. Each variable is assigned a column slot on
/// first sight and every fragment uses the same slot for the same variable.
pub struct SqlCompiler<'a> {
    pub(crate) schema: &'a SchemaHandle,
    pub(crate) codec: &'a dyn TermCodec,
    pub(crate) params: SqlParameters,
    slots: FxHashMap<Variable, usize>,
    aliases: usize,
}

impl<'a> SqlCompiler<'a> {
    pub fn new(schema: &'a SchemaHandle, codec: &'a dyn TermCodec) -> Self {
        Self {
            schema,
            codec,
            params: SqlParameters::default(),
            slots: FxHashMap::default(),
            aliases: 0,
        }
    }

    /// Compiles a plan whose solutions are returned row by row.
    pub fn compile_select(mut self, plan: &QueryPlanNode) -> CompileResult<CompiledQuery> {
        let fragment = self.compile_node(plan)?;
        let query = CompiledQuery {
            variables: fragment.bindings.iter().map(|b| b.variable.clone()).collect(),
            statically_empty: fragment.empty,
            tables: fragment.tables,
            sql: fragment.sql,
            parameters: self.params.into_values(),
        };
        tracing::debug!(
            sql = %query.sql,
            parameters = query.parameters.len(),
            statically_empty = query.statically_empty,
            "Compiled SELECT statement"
        );
        Ok(query)
    }

    /// Compiles a plan that is only checked for a solution. The statement returns at most one
    /// row.
    pub fn compile_ask(mut self, plan: &QueryPlanNode) -> CompileResult<CompiledQuery> {
        let fragment = self.compile_node(plan)?;
        let alias = self.next_alias();
        let query = CompiledQuery {
            sql: format!("SELECT 1 AS ok FROM ({}) AS {alias} LIMIT 1", fragment.sql),
            parameters: self.params.into_values(),
            variables: Vec::new(),
            statically_empty: fragment.empty,
            tables: fragment.tables,
        };
        tracing::debug!(sql = %query.sql, "Compiled ASK statement");
        Ok(query)
    }

    pub(crate) fn slot(&mut self, variable: &Variable) -> usize {
        let next = self.slots.len();
        *self.slots.entry(variable.clone()).or_insert(next)
    }

    pub(crate) fn next_alias(&mut self) -> String {
        self.aliases += 1;
        format!("t{}", self.aliases)
    }

    pub(crate) fn compile_node(&mut self, node: &QueryPlanNode) -> CompileResult<SqlFragment> {
        match node {
            QueryPlanNode::Pattern(pattern) => Ok(self.translate_pattern(pattern)),
            QueryPlanNode::Values { variables, rows } => Ok(self.values(variables, rows)),
            QueryPlanNode::Join { left, right } => {
                if is_unit(left) {
                    return self.compile_node(right);
                }
                if is_unit(right) {
                    return self.compile_node(left);
                }
                let left = self.compile_node(left)?;
                let right = self.compile_node(right)?;
                Ok(self.join(left, right))
            }
            QueryPlanNode::LeftJoin {
                left,
                right,
                filter,
            } => {
                let left = self.compile_node(left)?;
                let right = self.compile_node(right)?;
                self.left_join(left, right, filter.as_ref())
            }
            QueryPlanNode::Union { left, right } => {
                let left = self.compile_node(left)?;
                let right = self.compile_node(right)?;
                Ok(self.union(left, right))
            }
            QueryPlanNode::Minus { left, right } => {
                let left = self.compile_node(left)?;
                let right = self.compile_node(right)?;
                Ok(self.minus(left, right))
            }
            QueryPlanNode::Filter { inner, expression } => {
                let inner = self.compile_node(inner)?;
                if inner.empty {
                    return Ok(inner);
                }
                let alias = self.next_alias();
                let scope = Scope::of(&alias, &inner.bindings);
                let condition = self.compile_bool(expression, &scope)?;
                let sql = format!(
                    "SELECT {} FROM ({}) AS {alias} WHERE {condition}",
                    select_list(passthrough_columns(&alias, &inner.bindings)),
                    inner.sql
                );
                Ok(SqlFragment::new(sql, inner.bindings, inner.tables))
            }
            QueryPlanNode::Extend {
                inner,
                variable,
                expression,
            } => {
                let inner = self.compile_node(inner)?;
                if inner.binding(variable).is_some() {
                    return unsupported_err!("BIND of the already bound variable {variable}");
                }
                let slot = self.slot(variable);
                let mut bindings = inner.bindings.clone();
                bindings.push(Binding {
                    variable: variable.clone(),
                    slot,
                    nullable: true,
                });
                if inner.empty {
                    return Ok(SqlFragment::empty(bindings, inner.tables));
                }
                let alias = self.next_alias();
                let scope = Scope::of(&alias, &inner.bindings);
                let term = self.compile_term(expression, &scope)?;
                if let Some(binding) = bindings.last_mut() {
                    binding.nullable = !term.constant;
                }
                let mut columns = passthrough_columns(&alias, &inner.bindings);
                columns.extend(term_columns(slot, &term));
                let sql = format!("SELECT {} FROM ({}) AS {alias}", columns.join(", "), inner.sql);
                Ok(SqlFragment::new(sql, bindings, inner.tables))
            }
            QueryPlanNode::Group {
                inner,
                variables,
                aggregates,
                having,
            } => self.group(inner, variables, aggregates, having.as_ref()),
            QueryPlanNode::OrderBy { .. }
            | QueryPlanNode::Slice { .. }
            | QueryPlanNode::Project { .. }
            | QueryPlanNode::Distinct { .. } => self.select_statement(node),
        }
    }

    /// Inline data as a `UNION ALL` of constant rows.
    fn values(&mut self, variables: &[Variable], rows: &[Vec<Option<Term>>]) -> SqlFragment {
        let bindings = variables
            .iter()
            .enumerate()
            .map(|(i, variable)| Binding {
                variable: variable.clone(),
                slot: self.slot(variable),
                nullable: rows.iter().any(|row| row.get(i).map_or(true, Option::is_none)),
            })
            .collect::<Vec<_>>();
        if rows.is_empty() {
            return SqlFragment::empty(bindings, Vec::new());
        }

        let mut selects = Vec::with_capacity(rows.len());
        for row in rows {
            let mut columns = Vec::new();
            for (i, binding) in bindings.iter().enumerate() {
                let term = match row.get(i) {
                    Some(Some(term)) => self.constant(term),
                    _ => TermSql::null(),
                };
                columns.extend(term_columns(binding.slot, &term));
            }
            selects.push(format!("SELECT {}", select_list(columns)));
        }
        SqlFragment::new(selects.join(" UNION ALL "), bindings, Vec::new())
    }

    fn join(&mut self, left: SqlFragment, right: SqlFragment) -> SqlFragment {
        let tables = merge_tables(&left.tables, &right.tables);
        let (bindings, _) = combine_bindings(&left, &right, |l, r| l && r);
        if left.empty || right.empty {
            return SqlFragment::empty(bindings, tables);
        }

        let (la, ra) = (self.next_alias(), self.next_alias());
        let conditions = join_conditions(&la, &ra, &left, &right);
        let columns = joined_columns(&la, &ra, &left, &right);
        let sql = if conditions.is_empty() {
            format!(
                "SELECT {} FROM ({}) AS {la} CROSS JOIN ({}) AS {ra}",
                select_list(columns),
                left.sql,
                right.sql
            )
        } else {
            format!(
                "SELECT {} FROM ({}) AS {la} INNER JOIN ({}) AS {ra} ON {}",
                select_list(columns),
                left.sql,
                right.sql,
                conditions.join(" AND ")
            )
        };
        SqlFragment::new(sql, bindings, tables)
    }

    fn left_join(
        &mut self,
        left: SqlFragment,
        right: SqlFragment,
        filter: Option<&kgsql_logical::PlanExpression>,
    ) -> CompileResult<SqlFragment> {
        let tables = merge_tables(&left.tables, &right.tables);
        let (mut bindings, right_only) = combine_bindings(&left, &right, |l, r| l && r);
        for binding in &mut bindings {
            if right_only.contains(&binding.variable) {
                binding.nullable = true;
            }
        }
        if left.empty {
            return Ok(SqlFragment::empty(bindings, tables));
        }

        let (la, ra) = (self.next_alias(), self.next_alias());
        let mut conditions = join_conditions(&la, &ra, &left, &right);
        if let Some(filter) = filter {
            let mut scope = Scope::of(&ra, &right.bindings);
            for binding in &left.bindings {
                let term = match right.binding(&binding.variable) {
                    Some(other) if binding.nullable || other.nullable => {
                        merged_term(&la, &ra, binding.slot)
                    }
                    _ => TermSql::columns(&la, binding.slot),
                };
                scope.insert(binding.variable.clone(), term);
            }
            conditions.push(self.compile_bool(filter, &scope)?);
        }
        let condition = if conditions.is_empty() {
            "TRUE".to_owned()
        } else {
            conditions.join(" AND ")
        };
        let sql = format!(
            "SELECT {} FROM ({}) AS {la} LEFT JOIN ({}) AS {ra} ON {condition}",
            select_list(joined_columns(&la, &ra, &left, &right)),
            left.sql,
            right.sql
        );
        Ok(SqlFragment::new(sql, bindings, tables))
    }

    fn union(&mut self, left: SqlFragment, right: SqlFragment) -> SqlFragment {
        let tables = merge_tables(&left.tables, &right.tables);
        if left.empty && !right.empty {
            return SqlFragment { tables, ..right };
        }
        if right.empty {
            return SqlFragment { tables, ..left };
        }

        let (mut bindings, _) = combine_bindings(&left, &right, |l, r| l || r);
        for binding in &mut bindings {
            if left.binding(&binding.variable).is_none() || right.binding(&binding.variable).is_none()
            {
                binding.nullable = true;
            }
        }
        let (la, ra) = (self.next_alias(), self.next_alias());
        let side = |alias: &str, fragment: &SqlFragment| {
            let columns = bindings
                .iter()
                .flat_map(|b| {
                    FIELDS.map(|field| {
                        let column = column_alias(b.slot, field);
                        match fragment.binding(&b.variable) {
                            Some(_) => format!("{alias}.{column} AS {column}"),
                            None => format!("{NULL_TEXT} AS {column}"),
                        }
                    })
                })
                .collect::<Vec<_>>();
            format!(
                "SELECT {} FROM ({}) AS {alias}",
                select_list(columns),
                fragment.sql
            )
        };
        let sql = format!("{} UNION ALL {}", side(&la, &left), side(&ra, &right));
        SqlFragment::new(sql, bindings, tables)
    }

    fn minus(&mut self, left: SqlFragment, right: SqlFragment) -> SqlFragment {
        let shared = left
            .bindings
            .iter()
            .filter_map(|l| right.binding(&l.variable).map(|r| (l, r)))
            .collect::<Vec<_>>();
        if left.empty || right.empty || shared.is_empty() {
            return left;
        }

        let (la, ra) = (self.next_alias(), self.next_alias());
        let mut conditions = Vec::new();
        let mut some_shared_bound = Vec::new();
        for (l, r) in &shared {
            let (lt, rt) = (TermSql::columns(&la, l.slot), TermSql::columns(&ra, r.slot));
            conditions.push(compatible(&lt, l.nullable, &rt, r.nullable));
            if l.nullable || r.nullable {
                some_shared_bound.push(format!(
                    "({} IS NOT NULL AND {} IS NOT NULL)",
                    lt.value, rt.value
                ));
            }
        }
        if some_shared_bound.len() == shared.len() {
            conditions.push(format!("({})", some_shared_bound.join(" OR ")));
        }
        let tables = merge_tables(&left.tables, &right.tables);
        let sql = format!(
            "SELECT {} FROM ({}) AS {la} WHERE NOT EXISTS (SELECT 1 FROM ({}) AS {ra} WHERE {})",
            select_list(passthrough_columns(&la, &left.bindings)),
            left.sql,
            right.sql,
            conditions.join(" AND ")
        );
        SqlFragment::new(sql, left.bindings, tables)
    }

    /// Compiles the solution modifiers `Slice(Distinct(Project(OrderBy(...))))`. Each of them is
    /// optional.
    fn select_statement(&mut self, node: &QueryPlanNode) -> CompileResult<SqlFragment> {
        let mut node = node;
        let (mut offset, mut limit) = (0, None);
        if let QueryPlanNode::Slice {
            inner,
            offset: o,
            limit: l,
        } = node
        {
            (offset, limit) = (*o, *l);
            node = inner.as_ref();
        }
        let mut distinct = false;
        if let QueryPlanNode::Distinct { inner } = node {
            distinct = true;
            node = inner.as_ref();
        }
        let mut projection = None;
        if let QueryPlanNode::Project { inner, variables } = node {
            projection = Some(variables.as_slice());
            node = inner.as_ref();
        }
        let mut keys: &[SortKey] = &[];
        if let QueryPlanNode::OrderBy { inner, keys: k } = node {
            keys = k.as_slice();
            node = inner.as_ref();
        }

        let core = self.compile_node(node)?;
        let alias = self.next_alias();
        let mut columns = Vec::new();
        let bindings = match projection {
            Some(variables) => {
                let mut bindings = Vec::with_capacity(variables.len());
                for variable in variables {
                    match core.binding(variable) {
                        Some(binding) => {
                            columns.extend(passthrough_columns(&alias, std::slice::from_ref(binding)));
                            bindings.push(binding.clone());
                        }
                        None => {
                            let slot = self.slot(variable);
                            columns.extend(term_columns(slot, &TermSql::null()));
                            bindings.push(Binding {
                                variable: variable.clone(),
                                slot,
                                nullable: true,
                            });
                        }
                    }
                }
                bindings
            }
            None => {
                columns = passthrough_columns(&alias, &core.bindings);
                core.bindings.clone()
            }
        };
        if core.empty {
            return Ok(SqlFragment::empty(bindings, core.tables));
        }

        let paging = paging(offset, limit);
        let sql = if distinct {
            let inner = format!(
                "SELECT DISTINCT {} FROM ({}) AS {alias}",
                select_list(columns),
                core.sql
            );
            let visible = |v: &Variable| bindings.iter().any(|b| &b.variable == v);
            let keys = keys
                .iter()
                .filter(|key| only_reads(&key.expression, &visible))
                .collect::<Vec<_>>();
            if keys.is_empty() {
                format!("{inner}{paging}")
            } else {
                let outer = self.next_alias();
                let scope = Scope::of(&outer, &bindings);
                let order = self.order_by(keys.into_iter(), &scope)?;
                format!(
                    "SELECT {} FROM ({inner}) AS {outer}{order}{paging}",
                    select_list(passthrough_columns(&outer, &bindings))
                )
            }
        } else {
            let scope = Scope::of(&alias, &core.bindings);
            let order = self.order_by(keys.iter(), &scope)?;
            format!(
                "SELECT {} FROM ({}) AS {alias}{order}{paging}",
                select_list(columns),
                core.sql
            )
        };
        Ok(SqlFragment::new(sql, bindings, core.tables))
    }

    fn order_by<'k>(
        &mut self,
        keys: impl Iterator<Item = &'k SortKey>,
        scope: &Scope,
    ) -> CompileResult<String> {
        let mut columns = Vec::new();
        for key in keys {
            let term = self.compile_term(&key.expression, scope)?;
            columns.extend(order_keys(&term, key.descending));
        }
        Ok(if columns.is_empty() {
            String::new()
        } else {
            format!(" ORDER BY {}", columns.join(", "))
        })
    }
}

fn is_unit(node: &QueryPlanNode) -> bool {
    matches!(node, QueryPlanNode::Values { variables, rows } if variables.is_empty() && rows.len() == 1)
}

fn paging(offset: usize, limit: Option<usize>) -> String {
    let mut paging = String::new();
    if let Some(limit) = limit {
        paging.push_str(&format!(" LIMIT {limit}"));
    }
    if offset > 0 {
        paging.push_str(&format!(" OFFSET {offset}"));
    }
    paging
}

/// The bindings of `left` followed by the bindings only in `right`. Shared bindings get their
/// nullability from `nullable`. Also returns the variables only bound by `right`.
fn combine_bindings(
    left: &SqlFragment,
    right: &SqlFragment,
    nullable: impl Fn(bool, bool) -> bool,
) -> (Vec<Binding>, Vec<Variable>) {
    let mut bindings = Vec::with_capacity(left.bindings.len() + right.bindings.len());
    for binding in &left.bindings {
        let mut binding = binding.clone();
        if let Some(other) = right.binding(&binding.variable) {
            binding.nullable = nullable(binding.nullable, other.nullable);
        }
        bindings.push(binding);
    }
    let mut right_only = Vec::new();
    for binding in &right.bindings {
        if left.binding(&binding.variable).is_none() {
            right_only.push(binding.variable.clone());
            bindings.push(binding.clone());
        }
    }
    (bindings, right_only)
}

/// Two possibly unbound terms are compatible if one is unbound or both are equal.
fn compatible(a: &TermSql, a_nullable: bool, b: &TermSql, b_nullable: bool) -> String {
    let equal = term_equal(a, b);
    let mut alternatives = Vec::new();
    if a_nullable {
        alternatives.push(format!("{} IS NULL", a.value));
    }
    if b_nullable {
        alternatives.push(format!("{} IS NULL", b.value));
    }
    if alternatives.is_empty() {
        return equal;
    }
    alternatives.push(equal);
    format!("({})", alternatives.join(" OR "))
}

fn join_conditions(la: &str, ra: &str, left: &SqlFragment, right: &SqlFragment) -> Vec<String> {
    left.bindings
        .iter()
        .filter_map(|l| {
            let r = right.binding(&l.variable)?;
            Some(compatible(
                &TermSql::columns(la, l.slot),
                l.nullable,
                &TermSql::columns(ra, r.slot),
                r.nullable,
            ))
        })
        .collect()
}

/// Prefers the left value of a shared variable and falls back to the right one.
fn merged_term(la: &str, ra: &str, slot: usize) -> TermSql {
    let (l, r) = (TermSql::columns(la, slot), TermSql::columns(ra, slot));
    let pick = |a: &str, b: &str| format!("CASE WHEN {} IS NULL THEN {b} ELSE {a} END", l.value);
    TermSql {
        value: pick(&l.value, &r.value),
        datatype: pick(&l.datatype, &r.datatype),
        language: pick(&l.language, &r.language),
        known: None,
        constant: false,
    }
}

fn joined_columns(la: &str, ra: &str, left: &SqlFragment, right: &SqlFragment) -> Vec<String> {
    let mut columns = Vec::new();
    for binding in &left.bindings {
        match right.binding(&binding.variable) {
            Some(other) if binding.nullable || other.nullable => {
                columns.extend(term_columns(binding.slot, &merged_term(la, ra, binding.slot)));
            }
            _ => columns.extend(passthrough_columns(la, std::slice::from_ref(binding))),
        }
    }
    for binding in &right.bindings {
        if left.binding(&binding.variable).is_none() {
            columns.extend(passthrough_columns(ra, std::slice::from_ref(binding)));
        }
    }
    columns
}
