use crate::expr::{double, is_integer_or_decimal_sql, is_integer_sql, is_numeric_sql, KnownType, TermSql};
use crate::fragment::{column_alias, select_list, term_columns, Binding, Scope, SqlFragment, FIELDS};
use crate::sql_text::{quote, NULL_TEXT};
use crate::SqlCompiler;
use kgsql_common::CompileResult;
use kgsql_logical::{AggregateCall, AggregateKind, PlanExpression, QueryPlanNode};
use kgsql_model::vocab::xsd;
use kgsql_model::Variable;

impl SqlCompiler<'_> {
    /// `GROUP BY` with aggregates and an optional `HAVING` condition.
    ///
    /// Without grouping variables the statement produces exactly one row, even over no input.
    pub(crate) fn group(
        &mut self,
        inner: &QueryPlanNode,
        variables: &[Variable],
        aggregates: &[(Variable, AggregateCall)],
        having: Option<&PlanExpression>,
    ) -> CompileResult<SqlFragment> {
        let inner = self.compile_node(inner)?;
        let alias = self.next_alias();
        let scope = Scope::of(&alias, &inner.bindings);

        let mut bindings = Vec::new();
        let mut columns = Vec::new();
        let mut group_by = Vec::new();
        let mut having_scope = Scope::default();
        for variable in variables {
            let slot = self.slot(variable);
            let (term, nullable) = match inner.binding(variable) {
                Some(binding) => {
                    let term = TermSql::columns(&alias, binding.slot);
                    group_by.extend([
                        term.value.clone(),
                        term.datatype.clone(),
                        term.language.clone(),
                    ]);
                    (term, binding.nullable)
                }
                None => (TermSql::null(), true),
            };
            columns.extend(term_columns(slot, &term));
            having_scope.insert(variable.clone(), term);
            bindings.push(Binding {
                variable: variable.clone(),
                slot,
                nullable,
            });
        }
        for (variable, call) in aggregates {
            let slot = self.slot(variable);
            let term = self.aggregate(call, &scope, &inner.bindings, &alias)?;
            columns.extend(term_columns(slot, &term));
            bindings.push(Binding {
                variable: variable.clone(),
                slot,
                nullable: !term.constant,
            });
            having_scope.insert(variable.clone(), term);
        }

        if inner.empty && !variables.is_empty() {
            return Ok(SqlFragment::empty(bindings, inner.tables));
        }

        let mut sql = format!(
            "SELECT {} FROM ({}) AS {alias}",
            select_list(columns),
            inner.sql
        );
        if !group_by.is_empty() {
            sql.push_str(&format!(" GROUP BY {}", group_by.join(", ")));
        }
        if let Some(having) = having {
            let condition = self.compile_bool(having, &having_scope)?;
            sql.push_str(&format!(" HAVING {condition}"));
        }
        Ok(SqlFragment::new(sql, bindings, inner.tables))
    }

    fn aggregate(
        &mut self,
        call: &AggregateCall,
        scope: &Scope,
        bindings: &[Binding],
        alias: &str,
    ) -> CompileResult<TermSql> {
        let (kind, expression, distinct) = match call {
            AggregateCall::CountAll { distinct: false } => {
                return Ok(count("COUNT(*)".to_owned()));
            }
            AggregateCall::CountAll { distinct: true } => {
                let key = bindings
                    .iter()
                    .flat_map(|b| {
                        FIELDS.map(|field| {
                            format!("COALESCE({alias}.{}, '')", column_alias(b.slot, field))
                        })
                    })
                    .collect::<Vec<_>>();
                let key = if key.is_empty() {
                    "''".to_owned()
                } else {
                    key.join(" || '|' || ")
                };
                return Ok(count(format!("COUNT(DISTINCT {key})")));
            }
            AggregateCall::Function {
                kind,
                expression,
                distinct,
            } => (kind, expression, *distinct),
        };

        let term = self.compile_term(expression, scope)?;
        let distinct = if distinct { "DISTINCT " } else { "" };
        let v = &term.value;
        Ok(match kind {
            AggregateKind::Count => {
                if distinct.is_empty() {
                    count(format!("COUNT({v})"))
                } else {
                    count(format!("COUNT(DISTINCT {})", term_key(&term)))
                }
            }
            AggregateKind::Sum => {
                let all_integers = all_rows(&term, &is_integer_sql(&term), true);
                let all_decimals = all_rows(&term, &is_integer_or_decimal_sql(&term), true);
                let numeric = is_numeric_sql(&term);
                let integer = is_integer_sql(&term);
                TermSql {
                    value: format!(
                        "CASE WHEN {all_integers} \
                         THEN CAST(COALESCE(SUM({distinct}CASE WHEN {integer} THEN CAST({v} AS BIGINT) END), 0) AS TEXT) \
                         ELSE CAST(COALESCE(SUM({distinct}CASE WHEN {numeric} THEN {} END), 0) AS TEXT) END",
                        double(v)
                    ),
                    datatype: numeric_datatype(&all_integers, &all_decimals),
                    language: NULL_TEXT.to_owned(),
                    known: None,
                    constant: true,
                }
            }
            AggregateKind::Avg => {
                let all_decimals = all_rows(&term, &is_integer_or_decimal_sql(&term), true);
                let numeric = is_numeric_sql(&term);
                TermSql {
                    value: format!(
                        "CAST(COALESCE(AVG({distinct}CASE WHEN {numeric} THEN {} END), 0) AS TEXT)",
                        double(v)
                    ),
                    datatype: format!(
                        "CASE WHEN {all_decimals} THEN {} ELSE {} END",
                        quote(xsd::DECIMAL.as_str()),
                        quote(xsd::DOUBLE.as_str())
                    ),
                    language: NULL_TEXT.to_owned(),
                    known: None,
                    constant: true,
                }
            }
            AggregateKind::Min | AggregateKind::Sample => extremum("MIN", &term),
            AggregateKind::Max => extremum("MAX", &term),
            AggregateKind::GroupConcat { separator } => {
                let separator = self.params.placeholder(separator);
                TermSql {
                    value: format!("COALESCE(STRING_AGG({distinct}{v}, {separator}), '')"),
                    datatype: quote(xsd::STRING.as_str()),
                    language: NULL_TEXT.to_owned(),
                    known: Some(KnownType::String),
                    constant: true,
                }
            }
        })
    }
}

fn count(aggregate: String) -> TermSql {
    TermSql {
        value: format!("CAST({aggregate} AS TEXT)"),
        datatype: quote(xsd::INTEGER.as_str()),
        language: NULL_TEXT.to_owned(),
        known: Some(KnownType::Integer),
        constant: true,
    }
}

/// A single text value identifying a term, for `DISTINCT` inside aggregates.
fn term_key(term: &TermSql) -> String {
    format!(
        "{} || '|' || COALESCE({}, '') || '|' || COALESCE({}, '')",
        term.value, term.datatype, term.language
    )
}

/// Whether `test` holds for every bound value of the group. `if_empty` is used for groups
/// without bound values.
fn all_rows(term: &TermSql, test: &str, if_empty: bool) -> String {
    format!(
        "COALESCE(BOOL_AND(CASE WHEN {} IS NOT NULL THEN COALESCE({test}, FALSE) END), {})",
        term.value,
        if if_empty { "TRUE" } else { "FALSE" }
    )
}

fn numeric_datatype(all_integers: &str, all_decimals: &str) -> String {
    format!(
        "CASE WHEN {all_integers} THEN {} WHEN {all_decimals} THEN {} ELSE {} END",
        quote(xsd::INTEGER.as_str()),
        quote(xsd::DECIMAL.as_str()),
        quote(xsd::DOUBLE.as_str())
    )
}

/// `MIN` or `MAX`. Numbers compare by value if the whole group is numeric, everything else
/// compares lexically.
fn extremum(function: &str, term: &TermSql) -> TermSql {
    let v = &term.value;
    let all_integers = all_rows(term, &is_integer_sql(term), false);
    let all_numbers = all_rows(term, &is_numeric_sql(term), false);
    let all_decimals = all_rows(term, &is_integer_or_decimal_sql(term), false);
    let integer = is_integer_sql(term);
    let numeric = is_numeric_sql(term);

    // The lexical result keeps its datatype and language only if the whole group agrees on them.
    let uniform = format!(
        "MIN(COALESCE({dt}, '')) = MAX(COALESCE({dt}, '')) \
         AND MIN(COALESCE({lang}, '')) = MAX(COALESCE({lang}, ''))",
        dt = term.datatype,
        lang = term.language
    );
    TermSql {
        value: format!(
            "CASE WHEN {all_integers} THEN CAST({function}(CASE WHEN {integer} THEN CAST({v} AS BIGINT) END) AS TEXT) \
             WHEN {all_numbers} THEN CAST({function}(CASE WHEN {numeric} THEN {} END) AS TEXT) \
             ELSE {function}({v}) END",
            double(v)
        ),
        datatype: format!(
            "CASE WHEN COUNT({v}) = 0 THEN {NULL_TEXT} \
             WHEN {all_integers} THEN {} \
             WHEN {all_numbers} THEN CASE WHEN {all_decimals} THEN {} ELSE {} END \
             WHEN {uniform} THEN MIN({}) ELSE {} END",
            quote(xsd::INTEGER.as_str()),
            quote(xsd::DECIMAL.as_str()),
            quote(xsd::DOUBLE.as_str()),
            term.datatype,
            quote(xsd::STRING.as_str())
        ),
        language: format!(
            "CASE WHEN COUNT({v}) > 0 AND NOT {all_numbers} AND {uniform} \
             THEN NULLIF(MIN(COALESCE({}, '')), '') END",
            term.language
        ),
        known: None,
        constant: false,
    }
}
