use crate::fragment::{column_alias, select_list, Binding, SqlFragment};
use crate::sql_text::{quote, NULL_TEXT};
use crate::SqlCompiler;
use kgsql_encoding::{
    candidate_tables, ObjectShape, StorableField, TableKind, COL_DATATYPE,
    COL_LANGUAGE, COL_OBJECT, COL_PREDICATE, COL_SUBJECT,
};
use kgsql_logical::{PatternTerm, StatementPattern};
use kgsql_model::vocab::rdf;
use kgsql_model::{Term, Variable};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    Subject,
    Predicate,
    Object,
}

impl SqlCompiler<'_> {
    /// Translates one statement pattern into a scan of every table that may hold a match.
    ///
    /// The tables are combined with `UNION ALL`. They are disjoint, so no duplicate elimination
    /// is needed.
    pub(crate) fn translate_pattern(&mut self, pattern: &StatementPattern) -> SqlFragment {
        let variables = pattern_variables(pattern);
        let bindings = variables
            .iter()
            .map(|variable| Binding {
                variable: variable.clone(),
                slot: self.slot(variable),
                nullable: false,
            })
            .collect::<Vec<_>>();

        if matches!(&pattern.subject, PatternTerm::Bound(Term::Literal(_))) {
            return SqlFragment::empty(bindings, Vec::new());
        }
        let predicate = match &pattern.predicate {
            PatternTerm::Bound(Term::NamedNode(predicate)) => Some(predicate.as_ref()),
            PatternTerm::Bound(_) => return SqlFragment::empty(bindings, Vec::new()),
            PatternTerm::Variable(_) => None,
        };
        let shape = match &pattern.object {
            PatternTerm::Bound(object) => ObjectShape::from(object.as_ref()),
            PatternTerm::Variable(_) => ObjectShape::Unknown,
        };

        let mut branches = Vec::new();
        let mut tables = Vec::new();
        for table in candidate_tables(predicate, shape) {
            if let Some(sql) = self.table_scan(*table, pattern, &bindings) {
                branches.push(sql);
                tables.push(*table);
            }
        }

        if branches.is_empty() {
            return SqlFragment::empty(bindings, tables);
        }
        SqlFragment::new(branches.join(" UNION ALL "), bindings, tables)
    }

    /// The `SELECT` over one table. `None` if the table can never hold a match.
    fn table_scan(
        &mut self,
        table: TableKind,
        pattern: &StatementPattern,
        bindings: &[Binding],
    ) -> Option<String> {
        let positions = [
            (Position::Subject, &pattern.subject),
            (Position::Predicate, &pattern.predicate),
            (Position::Object, &pattern.object),
        ];
        let mut conditions = Vec::new();
        let mut seen: Vec<(&Variable, Position)> = Vec::new();

        for (position, term) in positions {
            let column = column_expression(table, position);
            match term {
                PatternTerm::Bound(term) => {
                    if position == Position::Predicate && !table.has_predicate_column() {
                        // Only `rdf:type` patterns reach the type table.
                        continue;
                    }
                    let value = self.codec.encode(term.as_ref());
                    conditions.push(format!("{column} = {}", self.params.placeholder(&value.value)));
                    if position == Position::Object && table.has_literal_columns() {
                        let datatype = value.datatype.as_deref().unwrap_or_default();
                        conditions.push(format!(
                            "{COL_DATATYPE} = {}",
                            self.params.placeholder(datatype)
                        ));
                        conditions.push(format!(
                            "{COL_LANGUAGE} = {}",
                            self.params.placeholder(value.stored_language())
                        ));
                    }
                }
                PatternTerm::Variable(variable) => {
                    match seen.iter().find(|(v, _)| *v == variable) {
                        Some((_, first)) => {
                            if table.has_literal_columns() && position == Position::Object {
                                // A resource position never equals a literal object.
                                return None;
                            }
                            conditions.push(format!(
                                "{} = {column}",
                                column_expression(table, *first)
                            ));
                        }
                        None => seen.push((variable, position)),
                    }
                }
            }
        }

        let mut columns = Vec::new();
        for binding in bindings {
            let position = seen
                .iter()
                .find(|(v, _)| **v == binding.variable)
                .map_or(Position::Subject, |(_, p)| *p);
            let (datatype, language) = if position == Position::Object && table.has_literal_columns()
            {
                (
                    COL_DATATYPE.to_owned(),
                    format!("NULLIF({COL_LANGUAGE}, '')"),
                )
            } else {
                (NULL_TEXT.to_owned(), NULL_TEXT.to_owned())
            };
            columns.push(format!(
                "{} AS {}",
                column_expression(table, position),
                column_alias(binding.slot, StorableField::Value)
            ));
            columns.push(format!(
                "{datatype} AS {}",
                column_alias(binding.slot, StorableField::DataType)
            ));
            columns.push(format!(
                "{language} AS {}",
                column_alias(binding.slot, StorableField::Language)
            ));
        }

        let mut sql = format!(
            "SELECT {} FROM {}",
            select_list(columns),
            self.schema.table_name(table)
        );
        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }
        Some(sql)
    }
}

fn column_expression(table: TableKind, position: Position) -> String {
    match position {
        Position::Subject => COL_SUBJECT.to_owned(),
        Position::Predicate if table.has_predicate_column() => COL_PREDICATE.to_owned(),
        Position::Predicate => format!("CAST({} AS TEXT)", quote(rdf::TYPE.as_str())),
        Position::Object => COL_OBJECT.to_owned(),
    }
}

/// The distinct variables of a pattern in order of first appearance.
fn pattern_variables(pattern: &StatementPattern) -> Vec<Variable> {
    let mut variables = Vec::new();
    for term in [&pattern.subject, &pattern.predicate, &pattern.object] {
        if let Some(variable) = term.as_variable() {
            if !variables.contains(variable) {
                variables.push(variable.clone());
            }
        }
    }
    variables
}
