use crate::expr::TermSql;
use crate::sql_text::NULL_TEXT;
use kgsql_encoding::{StorableField, TableKind};
use kgsql_model::Variable;
use rustc_hash::FxHashMap;

/// The column alias of `field` for the variable in `slot`.
pub(crate) fn column_alias(slot: usize, field: StorableField) -> String {
    format!("v{slot}{}", field.alias_suffix())
}

pub(crate) const FIELDS: [StorableField; 3] = [
    StorableField::Value,
    StorableField::DataType,
    StorableField::Language,
];

/// A variable produced by a fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub variable: Variable,
    /// Selects the column aliases `v{slot}`, `v{slot}_dt` and `v{slot}_lang`.
    pub slot: usize,
    /// Whether the variable may be unbound in some rows.
    pub nullable: bool,
}

/// A complete `SELECT` statement producing the solutions of one plan node.
///
/// The statement has three columns per binding, in the order of [SqlFragment::bindings], or a
/// single `nil` column if there are no bindings.
#[derive(Debug, Clone)]
pub struct SqlFragment {
    pub(crate) sql: String,
    pub(crate) bindings: Vec<Binding>,
    /// Statically known to produce no rows.
    pub(crate) empty: bool,
    pub(crate) tables: Vec<TableKind>,
}

impl SqlFragment {
    pub(crate) fn new(sql: String, bindings: Vec<Binding>, tables: Vec<TableKind>) -> Self {
        Self {
            sql,
            bindings,
            empty: false,
            tables,
        }
    }

    /// A fragment that never produces a row.
    pub(crate) fn empty(bindings: Vec<Binding>, tables: Vec<TableKind>) -> Self {
        let columns = bindings
            .iter()
            .flat_map(|b| FIELDS.map(|field| format!("{NULL_TEXT} AS {}", column_alias(b.slot, field))))
            .collect();
        Self {
            sql: format!("SELECT {} WHERE 1 = 0", select_list(columns)),
            bindings,
            empty: true,
            tables,
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    pub fn is_empty(&self) -> bool {
        self.empty
    }

    /// The statement tables this fragment reads from.
    pub fn tables(&self) -> &[TableKind] {
        &self.tables
    }

    pub(crate) fn binding(&self, variable: &Variable) -> Option<&Binding> {
        self.bindings.iter().find(|b| &b.variable == variable)
    }
}

/// Joins select items. A statement without items selects a single `nil` column.
pub(crate) fn select_list(columns: Vec<String>) -> String {
    if columns.is_empty() {
        format!("{NULL_TEXT} AS nil")
    } else {
        columns.join(", ")
    }
}

/// `alias.v1 AS v1, alias.v1_dt AS v1_dt, ...` for every binding.
pub(crate) fn passthrough_columns(alias: &str, bindings: &[Binding]) -> Vec<String> {
    bindings
        .iter()
        .flat_map(|b| {
            FIELDS.map(|field| {
                let column = column_alias(b.slot, field);
                format!("{alias}.{column} AS {column}")
            })
        })
        .collect()
}

/// Select items that bind the variable in `slot` to the given term expressions.
pub(crate) fn term_columns(slot: usize, term: &TermSql) -> [String; 3] {
    [
        format!("{} AS {}", term.value, column_alias(slot, StorableField::Value)),
        format!("{} AS {}", term.datatype, column_alias(slot, StorableField::DataType)),
        format!("{} AS {}", term.language, column_alias(slot, StorableField::Language)),
    ]
}

pub(crate) fn merge_tables(a: &[TableKind], b: &[TableKind]) -> Vec<TableKind> {
    let mut tables = a.iter().chain(b).copied().collect::<Vec<_>>();
    tables.sort_unstable();
    tables.dedup();
    tables
}

/// The terms that variables evaluate to inside an expression.
#[derive(Debug, Default, Clone)]
pub(crate) struct Scope {
    terms: FxHashMap<Variable, TermSql>,
}

impl Scope {
    /// The columns of `bindings` as seen through the table alias `alias`.
    pub(crate) fn of(alias: &str, bindings: &[Binding]) -> Self {
        let mut scope = Self::default();
        for binding in bindings {
            scope.insert(binding.variable.clone(), TermSql::columns(alias, binding.slot));
        }
        scope
    }

    pub(crate) fn insert(&mut self, variable: Variable, term: TermSql) {
        self.terms.insert(variable, term);
    }

    pub(crate) fn get(&self, variable: &Variable) -> Option<&TermSql> {
        self.terms.get(variable)
    }

    pub(crate) fn contains(&self, variable: &Variable) -> bool {
        self.terms.contains_key(variable)
    }
}
