use kgsql_encoding::TableKind;
use kgsql_model::Variable;
use kgsql_sql::CompiledQuery;
use std::fmt::{Display, Formatter};
use std::time::Duration;

/// The SQL statement a query compiles to, without executing it.
#[derive(Debug, Clone)]
pub struct QueryExplanation {
    /// The time spent lowering and compiling the query.
    pub planning_time: Duration,
    pub sql: String,
    pub parameters: Vec<String>,
    pub variables: Vec<Variable>,
    pub tables: Vec<TableKind>,
    /// The query can never return a solution and is not sent to the database.
    pub statically_empty: bool,
}

impl QueryExplanation {
    pub(crate) fn new(query: &CompiledQuery, planning_time: Duration) -> Self {
        Self {
            planning_time,
            sql: query.sql.clone(),
            parameters: query.parameters.clone(),
            variables: query.variables.clone(),
            tables: query.tables.clone(),
            statically_empty: query.statically_empty,
        }
    }
}

impl Display for QueryExplanation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}", self.sql)?;
        for (i, parameter) in self.parameters.iter().enumerate() {
            writeln!(f, "  ${} = {parameter:?}", i + 1)?;
        }
        if self.statically_empty {
            writeln!(f, "  (never executed: the query has no solutions)")?;
        }
        write!(f, "  planned in {:?}", self.planning_time)
    }
}
