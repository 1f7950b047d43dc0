//! [SPARQL](https://www.w3.org/TR/sparql11-overview/) implementation.

pub mod error;
mod eval;
mod explanation;
mod update;

pub use crate::results::{QueryResults, QuerySolution, QuerySolutionStream, QueryTripleStream};
pub use eval::{compile, evaluate_query};
pub use explanation::QueryExplanation;
pub use kgsql_model::{Variable, VariableNameParseError};
pub use spargebra::{Query, SparqlSyntaxError, Update};
pub use update::evaluate_update;

use std::time::Duration;

/// Options for SPARQL query evaluation.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// The deadline of the SQL statement. The server cancels the statement once it elapses.
    pub timeout: Option<Duration>,
}

impl QueryOptions {
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Options for SPARQL update evaluation.
#[derive(Debug, Clone, Default)]
pub struct UpdateOptions {
    /// The deadline of every statement executed for the update.
    pub timeout: Option<Duration>,
}

impl From<QueryOptions> for UpdateOptions {
    #[inline]
    fn from(query_options: QueryOptions) -> Self {
        Self {
            timeout: query_options.timeout,
        }
    }
}
