use kgsql_common::{CompileError, DecodeError, StorageError};
use kgsql_model::NamedNode;
use spargebra::SparqlSyntaxError;
use std::convert::Infallible;
use std::io;

/// How the caller should treat an error.
///
/// A REST layer maps these to status codes: `Client` to 4xx, `Transient` to 503 and `Internal`
/// to 500.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// The query or update is malformed or refers to something that does not exist.
    Client,
    /// Retrying the same request later may succeed.
    Transient,
    /// A bug or a corrupted database.
    Internal,
}

/// A SPARQL evaluation error.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum QueryEvaluationError {
    /// An error in SPARQL parsing.
    #[error(transparent)]
    Parsing(#[from] SparqlSyntaxError),
    /// The query uses a construct that cannot be compiled into SQL.
    #[error(transparent)]
    Compile(#[from] CompileError),
    /// An error from the storage.
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// An error returned during results serialization.
    #[error(transparent)]
    ResultsSerialization(io::Error),
    /// Error when `CREATE` tries to create an already existing graph
    #[error("The graph {0} already exists")]
    GraphAlreadyExists(NamedNode),
    /// Error when `DROP` or `CLEAR` tries to remove a not existing graph
    #[error("The graph {0} does not exist")]
    GraphDoesNotExist(NamedNode),
    /// The results are not a RDF graph
    #[error("The query results are not a RDF graph")]
    NotAGraph,
    #[error("An internal error that likely indicates towards a bug in kgsql: {0}")]
    InternalError(String),
}

impl QueryEvaluationError {
    pub fn internal<T>(cause: String) -> Result<T, Self> {
        Err(QueryEvaluationError::InternalError(cause))
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Parsing(_)
            | Self::Compile(_)
            | Self::GraphAlreadyExists(_)
            | Self::GraphDoesNotExist(_)
            | Self::NotAGraph => ErrorClass::Client,
            Self::Storage(error) if error.is_transient() => ErrorClass::Transient,
            Self::Storage(StorageError::GraphNotFound(_) | StorageError::GraphAlreadyExists(_)) => {
                ErrorClass::Client
            }
            Self::Storage(_) | Self::ResultsSerialization(_) | Self::InternalError(_) => {
                ErrorClass::Internal
            }
        }
    }
}

impl From<Infallible> for QueryEvaluationError {
    #[inline]
    fn from(error: Infallible) -> Self {
        match error {}
    }
}

impl From<DecodeError> for QueryEvaluationError {
    fn from(error: DecodeError) -> Self {
        Self::Storage(error.into())
    }
}

impl From<QueryEvaluationError> for io::Error {
    #[inline]
    fn from(error: QueryEvaluationError) -> Self {
        match error {
            QueryEvaluationError::Parsing(error) => Self::new(io::ErrorKind::InvalidInput, error),
            QueryEvaluationError::Storage(error) => error.into(),
            QueryEvaluationError::ResultsSerialization(error) => error,
            error => Self::other(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spargebra::Query;

    #[test]
    fn syntax_errors_are_client_errors() {
        let error = QueryEvaluationError::from(Query::parse("SELECT ?s WHERE {", None).unwrap_err());
        assert_eq!(error.class(), ErrorClass::Client);
    }

    #[test]
    fn unsupported_shapes_are_client_errors() {
        let error = QueryEvaluationError::from(CompileError::UnsupportedQueryShape(
            "DESCRIBE queries".to_owned(),
        ));
        assert_eq!(error.class(), ErrorClass::Client);
        assert_eq!(error.to_string(), "unsupported query shape: DESCRIBE queries");
    }

    #[test]
    fn pool_and_deadline_errors_are_transient() {
        let pool = QueryEvaluationError::from(StorageError::PoolTimeout);
        let deadline = QueryEvaluationError::from(StorageError::StatementTimeout {
            context: "executing a query".to_owned(),
        });
        assert_eq!(pool.class(), ErrorClass::Transient);
        assert_eq!(deadline.class(), ErrorClass::Transient);
    }

    #[test]
    fn decode_errors_are_internal() {
        let error = QueryEvaluationError::from(DecodeError::inconsistent("empty IRI"));
        assert_eq!(error.class(), ErrorClass::Internal);
    }

    #[test]
    fn missing_graphs_are_client_errors() {
        let error = QueryEvaluationError::from(StorageError::GraphNotFound(
            "http://example.com/g".to_owned(),
        ));
        assert_eq!(error.class(), ErrorClass::Client);
    }
}
