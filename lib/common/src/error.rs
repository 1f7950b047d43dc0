use kgsql_model::{BlankNodeIdParseError, LanguageTagParseError};
use std::io;

/// The SQLSTATE PostgreSQL reports when a statement is cancelled by `statement_timeout`.
const QUERY_CANCELED: &str = "57014";

/// A stored row does not match any known term encoding.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum DecodeError {
    /// The value, datatype and language columns contradict each other.
    #[error("inconsistent term columns: {0}")]
    Inconsistent(String),
    #[error("invalid blank node label in {value:?}")]
    InvalidBlankNode {
        value: String,
        #[source]
        source: BlankNodeIdParseError,
    },
    #[error("invalid language tag {language:?}")]
    InvalidLanguageTag {
        language: String,
        #[source]
        source: LanguageTagParseError,
    },
    /// A result row has fewer columns than the compiled query promised.
    #[error("result row has no column {0}")]
    MissingColumn(usize),
}

impl DecodeError {
    pub fn inconsistent(msg: impl Into<String>) -> Self {
        Self::Inconsistent(msg.into())
    }
}

/// A query cannot be translated into SQL.
///
/// Raised before any statement is sent to the database.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum CompileError {
    /// An algebra node or function outside the supported subset.
    #[error("unsupported query shape: {0}")]
    UnsupportedQueryShape(String),
}

/// An error related to storage operations (reads, writes, pooling...).
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum StorageError {
    /// No pooled connection became available before the acquire timeout.
    #[error("timed out while waiting for a pooled database connection")]
    PoolTimeout,
    /// The database rejected or aborted a statement. The enclosing transaction was rolled back.
    #[error("{context}")]
    TransactionFailure {
        context: String,
        #[source]
        source: sqlx::Error,
    },
    /// The statement was cancelled by the server because it exceeded its deadline.
    #[error("{context}: statement exceeded its deadline and was cancelled")]
    StatementTimeout { context: String },
    #[error(transparent)]
    Decode(#[from] DecodeError),
    /// Error from the OS I/O layer.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// Two graph identifiers hash to the same table prefix.
    #[error("table prefix {prefix} of graph {graph_id} is already owned by graph {existing}")]
    GraphPrefixCollision {
        graph_id: String,
        prefix: String,
        existing: String,
    },
    #[error("graph {0} does not exist")]
    GraphNotFound(String),
    #[error("graph {0} already exists")]
    GraphAlreadyExists(String),
}

impl StorageError {
    /// Wraps a driver error with the operation it happened in.
    ///
    /// Pool exhaustion and server-side cancellation get their own variants so callers can tell
    /// them apart from genuine failures.
    pub fn database(context: impl Into<String>, source: sqlx::Error) -> Self {
        match source {
            sqlx::Error::PoolTimedOut => Self::PoolTimeout,
            sqlx::Error::Database(db) if db.code().as_deref() == Some(QUERY_CANCELED) => {
                Self::StatementTimeout {
                    context: context.into(),
                }
            }
            source => Self::TransactionFailure {
                context: context.into(),
                source,
            },
        }
    }

    /// Whether retrying the same operation later may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::PoolTimeout | Self::StatementTimeout { .. } | Self::Io(_) => true,
            Self::TransactionFailure { source, .. } => matches!(
                source,
                sqlx::Error::Io(_) | sqlx::Error::PoolClosed | sqlx::Error::WorkerCrashed
            ),
            _ => false,
        }
    }
}

impl From<StorageError> for io::Error {
    #[inline]
    fn from(error: StorageError) -> Self {
        match error {
            StorageError::Io(error) => error,
            StorageError::Decode(error) => Self::new(io::ErrorKind::InvalidData, error),
            error => Self::other(error),
        }
    }
}
