use crate::results::{QueryResults, QuerySolution, QuerySolutionStream, QueryTripleStream};
use crate::sparql::error::QueryEvaluationError;
use crate::sparql::{QueryExplanation, QueryOptions};
use futures::TryStreamExt;
use kgsql_common::{DecodeError, StorageError, StorageResult};
use kgsql_encoding::{SchemaHandle, StorableValue, TermCodec};
use kgsql_logical::LogicalQuery;
use kgsql_model::{GraphScope, Variable};
use kgsql_sql::{compile_query, CompiledQuery};
use kgsql_storage::{commit, PgStorage};
use spargebra::Query;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::{PgConnection, Postgres, Row, Transaction};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Solutions decoded ahead of the consumer.
const SOLUTION_BUFFER: usize = 256;

/// Lowers `query` and compiles it for the graph of `schema`.
///
/// Nothing is sent to the database. Unsupported constructs are reported here.
pub fn compile(
    query: &Query,
    schema: &SchemaHandle,
    codec: &dyn TermCodec,
) -> Result<(LogicalQuery, CompiledQuery), QueryEvaluationError> {
    let logical = LogicalQuery::try_new(query, schema.scope())?;
    let compiled = compile_query(&logical, schema, codec)?;
    Ok((logical, compiled))
}

/// Evaluates `query` against the graph `scope`.
///
/// The query is compiled completely before any statement is issued. Solutions are decoded while
/// the caller consumes them.
#[tracing::instrument(skip_all, fields(graph = %scope))]
pub async fn evaluate_query(
    storage: &PgStorage,
    scope: &GraphScope,
    query: &Query,
    options: &QueryOptions,
) -> Result<(QueryResults, QueryExplanation), QueryEvaluationError> {
    let planning_time_start = Instant::now();
    let logical = LogicalQuery::try_new(query, scope)?;
    let schema = storage.require_graph(scope).await?;
    let compiled = compile_query(&logical, &schema, storage.cache())?;
    let explanation = QueryExplanation::new(&compiled, planning_time_start.elapsed());
    let timeout = options.timeout.or(storage.config().statement_timeout);

    let results = match logical {
        LogicalQuery::Ask { .. } => QueryResults::Boolean(ask(storage, &compiled, timeout).await?),
        LogicalQuery::Select { .. } => {
            QueryResults::Solutions(solutions(storage, compiled, timeout).await?)
        }
        LogicalQuery::Construct { template, .. } => QueryResults::Graph(QueryTripleStream::new(
            template,
            solutions(storage, compiled, timeout).await?,
        )),
    };
    Ok((results, explanation))
}

async fn ask(
    storage: &PgStorage,
    query: &CompiledQuery,
    timeout: Option<Duration>,
) -> Result<bool, QueryEvaluationError> {
    if query.statically_empty {
        return Ok(false);
    }
    let mut tx = begin_read(storage, timeout).await?;
    let row = bind_parameters(&query.sql, &query.parameters)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| StorageError::database(execution_context(query), e))?;
    commit(tx, "a read transaction").await?;
    Ok(row.is_some())
}

async fn solutions(
    storage: &PgStorage,
    query: CompiledQuery,
    timeout: Option<Duration>,
) -> Result<QuerySolutionStream, QueryEvaluationError> {
    let context = execution_context(&query);
    let CompiledQuery {
        sql,
        parameters,
        variables,
        statically_empty,
        ..
    } = query;
    let variables: Arc<[Variable]> = variables.into();
    if statically_empty {
        tracing::debug!("Skipping a query without solutions");
        return Ok(QuerySolutionStream::empty(variables));
    }

    let mut tx = begin_read(storage, timeout).await?;
    let (sender, receiver) = mpsc::channel(SOLUTION_BUFFER);
    let storage = storage.clone();
    let task_variables = Arc::clone(&variables);
    tokio::spawn(async move {
        let streamed = stream_rows(
            &mut tx,
            &sql,
            &parameters,
            &task_variables,
            storage.cache(),
            &sender,
        )
        .await;
        match streamed {
            Ok(rows) => tracing::debug!(rows, "Streamed query solutions"),
            Err(error) => {
                let error = match error {
                    QueryEvaluationError::Storage(StorageError::TransactionFailure {
                        source,
                        ..
                    }) => StorageError::database(context, source).into(),
                    error => error,
                };
                sender.send(Err(error)).await.ok();
            }
        }
        // The transaction is read only. Dropping it rolls back and returns the connection.
    });
    Ok(QuerySolutionStream::from_channel(variables, receiver))
}

/// Sends every decoded row to `sender`. Stops early once the receiver is gone.
async fn stream_rows(
    conn: &mut PgConnection,
    sql: &str,
    parameters: &[String],
    variables: &Arc<[Variable]>,
    codec: &dyn TermCodec,
    sender: &mpsc::Sender<Result<QuerySolution, QueryEvaluationError>>,
) -> Result<u64, QueryEvaluationError> {
    let mut rows = bind_parameters(sql, parameters).fetch(conn);
    let mut count = 0;
    while let Some(row) = rows
        .try_next()
        .await
        .map_err(|e| StorageError::database("executing the compiled query", e))?
    {
        let solution = decode_row(&row, variables, codec)?;
        if sender.send(Ok(solution)).await.is_err() {
            tracing::debug!("Solution stream dropped by the consumer");
            break;
        }
        count += 1;
    }
    Ok(count)
}

/// Starts a read-only transaction with an optional statement deadline.
async fn begin_read(
    storage: &PgStorage,
    timeout: Option<Duration>,
) -> StorageResult<Transaction<'static, Postgres>> {
    let mut tx = storage.pool().begin().await?;
    sqlx::query("SET TRANSACTION READ ONLY")
        .execute(&mut *tx)
        .await
        .map_err(|e| StorageError::database("starting a read transaction", e))?;
    if let Some(timeout) = timeout {
        set_statement_timeout(&mut tx, timeout).await?;
    }
    Ok(tx)
}

/// Limits the run time of every following statement of the current transaction.
pub(crate) async fn set_statement_timeout(
    conn: &mut PgConnection,
    timeout: Duration,
) -> StorageResult<()> {
    let millis = timeout.as_millis().max(1);
    sqlx::query(&format!("SET LOCAL statement_timeout = {millis}"))
        .execute(conn)
        .await
        .map_err(|e| StorageError::database("setting the statement timeout", e))?;
    Ok(())
}

pub(crate) fn bind_parameters<'q>(
    sql: &'q str,
    parameters: &'q [String],
) -> sqlx::query::Query<'q, Postgres, PgArguments> {
    parameters
        .iter()
        .fold(sqlx::query(sql), |query, parameter| query.bind(parameter.as_str()))
}

/// Decodes the value, datatype and language columns of every variable.
///
/// A `NULL` value column is an unbound variable.
pub(crate) fn decode_row(
    row: &PgRow,
    variables: &Arc<[Variable]>,
    codec: &dyn TermCodec,
) -> Result<QuerySolution, QueryEvaluationError> {
    let mut values = Vec::with_capacity(variables.len());
    for i in 0..variables.len() {
        let term = match text_column(row, 3 * i)? {
            None => None,
            Some(value) => Some(codec.decode(&StorableValue {
                value,
                datatype: text_column(row, 3 * i + 1)?,
                language: text_column(row, 3 * i + 2)?,
            })?),
        };
        values.push(term);
    }
    Ok(QuerySolution::from((Arc::clone(variables), values)))
}

fn text_column(row: &PgRow, index: usize) -> Result<Option<String>, QueryEvaluationError> {
    row.try_get(index).map_err(|e| match e {
        sqlx::Error::ColumnIndexOutOfBounds { .. } => DecodeError::MissingColumn(index).into(),
        e => StorageError::database(format!("reading column {index} of a result row"), e).into(),
    })
}

fn execution_context(query: &CompiledQuery) -> String {
    let tables = query
        .tables
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    format!("executing the compiled query over the {tables} tables")
}
