use crate::sparql::error::QueryEvaluationError;
use crate::sparql::{
    compile, evaluate_query, evaluate_update, Query, QueryExplanation, QueryOptions,
    QueryResults, Update, UpdateOptions,
};
use kgsql_model::GraphScope;
use kgsql_storage::PgStorage;
use std::time::Instant;

/// Evaluates SPARQL against the graphs of one database.
///
/// The engine holds no state besides the storage handle. Any number of queries may run
/// concurrently, each on its own pooled connection.
#[derive(Debug, Clone)]
pub struct QueryEngine {
    storage: PgStorage,
}

impl QueryEngine {
    pub fn new(storage: PgStorage) -> Self {
        Self { storage }
    }

    /// Provides access to the storage for writes and graph management.
    pub fn storage(&self) -> &PgStorage {
        &self.storage
    }

    /// Evaluates `query` against the graph `scope`.
    pub async fn execute_query(
        &self,
        scope: &GraphScope,
        query: &Query,
        options: &QueryOptions,
    ) -> Result<(QueryResults, QueryExplanation), QueryEvaluationError> {
        evaluate_query(&self.storage, scope, query, options).await
    }

    /// Executes `update`. Statements without a `GRAPH` go to `scope`.
    pub async fn execute_update(
        &self,
        scope: &GraphScope,
        update: &Update,
        options: &UpdateOptions,
    ) -> Result<(), QueryEvaluationError> {
        evaluate_update(&self.storage, scope, update, options).await
    }

    /// Compiles `query` for the graph `scope` without executing it.
    pub async fn explain(
        &self,
        scope: &GraphScope,
        query: &Query,
    ) -> Result<QueryExplanation, QueryEvaluationError> {
        let start = Instant::now();
        let schema = self.storage.require_graph(scope).await?;
        let (_, compiled) = compile(query, &schema, self.storage.cache())?;
        Ok(QueryExplanation::new(&compiled, start.elapsed()))
    }
}
