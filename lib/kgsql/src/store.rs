//! API to access RDF graphs stored in PostgreSQL.
//!
//! The entry point of the module is the [`Store`] struct.

use crate::error::FrameSearchError;
use kgsql_common::StorageError;
use kgsql_engine::sparql::error::QueryEvaluationError;
use kgsql_engine::sparql::{
    Query, QueryExplanation, QueryOptions, QueryResults, Update, UpdateOptions,
};
use kgsql_engine::QueryEngine;
use kgsql_frames::{EntityCriteria, FrameQueryBuilder, FrameQueryOptions};
use kgsql_model::{GraphScope, NamedNode, Term, Triple};
use kgsql_storage::{LoadError, LoadOptions, LoadReport, PgStorage, StoreConfig};
use std::io::Read;
use tokio_util::sync::CancellationToken;

/// A set of RDF graphs stored in one PostgreSQL database.
///
/// Every operation names the graph it works on with a [GraphScope]. The store can be updated
/// and queried using [SPARQL](https://www.w3.org/TR/sparql11-query) and cloned cheaply.
#[derive(Debug, Clone)]
pub struct Store {
    engine: QueryEngine,
    frames: FrameQueryBuilder,
}

impl Store {
    /// Connects to the database of `config` and prepares the graph registry.
    pub async fn connect(config: StoreConfig) -> Result<Self, StorageError> {
        Ok(Self::new(PgStorage::connect(config).await?))
    }

    pub fn new(storage: PgStorage) -> Self {
        Self {
            engine: QueryEngine::new(storage),
            frames: FrameQueryBuilder::default(),
        }
    }

    /// Sets the options used by [Self::frame_query].
    #[must_use]
    pub fn with_frame_query_options(mut self, options: FrameQueryOptions) -> Self {
        self.frames = FrameQueryBuilder::new(options);
        self
    }

    /// Returns a reference to the underlying [QueryEngine].
    pub fn engine(&self) -> &QueryEngine {
        &self.engine
    }

    pub fn storage(&self) -> &PgStorage {
        self.engine.storage()
    }

    /// Executes a [SPARQL](https://www.w3.org/TR/sparql11-query/) query against `graph`.
    pub async fn query(
        &self,
        graph: &GraphScope,
        query: impl TryInto<Query, Error = impl Into<QueryEvaluationError>>,
    ) -> Result<QueryResults, QueryEvaluationError> {
        self.query_opt(graph, query, QueryOptions::default()).await
    }

    /// Executes a [SPARQL](https://www.w3.org/TR/sparql11-query/) query with some options.
    pub async fn query_opt(
        &self,
        graph: &GraphScope,
        query: impl TryInto<Query, Error = impl Into<QueryEvaluationError>>,
        options: QueryOptions,
    ) -> Result<QueryResults, QueryEvaluationError> {
        let (results, _) = self.explain_query_opt(graph, query, options).await?;
        Ok(results)
    }

    /// Executes a query and returns the results together with an explanation of the SQL that
    /// produced them.
    pub async fn explain_query_opt(
        &self,
        graph: &GraphScope,
        query: impl TryInto<Query, Error = impl Into<QueryEvaluationError>>,
        options: QueryOptions,
    ) -> Result<(QueryResults, QueryExplanation), QueryEvaluationError> {
        let query = query.try_into().map_err(Into::into)?;
        self.engine.execute_query(graph, &query, &options).await
    }

    /// Compiles a query without executing it.
    pub async fn explain(
        &self,
        graph: &GraphScope,
        query: impl TryInto<Query, Error = impl Into<QueryEvaluationError>>,
    ) -> Result<QueryExplanation, QueryEvaluationError> {
        let query = query.try_into().map_err(Into::into)?;
        self.engine.explain(graph, &query).await
    }

    /// Executes a [SPARQL update](https://www.w3.org/TR/sparql11-update/).
    ///
    /// Statements outside of a `GRAPH` block are written to `graph`.
    pub async fn update(
        &self,
        graph: &GraphScope,
        update: impl TryInto<Update, Error = impl Into<QueryEvaluationError>>,
    ) -> Result<(), QueryEvaluationError> {
        self.update_opt(graph, update, UpdateOptions::default()).await
    }

    pub async fn update_opt(
        &self,
        graph: &GraphScope,
        update: impl TryInto<Update, Error = impl Into<QueryEvaluationError>>,
        options: impl Into<UpdateOptions>,
    ) -> Result<(), QueryEvaluationError> {
        let update = update.try_into().map_err(Into::into)?;
        self.engine
            .execute_update(graph, &update, &options.into())
            .await
    }

    /// Loads N-Triples or N-Quads from `reader` into `graph`, creating the graph if needed.
    pub async fn load(
        &self,
        graph: &GraphScope,
        reader: impl Read + Send + 'static,
        options: &LoadOptions,
        cancel: &CancellationToken,
    ) -> Result<LoadReport, LoadError> {
        self.storage().load(graph, reader, options, cancel).await
    }

    /// Adds statements to `graph`. Returns the number of statements that were not present yet.
    pub async fn insert<'a>(
        &self,
        graph: &GraphScope,
        statements: impl IntoIterator<Item = &'a Triple>,
    ) -> Result<u64, StorageError> {
        self.storage().insert(graph, statements).await
    }

    /// Removes statements from `graph`. Returns the number of statements that were present.
    pub async fn remove<'a>(
        &self,
        graph: &GraphScope,
        statements: impl IntoIterator<Item = &'a Triple>,
    ) -> Result<u64, StorageError> {
        self.storage().remove(graph, statements).await
    }

    /// Returns the number of statements in `graph`.
    pub async fn len(&self, graph: &GraphScope) -> Result<u64, StorageError> {
        self.storage().len(graph).await
    }

    pub async fn is_empty(&self, graph: &GraphScope) -> Result<bool, StorageError> {
        self.storage().is_empty(graph).await
    }

    /// Returns the names of all named graphs.
    pub async fn named_graphs(&self) -> Result<Vec<NamedNode>, StorageError> {
        Ok(self
            .storage()
            .graphs()
            .await?
            .into_iter()
            .filter_map(|scope| match scope {
                GraphScope::Named(name) => Some(name),
                GraphScope::Default => None,
            })
            .collect())
    }

    /// Returns `true` if the tables of `graph` exist.
    pub async fn contains_graph(&self, graph: &GraphScope) -> Result<bool, StorageError> {
        Ok(self.storage().graph(graph).await?.is_some())
    }

    /// Creates the tables of `graph`. Returns `false` if they already existed.
    pub async fn create_graph(&self, graph: &GraphScope) -> Result<bool, StorageError> {
        self.storage().create_graph(graph).await
    }

    /// Removes all statements of `graph` and keeps its tables.
    pub async fn clear_graph(&self, graph: &GraphScope) -> Result<(), StorageError> {
        self.storage().clear_graph(graph).await
    }

    /// Drops the tables of `graph`. Returns `false` if there was nothing to drop.
    pub async fn drop_graph(&self, graph: &GraphScope) -> Result<bool, StorageError> {
        self.storage().drop_graph(graph).await
    }

    /// Returns one page of the entities that match `criteria`, ordered by IRI.
    pub async fn frame_query(
        &self,
        graph: &GraphScope,
        criteria: &EntityCriteria,
        page_size: usize,
        offset: usize,
    ) -> Result<Vec<NamedNode>, FrameSearchError> {
        let query = self.frames.build(criteria, graph, page_size, offset)?;
        let QueryResults::Solutions(solutions) = self.query(graph, query.as_str()).await? else {
            return Err(QueryEvaluationError::InternalError(
                "a frame query did not return solutions".to_owned(),
            )
            .into());
        };
        solutions
            .try_collect_to_vec()
            .await?
            .into_iter()
            .filter_map(|solution| solution.get("entity").cloned())
            .map(|term| match term {
                Term::NamedNode(entity) => Ok(entity),
                term => Err(FrameSearchError::UnexpectedValue(term)),
            })
            .collect()
    }

    /// Returns the number of entities that match `criteria`.
    pub async fn frame_count(
        &self,
        graph: &GraphScope,
        criteria: &EntityCriteria,
    ) -> Result<u64, FrameSearchError> {
        let query = self.frames.build_count(criteria, graph)?;
        let QueryResults::Solutions(solutions) = self.query(graph, query.as_str()).await? else {
            return Err(QueryEvaluationError::InternalError(
                "a frame count query did not return solutions".to_owned(),
            )
            .into());
        };
        let solutions = solutions.try_collect_to_vec().await?;
        match solutions.first().and_then(|solution| solution.get("count")) {
            None => Ok(0),
            Some(Term::Literal(count)) => count
                .value()
                .parse()
                .map_err(|_| FrameSearchError::UnexpectedValue(count.clone().into())),
            Some(term) => Err(FrameSearchError::UnexpectedValue(term.clone())),
        }
    }

    /// Closes all pooled connections.
    pub async fn close(&self) {
        self.storage().close().await;
    }
}
