#![doc(test(attr(deny(warnings))))]

//! PostgreSQL storage for kgsql.
//!
//! [PgStorage] ties together the connection pool, the graph registry and the term cache. Row
//! level writes live in [writer] and bulk ingestion in [load](PgStorage::load).

mod cache;
mod config;
mod loader;
mod pool;
pub mod registry;
pub mod writer;

pub use cache::{CacheKey, CacheStats, TermCache};
pub use config::StoreConfig;
pub use loader::{
    LoadError, LoadFormat, LoadOptions, LoadProgress, LoadReport, ParseFailure, ProgressFn,
};
pub use pool::{commit, ConnectionPool};

use kgsql_common::{StorageError, StorageResult};
use kgsql_encoding::SchemaHandle;
use kgsql_model::{GraphScope, Triple};
use std::io::Read;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use writer::RoutedRows;

/// A handle to a kgsql database.
///
/// Cloning is cheap. All clones share the pool and the term cache.
#[derive(Debug, Clone)]
pub struct PgStorage {
    config: Arc<StoreConfig>,
    pool: ConnectionPool,
    cache: Arc<TermCache>,
}

impl PgStorage {
    /// Connects to the database of `config` and creates the graph registry if it is missing.
    #[tracing::instrument(skip_all)]
    pub async fn connect(config: StoreConfig) -> StorageResult<Self> {
        let pool = ConnectionPool::connect(&config).await?;
        let mut conn = pool.acquire().await?;
        registry::bootstrap(&mut conn).await?;
        drop(conn);
        tracing::info!(
            max_connections = config.max_connections,
            term_cache_capacity = config.term_cache_capacity,
            "Connected to the database"
        );
        Ok(Self::with_pool(config, pool))
    }

    /// Wraps an existing pool. The registry is expected to exist.
    pub fn with_pool(config: StoreConfig, pool: ConnectionPool) -> Self {
        let cache = Arc::new(TermCache::new(config.term_cache_capacity));
        Self {
            config: Arc::new(config),
            pool,
            cache,
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    pub fn cache(&self) -> &TermCache {
        &self.cache
    }

    /// Returns the schema of `scope` if the graph exists.
    pub async fn graph(&self, scope: &GraphScope) -> StorageResult<Option<SchemaHandle>> {
        let mut conn = self.pool.acquire().await?;
        registry::lookup(&mut conn, scope).await
    }

    /// Returns the schema of `scope` or fails with [StorageError::GraphNotFound].
    pub async fn require_graph(&self, scope: &GraphScope) -> StorageResult<SchemaHandle> {
        self.graph(scope)
            .await?
            .ok_or_else(|| StorageError::GraphNotFound(scope.to_string()))
    }

    /// All graphs of the database.
    pub async fn graphs(&self) -> StorageResult<Vec<GraphScope>> {
        let mut conn = self.pool.acquire().await?;
        registry::list(&mut conn).await
    }

    /// Creates the tables of `scope`. Returns `false` if the graph already existed.
    #[tracing::instrument(skip(self), fields(graph = %scope))]
    pub async fn create_graph(&self, scope: &GraphScope) -> StorageResult<bool> {
        let mut tx = self.pool.begin().await?;
        let (_, created) = registry::create(&mut tx, scope).await?;
        commit(tx, "creating a graph").await?;
        Ok(created)
    }

    /// Returns the schema of `scope`, creating the graph if needed.
    pub async fn ensure_graph(&self, scope: &GraphScope) -> StorageResult<SchemaHandle> {
        if let Some(schema) = self.graph(scope).await? {
            return Ok(schema);
        }
        let mut tx = self.pool.begin().await?;
        let schema = registry::ensure(&mut tx, scope).await?;
        commit(tx, "creating a graph").await?;
        Ok(schema)
    }

    /// Drops the tables of `scope`. Returns `false` if the graph did not exist.
    #[tracing::instrument(skip(self), fields(graph = %scope))]
    pub async fn drop_graph(&self, scope: &GraphScope) -> StorageResult<bool> {
        let mut tx = self.pool.begin().await?;
        let dropped = registry::remove(&mut tx, scope).await?;
        commit(tx, "dropping a graph").await?;
        Ok(dropped)
    }

    /// Removes all statements of `scope` but keeps the graph.
    #[tracing::instrument(skip(self), fields(graph = %scope))]
    pub async fn clear_graph(&self, scope: &GraphScope) -> StorageResult<()> {
        let schema = self.require_graph(scope).await?;
        let mut tx = self.pool.begin().await?;
        writer::clear(&mut tx, &schema).await?;
        commit(tx, "clearing a graph").await
    }

    /// Inserts `statements` into `scope` in one transaction. Returns the number of new rows.
    pub async fn insert<'a>(
        &self,
        scope: &GraphScope,
        statements: impl IntoIterator<Item = &'a Triple>,
    ) -> StorageResult<u64> {
        let schema = self.require_graph(scope).await?;
        let rows = RoutedRows::route(statements, self.cache.as_ref());
        let mut tx = self.pool.begin().await?;
        let inserted = writer::insert(&mut tx, &schema, &rows).await?;
        commit(tx, "inserting statements").await?;
        Ok(inserted)
    }

    /// Removes `statements` from `scope` in one transaction. Returns the number of removed rows.
    pub async fn remove<'a>(
        &self,
        scope: &GraphScope,
        statements: impl IntoIterator<Item = &'a Triple>,
    ) -> StorageResult<u64> {
        let schema = self.require_graph(scope).await?;
        let rows = RoutedRows::route(statements, self.cache.as_ref());
        let mut tx = self.pool.begin().await?;
        let removed = writer::delete(&mut tx, &schema, &rows).await?;
        commit(tx, "removing statements").await?;
        Ok(removed)
    }

    /// The number of statements in `scope`.
    pub async fn len(&self, scope: &GraphScope) -> StorageResult<u64> {
        let schema = self.require_graph(scope).await?;
        let mut conn = self.pool.acquire().await?;
        writer::count(&mut conn, &schema).await
    }

    pub async fn is_empty(&self, scope: &GraphScope) -> StorageResult<bool> {
        Ok(self.len(scope).await? == 0)
    }

    /// Streams the statements of `reader` into `scope`, creating the graph if needed.
    pub async fn load(
        &self,
        scope: &GraphScope,
        reader: impl Read + Send + 'static,
        options: &LoadOptions,
        cancel: &CancellationToken,
    ) -> Result<LoadReport, LoadError> {
        let schema = self.ensure_graph(scope).await?;
        loader::load(&self.pool, &schema, self.cache.as_ref(), reader, options, cancel).await
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
