use crate::StoreConfig;
use kgsql_common::{StorageError, StorageResult};
use sqlx::pool::PoolConnection;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Transaction};

/// A bounded pool of PostgreSQL connections.
///
/// Connections are handed out as guards. Dropping a guard returns the connection to the pool on
/// every exit path, including unwinding. A transaction that is dropped without a commit is
/// rolled back before its connection is reused.
#[derive(Debug, Clone)]
pub struct ConnectionPool {
    pool: PgPool,
}

impl ConnectionPool {
    /// Opens the pool and establishes `min_connections` connections.
    pub async fn connect(config: &StoreConfig) -> StorageResult<Self> {
        let pool = Self::options(config)
            .connect(&config.database_url)
            .await
            .map_err(|e| StorageError::database("connecting to the database", e))?;
        Ok(Self { pool })
    }

    /// Creates the pool without connecting. Connections are opened on first use.
    pub fn connect_lazy(config: &StoreConfig) -> StorageResult<Self> {
        let pool = Self::options(config)
            .connect_lazy(&config.database_url)
            .map_err(|e| StorageError::database("parsing the connection string", e))?;
        Ok(Self { pool })
    }

    fn options(config: &StoreConfig) -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout)
    }

    /// Waits for a free connection. Fails with [StorageError::PoolTimeout] once the acquire
    /// timeout elapses.
    pub async fn acquire(&self) -> StorageResult<PoolConnection<Postgres>> {
        self.pool
            .acquire()
            .await
            .map_err(|e| StorageError::database("acquiring a connection", e))
    }

    /// Acquires a connection and starts a transaction on it.
    pub async fn begin(&self) -> StorageResult<Transaction<'static, Postgres>> {
        self.pool
            .begin()
            .await
            .map_err(|e| StorageError::database("starting a transaction", e))
    }

    pub fn size(&self) -> u32 {
        self.pool.size()
    }

    pub fn idle(&self) -> usize {
        self.pool.num_idle()
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Commits `tx`, wrapping a failure with `context`.
pub async fn commit(tx: Transaction<'_, Postgres>, context: &str) -> StorageResult<()> {
    tx.commit()
        .await
        .map_err(|e| StorageError::database(format!("committing {context}"), e))
}
