use serde::Deserialize;
use std::time::Duration;

/// Connection and cache settings of a store.
///
/// The store never reads configuration files. An outer layer may deserialize this struct from
/// any format supported by `serde`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// A `postgres://` connection string.
    pub database_url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    /// How long a task waits for a pooled connection before failing with a pool timeout.
    pub acquire_timeout: Duration,
    /// The default deadline of a query. `None` means no deadline.
    pub statement_timeout: Option<Duration>,
    /// Number of terms kept by the term cache in each direction. Zero disables the cache.
    pub term_cache_capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: "postgres://localhost/kgsql".to_owned(),
            max_connections: 10,
            min_connections: 0,
            acquire_timeout: Duration::from_secs(30),
            statement_timeout: None,
            term_cache_capacity: 10_000,
        }
    }
}

impl StoreConfig {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }

    #[must_use]
    pub fn with_min_connections(mut self, min_connections: u32) -> Self {
        self.min_connections = min_connections;
        self
    }

    #[must_use]
    pub fn with_acquire_timeout(mut self, acquire_timeout: Duration) -> Self {
        self.acquire_timeout = acquire_timeout;
        self
    }

    #[must_use]
    pub fn with_statement_timeout(mut self, statement_timeout: Option<Duration>) -> Self {
        self.statement_timeout = statement_timeout;
        self
    }

    #[must_use]
    pub fn with_term_cache_capacity(mut self, term_cache_capacity: usize) -> Self {
        self.term_cache_capacity = term_cache_capacity;
        self
    }
}
