//! The `kgsql_graphs` table, which records the graphs of a database and their table prefixes.

use kgsql_common::{StorageError, StorageResult};
use kgsql_encoding::SchemaHandle;
use kgsql_model::GraphScope;
use sqlx::{PgConnection, Row};

pub const GRAPH_REGISTRY_TABLE: &str = "kgsql_graphs";

/// Creates the registry table and the extensions the statement tables rely on.
pub async fn bootstrap(conn: &mut PgConnection) -> StorageResult<()> {
    for statement in [
        "CREATE EXTENSION IF NOT EXISTS pg_trgm".to_owned(),
        format!(
            "CREATE TABLE IF NOT EXISTS {GRAPH_REGISTRY_TABLE} (\
             graph_id TEXT PRIMARY KEY, \
             table_prefix TEXT NOT NULL UNIQUE, \
             created_at TIMESTAMPTZ NOT NULL DEFAULT now())"
        ),
    ] {
        sqlx::query(&statement)
            .execute(&mut *conn)
            .await
            .map_err(|e| StorageError::database("creating the graph registry", e))?;
    }
    Ok(())
}

/// Returns the schema of `scope` if the graph is registered.
pub async fn lookup(conn: &mut PgConnection, scope: &GraphScope) -> StorageResult<Option<SchemaHandle>> {
    let row = sqlx::query(&format!(
        "SELECT table_prefix FROM {GRAPH_REGISTRY_TABLE} WHERE graph_id = $1"
    ))
    .bind(scope.graph_id())
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| StorageError::database(format!("looking up graph {scope}"), e))?;
    Ok(row.map(|_| SchemaHandle::new(scope.clone())))
}

/// Registers `scope` and creates its tables and indexes.
///
/// Returns `false` if the graph already existed. Fails with
/// [StorageError::GraphPrefixCollision] if another graph already owns the table prefix.
///
/// Concurrent calls for the same graph wait on the registry row, so exactly one of them creates
/// the tables and the others see the committed graph.
pub async fn create(conn: &mut PgConnection, scope: &GraphScope) -> StorageResult<(SchemaHandle, bool)> {
    let schema = SchemaHandle::new(scope.clone());
    let registered = sqlx::query(&format!(
        "INSERT INTO {GRAPH_REGISTRY_TABLE} (graph_id, table_prefix) VALUES ($1, $2) \
         ON CONFLICT DO NOTHING RETURNING graph_id"
    ))
    .bind(scope.graph_id())
    .bind(schema.prefix())
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| StorageError::database(format!("registering graph {scope}"), e))?;

    if registered.is_none() {
        let existing = prefix_owner(conn, &schema).await?.ok_or_else(|| {
            StorageError::Decode(kgsql_common::DecodeError::inconsistent(format!(
                "graph {scope} conflicts with a registry entry that does not own its prefix"
            )))
        })?;
        if existing == scope.graph_id() {
            return Ok((schema, false));
        }
        return Err(StorageError::GraphPrefixCollision {
            graph_id: scope.graph_id().to_owned(),
            prefix: schema.prefix().to_owned(),
            existing,
        });
    }

    let statements = schema
        .create_table_statements()
        .into_iter()
        .chain(schema.create_secondary_index_statements());
    for statement in statements {
        sqlx::query(&statement)
            .execute(&mut *conn)
            .await
            .map_err(|e| StorageError::database(format!("creating the tables of {scope}"), e))?;
    }
    tracing::info!(graph = %scope, prefix = schema.prefix(), "Created graph");
    Ok((schema, true))
}

/// The graph that registered the table prefix of `schema`.
async fn prefix_owner(conn: &mut PgConnection, schema: &SchemaHandle) -> StorageResult<Option<String>> {
    let owner = sqlx::query(&format!(
        "SELECT graph_id FROM {GRAPH_REGISTRY_TABLE} WHERE table_prefix = $1"
    ))
    .bind(schema.prefix())
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| StorageError::database(format!("checking the table prefix of {}", schema.scope()), e))?;
    owner
        .map(|row| row.try_get("graph_id"))
        .transpose()
        .map_err(|e| StorageError::database("reading the graph registry", e))
}

/// Returns the schema of `scope`, creating the graph if needed.
pub async fn ensure(conn: &mut PgConnection, scope: &GraphScope) -> StorageResult<SchemaHandle> {
    match lookup(conn, scope).await? {
        Some(schema) => Ok(schema),
        None => Ok(create(conn, scope).await?.0),
    }
}

/// Drops the tables of `scope` and removes it from the registry. Returns `false` if the graph
/// did not exist.
pub async fn remove(conn: &mut PgConnection, scope: &GraphScope) -> StorageResult<bool> {
    let Some(schema) = lookup(conn, scope).await? else {
        return Ok(false);
    };
    for statement in schema.drop_table_statements() {
        sqlx::query(&statement)
            .execute(&mut *conn)
            .await
            .map_err(|e| StorageError::database(format!("dropping the tables of {scope}"), e))?;
    }
    sqlx::query(&format!("DELETE FROM {GRAPH_REGISTRY_TABLE} WHERE graph_id = $1"))
        .bind(scope.graph_id())
        .execute(&mut *conn)
        .await
        .map_err(|e| StorageError::database(format!("unregistering graph {scope}"), e))?;
    tracing::info!(graph = %scope, "Dropped graph");
    Ok(true)
}

/// All registered graphs in order of creation.
pub async fn list(conn: &mut PgConnection) -> StorageResult<Vec<GraphScope>> {
    let rows = sqlx::query(&format!(
        "SELECT graph_id FROM {GRAPH_REGISTRY_TABLE} ORDER BY created_at, graph_id"
    ))
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| StorageError::database("listing graphs", e))?;

    let mut graphs = Vec::with_capacity(rows.len());
    for row in rows {
        let graph_id: String = row
            .try_get("graph_id")
            .map_err(|e| StorageError::database("reading the graph registry", e))?;
        let scope = GraphScope::from_graph_id(&graph_id).map_err(|e| {
            StorageError::Decode(kgsql_common::DecodeError::inconsistent(format!(
                "invalid graph id {graph_id:?} in the registry: {e}"
            )))
        })?;
        graphs.push(scope);
    }
    Ok(graphs)
}
