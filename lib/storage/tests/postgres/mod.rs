//! Tests against a live PostgreSQL server.
//!
//! They are ignored by default. Run them with `--ignored` and `KGSQL_TEST_DATABASE_URL` pointing to
//! a database the tests may create tables in.

use kgsql_model::vocab::rdf;
use kgsql_model::{GraphScope, Literal, NamedNode, Triple};
use kgsql_storage::{LoadError, LoadFormat, LoadOptions, PgStorage, StoreConfig};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

mod loading;
mod graphs;

async fn storage() -> Option<PgStorage> {
    let url = std::env::var("KGSQL_TEST_DATABASE_URL").ok()?;
    let config = StoreConfig::new(url).with_max_connections(4);
    Some(PgStorage::connect(config).await.unwrap())
}

/// A graph name that no other test uses.
fn unique_graph(test: &str) -> GraphScope {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    GraphScope::named(format!("http://example.com/test/{test}/{nanos}")).unwrap()
}

fn ex(local: &str) -> NamedNode {
    NamedNode::new_unchecked(format!("http://example.com/{local}"))
}

fn example_statements() -> Vec<Triple> {
    vec![
        Triple::new(ex("alice"), rdf::TYPE, ex("Person")),
        Triple::new(ex("alice"), ex("knows"), ex("bob")),
        Triple::new(ex("alice"), ex("name"), Literal::new_simple_literal("Alice")),
        Triple::new(
            ex("alice"),
            ex("greeting"),
            Literal::new_language_tagged_literal_unchecked("hello", "en"),
        ),
    ]
}
