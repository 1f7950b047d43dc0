//! End-to-end evaluation against a live PostgreSQL server.
//!
//! Ignored by default. Run with `--ignored` and `KGSQL_TEST_DATABASE_URL` pointing to a scratch
//! database.

use futures::StreamExt;
use kgsql_engine::sparql::error::{ErrorClass, QueryEvaluationError};
use kgsql_engine::sparql::{Query, QueryOptions, QueryResults, Update, UpdateOptions};
use kgsql_engine::QueryEngine;
use kgsql_model::{GraphScope, Term};
use kgsql_storage::{LoadOptions, PgStorage, StoreConfig};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

mod query;
mod update;

const DATA: &str = r#"<http://example.com/alice> <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <http://example.com/Person> .
<http://example.com/bob> <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <http://example.com/Person> .
<http://example.com/carol> <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <http://example.com/Person> .
<http://example.com/r1> <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <http://example.com/Robot> .
<http://example.com/r2> <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <http://example.com/Robot> .
<http://example.com/alice> <http://example.com/mood> "happy dog" .
<http://example.com/bob> <http://example.com/mood> "sad cat" .
<http://example.com/alice> <http://example.com/knows> <http://example.com/bob> .
<http://example.com/alice> <http://example.com/age> "30"^^<http://www.w3.org/2001/XMLSchema#integer> .
<http://example.com/bob> <http://example.com/age> "9"^^<http://www.w3.org/2001/XMLSchema#integer> .
"#;

const PREFIXES: &str = "PREFIX ex: <http://example.com/>\n";

struct Fixture {
    engine: QueryEngine,
    scope: GraphScope,
}

impl Fixture {
    async fn new(test: &str) -> Self {
        let url = std::env::var("KGSQL_TEST_DATABASE_URL").unwrap();
        let storage = PgStorage::connect(StoreConfig::new(url)).await.unwrap();
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let scope = GraphScope::named(format!("http://example.com/engine/{test}/{nanos}")).unwrap();
        storage
            .load(
                &scope,
                DATA.as_bytes(),
                &LoadOptions::default(),
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        Self {
            engine: QueryEngine::new(storage),
            scope,
        }
    }

    async fn query(&self, query: &str) -> Result<QueryResults, QueryEvaluationError> {
        let query = Query::parse(&format!("{PREFIXES}{query}"), None)?;
        self.engine
            .execute_query(&self.scope, &query, &QueryOptions::default())
            .await
            .map(|(results, _)| results)
    }

    async fn select(&self, query: &str, variable: &str) -> Vec<Option<Term>> {
        let QueryResults::Solutions(mut solutions) = self.query(query).await.unwrap() else {
            panic!("expected solutions");
        };
        let mut values = Vec::new();
        while let Some(solution) = solutions.next().await {
            values.push(solution.unwrap().get(variable).cloned());
        }
        values
    }

    async fn update(&self, update: &str) -> Result<(), QueryEvaluationError> {
        let update = Update::parse(&format!("{PREFIXES}{update}"), None)?;
        self.engine
            .execute_update(&self.scope, &update, &UpdateOptions::default())
            .await
    }

    async fn finish(self) {
        self.engine.storage().drop_graph(&self.scope).await.unwrap();
    }
}

fn iri(local: &str) -> Option<Term> {
    Some(kgsql_model::NamedNode::new_unchecked(format!("http://example.com/{local}")).into())
}
