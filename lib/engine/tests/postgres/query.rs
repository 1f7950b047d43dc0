use crate::*;

#[tokio::test]
#[ignore = "needs a PostgreSQL server in KGSQL_TEST_DATABASE_URL"]
async fn type_pattern_returns_only_persons() {
    let fixture = Fixture::new("types").await;
    let mut persons = fixture
        .select("SELECT ?s WHERE { ?s a ex:Person }", "s")
        .await;
    persons.sort_by_key(|t| t.as_ref().map(ToString::to_string));
    assert_eq!(persons, vec![iri("alice"), iri("bob"), iri("carol")]);
    fixture.finish().await;
}

#[tokio::test]
#[ignore = "needs a PostgreSQL server in KGSQL_TEST_DATABASE_URL"]
async fn missing_edge_gives_no_rows() {
    let fixture = Fixture::new("edges").await;
    let rows = fixture
        .select(
            "SELECT ?d WHERE { ex:e1 ex:hasEdgeSource ?s . ?e ex:hasEdgeDestination ?d }",
            "d",
        )
        .await;
    assert!(rows.is_empty());
    fixture.finish().await;
}

#[tokio::test]
#[ignore = "needs a PostgreSQL server in KGSQL_TEST_DATABASE_URL"]
async fn contains_filter_matches_substring() {
    let fixture = Fixture::new("contains").await;
    let rows = fixture
        .select(
            "SELECT ?s WHERE { ?s ex:mood ?m FILTER(CONTAINS(?m, \"happy\")) }",
            "s",
        )
        .await;
    assert_eq!(rows, vec![iri("alice")]);
    fixture.finish().await;
}

#[tokio::test]
#[ignore = "needs a PostgreSQL server in KGSQL_TEST_DATABASE_URL"]
async fn optional_with_false_filter_keeps_left_rows() {
    let fixture = Fixture::new("optional").await;
    let rows = fixture
        .select(
            "SELECT ?s ?m WHERE { ?s a ex:Person OPTIONAL { ?s ex:mood ?m FILTER(false) } }",
            "m",
        )
        .await;
    assert_eq!(rows, vec![None, None, None]);
    fixture.finish().await;
}

#[tokio::test]
#[ignore = "needs a PostgreSQL server in KGSQL_TEST_DATABASE_URL"]
async fn limit_is_pushed_into_sql() {
    let fixture = Fixture::new("limit").await;
    let query = Query::parse(
        &format!("{PREFIXES}SELECT ?s WHERE {{ ?s a ?c }} ORDER BY ?s LIMIT 2 OFFSET 1"),
        None,
    )
    .unwrap();
    let explanation = fixture.engine.explain(&fixture.scope, &query).await.unwrap();
    assert!(explanation.sql.ends_with("LIMIT 2 OFFSET 1"));
    let rows = fixture
        .select("SELECT ?s WHERE { ?s a ?c } ORDER BY ?s LIMIT 2 OFFSET 1", "s")
        .await;
    assert_eq!(rows, vec![iri("bob"), iri("carol")]);
    fixture.finish().await;
}

#[tokio::test]
#[ignore = "needs a PostgreSQL server in KGSQL_TEST_DATABASE_URL"]
async fn ask_and_construct() {
    let fixture = Fixture::new("forms").await;
    let QueryResults::Boolean(found) = fixture
        .query("ASK { ex:alice ex:knows ex:bob }")
        .await
        .unwrap()
    else {
        panic!("expected a boolean");
    };
    assert!(found);

    let QueryResults::Graph(triples) = fixture
        .query("CONSTRUCT { ?b ex:knownBy ?a } WHERE { ?a ex:knows ?b }")
        .await
        .unwrap()
    else {
        panic!("expected a graph");
    };
    let triples = triples.try_collect_to_vec().await.unwrap();
    assert_eq!(triples.len(), 1);
    assert_eq!(Some(Term::from(triples[0].subject.clone())), iri("bob"));
    fixture.finish().await;
}

#[tokio::test]
#[ignore = "needs a PostgreSQL server in KGSQL_TEST_DATABASE_URL"]
async fn unsupported_queries_are_client_errors() {
    let fixture = Fixture::new("unsupported").await;
    let error = fixture
        .query("DESCRIBE ex:alice")
        .await
        .err()
        .unwrap();
    assert_eq!(error.class(), ErrorClass::Client);
    fixture.finish().await;
}

#[tokio::test]
#[ignore = "needs a PostgreSQL server in KGSQL_TEST_DATABASE_URL"]
async fn deadline_cancels_the_statement() {
    let fixture = Fixture::new("deadline").await;
    let query = Query::parse(
        &format!(
            "{PREFIXES}SELECT (COUNT(*) AS ?n) WHERE {{ ?a ?p1 ?b . ?c ?p2 ?d . ?e ?p3 ?f . ?g ?p4 ?h . ?i ?p5 ?j }}"
        ),
        None,
    )
    .unwrap();
    let options = QueryOptions::default().with_timeout(Duration::from_millis(1));
    let outcome = match fixture
        .engine
        .execute_query(&fixture.scope, &query, &options)
        .await
    {
        Ok((QueryResults::Solutions(mut solutions), _)) => solutions.next().await.unwrap().err(),
        Ok(_) => panic!("expected solutions"),
        Err(error) => Some(error),
    };
    if let Some(error) = outcome {
        assert_eq!(error.class(), ErrorClass::Transient);
    }
    // The connection went back to the pool in a clean state.
    let rows = fixture.select("SELECT ?s WHERE { ?s a ex:Robot }", "s").await;
    assert_eq!(rows.len(), 2);
    fixture.finish().await;
}
