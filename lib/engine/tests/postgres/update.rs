use crate::*;

#[tokio::test]
#[ignore = "needs a PostgreSQL server in KGSQL_TEST_DATABASE_URL"]
async fn insert_and_delete_data() {
    let fixture = Fixture::new("data").await;
    fixture
        .update("INSERT DATA { ex:dave a ex:Person ; ex:mood \"calm\"@en }")
        .await
        .unwrap();
    assert_eq!(
        fixture.select("SELECT ?s WHERE { ?s ex:mood \"calm\"@en }", "s").await,
        vec![iri("dave")]
    );

    fixture
        .update("DELETE DATA { ex:dave ex:mood \"calm\"@en }")
        .await
        .unwrap();
    assert!(fixture
        .select("SELECT ?s WHERE { ?s ex:mood \"calm\"@en }", "s")
        .await
        .is_empty());
    fixture.finish().await;
}

#[tokio::test]
#[ignore = "needs a PostgreSQL server in KGSQL_TEST_DATABASE_URL"]
async fn delete_insert_where_rewrites_matches() {
    let fixture = Fixture::new("delete-insert").await;
    fixture
        .update("DELETE { ?s a ex:Robot } INSERT { ?s a ex:Machine } WHERE { ?s a ex:Robot }")
        .await
        .unwrap();
    assert!(fixture
        .select("SELECT ?s WHERE { ?s a ex:Robot }", "s")
        .await
        .is_empty());
    assert_eq!(
        fixture.select("SELECT ?s WHERE { ?s a ex:Machine }", "s").await.len(),
        2
    );

    fixture
        .update("DELETE WHERE { ?s ex:mood ?m }")
        .await
        .unwrap();
    assert!(fixture
        .select("SELECT ?m WHERE { ?s ex:mood ?m }", "m")
        .await
        .is_empty());
    fixture.finish().await;
}

#[tokio::test]
#[ignore = "needs a PostgreSQL server in KGSQL_TEST_DATABASE_URL"]
async fn delete_where_on_a_missing_graph_creates_nothing() {
    let fixture = Fixture::new("delete-missing").await;
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let missing = GraphScope::named(format!("http://example.com/engine/missing/{nanos}")).unwrap();

    let update = Update::parse(&format!("{PREFIXES}DELETE WHERE {{ ?s ex:mood ?m }}"), None).unwrap();
    fixture
        .engine
        .execute_update(&missing, &update, &UpdateOptions::default())
        .await
        .unwrap();
    assert!(fixture.engine.storage().graph(&missing).await.unwrap().is_none());
    assert!(!fixture.engine.storage().graphs().await.unwrap().contains(&missing));

    let update = Update::parse(
        &format!("{PREFIXES}DELETE {{ ?s ex:mood ?m }} WHERE {{ ?s ex:mood ?m }}"),
        None,
    )
    .unwrap();
    fixture
        .engine
        .execute_update(&missing, &update, &UpdateOptions::default())
        .await
        .unwrap();
    assert!(fixture.engine.storage().graph(&missing).await.unwrap().is_none());
    fixture.finish().await;
}

#[tokio::test]
#[ignore = "needs a PostgreSQL server in KGSQL_TEST_DATABASE_URL"]
async fn graph_management() {
    let fixture = Fixture::new("management").await;
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let other = format!("http://example.com/engine/other/{nanos}");

    fixture.update(&format!("CREATE GRAPH <{other}>")).await.unwrap();
    let error = fixture
        .update(&format!("CREATE GRAPH <{other}>"))
        .await
        .unwrap_err();
    assert!(matches!(error, QueryEvaluationError::GraphAlreadyExists(_)));
    fixture
        .update(&format!("CREATE SILENT GRAPH <{other}>"))
        .await
        .unwrap();

    fixture.update(&format!("DROP GRAPH <{other}>")).await.unwrap();
    let error = fixture
        .update(&format!("DROP GRAPH <{other}>"))
        .await
        .unwrap_err();
    assert_eq!(error.class(), ErrorClass::Client);
    fixture
        .update(&format!("DROP SILENT GRAPH <{other}>"))
        .await
        .unwrap();

    fixture
        .update(&format!("CLEAR GRAPH {}", fixture.scope))
        .await
        .unwrap();
    assert!(fixture.engine.storage().is_empty(&fixture.scope).await.unwrap());
    fixture.finish().await;
}
