use crate::*;

#[tokio::test]
#[ignore = "needs a PostgreSQL server in KGSQL_TEST_DATABASE_URL"]
async fn create_and_drop_graph() {
    let Some(storage) = storage().await else {
        return;
    };
    let scope = unique_graph("create-drop");

    assert!(storage.create_graph(&scope).await.unwrap());
    assert!(!storage.create_graph(&scope).await.unwrap());
    assert!(storage.graphs().await.unwrap().contains(&scope));

    assert!(storage.drop_graph(&scope).await.unwrap());
    assert!(!storage.drop_graph(&scope).await.unwrap());
    assert!(storage.graph(&scope).await.unwrap().is_none());
}

#[tokio::test(flavor = "multi_thread")]
#[ignore = "needs a PostgreSQL server in KGSQL_TEST_DATABASE_URL"]
async fn concurrent_first_writes_share_the_graph() {
    let Some(storage) = storage().await else {
        return;
    };
    let scope = unique_graph("concurrent");

    let (first, second) = tokio::join!(storage.ensure_graph(&scope), storage.ensure_graph(&scope));
    assert_eq!(first.unwrap().prefix(), second.unwrap().prefix());
    let (statements_a, statements_b) = (example_statements(), example_statements());
    let (first, second) = tokio::join!(
        storage.insert(&scope, &statements_a),
        storage.insert(&scope, &statements_b)
    );
    assert_eq!(first.unwrap() + second.unwrap(), 4);
    assert_eq!(storage.len(&scope).await.unwrap(), 4);
    assert_eq!(storage.graphs().await.unwrap().iter().filter(|g| **g == scope).count(), 1);
    storage.drop_graph(&scope).await.unwrap();
}

#[tokio::test]
#[ignore = "needs a PostgreSQL server in KGSQL_TEST_DATABASE_URL"]
async fn insert_is_idempotent() {
    let Some(storage) = storage().await else {
        return;
    };
    let scope = unique_graph("insert");
    storage.create_graph(&scope).await.unwrap();
    let statements = example_statements();

    assert_eq!(storage.insert(&scope, &statements).await.unwrap(), 4);
    assert_eq!(storage.insert(&scope, &statements).await.unwrap(), 0);
    assert_eq!(storage.len(&scope).await.unwrap(), 4);

    assert_eq!(storage.remove(&scope, &statements[..2]).await.unwrap(), 2);
    assert_eq!(storage.len(&scope).await.unwrap(), 2);

    storage.clear_graph(&scope).await.unwrap();
    assert!(storage.is_empty(&scope).await.unwrap());
    storage.drop_graph(&scope).await.unwrap();
}

#[tokio::test]
#[ignore = "needs a PostgreSQL server in KGSQL_TEST_DATABASE_URL"]
async fn insert_into_missing_graph_fails() {
    let Some(storage) = storage().await else {
        return;
    };
    let scope = unique_graph("missing");
    let error = storage
        .insert(&scope, &example_statements())
        .await
        .unwrap_err();
    assert!(error.to_string().contains("does not exist"));
}
