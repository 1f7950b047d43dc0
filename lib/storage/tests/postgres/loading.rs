use crate::*;

const DATA: &str = r#"<http://example.com/alice> <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <http://example.com/Person> .
<http://example.com/alice> <http://example.com/name> "Alice" .
<http://example.com/alice> <http://example.com/note> "tab\there" .
this line is broken
<http://example.com/alice> <http://example.com/knows> <http://example.com/bob> .
<http://example.com/bob> <http://example.com/name> "Bob"@en .
"#;

#[tokio::test]
#[ignore = "needs a PostgreSQL server in KGSQL_TEST_DATABASE_URL"]
async fn load_collects_parse_failures() {
    let Some(storage) = storage().await else {
        return;
    };
    let scope = unique_graph("load");
    let batches = Arc::new(AtomicU64::new(0));
    let seen = Arc::clone(&batches);
    let options = LoadOptions::default()
        .with_batch_size(2)
        .with_progress(move |progress| seen.store(progress.batches, Ordering::SeqCst));

    let report = storage
        .load(&scope, DATA.as_bytes(), &options, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.rows_loaded, 5);
    assert_eq!(report.statements_parsed, 5);
    assert_eq!(report.parse_failures.len(), 1);
    assert_eq!(report.parse_failures[0].line, Some(4));
    assert_eq!(batches.load(Ordering::SeqCst), 3);
    assert_eq!(storage.len(&scope).await.unwrap(), 5);

    let again = storage
        .load(&scope, DATA.as_bytes(), &options, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(again.rows_loaded, 0);
    storage.drop_graph(&scope).await.unwrap();
}

#[tokio::test]
#[ignore = "needs a PostgreSQL server in KGSQL_TEST_DATABASE_URL"]
async fn strict_load_stops_at_first_failure() {
    let Some(storage) = storage().await else {
        return;
    };
    let scope = unique_graph("strict");
    let options = LoadOptions::default().with_strict(true);

    let error = storage
        .load(&scope, DATA.as_bytes(), &options, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(error, LoadError::Parse(failure) if failure.line == Some(4)));
    storage.drop_graph(&scope).await.unwrap();
}

#[tokio::test]
#[ignore = "needs a PostgreSQL server in KGSQL_TEST_DATABASE_URL"]
async fn cancelled_load_keeps_nothing_uncommitted() {
    let Some(storage) = storage().await else {
        return;
    };
    let scope = unique_graph("cancel");
    let cancel = CancellationToken::new();
    cancel.cancel();

    let error = storage
        .load(&scope, DATA.as_bytes(), &LoadOptions::default(), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(error, LoadError::Cancelled(report) if report.rows_loaded == 0));
    assert_eq!(storage.len(&scope).await.unwrap(), 0);
    storage.drop_graph(&scope).await.unwrap();
}

#[tokio::test]
#[ignore = "needs a PostgreSQL server in KGSQL_TEST_DATABASE_URL"]
async fn nquads_graph_component_is_ignored() {
    let Some(storage) = storage().await else {
        return;
    };
    let scope = unique_graph("nquads");
    let data = "<http://example.com/s> <http://example.com/p> \"o\" <http://example.com/other> .\n";
    let options = LoadOptions::default()
        .with_format(LoadFormat::NQuads)
        .with_suspend_indexes(true);

    let report = storage
        .load(&scope, data.as_bytes(), &options, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report.rows_loaded, 1);
    assert!(report.index_suspend.is_some());
    assert!(report.index_rebuild.is_some());
    storage.drop_graph(&scope).await.unwrap();
}
