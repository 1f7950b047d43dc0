use crate::test_utils::{ask, execute, execute_unordered, iri, plain, typed};

#[tokio::test]
async fn type_pattern_returns_instances() {
    let solutions = execute_unordered("SELECT ?s WHERE { ?s a ex:Person }").await;
    assert_eq!(solutions, vec![vec![iri("alice")], vec![iri("bob")]]);
}

#[tokio::test]
async fn join_without_matches_is_empty() {
    let solutions = execute("SELECT ?s ?o WHERE { ?s a ex:Robot . ?s ex:knows ?o }").await;
    assert!(solutions.is_empty());
}

#[tokio::test]
async fn join_on_shared_subject() {
    let solutions =
        execute_unordered("SELECT ?s ?name WHERE { ?s a ex:Person . ?s ex:name ?name }").await;
    assert_eq!(
        solutions,
        vec![
            vec![iri("alice"), plain("Alice")],
            vec![iri("bob"), plain("Bob")],
        ]
    );
}

#[tokio::test]
async fn variable_predicate_reads_all_tables() {
    let solutions = execute_unordered("SELECT ?p ?o WHERE { ex:bob ?p ?o }").await;
    assert_eq!(
        solutions,
        vec![
            vec![iri("age"), typed("9", "integer")],
            vec![iri("name"), plain("Bob")],
            vec![
                Some("<http://www.w3.org/1999/02/22-rdf-syntax-ns#type>".to_owned()),
                iri("Person")
            ],
        ]
    );
}

#[tokio::test]
async fn contains_is_case_sensitive() {
    let solutions = execute_unordered(
        "SELECT ?s WHERE { ?s ex:mood ?m FILTER(CONTAINS(?m, \"happy\")) }",
    )
    .await;
    assert_eq!(solutions, vec![vec![iri("alice")]]);
}

#[tokio::test]
async fn contains_on_lowercase_ignores_case() {
    let solutions = execute_unordered(
        "SELECT ?s WHERE { ?s ex:mood ?m FILTER(CONTAINS(LCASE(?m), \"happy\")) }",
    )
    .await;
    assert_eq!(solutions, vec![vec![iri("alice")], vec![iri("carol")]]);
}

#[tokio::test]
async fn language_tags_are_preserved() {
    let solutions = execute("SELECT ?m WHERE { ex:alice ex:mood ?m }").await;
    assert_eq!(solutions, vec![vec![Some("\"happy today\"@en".to_owned())]]);
}

#[tokio::test]
async fn optional_with_false_filter_keeps_left_solutions() {
    let solutions = execute_unordered(
        "SELECT ?s ?o WHERE { ?s a ex:Person OPTIONAL { ?s ex:knows ?o FILTER(false) } }",
    )
    .await;
    assert_eq!(solutions, vec![vec![iri("alice"), None], vec![iri("bob"), None]]);
}

#[tokio::test]
async fn optional_binds_when_matching() {
    let solutions = execute_unordered(
        "SELECT ?s ?o WHERE { ?s a ex:Person OPTIONAL { ?s ex:knows ?o } }",
    )
    .await;
    assert_eq!(
        solutions,
        vec![vec![iri("alice"), iri("bob")], vec![iri("bob"), None]]
    );
}

#[tokio::test]
async fn union_keeps_both_sides() {
    let solutions = execute_unordered(
        "SELECT ?s ?name WHERE { { ?s a ex:Person } UNION { ?s ex:name ?name FILTER(?name = \"Carol\") } }",
    )
    .await;
    assert_eq!(
        solutions,
        vec![
            vec![iri("alice"), None],
            vec![iri("bob"), None],
            vec![iri("carol"), plain("Carol")],
        ]
    );
}

#[tokio::test]
async fn order_by_compares_numbers_by_value() {
    let solutions = execute("SELECT ?s WHERE { ?s ex:age ?age } ORDER BY DESC(?age)").await;
    assert_eq!(
        solutions,
        vec![vec![iri("carol")], vec![iri("alice")], vec![iri("bob")]]
    );
}

#[tokio::test]
async fn large_integers_compare_exactly() {
    let solutions = execute_unordered(
        "SELECT ?s WHERE { ?s ex:serial ?n FILTER(?n > 9007199254740992) }",
    )
    .await;
    assert_eq!(solutions, vec![vec![iri("carol")]]);

    let solutions = execute_unordered(
        "SELECT ?s WHERE { ?s ex:serial ?n FILTER(?n = 9007199254740992.0) }",
    )
    .await;
    assert_eq!(solutions, vec![vec![iri("dave")]]);
}

#[tokio::test]
async fn order_by_breaks_double_ties_by_exact_value() {
    let solutions = execute("SELECT ?s WHERE { ?s ex:serial ?n } ORDER BY ?n").await;
    assert_eq!(solutions, vec![vec![iri("dave")], vec![iri("carol")]]);
}

#[tokio::test]
async fn malformed_numbers_fail_only_their_own_filter() {
    let solutions =
        execute_unordered("SELECT ?s WHERE { ?s ex:score ?v FILTER(?v > 1) }").await;
    assert_eq!(solutions, vec![vec![iri("carol")]]);

    let solutions = execute_unordered(
        "SELECT ?s WHERE { ?s ex:score ?v FILTER(!(?v > 1)) }",
    )
    .await;
    assert!(solutions.is_empty());
}

#[tokio::test]
async fn limit_and_offset_page_through_ordered_solutions() {
    let solutions =
        execute("SELECT ?s WHERE { ?s ex:age ?age } ORDER BY ?age LIMIT 1 OFFSET 1").await;
    assert_eq!(solutions, vec![vec![iri("alice")]]);
}

#[tokio::test]
async fn numeric_filter() {
    let solutions =
        execute_unordered("SELECT ?s WHERE { ?s ex:age ?age FILTER(?age >= 30) }").await;
    assert_eq!(solutions, vec![vec![iri("alice")], vec![iri("carol")]]);
}

#[tokio::test]
async fn bind_computes_arithmetic() {
    let solutions =
        execute("SELECT ?next WHERE { ex:bob ex:age ?age BIND(?age + 1 AS ?next) }").await;
    assert_eq!(solutions, vec![vec![typed("10", "integer")]]);
}

#[tokio::test]
async fn values_restrict_solutions() {
    let solutions = execute_unordered(
        "SELECT ?s ?name WHERE { VALUES ?s { ex:alice ex:carol } ?s ex:name ?name }",
    )
    .await;
    assert_eq!(
        solutions,
        vec![
            vec![iri("alice"), plain("Alice")],
            vec![iri("carol"), plain("Carol")],
        ]
    );
}

#[tokio::test]
async fn group_by_with_having() {
    let solutions = execute(
        "SELECT ?type (COUNT(?s) AS ?n) WHERE { ?s a ?type } GROUP BY ?type HAVING (COUNT(?s) > 1)",
    )
    .await;
    assert_eq!(solutions, vec![vec![iri("Person"), typed("2", "integer")]]);
}

#[tokio::test]
async fn count_over_no_solutions_is_zero() {
    let solutions = execute("SELECT (COUNT(*) AS ?n) WHERE { ?s ex:missing ?o }").await;
    assert_eq!(solutions, vec![vec![typed("0", "integer")]]);
}

#[tokio::test]
async fn sum_and_max_of_integers() {
    let solutions =
        execute("SELECT (SUM(?age) AS ?total) (MAX(?age) AS ?oldest) WHERE { ?s ex:age ?age }")
            .await;
    assert_eq!(
        solutions,
        vec![vec![typed("139", "integer"), typed("100", "integer")]]
    );
}

#[tokio::test]
async fn distinct_removes_duplicates() {
    let solutions = execute_unordered("SELECT DISTINCT ?type WHERE { ?s a ?type }").await;
    assert_eq!(solutions, vec![vec![iri("Person")], vec![iri("Robot")]]);
}

#[tokio::test]
async fn ask_reports_existence() {
    assert!(ask("ASK { ex:alice ex:knows ex:bob }").await);
    assert!(!ask("ASK { ex:bob ex:knows ex:alice }").await);
}
