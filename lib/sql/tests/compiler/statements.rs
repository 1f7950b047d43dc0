use crate::test_utils::compile;
use kgsql_encoding::TableKind;

#[test]
fn type_pattern_reads_only_the_type_table() {
    let query = compile("SELECT ?s WHERE { ?s a ex:Person }");
    assert_eq!(query.tables, vec![TableKind::Type]);
    assert!(!query.sql.contains("_asserted"));
    assert!(!query.sql.contains("_literal"));
    assert_eq!(query.parameters, vec!["http://example.com/Person".to_owned()]);
}

#[test]
fn literal_object_reads_only_the_literal_table() {
    let query = compile("SELECT ?s WHERE { ?s ex:name \"Alice\" }");
    assert_eq!(query.tables, vec![TableKind::Literal]);
    assert_eq!(
        query.parameters,
        vec![
            "http://example.com/name".to_owned(),
            "Alice".to_owned(),
            "http://www.w3.org/2001/XMLSchema#string".to_owned(),
            String::new(),
        ]
    );
}

#[test]
fn unknown_object_reads_asserted_and_literal_tables() {
    let query = compile("SELECT ?o WHERE { ?s ex:knows ?o }");
    assert_eq!(query.tables, vec![TableKind::Asserted, TableKind::Literal]);
    assert!(query.sql.contains(" UNION ALL "));
}

#[test]
fn literal_subject_is_statically_empty() {
    let query = compile("SELECT ?p WHERE { \"text\" ?p ?o }");
    assert!(query.statically_empty);
    assert!(query.tables.is_empty());
}

#[test]
fn user_values_are_parameters() {
    let query = compile("SELECT ?s WHERE { ?s ex:name \"O'Brien\" }");
    assert!(!query.sql.contains("Brien"));
    assert!(query.parameters.contains(&"O'Brien".to_owned()));
}

#[test]
fn contains_with_constant_uses_like() {
    let query = compile("SELECT ?s WHERE { ?s ex:mood ?m FILTER(CONTAINS(?m, \"50%\")) }");
    assert!(query.sql.contains(" LIKE "));
    assert!(query.parameters.contains(&"%50\\%%".to_owned()));
}

#[test]
fn limit_and_offset_are_inlined() {
    let query = compile("SELECT ?s WHERE { ?s ?p ?o } LIMIT 10 OFFSET 5");
    assert!(query.sql.ends_with(" LIMIT 10 OFFSET 5"), "{}", query.sql);
}

#[test]
fn zero_offset_is_omitted() {
    let query = compile("SELECT ?s WHERE { ?s ?p ?o } LIMIT 10");
    assert!(query.sql.ends_with(" LIMIT 10"), "{}", query.sql);
    assert!(!query.sql.contains("OFFSET"));
}

#[test]
fn result_variables_follow_the_projection() {
    let query = compile("SELECT ?o ?s WHERE { ?s ex:knows ?o }");
    let names = query
        .variables
        .iter()
        .map(|v| v.as_str().to_owned())
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["o", "s"]);
}

#[test]
fn ask_limits_to_one_row() {
    let query = compile("ASK { ?s a ex:Person }");
    assert!(query.sql.starts_with("SELECT 1 AS ok FROM ("));
    assert!(query.sql.ends_with(" LIMIT 1"));
    assert!(query.variables.is_empty());
}
