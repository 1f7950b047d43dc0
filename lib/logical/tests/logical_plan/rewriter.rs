use crate::test_utils::{lower, lower_in};
use kgsql_common::CompileError;
use kgsql_logical::{AggregateCall, AggregateKind, LogicalQuery, PatternTerm, QueryPlanNode};
use kgsql_model::GraphScope;
use spargebra::Query;

#[test]
fn test_type_pattern() {
    let plan = lower("SELECT ?s WHERE { ?s a <http://example.com/Person> }").unwrap();
    insta::assert_snapshot!(plan, @r"
    Project: ?s
      Pattern: ?s <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <http://example.com/Person>
    ");
}

#[test]
fn test_bgp_becomes_join_chain() {
    let plan = lower(
        "SELECT ?d WHERE { <http://example.com/e1> <http://example.com/hasEdgeSource> ?x . ?x <http://example.com/hasEdgeDestination> ?d }",
    )
    .unwrap();
    insta::assert_snapshot!(plan, @r"
    Project: ?d
      Join
        Pattern: <http://example.com/e1> <http://example.com/hasEdgeSource> ?x
        Pattern: ?x <http://example.com/hasEdgeDestination> ?d
    ");
}

#[test]
fn test_optional_filter_stays_in_left_join() {
    let plan = lower(
        "SELECT * WHERE { ?s <http://example.com/p> ?o OPTIONAL { ?s <http://example.com/q> ?x FILTER(?x > 3) } }",
    )
    .unwrap();
    insta::assert_snapshot!(plan, @r#"
    Project: ?s ?o ?x
      LeftJoin: (?x > "3"^^<http://www.w3.org/2001/XMLSchema#integer>)
        Pattern: ?s <http://example.com/p> ?o
        Pattern: ?s <http://example.com/q> ?x
    "#);
}

#[test]
fn test_text_filter() {
    let plan = lower(
        r#"SELECT ?s ?o WHERE { ?s <http://example.com/p> ?o FILTER(CONTAINS(?o, "happy")) }"#,
    )
    .unwrap();
    insta::assert_snapshot!(plan, @r#"
    Project: ?s ?o
      Filter: CONTAINS(?o, "happy")
        Pattern: ?s <http://example.com/p> ?o
    "#);
}

#[test]
fn test_slice_and_order() {
    let plan =
        lower("SELECT ?s WHERE { ?s ?p ?o } ORDER BY DESC(?s) LIMIT 10 OFFSET 5").unwrap();
    insta::assert_snapshot!(plan, @r"
    Slice: offset=5 limit=10
      Project: ?s
        OrderBy: DESC(?s)
          Pattern: ?s ?p ?o
    ");
}

#[test]
fn test_union() {
    let plan = lower(
        "SELECT ?s WHERE { { ?s a <http://example.com/A> } UNION { ?s a <http://example.com/B> } }",
    )
    .unwrap();
    insta::assert_snapshot!(plan, @r"
    Project: ?s
      Union
        Pattern: ?s <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <http://example.com/A>
        Pattern: ?s <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <http://example.com/B>
    ");
}

#[test]
fn test_having_is_folded_into_group() {
    let plan = lower(
        "SELECT ?s (COUNT(?o) AS ?c) WHERE { ?s <http://example.com/p> ?o } GROUP BY ?s HAVING (COUNT(?o) > 1)",
    )
    .unwrap();

    fn find_group(plan: &QueryPlanNode) -> Option<&QueryPlanNode> {
        if matches!(plan, QueryPlanNode::Group { .. }) {
            return Some(plan);
        }
        plan.children().into_iter().find_map(find_group)
    }

    let Some(QueryPlanNode::Group {
        variables,
        aggregates,
        having,
        ..
    }) = find_group(&plan)
    else {
        panic!("no group in {plan}");
    };
    assert_eq!(variables.len(), 1);
    assert!(having.is_some());
    assert!(aggregates.iter().all(|(_, a)| matches!(
        a,
        AggregateCall::Function {
            kind: AggregateKind::Count,
            distinct: false,
            ..
        }
    )));
    assert!(!plan.to_string().contains("Filter"));
}

#[test]
fn test_blank_nodes_become_variables() {
    let plan = lower("SELECT ?s WHERE { ?s <http://example.com/p> _:b }").unwrap();
    let QueryPlanNode::Project { inner, .. } = plan else {
        panic!("expected a projection");
    };
    let QueryPlanNode::Pattern(pattern) = *inner else {
        panic!("expected a pattern");
    };
    assert!(matches!(pattern.object, PatternTerm::Variable(_)));
}

#[test]
fn test_graph_matching_scope_is_transparent() {
    let scope = GraphScope::named("http://example.com/g").unwrap();
    let plan = lower_in(
        "SELECT * WHERE { GRAPH <http://example.com/g> { ?s ?p ?o } }",
        &scope,
    )
    .unwrap();
    insta::assert_snapshot!(plan, @r"
    Project: ?s ?p ?o
      Pattern: ?s ?p ?o
    ");
}

#[test]
fn test_graph_outside_scope_is_rejected() {
    let result = lower("SELECT * WHERE { GRAPH <http://example.com/g> { ?s ?p ?o } }");
    assert!(matches!(result, Err(CompileError::UnsupportedQueryShape(_))));
}

#[test]
fn test_unsupported_shapes_are_rejected() {
    for query in [
        "SELECT * WHERE { ?s <http://example.com/p>+ ?o }",
        "SELECT * WHERE { GRAPH ?g { ?s ?p ?o } }",
        r#"SELECT * WHERE { ?s ?p ?o FILTER(CONCAT(?o, "x") = "y") }"#,
        "SELECT * FROM <http://example.com/g> WHERE { ?s ?p ?o }",
        "DESCRIBE <http://example.com/s>",
    ] {
        assert!(
            matches!(lower(query), Err(CompileError::UnsupportedQueryShape(_))),
            "{query} should be rejected"
        );
    }
}

#[test]
fn test_construct_template_keeps_blank_nodes() {
    let query = Query::parse(
        "CONSTRUCT { _:n <http://example.com/name> ?o } WHERE { ?s <http://example.com/p> ?o }",
        None,
    )
    .unwrap();
    let LogicalQuery::Construct { template, .. } =
        LogicalQuery::try_new(&query, &GraphScope::Default).unwrap()
    else {
        panic!("expected a construct query");
    };
    assert_eq!(template.len(), 1);
    assert!(matches!(template[0].subject, PatternTerm::Bound(_)));
}

#[test]
fn test_empty_group_is_unit() {
    let plan = lower("ASK {}").unwrap();
    assert_eq!(plan, QueryPlanNode::unit());
}
