use kgsql_frames::{
    build, Comparator, EntityCriteria, FrameCriteria, FrameQueryBuilder, SlotCriteria, SlotValue,
};
use kgsql_logical::{CompareOp, LogicalQuery, PatternTerm, PlanExpression, QueryPlanNode};
use kgsql_model::vocab::{haley, rdf};
use kgsql_model::{GraphScope, NamedNode, Term};
use spargebra::Query;

fn lower(query: &str, scope: &GraphScope) -> QueryPlanNode {
    let query = Query::parse(query, None).unwrap();
    LogicalQuery::try_new(&query, scope).unwrap().plan().clone()
}

fn nodes(plan: &QueryPlanNode) -> Vec<&QueryPlanNode> {
    let mut result = Vec::new();
    let mut stack = vec![plan];
    while let Some(node) = stack.pop() {
        result.push(node);
        stack.extend(node.children());
    }
    result
}

fn count_edge_hops(plan: &QueryPlanNode) -> usize {
    nodes(plan)
        .into_iter()
        .filter(|node| match node {
            QueryPlanNode::Pattern(pattern) => {
                pattern.predicate == PatternTerm::Bound(rdf::TYPE.into_owned().into())
                    && [haley::EDGE_HAS_ENTITY_KG_FRAME, haley::EDGE_HAS_KG_FRAME]
                        .into_iter()
                        .any(|edge| pattern.object == PatternTerm::Bound(Term::from(edge.into_owned())))
            }
            _ => false,
        })
        .count()
}

fn count_equality_filters(plan: &QueryPlanNode) -> usize {
    nodes(plan)
        .into_iter()
        .filter(|node| {
            matches!(
                node,
                QueryPlanNode::Filter {
                    expression: PlanExpression::Compare(CompareOp::Eq, _, _),
                    ..
                }
            )
        })
        .count()
}

fn nested_criteria() -> EntityCriteria {
    EntityCriteria::default()
        .with_entity_type(NamedNode::new_unchecked("http://example.org/types#Company"))
        .with_frame(
            FrameCriteria::of_type(NamedNode::new_unchecked("http://example.org/frames#Address"))
                .with_frame(
                    FrameCriteria::of_type(NamedNode::new_unchecked(
                        "http://example.org/frames#City",
                    ))
                    .with_slot(SlotCriteria::new(
                        Some(NamedNode::new_unchecked("http://example.org/slots#CityName")),
                        Comparator::Eq,
                        SlotValue::Text("Oslo".to_owned()),
                    )),
                ),
        )
}

#[test]
fn test_nested_frames_lower_to_two_hops_and_one_filter() {
    let query = build(&nested_criteria(), &GraphScope::Default, 10, 0).unwrap();
    let plan = lower(&query, &GraphScope::Default);

    assert_eq!(count_edge_hops(&plan), 2);
    assert_eq!(count_equality_filters(&plan), 1);
}

#[test]
fn test_named_scope_query_lowers_in_that_scope() {
    let scope = GraphScope::named("http://example.org/graphs/kg").unwrap();
    let query = build(&nested_criteria(), &scope, 10, 20).unwrap();
    let plan = lower(&query, &scope);

    assert_eq!(count_edge_hops(&plan), 2);
    assert!(nodes(&plan).iter().any(|node| matches!(
        node,
        QueryPlanNode::Slice {
            offset: 20,
            limit: Some(10),
            ..
        }
    )));
}

#[test]
fn test_named_scope_query_is_rejected_in_another_scope() {
    let scope = GraphScope::named("http://example.org/graphs/kg").unwrap();
    let query = build(&nested_criteria(), &scope, 10, 0).unwrap();
    let query = Query::parse(&query, None).unwrap();

    assert!(LogicalQuery::try_new(&query, &GraphScope::Default).is_err());
}

#[test]
fn test_every_comparator_produces_valid_sparql() {
    let slots = [
        (Comparator::Eq, SlotValue::Integer(3)),
        (Comparator::Ne, SlotValue::Boolean(false)),
        (Comparator::Gt, SlotValue::Double(1.5)),
        (Comparator::Lt, SlotValue::DateTime("2024-01-01T00:00:00Z".to_owned())),
        (Comparator::Gte, SlotValue::Integer(-7)),
        (Comparator::Lte, SlotValue::Text("m".to_owned())),
        (Comparator::Contains, SlotValue::Text("needle \"quoted\"".to_owned())),
        (
            Comparator::Eq,
            SlotValue::Uri(NamedNode::new_unchecked("http://example.org/target")),
        ),
    ];
    let frame = slots
        .into_iter()
        .fold(FrameCriteria::default(), |frame, (comparator, value)| {
            frame.with_slot(SlotCriteria::new(None, comparator, value))
        });
    let criteria = EntityCriteria::default()
        .with_search_string("Acme")
        .with_frame(frame);

    let query = build(&criteria, &GraphScope::Default, 50, 0).unwrap();
    lower(&query, &GraphScope::Default);
}

#[test]
fn test_count_query_lowers() {
    let query = FrameQueryBuilder::default()
        .build_count(&nested_criteria(), &GraphScope::Default)
        .unwrap();
    let plan = lower(&query, &GraphScope::Default);

    assert!(nodes(&plan)
        .iter()
        .any(|node| matches!(node, QueryPlanNode::Group { .. })));
}
