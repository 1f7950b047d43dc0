use kgsql_common::CompileResult;
use kgsql_logical::{LogicalQuery, QueryPlanNode};
use kgsql_model::GraphScope;
use spargebra::Query;

pub fn lower(query: &str) -> CompileResult<QueryPlanNode> {
    lower_in(query, &GraphScope::Default)
}

pub fn lower_in(query: &str, scope: &GraphScope) -> CompileResult<QueryPlanNode> {
    let query = Query::parse(query, None).unwrap();
    Ok(LogicalQuery::try_new(&query, scope)?.plan().clone())
}
