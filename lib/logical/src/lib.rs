//! The query plan tree and its construction from the SPARQL algebra.
//!
//! [GraphPatternRewriter] lowers a parsed [spargebra] query into a [QueryPlanNode] tree. The tree
//! only contains constructs that the SQL compiler can translate. Everything else is rejected
//! during lowering, before any SQL is produced.

mod expr;
mod plan;
mod query;
mod rewriter;

pub use expr::{ArithmeticOp, CompareOp, PlanExpression, PlanFunction, UnaryOp};
pub use plan::{AggregateCall, AggregateKind, PatternTerm, QueryPlanNode, SortKey, StatementPattern};
pub use query::LogicalQuery;
pub use rewriter::GraphPatternRewriter;
