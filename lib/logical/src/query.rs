use crate::{GraphPatternRewriter, QueryPlanNode, StatementPattern};
use kgsql_common::{unsupported_err, CompileResult};
use kgsql_model::GraphScope;
use spargebra::Query;

/// A query form together with its plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogicalQuery {
    Select {
        plan: QueryPlanNode,
    },
    /// Only the existence of a solution matters.
    Ask {
        plan: QueryPlanNode,
    },
    Construct {
        plan: QueryPlanNode,
        template: Vec<StatementPattern>,
    },
}

impl LogicalQuery {
    /// Lowers a parsed query that is evaluated against `scope`.
    pub fn try_new(query: &Query, scope: &GraphScope) -> CompileResult<Self> {
        let rewriter = GraphPatternRewriter::new(scope.clone());
        match query {
            Query::Select {
                dataset, pattern, ..
            } => {
                reject_dataset(dataset.is_some())?;
                Ok(Self::Select {
                    plan: rewriter.rewrite(pattern)?,
                })
            }
            Query::Ask {
                dataset, pattern, ..
            } => {
                reject_dataset(dataset.is_some())?;
                Ok(Self::Ask {
                    plan: rewriter.rewrite(pattern)?,
                })
            }
            Query::Construct {
                template,
                dataset,
                pattern,
                ..
            } => {
                reject_dataset(dataset.is_some())?;
                Ok(Self::Construct {
                    plan: rewriter.rewrite(pattern)?,
                    template: rewriter.rewrite_template(template),
                })
            }
            Query::Describe { .. } => unsupported_err!("DESCRIBE queries"),
        }
    }

    pub fn plan(&self) -> &QueryPlanNode {
        match self {
            Self::Select { plan } | Self::Ask { plan } | Self::Construct { plan, .. } => plan,
        }
    }
}

fn reject_dataset(has_dataset: bool) -> CompileResult<()> {
    if has_dataset {
        return unsupported_err!("FROM and FROM NAMED clauses; queries are scoped to one graph");
    }
    Ok(())
}
