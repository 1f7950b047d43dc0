use crate::PlanExpression;
use kgsql_model::{Term, Variable};
use std::fmt::{Display, Formatter};

/// One position of a [StatementPattern].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PatternTerm {
    Bound(Term),
    Variable(Variable),
}

impl PatternTerm {
    pub fn as_variable(&self) -> Option<&Variable> {
        match self {
            PatternTerm::Variable(v) => Some(v),
            PatternTerm::Bound(_) => None,
        }
    }

    pub fn as_bound(&self) -> Option<&Term> {
        match self {
            PatternTerm::Bound(t) => Some(t),
            PatternTerm::Variable(_) => None,
        }
    }
}

impl Display for PatternTerm {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            PatternTerm::Bound(term) => write!(f, "{term}"),
            PatternTerm::Variable(variable) => write!(f, "{variable}"),
        }
    }
}

/// A statement with variables. The graph is implied by the scope of the query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StatementPattern {
    pub subject: PatternTerm,
    pub predicate: PatternTerm,
    pub object: PatternTerm,
}

impl Display for StatementPattern {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.subject, self.predicate, self.object)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AggregateKind {
    Count,
    Sum,
    Avg,
    Min,
    Max,
    Sample,
    GroupConcat { separator: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AggregateCall {
    /// `COUNT(*)`
    CountAll { distinct: bool },
    Function {
        kind: AggregateKind,
        expression: PlanExpression,
        distinct: bool,
    },
}

impl Display for AggregateCall {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            AggregateCall::CountAll { distinct } => {
                write!(f, "COUNT({}*)", if *distinct { "DISTINCT " } else { "" })
            }
            AggregateCall::Function {
                kind,
                expression,
                distinct,
            } => {
                let name = match kind {
                    AggregateKind::Count => "COUNT",
                    AggregateKind::Sum => "SUM",
                    AggregateKind::Avg => "AVG",
                    AggregateKind::Min => "MIN",
                    AggregateKind::Max => "MAX",
                    AggregateKind::Sample => "SAMPLE",
                    AggregateKind::GroupConcat { .. } => "GROUP_CONCAT",
                };
                let distinct = if *distinct { "DISTINCT " } else { "" };
                write!(f, "{name}({distinct}{expression})")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SortKey {
    pub expression: PlanExpression,
    pub descending: bool,
}

/// A node of the query plan.
///
/// The tree is built once per query and never changes afterward. Children are owned, so a plan
/// can be handed to another task as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryPlanNode {
    Pattern(StatementPattern),
    /// Inline solutions. A single empty row is the neutral element of [QueryPlanNode::Join].
    Values {
        variables: Vec<Variable>,
        rows: Vec<Vec<Option<Term>>>,
    },
    Join {
        left: Box<Self>,
        right: Box<Self>,
    },
    /// `OPTIONAL`. The filter belongs to the join condition.
    LeftJoin {
        left: Box<Self>,
        right: Box<Self>,
        filter: Option<PlanExpression>,
    },
    Union {
        left: Box<Self>,
        right: Box<Self>,
    },
    Minus {
        left: Box<Self>,
        right: Box<Self>,
    },
    Filter {
        inner: Box<Self>,
        expression: PlanExpression,
    },
    /// `BIND`
    Extend {
        inner: Box<Self>,
        variable: Variable,
        expression: PlanExpression,
    },
    Group {
        inner: Box<Self>,
        variables: Vec<Variable>,
        aggregates: Vec<(Variable, AggregateCall)>,
        having: Option<PlanExpression>,
    },
    OrderBy {
        inner: Box<Self>,
        keys: Vec<SortKey>,
    },
    Slice {
        inner: Box<Self>,
        offset: usize,
        limit: Option<usize>,
    },
    Project {
        inner: Box<Self>,
        variables: Vec<Variable>,
    },
    Distinct {
        inner: Box<Self>,
    },
}

impl QueryPlanNode {
    /// A plan producing exactly one solution without bindings.
    pub fn unit() -> Self {
        QueryPlanNode::Values {
            variables: Vec::new(),
            rows: vec![Vec::new()],
        }
    }

    pub fn join(left: Self, right: Self) -> Self {
        QueryPlanNode::Join {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    fn fmt_indented(&self, f: &mut Formatter<'_>, indent: usize) -> std::fmt::Result {
        write!(f, "{:width$}", "", width = indent * 2)?;
        match self {
            QueryPlanNode::Pattern(pattern) => return write!(f, "Pattern: {pattern}"),
            QueryPlanNode::Values { variables, rows } => {
                return write!(f, "Values: [{}] ({} rows)", join_variables(variables), rows.len())
            }
            QueryPlanNode::Join { .. } => write!(f, "Join")?,
            QueryPlanNode::LeftJoin { filter, .. } => match filter {
                Some(filter) => write!(f, "LeftJoin: {filter}")?,
                None => write!(f, "LeftJoin")?,
            },
            QueryPlanNode::Union { .. } => write!(f, "Union")?,
            QueryPlanNode::Minus { .. } => write!(f, "Minus")?,
            QueryPlanNode::Filter { expression, .. } => write!(f, "Filter: {expression}")?,
            QueryPlanNode::Extend {
                variable,
                expression,
                ..
            } => write!(f, "Extend: {variable} := {expression}")?,
            QueryPlanNode::Group {
                variables,
                aggregates,
                having,
                ..
            } => {
                write!(f, "Group: [{}]", join_variables(variables))?;
                for (variable, aggregate) in aggregates {
                    write!(f, " {variable} := {aggregate}")?;
                }
                if let Some(having) = having {
                    write!(f, " HAVING {having}")?;
                }
            }
            QueryPlanNode::OrderBy { keys, .. } => {
                let keys = keys
                    .iter()
                    .map(|k| {
                        if k.descending {
                            format!("DESC({})", k.expression)
                        } else {
                            format!("ASC({})", k.expression)
                        }
                    })
                    .collect::<Vec<_>>();
                write!(f, "OrderBy: {}", keys.join(", "))?;
            }
            QueryPlanNode::Slice { offset, limit, .. } => match limit {
                Some(limit) => write!(f, "Slice: offset={offset} limit={limit}")?,
                None => write!(f, "Slice: offset={offset}")?,
            },
            QueryPlanNode::Project { variables, .. } => {
                write!(f, "Project: {}", join_variables(variables))?;
            }
            QueryPlanNode::Distinct { .. } => write!(f, "Distinct")?,
        }
        for child in self.children() {
            writeln!(f)?;
            child.fmt_indented(f, indent + 1)?;
        }
        Ok(())
    }

    pub fn children(&self) -> Vec<&QueryPlanNode> {
        match self {
            QueryPlanNode::Pattern(_) | QueryPlanNode::Values { .. } => Vec::new(),
            QueryPlanNode::Join { left, right }
            | QueryPlanNode::LeftJoin { left, right, .. }
            | QueryPlanNode::Union { left, right }
            | QueryPlanNode::Minus { left, right } => vec![left.as_ref(), right.as_ref()],
            QueryPlanNode::Filter { inner, .. }
            | QueryPlanNode::Extend { inner, .. }
            | QueryPlanNode::Group { inner, .. }
            | QueryPlanNode::OrderBy { inner, .. }
            | QueryPlanNode::Slice { inner, .. }
            | QueryPlanNode::Project { inner, .. }
            | QueryPlanNode::Distinct { inner } => vec![inner.as_ref()],
        }
    }
}

fn join_variables(variables: &[Variable]) -> String {
    variables
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

impl Display for QueryPlanNode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.fmt_indented(f, 0)
    }
}
