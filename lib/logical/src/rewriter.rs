use crate::{
    AggregateCall, AggregateKind, ArithmeticOp, CompareOp, PatternTerm, PlanExpression,
    PlanFunction, QueryPlanNode, SortKey, StatementPattern, UnaryOp,
};
use kgsql_common::{unsupported_err, CompileResult};
use kgsql_model::{GraphScope, Term, Variable};
use spargebra::algebra::{
    AggregateExpression, AggregateFunction, Expression, Function, GraphPattern, OrderExpression,
};
use spargebra::term::{GroundTerm, NamedNodePattern, TermPattern, TriplePattern};

/// Blank nodes of a query pattern behave like variables that cannot be projected.
const BLANK_NODE_VARIABLE_PREFIX: &str = "_bnode_";

/// Lowers a [GraphPattern] into a [QueryPlanNode] for one graph scope.
pub struct GraphPatternRewriter {
    scope: GraphScope,
}

impl GraphPatternRewriter {
    pub fn new(scope: GraphScope) -> Self {
        Self { scope }
    }

    pub fn rewrite(&self, pattern: &GraphPattern) -> CompileResult<QueryPlanNode> {
        self.rewrite_graph_pattern(pattern)
    }

    fn rewrite_graph_pattern(&self, pattern: &GraphPattern) -> CompileResult<QueryPlanNode> {
        match pattern {
            GraphPattern::Bgp { patterns } => Ok(patterns
                .iter()
                .map(|p| QueryPlanNode::Pattern(self.rewrite_triple_pattern(p)))
                .reduce(QueryPlanNode::join)
                .unwrap_or_else(QueryPlanNode::unit)),
            GraphPattern::Project { inner, variables } => Ok(QueryPlanNode::Project {
                inner: Box::new(self.rewrite_graph_pattern(inner)?),
                variables: variables.clone(),
            }),
            GraphPattern::Filter { expr, inner } => {
                let inner = self.rewrite_graph_pattern(inner)?;
                let expression = self.rewrite_expression(expr)?;
                match inner {
                    // HAVING is a filter directly on top of the aggregation.
                    QueryPlanNode::Group {
                        inner,
                        variables,
                        aggregates,
                        having: None,
                    } => Ok(QueryPlanNode::Group {
                        inner,
                        variables,
                        aggregates,
                        having: Some(expression),
                    }),
                    inner => Ok(QueryPlanNode::Filter {
                        inner: Box::new(inner),
                        expression,
                    }),
                }
            }
            GraphPattern::Extend {
                inner,
                variable,
                expression,
            } => Ok(QueryPlanNode::Extend {
                inner: Box::new(self.rewrite_graph_pattern(inner)?),
                variable: variable.clone(),
                expression: self.rewrite_expression(expression)?,
            }),
            GraphPattern::Values {
                variables,
                bindings,
            } => Ok(QueryPlanNode::Values {
                variables: variables.clone(),
                rows: bindings
                    .iter()
                    .map(|row| row.iter().map(|t| t.as_ref().map(ground_term)).collect())
                    .collect(),
            }),
            GraphPattern::Join { left, right } => Ok(QueryPlanNode::join(
                self.rewrite_graph_pattern(left)?,
                self.rewrite_graph_pattern(right)?,
            )),
            GraphPattern::LeftJoin {
                left,
                right,
                expression,
            } => Ok(QueryPlanNode::LeftJoin {
                left: Box::new(self.rewrite_graph_pattern(left)?),
                right: Box::new(self.rewrite_graph_pattern(right)?),
                filter: expression
                    .as_ref()
                    .map(|e| self.rewrite_expression(e))
                    .transpose()?,
            }),
            GraphPattern::Union { left, right } => Ok(QueryPlanNode::Union {
                left: Box::new(self.rewrite_graph_pattern(left)?),
                right: Box::new(self.rewrite_graph_pattern(right)?),
            }),
            GraphPattern::Minus { left, right } => Ok(QueryPlanNode::Minus {
                left: Box::new(self.rewrite_graph_pattern(left)?),
                right: Box::new(self.rewrite_graph_pattern(right)?),
            }),
            GraphPattern::Slice {
                inner,
                start,
                length,
            } => Ok(QueryPlanNode::Slice {
                inner: Box::new(self.rewrite_graph_pattern(inner)?),
                offset: *start,
                limit: *length,
            }),
            GraphPattern::Distinct { inner } | GraphPattern::Reduced { inner } => {
                Ok(QueryPlanNode::Distinct {
                    inner: Box::new(self.rewrite_graph_pattern(inner)?),
                })
            }
            GraphPattern::OrderBy { inner, expression } => Ok(QueryPlanNode::OrderBy {
                inner: Box::new(self.rewrite_graph_pattern(inner)?),
                keys: expression
                    .iter()
                    .map(|e| self.rewrite_order_expression(e))
                    .collect::<CompileResult<Vec<_>>>()?,
            }),
            GraphPattern::Group {
                inner,
                variables,
                aggregates,
            } => Ok(QueryPlanNode::Group {
                inner: Box::new(self.rewrite_graph_pattern(inner)?),
                variables: variables.clone(),
                aggregates: aggregates
                    .iter()
                    .map(|(variable, aggregate)| {
                        self.rewrite_aggregate(aggregate)
                            .map(|a| (variable.clone(), a))
                    })
                    .collect::<CompileResult<Vec<_>>>()?,
                having: None,
            }),
            GraphPattern::Graph { name, inner } => match name {
                NamedNodePattern::NamedNode(nn) if self.scope == GraphScope::Named(nn.clone()) => {
                    self.rewrite_graph_pattern(inner)
                }
                NamedNodePattern::NamedNode(nn) => unsupported_err!(
                    "GRAPH {nn} differs from the query scope {}",
                    self.scope
                ),
                NamedNodePattern::Variable(v) => {
                    unsupported_err!("GRAPH {v} ranges over several graphs")
                }
            },
            GraphPattern::Path { .. } => unsupported_err!("property paths"),
            GraphPattern::Service { .. } => unsupported_err!("federated SERVICE patterns"),
            #[allow(unreachable_patterns)]
            _ => unsupported_err!("graph pattern {pattern:?}"),
        }
    }

    /// Lowers a triple pattern of a query body. Blank nodes become internal variables.
    pub fn rewrite_triple_pattern(&self, pattern: &TriplePattern) -> StatementPattern {
        StatementPattern {
            subject: body_term(&pattern.subject),
            predicate: named_node_pattern(&pattern.predicate),
            object: body_term(&pattern.object),
        }
    }

    /// Lowers a CONSTRUCT template. Blank nodes stay bound so that they can be renamed per
    /// solution.
    pub fn rewrite_template(&self, template: &[TriplePattern]) -> Vec<StatementPattern> {
        template
            .iter()
            .map(|pattern| StatementPattern {
                subject: template_term(&pattern.subject),
                predicate: named_node_pattern(&pattern.predicate),
                object: template_term(&pattern.object),
            })
            .collect()
    }

    /// Rewrites an [Expression].
    pub fn rewrite_expression(&self, expression: &Expression) -> CompileResult<PlanExpression> {
        let binary = |a: &Expression, b: &Expression| -> CompileResult<_> {
            Ok((
                Box::new(self.rewrite_expression(a)?),
                Box::new(self.rewrite_expression(b)?),
            ))
        };
        Ok(match expression {
            Expression::NamedNode(nn) => PlanExpression::Constant(nn.clone().into()),
            Expression::Literal(literal) => PlanExpression::Constant(literal.clone().into()),
            Expression::Variable(variable) => PlanExpression::Variable(variable.clone()),
            Expression::Or(a, b) => {
                let (a, b) = binary(a, b)?;
                PlanExpression::Or(a, b)
            }
            Expression::And(a, b) => {
                let (a, b) = binary(a, b)?;
                PlanExpression::And(a, b)
            }
            Expression::Equal(a, b) => compare(CompareOp::Eq, binary(a, b)?),
            Expression::Greater(a, b) => compare(CompareOp::Gt, binary(a, b)?),
            Expression::GreaterOrEqual(a, b) => compare(CompareOp::Ge, binary(a, b)?),
            Expression::Less(a, b) => compare(CompareOp::Lt, binary(a, b)?),
            Expression::LessOrEqual(a, b) => compare(CompareOp::Le, binary(a, b)?),
            Expression::SameTerm(a, b) => {
                let (a, b) = binary(a, b)?;
                PlanExpression::SameTerm(a, b)
            }
            Expression::In(a, list) => PlanExpression::In(
                Box::new(self.rewrite_expression(a)?),
                self.rewrite_expressions(list)?,
            ),
            Expression::Add(a, b) => arithmetic(ArithmeticOp::Add, binary(a, b)?),
            Expression::Subtract(a, b) => arithmetic(ArithmeticOp::Subtract, binary(a, b)?),
            Expression::Multiply(a, b) => arithmetic(ArithmeticOp::Multiply, binary(a, b)?),
            Expression::Divide(a, b) => arithmetic(ArithmeticOp::Divide, binary(a, b)?),
            Expression::UnaryPlus(inner) => {
                PlanExpression::Unary(UnaryOp::Plus, Box::new(self.rewrite_expression(inner)?))
            }
            Expression::UnaryMinus(inner) => {
                PlanExpression::Unary(UnaryOp::Minus, Box::new(self.rewrite_expression(inner)?))
            }
            Expression::Not(inner) => PlanExpression::Not(Box::new(self.rewrite_expression(inner)?)),
            Expression::Exists(pattern) => {
                PlanExpression::Exists(Box::new(self.rewrite_graph_pattern(pattern)?))
            }
            Expression::Bound(variable) => PlanExpression::Bound(variable.clone()),
            Expression::If(c, a, b) => PlanExpression::If(
                Box::new(self.rewrite_expression(c)?),
                Box::new(self.rewrite_expression(a)?),
                Box::new(self.rewrite_expression(b)?),
            ),
            Expression::Coalesce(list) => PlanExpression::Coalesce(self.rewrite_expressions(list)?),
            Expression::FunctionCall(function, args) => {
                let function = rewrite_function(function)?;
                let (min, max) = function.arity();
                if args.len() < min || args.len() > max {
                    return unsupported_err!(
                        "{} called with {} arguments",
                        function.name(),
                        args.len()
                    );
                }
                PlanExpression::Function(function, self.rewrite_expressions(args)?)
            }
        })
    }

    fn rewrite_expressions(&self, list: &[Expression]) -> CompileResult<Vec<PlanExpression>> {
        list.iter().map(|e| self.rewrite_expression(e)).collect()
    }

    /// Rewrites an [OrderExpression].
    fn rewrite_order_expression(&self, expression: &OrderExpression) -> CompileResult<SortKey> {
        let (descending, inner) = match expression {
            OrderExpression::Asc(inner) => (false, inner),
            OrderExpression::Desc(inner) => (true, inner),
        };
        Ok(SortKey {
            expression: self.rewrite_expression(inner)?,
            descending,
        })
    }

    /// Rewrites an [AggregateExpression].
    fn rewrite_aggregate(&self, expression: &AggregateExpression) -> CompileResult<AggregateCall> {
        match expression {
            AggregateExpression::CountSolutions { distinct } => Ok(AggregateCall::CountAll {
                distinct: *distinct,
            }),
            AggregateExpression::FunctionCall {
                name,
                expr,
                distinct,
            } => {
                let kind = match name {
                    AggregateFunction::Count => AggregateKind::Count,
                    AggregateFunction::Sum => AggregateKind::Sum,
                    AggregateFunction::Avg => AggregateKind::Avg,
                    AggregateFunction::Min => AggregateKind::Min,
                    AggregateFunction::Max => AggregateKind::Max,
                    AggregateFunction::Sample => AggregateKind::Sample,
                    AggregateFunction::GroupConcat { separator } => AggregateKind::GroupConcat {
                        separator: separator.clone().unwrap_or_else(|| " ".to_owned()),
                    },
                    AggregateFunction::Custom(name) => {
                        return unsupported_err!("custom aggregate function {name}")
                    }
                };
                Ok(AggregateCall::Function {
                    kind,
                    expression: self.rewrite_expression(expr)?,
                    distinct: *distinct,
                })
            }
        }
    }
}

fn compare(op: CompareOp, (a, b): (Box<PlanExpression>, Box<PlanExpression>)) -> PlanExpression {
    PlanExpression::Compare(op, a, b)
}

fn arithmetic(
    op: ArithmeticOp,
    (a, b): (Box<PlanExpression>, Box<PlanExpression>),
) -> PlanExpression {
    PlanExpression::Arithmetic(op, a, b)
}

fn rewrite_function(function: &Function) -> CompileResult<PlanFunction> {
    Ok(match function {
        Function::Str => PlanFunction::Str,
        Function::Lang => PlanFunction::Lang,
        Function::Datatype => PlanFunction::Datatype,
        Function::StrLen => PlanFunction::StrLen,
        Function::UCase => PlanFunction::UCase,
        Function::LCase => PlanFunction::LCase,
        Function::IsIri => PlanFunction::IsIri,
        Function::IsBlank => PlanFunction::IsBlank,
        Function::IsLiteral => PlanFunction::IsLiteral,
        Function::IsNumeric => PlanFunction::IsNumeric,
        Function::Contains => PlanFunction::Contains,
        Function::StrStarts => PlanFunction::StrStarts,
        Function::StrEnds => PlanFunction::StrEnds,
        Function::Regex => PlanFunction::Regex,
        other => return unsupported_err!("function {other:?}"),
    })
}

fn ground_term(term: &GroundTerm) -> Term {
    match term {
        GroundTerm::NamedNode(nn) => nn.clone().into(),
        GroundTerm::Literal(literal) => literal.clone().into(),
    }
}

fn named_node_pattern(pattern: &NamedNodePattern) -> PatternTerm {
    match pattern {
        NamedNodePattern::NamedNode(nn) => PatternTerm::Bound(nn.clone().into()),
        NamedNodePattern::Variable(v) => PatternTerm::Variable(v.clone()),
    }
}

fn body_term(pattern: &TermPattern) -> PatternTerm {
    match pattern {
        TermPattern::NamedNode(nn) => PatternTerm::Bound(nn.clone().into()),
        TermPattern::Literal(literal) => PatternTerm::Bound(literal.clone().into()),
        TermPattern::BlankNode(bnode) => PatternTerm::Variable(Variable::new_unchecked(format!(
            "{BLANK_NODE_VARIABLE_PREFIX}{}",
            bnode.as_str()
        ))),
        TermPattern::Variable(v) => PatternTerm::Variable(v.clone()),
    }
}

fn template_term(pattern: &TermPattern) -> PatternTerm {
    match pattern {
        TermPattern::NamedNode(nn) => PatternTerm::Bound(nn.clone().into()),
        TermPattern::Literal(literal) => PatternTerm::Bound(literal.clone().into()),
        TermPattern::BlankNode(bnode) => PatternTerm::Bound(bnode.clone().into()),
        TermPattern::Variable(v) => PatternTerm::Variable(v.clone()),
    }
}
