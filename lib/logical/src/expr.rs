use crate::QueryPlanNode;
use kgsql_model::{Term, Variable};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Eq,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithmeticOp {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl ArithmeticOp {
    pub fn symbol(self) -> &'static str {
        match self {
            ArithmeticOp::Add => "+",
            ArithmeticOp::Subtract => "-",
            ArithmeticOp::Multiply => "*",
            ArithmeticOp::Divide => "/",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Plus,
    Minus,
}

/// The built-in functions that can be translated into SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlanFunction {
    Str,
    Lang,
    Datatype,
    StrLen,
    UCase,
    LCase,
    IsIri,
    IsBlank,
    IsLiteral,
    IsNumeric,
    Contains,
    StrStarts,
    StrEnds,
    /// `REGEX(text, pattern [, flags])`. Flags must be a constant.
    Regex,
}

impl PlanFunction {
    pub fn name(self) -> &'static str {
        match self {
            PlanFunction::Str => "STR",
            PlanFunction::Lang => "LANG",
            PlanFunction::Datatype => "DATATYPE",
            PlanFunction::StrLen => "STRLEN",
            PlanFunction::UCase => "UCASE",
            PlanFunction::LCase => "LCASE",
            PlanFunction::IsIri => "isIRI",
            PlanFunction::IsBlank => "isBLANK",
            PlanFunction::IsLiteral => "isLITERAL",
            PlanFunction::IsNumeric => "isNUMERIC",
            PlanFunction::Contains => "CONTAINS",
            PlanFunction::StrStarts => "STRSTARTS",
            PlanFunction::StrEnds => "STRENDS",
            PlanFunction::Regex => "REGEX",
        }
    }

    /// The accepted number of arguments (inclusive range).
    pub fn arity(self) -> (usize, usize) {
        match self {
            PlanFunction::Contains | PlanFunction::StrStarts | PlanFunction::StrEnds => (2, 2),
            PlanFunction::Regex => (2, 3),
            _ => (1, 1),
        }
    }
}

/// A filter, bind or ordering expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PlanExpression {
    Constant(Term),
    Variable(Variable),
    Or(Box<Self>, Box<Self>),
    And(Box<Self>, Box<Self>),
    Not(Box<Self>),
    Compare(CompareOp, Box<Self>, Box<Self>),
    SameTerm(Box<Self>, Box<Self>),
    In(Box<Self>, Vec<Self>),
    Arithmetic(ArithmeticOp, Box<Self>, Box<Self>),
    Unary(UnaryOp, Box<Self>),
    Bound(Variable),
    If(Box<Self>, Box<Self>, Box<Self>),
    Coalesce(Vec<Self>),
    Exists(Box<QueryPlanNode>),
    Function(PlanFunction, Vec<Self>),
}

impl PlanExpression {
    pub fn as_constant(&self) -> Option<&Term> {
        match self {
            PlanExpression::Constant(term) => Some(term),
            _ => None,
        }
    }
}

impl Display for PlanExpression {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            PlanExpression::Constant(term) => write!(f, "{term}"),
            PlanExpression::Variable(variable) => write!(f, "{variable}"),
            PlanExpression::Or(a, b) => write!(f, "({a} || {b})"),
            PlanExpression::And(a, b) => write!(f, "({a} && {b})"),
            PlanExpression::Not(inner) => write!(f, "!{inner}"),
            PlanExpression::Compare(op, a, b) => write!(f, "({a} {} {b})", op.symbol()),
            PlanExpression::SameTerm(a, b) => write!(f, "sameTerm({a}, {b})"),
            PlanExpression::In(a, list) => {
                write!(f, "({a} IN (")?;
                write_list(f, list)?;
                f.write_str("))")
            }
            PlanExpression::Arithmetic(op, a, b) => write!(f, "({a} {} {b})", op.symbol()),
            PlanExpression::Unary(UnaryOp::Plus, inner) => write!(f, "+{inner}"),
            PlanExpression::Unary(UnaryOp::Minus, inner) => write!(f, "-{inner}"),
            PlanExpression::Bound(variable) => write!(f, "BOUND({variable})"),
            PlanExpression::If(c, a, b) => write!(f, "IF({c}, {a}, {b})"),
            PlanExpression::Coalesce(list) => {
                f.write_str("COALESCE(")?;
                write_list(f, list)?;
                f.write_str(")")
            }
            PlanExpression::Exists(_) => f.write_str("EXISTS { ... }"),
            PlanExpression::Function(function, args) => {
                write!(f, "{}(", function.name())?;
                write_list(f, args)?;
                f.write_str(")")
            }
        }
    }
}

fn write_list(f: &mut Formatter<'_>, list: &[PlanExpression]) -> std::fmt::Result {
    for (i, e) in list.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{e}")?;
    }
    Ok(())
}
