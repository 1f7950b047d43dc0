use kgsql_model::vocab::rdf;
use kgsql_model::{NamedNodeRef, TermRef};
use std::fmt::{Display, Formatter};

/// One of the three statement tables of a graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TableKind {
    /// `rdf:type` statements with an IRI or blank node class: `(subject, object, context)`.
    Type,
    /// Statements with an IRI or blank node object: `(subject, predicate, object, context)`.
    Asserted,
    /// Statements with a literal object:
    /// `(subject, predicate, object, datatype, language, context)`.
    Literal,
}

impl TableKind {
    pub const ALL: [TableKind; 3] = [TableKind::Type, TableKind::Asserted, TableKind::Literal];

    pub fn suffix(self) -> &'static str {
        match self {
            TableKind::Type => "type",
            TableKind::Asserted => "asserted",
            TableKind::Literal => "literal",
        }
    }

    /// The type table has no predicate column. Its predicate is always `rdf:type`.
    pub fn has_predicate_column(self) -> bool {
        !matches!(self, TableKind::Type)
    }

    pub fn has_literal_columns(self) -> bool {
        matches!(self, TableKind::Literal)
    }
}

impl Display for TableKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.suffix())
    }
}

/// Decides which table stores the statement with the given predicate and object.
///
/// This is a pure function of its inputs. Writers use it to route rows and the pattern translator
/// relies on [candidate_tables], which follows the same rules.
pub fn classify(predicate: NamedNodeRef<'_>, object: TermRef<'_>) -> TableKind {
    match object {
        TermRef::Literal(_) => TableKind::Literal,
        TermRef::NamedNode(_) | TermRef::BlankNode(_) => {
            if predicate == rdf::TYPE {
                TableKind::Type
            } else {
                TableKind::Asserted
            }
        }
    }
}

/// What is statically known about the object position of a pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectShape {
    /// Bound to an IRI or a blank node.
    Resource,
    /// Bound to a literal.
    Literal,
    /// A variable that may take any term.
    Unknown,
}

impl From<TermRef<'_>> for ObjectShape {
    fn from(value: TermRef<'_>) -> Self {
        match value {
            TermRef::Literal(_) => ObjectShape::Literal,
            TermRef::NamedNode(_) | TermRef::BlankNode(_) => ObjectShape::Resource,
        }
    }
}

/// Returns every table that may hold a statement matching the given predicate and object shape.
///
/// A single table is returned only when [classify] would put every matching statement there.
/// `predicate` is `None` if the predicate is a variable.
pub fn candidate_tables(
    predicate: Option<NamedNodeRef<'_>>,
    object: ObjectShape,
) -> &'static [TableKind] {
    const TYPE: &[TableKind] = &[TableKind::Type];
    const ASSERTED: &[TableKind] = &[TableKind::Asserted];
    const LITERAL: &[TableKind] = &[TableKind::Literal];
    const TYPE_OR_LITERAL: &[TableKind] = &[TableKind::Type, TableKind::Literal];
    const ASSERTED_OR_LITERAL: &[TableKind] = &[TableKind::Asserted, TableKind::Literal];
    const RESOURCES: &[TableKind] = &[TableKind::Type, TableKind::Asserted];

    match (predicate, object) {
        (_, ObjectShape::Literal) => LITERAL,
        (Some(p), ObjectShape::Resource) if p == rdf::TYPE => TYPE,
        (Some(p), ObjectShape::Unknown) if p == rdf::TYPE => TYPE_OR_LITERAL,
        (Some(_), ObjectShape::Resource) => ASSERTED,
        (Some(_), ObjectShape::Unknown) => ASSERTED_OR_LITERAL,
        (None, ObjectShape::Resource) => RESOURCES,
        (None, ObjectShape::Unknown) => &TableKind::ALL,
    }
}
