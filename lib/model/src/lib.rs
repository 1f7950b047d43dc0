mod scope;
pub mod vocab;

pub use scope::{GraphScope, DEFAULT_GRAPH_ID};

// Re-export some oxrdf types.
pub use oxiri::Iri;
pub use oxrdf::{
    BlankNode, BlankNodeIdParseError, BlankNodeRef, GraphName, GraphNameRef, IriParseError,
    LanguageTagParseError, Literal, LiteralRef, NamedNode, NamedNodeRef, NamedOrBlankNode, Quad,
    QuadRef, Subject, SubjectRef, Term, TermRef, Triple, TripleRef, Variable,
    VariableNameParseError, VariableRef,
};
