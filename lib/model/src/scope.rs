use oxrdf::{GraphName, GraphNameRef, IriParseError, NamedNode};
use std::fmt::{Display, Formatter};

/// The identifier used for the default graph of a store.
///
/// It is an IRI that no application data is expected to use as a graph name, so the default graph
/// gets its own table namespace like any named graph.
pub const DEFAULT_GRAPH_ID: &str = "urn:kgsql:default-graph";

/// The graph a read or write operates on.
///
/// Every query, update and load is scoped to exactly one graph. Each scope owns its own set of
/// statement tables.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum GraphScope {
    /// The store-wide default graph.
    #[default]
    Default,
    /// A named graph.
    Named(NamedNode),
}

impl GraphScope {
    /// Creates a scope for the named graph `iri`.
    pub fn named(iri: impl Into<String>) -> Result<Self, IriParseError> {
        Ok(Self::Named(NamedNode::new(iri)?))
    }

    /// The string identifier from which the table namespace of this graph is derived.
    pub fn graph_id(&self) -> &str {
        match self {
            GraphScope::Default => DEFAULT_GRAPH_ID,
            GraphScope::Named(nn) => nn.as_str(),
        }
    }

    /// Rebuilds a scope from a stored graph identifier.
    pub fn from_graph_id(graph_id: &str) -> Result<Self, IriParseError> {
        if graph_id == DEFAULT_GRAPH_ID {
            Ok(GraphScope::Default)
        } else {
            Self::named(graph_id)
        }
    }

    pub fn is_default(&self) -> bool {
        matches!(self, GraphScope::Default)
    }

    pub fn as_graph_name(&self) -> GraphNameRef<'_> {
        match self {
            GraphScope::Default => GraphNameRef::DefaultGraph,
            GraphScope::Named(nn) => GraphNameRef::NamedNode(nn.as_ref()),
        }
    }
}

impl From<NamedNode> for GraphScope {
    fn from(value: NamedNode) -> Self {
        GraphScope::Named(value)
    }
}

impl From<GraphScope> for GraphName {
    fn from(value: GraphScope) -> Self {
        match value {
            GraphScope::Default => GraphName::DefaultGraph,
            GraphScope::Named(nn) => GraphName::NamedNode(nn),
        }
    }
}

impl Display for GraphScope {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            GraphScope::Default => f.write_str("DEFAULT"),
            GraphScope::Named(nn) => write!(f, "{nn}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_scope_uses_reserved_id() {
        assert_eq!(GraphScope::Default.graph_id(), DEFAULT_GRAPH_ID);
        assert_eq!(
            GraphScope::from_graph_id(DEFAULT_GRAPH_ID).unwrap(),
            GraphScope::Default
        );
    }

    #[test]
    fn named_scope_round_trips_through_graph_id() {
        let scope = GraphScope::named("http://example.com/g").unwrap();
        assert_eq!(scope.graph_id(), "http://example.com/g");
        assert_eq!(GraphScope::from_graph_id(scope.graph_id()).unwrap(), scope);
        assert_eq!(scope.to_string(), "<http://example.com/g>");
    }

    #[test]
    fn named_scope_rejects_relative_iri() {
        assert!(GraphScope::named("not an iri").is_err());
    }
}
