use crate::TableKind;
use kgsql_model::GraphScope;
use sha1::{Digest, Sha1};

/// The number of hex characters of the SHA-1 digest kept in a table prefix.
pub const TABLE_PREFIX_HEX_LEN: usize = 16;

/// Derives the table namespace of a graph from its identifier.
///
/// The prefix only depends on `graph_id`, so it is stable across processes and restarts. It is
/// lowercase and alphanumeric and can be used as an unquoted SQL identifier.
pub fn graph_table_prefix(graph_id: &str) -> String {
    let digest = Sha1::digest(graph_id.as_bytes());
    let hex = hex::encode(digest);
    format!("kg_{}", &hex[..TABLE_PREFIX_HEX_LEN])
}

/// Everything needed to address the tables of one graph.
///
/// A handle is computed once per graph and passed to the components that need it. It never
/// changes after construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SchemaHandle {
    scope: GraphScope,
    prefix: String,
}

impl SchemaHandle {
    pub fn new(scope: GraphScope) -> Self {
        let prefix = graph_table_prefix(scope.graph_id());
        Self { scope, prefix }
    }

    pub fn scope(&self) -> &GraphScope {
        &self.scope
    }

    pub fn graph_id(&self) -> &str {
        self.scope.graph_id()
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn table_name(&self, kind: TableKind) -> String {
        format!("{}_{}", self.prefix, kind.suffix())
    }

    /// The columns of a table in storage order.
    pub fn columns(kind: TableKind) -> &'static [&'static str] {
        match kind {
            TableKind::Type => &["subject", "object", "context"],
            TableKind::Asserted => &["subject", "predicate", "object", "context"],
            TableKind::Literal => &[
                "subject",
                "predicate",
                "object",
                "datatype",
                "language",
                "context",
            ],
        }
    }

    /// `CREATE TABLE` and unique index statements for the three tables.
    ///
    /// The unique indexes enforce that each statement is stored at most once and are never
    /// dropped by a bulk load.
    pub fn create_table_statements(&self) -> Vec<String> {
        let ty = self.table_name(TableKind::Type);
        let asserted = self.table_name(TableKind::Asserted);
        let literal = self.table_name(TableKind::Literal);
        vec![
            format!(
                "CREATE TABLE IF NOT EXISTS {ty} (\
                 subject TEXT NOT NULL, object TEXT NOT NULL, context TEXT NOT NULL)"
            ),
            format!(
                "CREATE UNIQUE INDEX IF NOT EXISTS {ty}_uq ON {ty} (subject, object, context)"
            ),
            format!(
                "CREATE TABLE IF NOT EXISTS {asserted} (\
                 subject TEXT NOT NULL, predicate TEXT NOT NULL, object TEXT NOT NULL, \
                 context TEXT NOT NULL)"
            ),
            format!(
                "CREATE UNIQUE INDEX IF NOT EXISTS {asserted}_uq \
                 ON {asserted} (subject, predicate, object, context)"
            ),
            format!(
                "CREATE TABLE IF NOT EXISTS {literal} (\
                 subject TEXT NOT NULL, predicate TEXT NOT NULL, object TEXT NOT NULL, \
                 datatype TEXT NOT NULL, language TEXT NOT NULL DEFAULT '', \
                 context TEXT NOT NULL)"
            ),
            // Literal values may exceed the btree row size limit, hence the digest.
            format!(
                "CREATE UNIQUE INDEX IF NOT EXISTS {literal}_uq \
                 ON {literal} (subject, predicate, md5(object), datatype, language, context)"
            ),
        ]
    }

    /// Names and definitions of the secondary indexes, which a bulk load may suspend.
    fn secondary_indexes(&self) -> Vec<(String, String)> {
        let ty = self.table_name(TableKind::Type);
        let asserted = self.table_name(TableKind::Asserted);
        let literal = self.table_name(TableKind::Literal);
        vec![
            (format!("{ty}_object_idx"), format!("{ty} (object, subject)")),
            (
                format!("{asserted}_predicate_object_idx"),
                format!("{asserted} (predicate, object)"),
            ),
            (format!("{asserted}_object_idx"), format!("{asserted} (object)")),
            (
                format!("{literal}_predicate_idx"),
                format!("{literal} (predicate, subject)"),
            ),
            (
                format!("{literal}_object_trgm_idx"),
                format!("{literal} USING GIN (object gin_trgm_ops)"),
            ),
        ]
    }

    pub fn create_secondary_index_statements(&self) -> Vec<String> {
        self.secondary_indexes()
            .into_iter()
            .map(|(name, definition)| format!("CREATE INDEX IF NOT EXISTS {name} ON {definition}"))
            .collect()
    }

    pub fn drop_secondary_index_statements(&self) -> Vec<String> {
        self.secondary_indexes()
            .into_iter()
            .map(|(name, _)| format!("DROP INDEX IF EXISTS {name}"))
            .collect()
    }

    pub fn drop_table_statements(&self) -> Vec<String> {
        TableKind::ALL
            .iter()
            .map(|kind| format!("DROP TABLE IF EXISTS {}", self.table_name(*kind)))
            .collect()
    }

    pub fn truncate_statement(&self) -> String {
        let tables = TableKind::ALL
            .iter()
            .map(|kind| self.table_name(*kind))
            .collect::<Vec<_>>();
        format!("TRUNCATE TABLE {}", tables.join(", "))
    }
}
