//! Row-level writes of statements into the three tables of a graph.

use kgsql_common::{StorageError, StorageResult};
use kgsql_encoding::{classify, SchemaHandle, TableKind, TermCodec};
use kgsql_model::Triple;
use sqlx::{PgConnection, Row};

/// The columns of statements routed to one table, in column-major order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TableRows {
    pub subjects: Vec<String>,
    pub predicates: Vec<String>,
    pub objects: Vec<String>,
    pub datatypes: Vec<String>,
    pub languages: Vec<String>,
}

impl TableRows {
    pub fn len(&self) -> usize {
        self.subjects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }
}

/// Statements grouped by their target table.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RoutedRows {
    tables: [TableRows; 3],
}

impl RoutedRows {
    /// Encodes `statements` and routes each of them to the table [classify] picks.
    pub fn route<'a>(statements: impl IntoIterator<Item = &'a Triple>, codec: &dyn TermCodec) -> Self {
        let mut rows = Self::default();
        for statement in statements {
            rows.push(statement, codec);
        }
        rows
    }

    pub fn push(&mut self, statement: &Triple, codec: &dyn TermCodec) {
        let kind = classify(statement.predicate.as_ref(), statement.object.as_ref());
        let subject = codec.encode(statement.subject.as_ref().into());
        let object = codec.encode(statement.object.as_ref());
        let rows = &mut self.tables[index(kind)];
        rows.subjects.push(subject.value);
        if kind.has_predicate_column() {
            rows.predicates.push(statement.predicate.as_str().to_owned());
        }
        if kind.has_literal_columns() {
            rows.languages.push(object.stored_language().to_owned());
            rows.datatypes.push(object.datatype.unwrap_or_default());
        }
        rows.objects.push(object.value);
    }

    pub fn get(&self, kind: TableKind) -> &TableRows {
        &self.tables[index(kind)]
    }

    pub fn len(&self) -> usize {
        self.tables.iter().map(TableRows::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The rows of every table, in [TableKind::ALL] order.
    pub fn into_tables(self) -> impl Iterator<Item = (TableKind, TableRows)> {
        TableKind::ALL.into_iter().zip(self.tables)
    }
}

fn index(kind: TableKind) -> usize {
    match kind {
        TableKind::Type => 0,
        TableKind::Asserted => 1,
        TableKind::Literal => 2,
    }
}

/// Inserts statements that are not stored yet. Returns the number of new rows.
pub async fn insert(
    conn: &mut PgConnection,
    schema: &SchemaHandle,
    rows: &RoutedRows,
) -> StorageResult<u64> {
    let mut inserted = 0;
    for kind in TableKind::ALL {
        let table_rows = rows.get(kind);
        if table_rows.is_empty() {
            continue;
        }
        let table = schema.table_name(kind);
        let sql = match kind {
            TableKind::Type => format!(
                "INSERT INTO {table} (subject, object, context) \
                 SELECT s, o, $3 FROM UNNEST($1::text[], $2::text[]) AS u(s, o) \
                 ON CONFLICT DO NOTHING"
            ),
            TableKind::Asserted => format!(
                "INSERT INTO {table} (subject, predicate, object, context) \
                 SELECT s, p, o, $4 FROM UNNEST($1::text[], $2::text[], $3::text[]) AS u(s, p, o) \
                 ON CONFLICT DO NOTHING"
            ),
            TableKind::Literal => format!(
                "INSERT INTO {table} (subject, predicate, object, datatype, language, context) \
                 SELECT s, p, o, d, l, $6 \
                 FROM UNNEST($1::text[], $2::text[], $3::text[], $4::text[], $5::text[]) \
                 AS u(s, p, o, d, l) \
                 ON CONFLICT DO NOTHING"
            ),
        };
        inserted += bind_rows(sqlx::query(&sql), kind, table_rows)
            .bind(schema.graph_id())
            .execute(&mut *conn)
            .await
            .map_err(|e| StorageError::database(format!("inserting into {table}"), e))?
            .rows_affected();
    }
    Ok(inserted)
}

/// Deletes stored statements. Returns the number of removed rows.
pub async fn delete(
    conn: &mut PgConnection,
    schema: &SchemaHandle,
    rows: &RoutedRows,
) -> StorageResult<u64> {
    let mut deleted = 0;
    for kind in TableKind::ALL {
        let table_rows = rows.get(kind);
        if table_rows.is_empty() {
            continue;
        }
        let table = schema.table_name(kind);
        let sql = match kind {
            TableKind::Type => format!(
                "DELETE FROM {table} AS t USING UNNEST($1::text[], $2::text[]) AS u(s, o) \
                 WHERE t.subject = u.s AND t.object = u.o"
            ),
            TableKind::Asserted => format!(
                "DELETE FROM {table} AS t \
                 USING UNNEST($1::text[], $2::text[], $3::text[]) AS u(s, p, o) \
                 WHERE t.subject = u.s AND t.predicate = u.p AND t.object = u.o"
            ),
            TableKind::Literal => format!(
                "DELETE FROM {table} AS t \
                 USING UNNEST($1::text[], $2::text[], $3::text[], $4::text[], $5::text[]) \
                 AS u(s, p, o, d, l) \
                 WHERE t.subject = u.s AND t.predicate = u.p AND t.object = u.o \
                 AND t.datatype = u.d AND t.language = u.l"
            ),
        };
        deleted += bind_rows(sqlx::query(&sql), kind, table_rows)
            .execute(&mut *conn)
            .await
            .map_err(|e| StorageError::database(format!("deleting from {table}"), e))?
            .rows_affected();
    }
    Ok(deleted)
}

fn bind_rows<'q>(
    query: sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments>,
    kind: TableKind,
    rows: &'q TableRows,
) -> sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments> {
    let query = query.bind(&rows.subjects);
    let query = if kind.has_predicate_column() {
        query.bind(&rows.predicates)
    } else {
        query
    };
    let query = query.bind(&rows.objects);
    if kind.has_literal_columns() {
        query.bind(&rows.datatypes).bind(&rows.languages)
    } else {
        query
    }
}

/// Removes every statement of the graph but keeps its tables.
pub async fn clear(conn: &mut PgConnection, schema: &SchemaHandle) -> StorageResult<()> {
    sqlx::query(&schema.truncate_statement())
        .execute(&mut *conn)
        .await
        .map_err(|e| StorageError::database(format!("clearing graph {}", schema.scope()), e))?;
    Ok(())
}

/// The number of statements stored in the graph.
pub async fn count(conn: &mut PgConnection, schema: &SchemaHandle) -> StorageResult<u64> {
    let selects = TableKind::ALL
        .iter()
        .map(|kind| format!("SELECT COUNT(*) AS n FROM {}", schema.table_name(*kind)))
        .collect::<Vec<_>>();
    let row = sqlx::query(&format!(
        "SELECT CAST(SUM(n) AS BIGINT) AS total FROM ({}) AS counts",
        selects.join(" UNION ALL ")
    ))
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| StorageError::database(format!("counting the statements of {}", schema.scope()), e))?;
    let total: i64 = row
        .try_get("total")
        .map_err(|e| StorageError::database("reading the statement count", e))?;
    statement_count(total)
}

fn statement_count(total: i64) -> StorageResult<u64> {
    u64::try_from(total).map_err(|e| {
        StorageError::database("reading the statement count", sqlx::Error::Decode(e.into()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use kgsql_encoding::DirectCodec;
    use kgsql_model::vocab::rdf;
    use kgsql_model::{Literal, NamedNode};

    #[test]
    fn statements_are_routed_by_table() {
        let ex = |v: &str| NamedNode::new_unchecked(format!("http://example.com/{v}"));
        let statements = [
            Triple::new(ex("a"), rdf::TYPE, ex("Person")),
            Triple::new(ex("a"), ex("knows"), ex("b")),
            Triple::new(ex("a"), ex("name"), Literal::new_language_tagged_literal_unchecked("A", "en")),
            Triple::new(ex("a"), ex("nick"), Literal::new_simple_literal("ay")),
        ];
        let rows = RoutedRows::route(&statements, &DirectCodec);

        assert_eq!(rows.len(), 4);
        let types = rows.get(TableKind::Type);
        assert_eq!(types.objects, vec!["http://example.com/Person"]);
        assert!(types.predicates.is_empty());

        let literals = rows.get(TableKind::Literal);
        assert_eq!(literals.objects, vec!["A", "ay"]);
        assert_eq!(literals.languages, vec!["en", ""]);
        assert_eq!(
            literals.datatypes,
            vec![rdf::LANG_STRING.as_str(), "http://www.w3.org/2001/XMLSchema#string"]
        );
        assert_eq!(rows.get(TableKind::Asserted).predicates, vec!["http://example.com/knows"]);
    }

    #[test]
    fn negative_statement_counts_are_errors() {
        assert_eq!(statement_count(42).unwrap(), 42);
        let error = statement_count(-1).unwrap_err();
        assert!(matches!(error, StorageError::TransactionFailure { .. }));
        assert!(!error.is_transient());
    }

    #[test]
    fn tables_are_consumed_in_table_order() {
        let statement = Triple::new(
            NamedNode::new_unchecked("http://example.com/a"),
            NamedNode::new_unchecked("http://example.com/knows"),
            NamedNode::new_unchecked("http://example.com/b"),
        );
        let tables = RoutedRows::route([&statement], &DirectCodec)
            .into_tables()
            .map(|(kind, rows)| (kind, rows.len()))
            .collect::<Vec<_>>();
        assert_eq!(
            tables,
            vec![(TableKind::Type, 0), (TableKind::Asserted, 1), (TableKind::Literal, 0)]
        );
    }
}
