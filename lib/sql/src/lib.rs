//! Compilation of query plans into SQL over the statement tables of one graph.
//!
//! Each plan node becomes a complete `SELECT` statement ([SqlFragment]) whose columns carry the
//! value, datatype and language of every variable. Parent nodes nest the statements of their
//! children as derived tables. All bound terms are passed as positional parameters, so the
//! statement text never contains user data.

mod aggregate;
mod compiler;
mod expr;
mod fragment;
mod params;
mod pattern;
mod sql_text;

pub use compiler::{CompiledQuery, SqlCompiler};
pub use fragment::{Binding, SqlFragment};
pub use params::SqlParameters;
pub use sql_text::escape_like;

use kgsql_common::CompileResult;
use kgsql_encoding::{SchemaHandle, TermCodec};
use kgsql_logical::LogicalQuery;

/// Compiles the graph pattern of a query.
///
/// `ASK` queries compile to a statement returning at most one row. `SELECT` and `CONSTRUCT`
/// queries compile to a statement returning their solutions.
pub fn compile_query(
    query: &LogicalQuery,
    schema: &SchemaHandle,
    codec: &dyn TermCodec,
) -> CompileResult<CompiledQuery> {
    let compiler = SqlCompiler::new(schema, codec);
    match query {
        LogicalQuery::Ask { plan } => compiler.compile_ask(plan),
        LogicalQuery::Select { plan } | LogicalQuery::Construct { plan, .. } => {
            compiler.compile_select(plan)
        }
    }
}
