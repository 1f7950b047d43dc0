//! Evaluation of SPARQL queries and updates against graphs stored in PostgreSQL.
//!
//! Queries are lowered to a query plan, compiled into one SQL statement and executed inside a
//! read transaction. Result rows are decoded while they are streamed to the caller. Updates are
//! executed operation by operation, each in its own transaction.

mod engine;
pub mod results;
pub mod sparql;

pub use engine::QueryEngine;
