//! The relational representation of RDF terms and graphs.
//!
//! Every graph is stored in three statement tables whose names share a prefix derived from the
//! graph identifier. [classify] decides which of the three tables a statement belongs to and the
//! same rules drive [candidate_tables] when reads are planned.

mod schema;
mod storable;
mod table;

pub use schema::{graph_table_prefix, SchemaHandle, TABLE_PREFIX_HEX_LEN};
pub use storable::{decode, encode, DirectCodec, StorableField, StorableValue, TermCodec, BLANK_NODE_PREFIX};
pub use table::{candidate_tables, classify, ObjectShape, TableKind};

pub const COL_SUBJECT: &str = "subject";
pub const COL_PREDICATE: &str = "predicate";
pub const COL_OBJECT: &str = "object";
pub const COL_DATATYPE: &str = "datatype";
pub const COL_LANGUAGE: &str = "language";
pub const COL_CONTEXT: &str = "context";
