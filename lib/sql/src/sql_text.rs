//! Small helpers for writing SQL text.

use kgsql_model::vocab::{rdf, xsd};

pub const NULL_TEXT: &str = "CAST(NULL AS TEXT)";

/// Quotes a string as a SQL literal. Only used for fixed vocabulary, never for user data.
pub fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Escapes the `LIKE` wildcards of `value`. The escape character is `\`.
pub fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

pub fn xsd_string() -> String {
    quote(xsd::STRING.as_str())
}

pub fn lang_string() -> String {
    quote(rdf::LANG_STRING.as_str())
}

/// Lexical forms of `xsd:integer` and its derived types.
pub const INTEGER_LEXICAL: &str = "'^[+-]?[0-9]+$'";

/// Lexical forms of `xsd:decimal`, which include the integer forms.
pub const DECIMAL_LEXICAL: &str = "'^[+-]?([0-9]+([.][0-9]*)?|[.][0-9]+)$'";

/// Lexical forms of `xsd:double` and `xsd:float`, which include the decimal forms.
pub const DOUBLE_LEXICAL: &str =
    "'^([+-]?(([0-9]+([.][0-9]*)?|[.][0-9]+)([eE][+-]?[0-9]+)?|INF)|NaN)$'";

/// Datatypes whose values compare numerically.
pub const NUMERIC_TYPES: &[&str] = &[
    "http://www.w3.org/2001/XMLSchema#integer",
    "http://www.w3.org/2001/XMLSchema#decimal",
    "http://www.w3.org/2001/XMLSchema#double",
    "http://www.w3.org/2001/XMLSchema#float",
    "http://www.w3.org/2001/XMLSchema#int",
    "http://www.w3.org/2001/XMLSchema#long",
    "http://www.w3.org/2001/XMLSchema#short",
    "http://www.w3.org/2001/XMLSchema#byte",
    "http://www.w3.org/2001/XMLSchema#nonNegativeInteger",
    "http://www.w3.org/2001/XMLSchema#nonPositiveInteger",
    "http://www.w3.org/2001/XMLSchema#positiveInteger",
    "http://www.w3.org/2001/XMLSchema#negativeInteger",
    "http://www.w3.org/2001/XMLSchema#unsignedLong",
    "http://www.w3.org/2001/XMLSchema#unsignedInt",
    "http://www.w3.org/2001/XMLSchema#unsignedShort",
    "http://www.w3.org/2001/XMLSchema#unsignedByte",
];

/// The subset of [NUMERIC_TYPES] whose values are integers.
pub const INTEGER_TYPES: &[&str] = &[
    "http://www.w3.org/2001/XMLSchema#integer",
    "http://www.w3.org/2001/XMLSchema#int",
    "http://www.w3.org/2001/XMLSchema#long",
    "http://www.w3.org/2001/XMLSchema#short",
    "http://www.w3.org/2001/XMLSchema#byte",
    "http://www.w3.org/2001/XMLSchema#nonNegativeInteger",
    "http://www.w3.org/2001/XMLSchema#nonPositiveInteger",
    "http://www.w3.org/2001/XMLSchema#positiveInteger",
    "http://www.w3.org/2001/XMLSchema#negativeInteger",
    "http://www.w3.org/2001/XMLSchema#unsignedLong",
    "http://www.w3.org/2001/XMLSchema#unsignedInt",
    "http://www.w3.org/2001/XMLSchema#unsignedShort",
    "http://www.w3.org/2001/XMLSchema#unsignedByte",
];

pub const DATE_TIME_TYPES: &[&str] = &[
    "http://www.w3.org/2001/XMLSchema#dateTime",
    "http://www.w3.org/2001/XMLSchema#date",
];

/// `column IN ('a', 'b', ...)`
pub fn in_list(column: &str, values: &[&str]) -> String {
    let values = values.iter().map(|v| quote(v)).collect::<Vec<_>>();
    format!("{column} IN ({})", values.join(", "))
}
