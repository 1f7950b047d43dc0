use kgsql_common::DecodeError;
use kgsql_model::vocab::{rdf, xsd};
use kgsql_model::{BlankNode, Literal, NamedNode, Term, TermRef};

/// Blank nodes are stored with this prefix. An absolute IRI can never start with it.
pub const BLANK_NODE_PREFIX: &str = "_:";

/// The columns that together hold one term.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorableField {
    /// The IRI, the `_:`-prefixed blank node label or the lexical form of a literal.
    Value,
    /// The datatype IRI of a literal. `NULL` for IRIs and blank nodes.
    DataType,
    /// The language tag of a literal. `NULL` (or `''` in the literal table) if there is none.
    Language,
}

impl StorableField {
    /// The suffix appended to a variable alias for this field in compiled SQL.
    pub fn alias_suffix(self) -> &'static str {
        match self {
            StorableField::Value => "",
            StorableField::DataType => "_dt",
            StorableField::Language => "_lang",
        }
    }
}

/// The relational representation of a term.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorableValue {
    pub value: String,
    pub datatype: Option<String>,
    pub language: Option<String>,
}

impl StorableValue {
    pub fn is_literal(&self) -> bool {
        self.datatype.is_some()
    }

    /// The language column as stored in the literal table, where it is not nullable.
    pub fn stored_language(&self) -> &str {
        self.language.as_deref().unwrap_or("")
    }

    pub fn decode(&self) -> Result<Term, DecodeError> {
        decode(
            &self.value,
            self.datatype.as_deref(),
            self.language.as_deref(),
        )
    }
}

/// Maps a term to its relational representation.
///
/// Literals always carry a datatype: simple literals get `xsd:string` and language-tagged ones
/// `rdf:langString`.
pub fn encode(term: TermRef<'_>) -> StorableValue {
    match term {
        TermRef::NamedNode(nn) => StorableValue {
            value: nn.as_str().to_owned(),
            datatype: None,
            language: None,
        },
        TermRef::BlankNode(bnode) => StorableValue {
            value: format!("{BLANK_NODE_PREFIX}{}", bnode.as_str()),
            datatype: None,
            language: None,
        },
        TermRef::Literal(literal) => StorableValue {
            value: literal.value().to_owned(),
            datatype: Some(literal.datatype().as_str().to_owned()),
            language: literal.language().map(str::to_owned),
        },
    }
}

/// The inverse of [encode].
///
/// An empty language is treated like a missing one.
pub fn decode(
    value: &str,
    datatype: Option<&str>,
    language: Option<&str>,
) -> Result<Term, DecodeError> {
    let language = language.filter(|l| !l.is_empty());
    match (datatype, language) {
        (None, Some(language)) => Err(DecodeError::inconsistent(format!(
            "language tag {language:?} on non-literal {value:?}"
        ))),
        (None, None) => {
            if let Some(label) = value.strip_prefix(BLANK_NODE_PREFIX) {
                BlankNode::new(label)
                    .map(Term::from)
                    .map_err(|source| DecodeError::InvalidBlankNode {
                        value: value.to_owned(),
                        source,
                    })
            } else if value.is_empty() {
                Err(DecodeError::inconsistent("empty IRI"))
            } else {
                Ok(NamedNode::new_unchecked(value).into())
            }
        }
        (Some(datatype), Some(language)) => {
            if datatype != rdf::LANG_STRING.as_str() {
                return Err(DecodeError::inconsistent(format!(
                    "language tag {language:?} on a literal of type <{datatype}>"
                )));
            }
            Literal::new_language_tagged_literal(value, language)
                .map(Term::from)
                .map_err(|source| DecodeError::InvalidLanguageTag {
                    language: language.to_owned(),
                    source,
                })
        }
        (Some(datatype), None) => {
            if datatype == rdf::LANG_STRING.as_str() {
                Err(DecodeError::inconsistent(format!(
                    "rdf:langString literal {value:?} without a language tag"
                )))
            } else if datatype == xsd::STRING.as_str() {
                Ok(Literal::new_simple_literal(value).into())
            } else if datatype.is_empty() {
                Err(DecodeError::inconsistent("empty datatype IRI"))
            } else {
                Ok(Literal::new_typed_literal(value, NamedNode::new_unchecked(datatype)).into())
            }
        }
    }
}

/// Translates terms from and to their storable representation.
///
/// The SQL compiler encodes every bound term through a codec and the executor decodes every
/// result cell through one, so a caching implementation can sit on both hot paths.
pub trait TermCodec: Send + Sync {
    fn encode(&self, term: TermRef<'_>) -> StorableValue;

    fn decode(&self, value: &StorableValue) -> Result<Term, DecodeError>;
}

/// A [TermCodec] without any memoization.
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectCodec;

impl TermCodec for DirectCodec {
    fn encode(&self, term: TermRef<'_>) -> StorableValue {
        encode(term)
    }

    fn decode(&self, value: &StorableValue) -> Result<Term, DecodeError> {
        value.decode()
    }
}
