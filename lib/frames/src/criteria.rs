use kgsql_model::vocab::{haley, xsd};
use kgsql_model::{Literal, NamedNode, NamedNodeRef};
use serde::Deserialize;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Selects entities by their type, name and frames.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityCriteria {
    pub entity_type: Option<NamedNode>,
    /// Case-insensitive substring of the entity name.
    pub search_string: Option<String>,
    pub frames: Vec<FrameCriteria>,
}

impl EntityCriteria {
    #[must_use]
    pub fn with_entity_type(mut self, entity_type: NamedNode) -> Self {
        self.entity_type = Some(entity_type);
        self
    }

    #[must_use]
    pub fn with_search_string(mut self, search_string: impl Into<String>) -> Self {
        self.search_string = Some(search_string.into());
        self
    }

    #[must_use]
    pub fn with_frame(mut self, frame: FrameCriteria) -> Self {
        self.frames.push(frame);
        self
    }
}

/// A frame that must be attached to the entity or to the parent frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameCriteria {
    pub frame_type: Option<NamedNode>,
    pub frames: Vec<FrameCriteria>,
    pub slots: Vec<SlotCriteria>,
}

impl FrameCriteria {
    pub fn of_type(frame_type: NamedNode) -> Self {
        Self {
            frame_type: Some(frame_type),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_frame(mut self, frame: FrameCriteria) -> Self {
        self.frames.push(frame);
        self
    }

    #[must_use]
    pub fn with_slot(mut self, slot: SlotCriteria) -> Self {
        self.slots.push(slot);
        self
    }
}

/// A slot of a frame and a condition on its value.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotCriteria {
    pub slot_type: Option<NamedNode>,
    pub comparator: Comparator,
    pub value: Option<SlotValue>,
}

impl SlotCriteria {
    pub fn new(slot_type: Option<NamedNode>, comparator: Comparator, value: SlotValue) -> Self {
        Self {
            slot_type,
            comparator,
            value: Some(value),
        }
    }

    /// Only requires the slot to be present.
    pub fn exists(slot_type: NamedNode) -> Self {
        Self {
            slot_type: Some(slot_type),
            comparator: Comparator::Exists,
            value: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Comparator {
    Eq,
    Ne,
    Gt,
    Lt,
    Gte,
    Lte,
    Contains,
    Exists,
}

impl Comparator {
    /// The SPARQL operator of the relational comparators.
    pub(crate) fn operator(self) -> Option<&'static str> {
        match self {
            Self::Eq => Some("="),
            Self::Ne => Some("!="),
            Self::Gt => Some(">"),
            Self::Lt => Some("<"),
            Self::Gte => Some(">="),
            Self::Lte => Some("<="),
            Self::Contains | Self::Exists => None,
        }
    }
}

impl Display for Comparator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Gt => "gt",
            Self::Lt => "lt",
            Self::Gte => "gte",
            Self::Lte => "lte",
            Self::Contains => "contains",
            Self::Exists => "exists",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown comparator {0:?}")]
pub struct UnknownComparator(String);

impl FromStr for Comparator {
    type Err = UnknownComparator;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "eq" => Self::Eq,
            "ne" => Self::Ne,
            "gt" => Self::Gt,
            "lt" => Self::Lt,
            "gte" => Self::Gte,
            "lte" => Self::Lte,
            "contains" => Self::Contains,
            "exists" => Self::Exists,
            _ => return Err(UnknownComparator(s.to_owned())),
        })
    }
}

/// A slot value. The variant decides which value property of the slot is compared.
#[derive(Debug, Clone, PartialEq)]
pub enum SlotValue {
    Text(String),
    Integer(i64),
    Double(f64),
    Boolean(bool),
    /// An `xsd:dateTime` lexical form.
    DateTime(String),
    Entity(NamedNode),
    Uri(NamedNode),
}

impl SlotValue {
    pub(crate) fn property(&self) -> NamedNodeRef<'static> {
        match self {
            Self::Text(_) => haley::HAS_TEXT_SLOT_VALUE,
            Self::Integer(_) => haley::HAS_INTEGER_SLOT_VALUE,
            Self::Double(_) => haley::HAS_DOUBLE_SLOT_VALUE,
            Self::Boolean(_) => haley::HAS_BOOLEAN_SLOT_VALUE,
            Self::DateTime(_) => haley::HAS_DATE_TIME_SLOT_VALUE,
            Self::Entity(_) => haley::HAS_ENTITY_SLOT_VALUE,
            Self::Uri(_) => haley::HAS_URI_SLOT_VALUE,
        }
    }

    /// The value as a SPARQL term. Strings are escaped by the literal serialization.
    pub(crate) fn to_sparql(&self) -> String {
        match self {
            Self::Text(text) => Literal::new_simple_literal(text).to_string(),
            Self::Integer(value) => Literal::from(*value).to_string(),
            Self::Double(value) => Literal::from(*value).to_string(),
            Self::Boolean(value) => Literal::from(*value).to_string(),
            Self::DateTime(value) => Literal::new_typed_literal(value, xsd::DATE_TIME).to_string(),
            Self::Entity(iri) | Self::Uri(iri) => iri.to_string(),
        }
    }
}
