//! Vocabularies used by the storage layout and the structured-query builder.

pub use oxrdf::vocab::{rdf, xsd};

/// The `vital-core` ontology that defines edges and names.
pub mod vital {
    use oxrdf::NamedNodeRef;

    pub const NAMESPACE: &str = "http://vital.ai/ontology/vital-core#";

    pub const HAS_NAME: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://vital.ai/ontology/vital-core#hasName");
    pub const HAS_EDGE_SOURCE: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://vital.ai/ontology/vital-core#hasEdgeSource");
    pub const HAS_EDGE_DESTINATION: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://vital.ai/ontology/vital-core#hasEdgeDestination");
}

/// The `haley-ai-kg` ontology of entities, frames and slots.
pub mod haley {
    use oxrdf::NamedNodeRef;

    pub const NAMESPACE: &str = "http://vital.ai/ontology/haley-ai-kg#";

    pub const KG_ENTITY: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://vital.ai/ontology/haley-ai-kg#KGEntity");
    pub const KG_FRAME: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://vital.ai/ontology/haley-ai-kg#KGFrame");
    pub const HAS_KG_ENTITY_TYPE: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://vital.ai/ontology/haley-ai-kg#hasKGEntityType");
    pub const HAS_KG_FRAME_TYPE: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://vital.ai/ontology/haley-ai-kg#hasKGFrameType");
    pub const HAS_KG_SLOT_TYPE: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://vital.ai/ontology/haley-ai-kg#hasKGSlotType");

    pub const EDGE_HAS_ENTITY_KG_FRAME: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://vital.ai/ontology/haley-ai-kg#Edge_hasEntityKGFrame");
    pub const EDGE_HAS_KG_FRAME: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://vital.ai/ontology/haley-ai-kg#Edge_hasKGFrame");
    pub const EDGE_HAS_KG_SLOT: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://vital.ai/ontology/haley-ai-kg#Edge_hasKGSlot");

    pub const HAS_TEXT_SLOT_VALUE: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://vital.ai/ontology/haley-ai-kg#hasTextSlotValue");
    pub const HAS_INTEGER_SLOT_VALUE: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://vital.ai/ontology/haley-ai-kg#hasIntegerSlotValue");
    pub const HAS_DOUBLE_SLOT_VALUE: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://vital.ai/ontology/haley-ai-kg#hasDoubleSlotValue");
    pub const HAS_BOOLEAN_SLOT_VALUE: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://vital.ai/ontology/haley-ai-kg#hasBooleanSlotValue");
    pub const HAS_DATE_TIME_SLOT_VALUE: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://vital.ai/ontology/haley-ai-kg#hasDateTimeSlotValue");
    pub const HAS_ENTITY_SLOT_VALUE: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://vital.ai/ontology/haley-ai-kg#hasEntitySlotValue");
    pub const HAS_URI_SLOT_VALUE: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://vital.ai/ontology/haley-ai-kg#hasUriSlotValue");
}
