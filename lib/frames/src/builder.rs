use crate::criteria::{Comparator, EntityCriteria, FrameCriteria, SlotCriteria, SlotValue};
use itertools::Itertools;
use kgsql_model::vocab::{haley, vital};
use kgsql_model::{GraphScope, NamedNodeRef};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FrameQueryOptions {
    /// How deep frame criteria may be nested below the entity.
    pub max_depth: usize,
}

impl Default for FrameQueryOptions {
    fn default() -> Self {
        Self { max_depth: 8 }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FrameQueryError {
    #[error("slot criteria with comparator '{0}' need a value")]
    MissingValue(Comparator),
    #[error("comparator '{comparator}' cannot be applied to {kind} values")]
    InvalidComparator {
        comparator: Comparator,
        kind: &'static str,
    },
    #[error("frame criteria are nested deeper than {max_depth} levels")]
    DepthExceeded { max_depth: usize },
}

/// Builds a paged entity query with the default options.
pub fn build(
    criteria: &EntityCriteria,
    scope: &GraphScope,
    page_size: usize,
    offset: usize,
) -> Result<String, FrameQueryError> {
    FrameQueryBuilder::default().build(criteria, scope, page_size, offset)
}

/// Turns [EntityCriteria] into SPARQL that selects the matching `?entity` values.
#[derive(Debug, Clone, Default)]
pub struct FrameQueryBuilder {
    options: FrameQueryOptions,
}

impl FrameQueryBuilder {
    pub fn new(options: FrameQueryOptions) -> Self {
        Self { options }
    }

    /// Builds the query for one page of matching entities, ordered by entity IRI.
    pub fn build(
        &self,
        criteria: &EntityCriteria,
        scope: &GraphScope,
        page_size: usize,
        offset: usize,
    ) -> Result<String, FrameQueryError> {
        let body = self.where_clause(criteria, scope)?;
        let mut query = format!(
            "{PROLOGUE}SELECT DISTINCT ?entity WHERE {{\n{body}}}\nORDER BY ?entity\nLIMIT {page_size}"
        );
        if offset > 0 {
            query += &format!(" OFFSET {offset}");
        }
        query.push('\n');
        tracing::debug!(scope = %scope, %query, "Built frame query");
        Ok(query)
    }

    /// Builds a query that binds `?count` to the number of matching entities.
    pub fn build_count(
        &self,
        criteria: &EntityCriteria,
        scope: &GraphScope,
    ) -> Result<String, FrameQueryError> {
        let body = self.where_clause(criteria, scope)?;
        Ok(format!(
            "{PROLOGUE}SELECT (COUNT(DISTINCT ?entity) AS ?count) WHERE {{\n{body}}}\n"
        ))
    }

    fn where_clause(
        &self,
        criteria: &EntityCriteria,
        scope: &GraphScope,
    ) -> Result<String, FrameQueryError> {
        let lines = self.patterns(criteria)?;
        let body = match scope {
            GraphScope::Default => lines.iter().map(|line| format!("  {line}\n")).join(""),
            GraphScope::Named(name) => {
                let inner = lines.iter().map(|line| format!("    {line}\n")).join("");
                format!("  GRAPH {name} {{\n{inner}  }}\n")
            }
        };
        Ok(body)
    }

    /// The pattern lines, entity first and then every frame in depth-first order.
    fn patterns(&self, criteria: &EntityCriteria) -> Result<Vec<String>, FrameQueryError> {
        let mut lines = vec![format!("?entity a {} .", short(haley::KG_ENTITY))];
        if let Some(entity_type) = &criteria.entity_type {
            lines.push(format!(
                "?entity {} {entity_type} .",
                short(haley::HAS_KG_ENTITY_TYPE)
            ));
        }
        if let Some(search) = &criteria.search_string {
            lines.push(format!("?entity {} ?entity_name .", short(vital::HAS_NAME)));
            lines.push(format!(
                "FILTER(CONTAINS(LCASE(?entity_name), {}))",
                SlotValue::Text(search.to_lowercase()).to_sparql()
            ));
        }

        let mut stack = criteria
            .frames
            .iter()
            .enumerate()
            .rev()
            .map(|(i, frame)| PendingFrame {
                frame,
                parent: "entity".to_owned(),
                variable: format!("frame_{}", i + 1),
                edge_type: haley::EDGE_HAS_ENTITY_KG_FRAME,
                depth: 1,
            })
            .collect::<Vec<_>>();

        while let Some(pending) = stack.pop() {
            if pending.depth > self.options.max_depth {
                return Err(FrameQueryError::DepthExceeded {
                    max_depth: self.options.max_depth,
                });
            }
            pending.write_hop(&mut lines);
            for (i, slot) in pending.frame.slots.iter().enumerate() {
                let variable = format!("{}_slot_{}", pending.variable, i + 1);
                write_slot(&mut lines, &variable, &pending.variable, slot)?;
            }
            stack.extend(
                pending
                    .frame
                    .frames
                    .iter()
                    .enumerate()
                    .rev()
                    .map(|(i, frame)| PendingFrame {
                        frame,
                        parent: pending.variable.clone(),
                        variable: format!("{}_{}", pending.variable, i + 1),
                        edge_type: haley::EDGE_HAS_KG_FRAME,
                        depth: pending.depth + 1,
                    }),
            );
        }
        Ok(lines)
    }
}

const PROLOGUE: &str = "PREFIX vital: <http://vital.ai/ontology/vital-core#>\nPREFIX haley: <http://vital.ai/ontology/haley-ai-kg#>\n";

struct PendingFrame<'a> {
    frame: &'a FrameCriteria,
    parent: String,
    variable: String,
    edge_type: NamedNodeRef<'static>,
    depth: usize,
}

impl PendingFrame<'_> {
    fn write_hop(&self, lines: &mut Vec<String>) {
        let PendingFrame {
            parent, variable, ..
        } = self;
        lines.push(format!("?{variable}_edge a {} .", short(self.edge_type)));
        lines.push(format!("?{variable}_edge {} ?{parent} .", short(vital::HAS_EDGE_SOURCE)));
        lines.push(format!(
            "?{variable}_edge {} ?{variable} .",
            short(vital::HAS_EDGE_DESTINATION)
        ));
        if let Some(frame_type) = &self.frame.frame_type {
            lines.push(format!(
                "?{variable} {} {frame_type} .",
                short(haley::HAS_KG_FRAME_TYPE)
            ));
        }
    }
}

fn write_slot(
    lines: &mut Vec<String>,
    variable: &str,
    frame: &str,
    slot: &SlotCriteria,
) -> Result<(), FrameQueryError> {
    lines.push(format!("?{variable}_edge a {} .", short(haley::EDGE_HAS_KG_SLOT)));
    lines.push(format!("?{variable}_edge {} ?{frame} .", short(vital::HAS_EDGE_SOURCE)));
    lines.push(format!(
        "?{variable}_edge {} ?{variable} .",
        short(vital::HAS_EDGE_DESTINATION)
    ));
    if let Some(slot_type) = &slot.slot_type {
        lines.push(format!("?{variable} {} {slot_type} .", short(haley::HAS_KG_SLOT_TYPE)));
    }

    if slot.comparator == Comparator::Exists {
        return Ok(());
    }
    let value = slot
        .value
        .as_ref()
        .ok_or(FrameQueryError::MissingValue(slot.comparator))?;
    check_comparator(slot.comparator, value)?;

    lines.push(format!("?{variable} {} ?{variable}_value .", short(value.property())));
    let filter = match slot.comparator.operator() {
        Some(operator) => format!("FILTER(?{variable}_value {operator} {})", value.to_sparql()),
        None => format!("FILTER(CONTAINS(?{variable}_value, {}))", value.to_sparql()),
    };
    lines.push(filter);
    Ok(())
}

fn check_comparator(comparator: Comparator, value: &SlotValue) -> Result<(), FrameQueryError> {
    let equality = matches!(comparator, Comparator::Eq | Comparator::Ne);
    let (kind, allowed) = match value {
        SlotValue::Text(_) => return Ok(()),
        SlotValue::Integer(_) | SlotValue::Double(_) => ("numeric", comparator != Comparator::Contains),
        SlotValue::DateTime(_) => ("dateTime", comparator != Comparator::Contains),
        SlotValue::Boolean(_) => ("boolean", equality),
        SlotValue::Entity(_) | SlotValue::Uri(_) => ("IRI", equality),
    };
    if allowed {
        Ok(())
    } else {
        Err(FrameQueryError::InvalidComparator { comparator, kind })
    }
}

/// The prefixed name of a vocabulary term.
fn short(term: NamedNodeRef<'_>) -> String {
    let iri = term.as_str();
    if let Some(local) = iri.strip_prefix(vital::NAMESPACE) {
        format!("vital:{local}")
    } else if let Some(local) = iri.strip_prefix(haley::NAMESPACE) {
        format!("haley:{local}")
    } else {
        term.to_string()
    }
}
