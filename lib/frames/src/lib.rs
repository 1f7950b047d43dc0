//! Query construction for the entity/frame/slot knowledge-graph model.
//!
//! An entity owns frames through `Edge_hasEntityKGFrame` edges, a frame owns child frames
//! through `Edge_hasKGFrame` edges and slots through `Edge_hasKGSlot` edges. [FrameQueryBuilder]
//! turns nested criteria over this structure into SPARQL text. The text is evaluated like any
//! other query, so it goes through the same lowering and SQL compilation.

mod builder;
mod criteria;

pub use builder::{build, FrameQueryBuilder, FrameQueryError, FrameQueryOptions};
pub use criteria::{
    Comparator, EntityCriteria, FrameCriteria, SlotCriteria, SlotValue, UnknownComparator,
};
