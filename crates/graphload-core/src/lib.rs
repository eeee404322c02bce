//! graphload-core: Shared data model for the graphload CSV-to-graph loader.
//!
//! This crate provides the foundational pieces used by the graph client and
//! the ingestion engine:
//! - Row, TypedValue and NodeId, the typed view of raw CSV cells
//! - NodeSpec / EdgeSpec, the translated form of one CSV row
//! - IndexSpec / ConstraintSpec, parsed schema descriptors
//! - GraphTarget / TenantContext, the explicit write destination
//! - Value typing and label/identifier normalization

pub mod error;
pub mod normalize;
pub mod types;
pub mod typing;

pub use error::CoreError;
pub use types::{
    ConstraintKind, ConstraintSpec, EdgeSpec, EntityType, GraphTarget, IndexSpec, NodeId,
    NodeSpec, Properties, Row, TenantContext, TypedValue,
};
