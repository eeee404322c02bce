//! graphload-graph: the graph store collaborator.
//!
//! Everything the loader writes goes through the [`GraphStore`] trait as a
//! parameterized [`Statement`] issued against an explicit
//! [`GraphTarget`](graphload_core::GraphTarget). [`GraphClient`] is the Neo4j
//! (Bolt) implementation; tests substitute their own store.

pub mod client;
pub mod queries;
pub mod statement;
pub mod store;

pub use client::{GraphClient, GraphConfig, GraphError};
pub use statement::{ParamValue, Params, ResultSet, Statement};
pub use store::GraphStore;
