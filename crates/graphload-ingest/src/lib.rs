//! graphload-ingest: bulk loader from exported CSV files into Neo4j.
//!
//! Reads `nodes_*.csv` / `edges_*.csv` plus optional index and constraint
//! descriptors, provisions the schema, then writes nodes and edges in
//! parameterized batches, per graph or per tenant graph.

pub mod config;
pub mod error;
pub mod execute;
pub mod orchestrator;
pub mod pipeline;
pub mod schema;
pub mod source;
pub mod translate;

pub use error::{IngestError, Result};
pub use orchestrator::{run, RunOptions, RunSummary};
pub use pipeline::{load_graph, LoadOptions, LoadReport};
