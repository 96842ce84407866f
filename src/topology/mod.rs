//! Switch topology model and its JSON projection.
//!
//! # Main Components
//!
//! - [`Switch`] - A switch identified by its management address
//! - [`TopologyGraph`] - Undirected adjacency of discovered switches
//! - [`NetworkDocument`] - Serializable form of the graph

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub use graph::TopologyGraph;
pub use switch::Switch;

/// Top-level output document: `{"network": [...]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct NetworkDocument {
    pub network: Vec<SwitchEntry>,
}

/// A graph node together with its direct neighbors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SwitchEntry {
    pub name: String,
    pub address: String,

    /// Omitted from the document when the node has no links.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub neighbors: Vec<NeighborEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct NeighborEntry {
    pub name: String,
    pub address: String,
}

mod graph;
mod switch;
