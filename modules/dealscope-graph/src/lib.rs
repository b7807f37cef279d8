pub mod backend;
pub mod builder;
pub mod client;
pub mod error;
pub mod memory;
pub mod migrate;
pub mod model;
pub mod neo4j;
pub mod store;

#[cfg(feature = "test-utils")]
pub mod testutil;

pub use backend::GraphBackend;
pub use builder::{build_graph, plan_writes, BuildStats};
pub use client::GraphClient;
pub use error::GraphError;
pub use memory::MemoryGraph;
pub use model::{EdgeKind, EdgeSpec, GraphWrite, NodeKey, NodeLabel, NodeSpec, PropValue, Props};
pub use neo4j::Neo4jGraph;
pub use store::{RelationshipGraph, TOP_ACQUIRER_LIMIT};
