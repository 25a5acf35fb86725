//! Network topology: adjacency → node indexing → arc linking.
pub mod adjacency;
pub mod arc_links;
pub mod node_indexing;

pub use adjacency::{AdjacencyIndex, NodeKey};
pub use arc_links::{link_arcs, LinkSummary};
pub use node_indexing::{index_nodes, NodeIndexing, OUTLET_DOWN_NODE_ID};
