//! Arc adjacency dictionary: for every node, the arcs that start or end there.
//!
//! Nodes are identified by exact coordinate equality. No snapping tolerance
//! is applied, so endpoints that differ in the last bit are distinct nodes.
use std::collections::HashMap;

use geo::Coord;

use crate::arcs::ArcTable;

/// Hashable node identity derived from an endpoint coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeKey {
    x: u64,
    y: u64,
}

impl From<Coord<f64>> for NodeKey {
    fn from(c: Coord<f64>) -> Self {
        // Adding 0.0 folds -0.0 onto 0.0 so the key agrees with `==`.
        Self {
            x: (c.x + 0.0).to_bits(),
            y: (c.y + 0.0).to_bits(),
        }
    }
}

/// Node → arc positions, each bucket in arc enumeration order.
#[derive(Debug, Clone, Default)]
pub struct AdjacencyIndex {
    buckets: HashMap<NodeKey, Vec<usize>>,
}

impl AdjacencyIndex {
    /// Every arc is appended under its first and its last vertex. An arc whose
    /// endpoints coincide lands twice in the same bucket.
    pub fn build(table: &ArcTable) -> Self {
        let mut buckets: HashMap<NodeKey, Vec<usize>> = HashMap::new();
        for (pos, record) in table.iter().enumerate() {
            buckets.entry(record.from.into()).or_default().push(pos);
            buckets.entry(record.to.into()).or_default().push(pos);
        }
        tracing::debug!(nodes = buckets.len(), arcs = table.len(), "built arc adjacency index");
        Self { buckets }
    }

    pub fn arcs_at(&self, node: NodeKey) -> &[usize] {
        self.buckets.get(&node).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn node_count(&self) -> usize {
        self.buckets.len()
    }
}
