//! Node indexing: a depth-first walk upstream from the outlet arc.
//!
//! The outlet gets `(-1, 0)` as its (downstream, upstream) node ids. Every
//! other arc met at a node inherits the parent's upstream id as its
//! downstream id and takes the next counter value as its upstream id. Children
//! are visited in adjacency-bucket order and each subtree is numbered before
//! the next sibling, so ids come out in pre-order.
use crate::arcs::ArcTable;
use crate::error::{Error, Result};
use crate::network::ArcId;

use super::adjacency::{AdjacencyIndex, NodeKey};

/// Downstream node id of the outlet arc: nothing lies below the network exit.
pub const OUTLET_DOWN_NODE_ID: i64 = -1;

/// Summary of one indexing walk.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeIndexing {
    /// Number of upstream node ids handed out (`0..node_count`).
    pub node_count: usize,
    /// Arcs the walk never reached, in enumeration order.
    pub unreachable: Vec<ArcId>,
}

/// Pending walk state: the arc we arrived by, the node being expanded and
/// the next bucket slot to look at.
struct Frame {
    arc: usize,
    node: NodeKey,
    cursor: usize,
}

/// Assign `down_node_id` / `up_node_id` to every arc reachable from `outlet`.
/// Links, lengths and orders computed from earlier node ids are cleared.
///
/// Fails with [`Error::Cycle`] when an arc is reached twice and with
/// [`Error::Unreachable`] when arcs remain unvisited, unless
/// `allow_unreachable` is set, in which case they are left unindexed.
pub fn index_nodes(
    table: &mut ArcTable,
    adjacency: &AdjacencyIndex,
    outlet: ArcId,
    allow_unreachable: bool,
) -> Result<NodeIndexing> {
    let outlet_pos = table.position(outlet)?;

    for record in table.records_mut() {
        record.down_node_id = None;
        record.up_node_id = None;
        record.clear_links();
    }

    let mut visited = vec![false; table.len()];
    let mut next_node_id: i64 = 0;

    let root = table.record_mut(outlet_pos);
    root.down_node_id = Some(OUTLET_DOWN_NODE_ID);
    root.up_node_id = Some(next_node_id);
    let root_node = NodeKey::from(root.to);
    visited[outlet_pos] = true;

    let mut stack = vec![Frame {
        arc: outlet_pos,
        node: root_node,
        cursor: 0,
    }];

    while let Some(&Frame { arc, node, cursor }) = stack.last() {
        // A source node only lists the arc we came in by.
        let bucket = adjacency.arcs_at(node);
        let next = bucket
            .iter()
            .enumerate()
            .skip(cursor)
            .find(|&(_, &b)| b != arc)
            .map(|(slot, &b)| (slot, b));

        let Some((slot, child)) = next else {
            stack.pop();
            continue;
        };
        if let Some(top) = stack.last_mut() {
            top.cursor = slot + 1;
        }

        if visited[child] {
            return Err(Error::Cycle {
                arc: table.record(child).id,
            });
        }
        visited[child] = true;

        next_node_id += 1;
        let parent_up = table.record(arc).up_node_id;
        let record = table.record_mut(child);
        record.down_node_id = parent_up;
        record.up_node_id = Some(next_node_id);

        let far = if NodeKey::from(record.from) != node {
            record.from
        } else {
            record.to
        };
        stack.push(Frame {
            arc: child,
            node: far.into(),
            cursor: 0,
        });
    }

    let unreachable: Vec<ArcId> = visited
        .iter()
        .zip(table.iter())
        .filter(|(seen, _)| !**seen)
        .map(|(_, r)| r.id)
        .collect();

    if let Some(&first) = unreachable.first() {
        if !allow_unreachable {
            return Err(Error::Unreachable {
                count: unreachable.len(),
                first,
            });
        }
        tracing::warn!(
            count = unreachable.len(),
            first,
            "arcs not connected to the outlet were left unindexed"
        );
    }

    let node_count = (next_node_id + 1) as usize;
    tracing::info!(outlet, node_count, "indexed nodes");
    Ok(NodeIndexing {
        node_count,
        unreachable,
    })
}
