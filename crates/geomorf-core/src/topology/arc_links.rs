//! Upstream / downstream arc detection from indexed node ids.
//!
//! Arcs flowing into arc `a` are exactly the arcs whose downstream node id is
//! `a`'s upstream node id. They are collected through a node id → arcs
//! index in which every arc is listed under both of its node ids.
use std::collections::HashMap;

use crate::arcs::ArcTable;
use crate::error::{Error, Result};

const STAGE: &str = "arc linking";

/// Counts reported by [`link_arcs`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkSummary {
    pub linked: usize,
    pub headwaters: usize,
    pub confluences: usize,
}

/// Fill `down_arc_id`, `up_arc_ids` and `length` for every indexed arc.
/// Accumulated lengths and orders from an earlier run are cleared.
///
/// Arcs without node ids are skipped; if no arc carries node ids the node
/// indexing stage has not run and [`Error::MissingAttribute`] is returned.
pub fn link_arcs(table: &mut ArcTable) -> Result<LinkSummary> {
    let indexed: Vec<usize> = (0..table.len())
        .filter(|&pos| table.record(pos).is_indexed())
        .collect();
    if indexed.is_empty() {
        return Err(Error::MissingAttribute {
            stage: STAGE,
            field: "UpNodeId",
        });
    }

    let mut arcs_per_node: HashMap<i64, Vec<usize>> = HashMap::new();
    for &pos in &indexed {
        let record = table.record(pos);
        if let (Some(down), Some(up)) = (record.down_node_id, record.up_node_id) {
            arcs_per_node.entry(up).or_default().push(pos);
            arcs_per_node.entry(down).or_default().push(pos);
        }
    }

    for record in table.records_mut() {
        record.clear_links();
    }

    let mut summary = LinkSummary {
        linked: indexed.len(),
        headwaters: 0,
        confluences: 0,
    };

    for &pos in &indexed {
        let Some(up) = table.record(pos).up_node_id else {
            continue;
        };
        let upstream: Vec<usize> = arcs_per_node
            .get(&up)
            .map(|arcs| arcs.iter().copied().filter(|&b| b != pos).collect())
            .unwrap_or_default();

        let id = table.record(pos).id;
        let mut up_ids = Vec::with_capacity(upstream.len());
        for b in upstream {
            let neighbour = table.record_mut(b);
            neighbour.down_arc_id = Some(id);
            up_ids.push(neighbour.id);
        }

        match up_ids.len() {
            0 => summary.headwaters += 1,
            1 => {}
            _ => summary.confluences += 1,
        }

        let record = table.record_mut(pos);
        record.up_arc_ids = Some(up_ids);
        record.length = Some(record.geometry_length);
    }

    tracing::info!(
        linked = summary.linked,
        headwaters = summary.headwaters,
        confluences = summary.confluences,
        "linked upstream and downstream arcs"
    );
    Ok(summary)
}
