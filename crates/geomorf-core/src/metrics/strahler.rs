//! Strahler stream order.
//!
//! Sources are order 1. Where streams meet, the order rises by one only if
//! the two highest incoming orders are equal; otherwise the highest incoming
//! order passes through. Further, lower tributaries never change the result.
use crate::arcs::ArcTable;
use crate::error::{Error, Result};

const STAGE: &str = "Strahler ordering";

/// Order of an arc given the orders of the arcs flowing into it.
pub fn merge_orders(upstream: &[u32]) -> u32 {
    let mut orders = upstream.to_vec();
    orders.sort_unstable_by(|a, b| b.cmp(a));
    match orders.as_slice() {
        [] => 1,
        [only] => *only,
        [top, second, ..] if top == second => top + 1,
        [top, ..] => *top,
    }
}

/// Assign `strahler_order` to every linked arc and return the highest order.
/// Every indexed arc must carry its upstream links.
///
/// Arcs are reduced bottom-up, visiting upstream node ids in descending
/// order so every tributary is ordered before the arc it flows into.
pub fn assign_strahler_orders(table: &mut ArcTable) -> Result<u32> {
    let order = table.by_upstream_node();
    if order.is_empty() || order.iter().any(|&pos| table.record(pos).up_arc_ids.is_none()) {
        return Err(Error::MissingAttribute {
            stage: STAGE,
            field: "UpArcId",
        });
    }

    for record in table.records_mut() {
        record.strahler_order = None;
    }

    let mut max_order = 0;
    for &pos in order.iter().rev() {
        let up_ids = table.record(pos).up_arc_ids.as_deref().unwrap_or_default();
        let mut upstream = Vec::with_capacity(up_ids.len());
        for &up in up_ids {
            let tributary = table.get(up).ok_or(Error::UnknownArc(up))?;
            upstream.extend(tributary.strahler_order);
        }
        let strahler = merge_orders(&upstream);
        max_order = max_order.max(strahler);
        table.record_mut(pos).strahler_order = Some(strahler);
    }

    tracing::info!(max_order, "assigned Strahler orders");
    Ok(max_order)
}
