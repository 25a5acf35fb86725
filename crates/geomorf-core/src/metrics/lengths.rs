//! Cumulative upstream and downstream path lengths.
//!
//! Upstream length is the longest flow path from the arc's top back to a
//! source, including the arc itself. Downstream length is the additive path
//! from the arc's bottom to the network exit: the downstream neighbour's own
//! length plus that neighbour's downstream length.
use crate::arcs::ArcTable;
use crate::error::{Error, Result};

const STAGE: &str = "length propagation";

/// Fill `length_up` and `length_down` for every linked arc.
///
/// Arcs are visited by upstream node id, sources first for the upstream pass
/// and outlet first for the downstream pass, so each value only depends on
/// values already computed. Missing lengths count as `0.0`.
pub fn propagate_lengths(table: &mut ArcTable) -> Result<()> {
    let order = table.by_upstream_node();
    if order.is_empty() {
        return Err(Error::MissingAttribute {
            stage: STAGE,
            field: "UpNodeId",
        });
    }
    if order.iter().any(|&pos| table.record(pos).up_arc_ids.is_none()) {
        return Err(Error::MissingAttribute {
            stage: STAGE,
            field: "UpArcId",
        });
    }

    for record in table.records_mut() {
        record.length_up = None;
        record.length_down = None;
    }

    for &pos in order.iter().rev() {
        let record = table.record(pos);
        let own = record.length.unwrap_or(0.0);
        let mut longest = 0.0f64;
        for &up in record.up_arc_ids.as_deref().unwrap_or_default() {
            let upstream = table.get(up).ok_or(Error::UnknownArc(up))?;
            longest = longest.max(upstream.length_up.unwrap_or(0.0));
        }
        table.record_mut(pos).length_up = Some(own + longest);
    }

    for &pos in &order {
        let length_down = match table.record(pos).down_arc_id {
            Some(down) => {
                let downstream = table.get(down).ok_or(Error::UnknownArc(down))?;
                downstream.length.unwrap_or(0.0) + downstream.length_down.unwrap_or(0.0)
            }
            None => 0.0,
        };
        table.record_mut(pos).length_down = Some(length_down);
    }

    tracing::info!(arcs = order.len(), "propagated upstream and downstream lengths");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{ArcFeature, Network};
    use crate::topology::{index_nodes, link_arcs, AdjacencyIndex};
    use approx::assert_relative_eq;

    fn measured(arcs: Vec<ArcFeature>) -> ArcTable {
        let mut table = ArcTable::from_network(&Network::new(arcs)).unwrap();
        let adj = AdjacencyIndex::build(&table);
        index_nodes(&mut table, &adj, 0, false).unwrap();
        link_arcs(&mut table).unwrap();
        propagate_lengths(&mut table).unwrap();
        table
    }

    /// Outlet O(0) ← confluence arc C(1) ← sources S1(2), S2(3); all 100 long.
    fn y_network() -> Vec<ArcFeature> {
        vec![
            ArcFeature::new(0, vec![[0.0, 0.0], [0.0, 100.0]]),
            ArcFeature::new(1, vec![[0.0, 100.0], [0.0, 200.0]]),
            ArcFeature::new(2, vec![[-60.0, 280.0], [0.0, 200.0]]),
            ArcFeature::new(3, vec![[0.0, 200.0], [60.0, 280.0]]),
        ]
    }

    fn up(table: &ArcTable, id: i64) -> f64 {
        table.get(id).unwrap().length_up.unwrap()
    }

    fn down(table: &ArcTable, id: i64) -> f64 {
        table.get(id).unwrap().length_down.unwrap()
    }

    #[test]
    fn upstream_length_takes_longest_branch() {
        let table = measured(y_network());
        assert_relative_eq!(up(&table, 2), 100.0);
        assert_relative_eq!(up(&table, 3), 100.0);
        assert_relative_eq!(up(&table, 1), 200.0);
        assert_relative_eq!(up(&table, 0), 300.0);
    }

    #[test]
    fn downstream_length_adds_downstream_neighbours() {
        let table = measured(y_network());
        assert_relative_eq!(down(&table, 0), 0.0);
        assert_relative_eq!(down(&table, 1), 100.0);
        assert_relative_eq!(down(&table, 2), 200.0);
        assert_relative_eq!(down(&table, 3), 200.0);
    }

    #[test]
    fn unequal_branches_keep_the_maximum() {
        let mut arcs = y_network();
        // Lengthen S2 to 250 with an extra vertex.
        arcs[3] = ArcFeature::new(3, vec![[0.0, 200.0], [0.0, 350.0], [0.0, 450.0]]);
        let table = measured(arcs);
        assert_relative_eq!(up(&table, 1), 350.0);
        assert_relative_eq!(up(&table, 0), 450.0);
    }

    #[test]
    fn upstream_length_never_below_own_length() {
        let table = measured(y_network());
        for record in table.iter() {
            assert!(record.length_up.unwrap() >= record.length.unwrap());
            if record.is_headwater() {
                assert_relative_eq!(record.length_up.unwrap(), record.length.unwrap());
            }
        }
    }

    #[test]
    fn running_before_linking_is_a_precondition_error() {
        let mut table = ArcTable::from_network(&Network::new(y_network())).unwrap();
        let adj = AdjacencyIndex::build(&table);
        index_nodes(&mut table, &adj, 0, false).unwrap();
        let err = propagate_lengths(&mut table).unwrap_err();
        assert!(matches!(err, Error::MissingAttribute { field: "UpArcId", .. }));
    }

    #[test]
    fn missing_length_counts_as_zero() {
        let mut table = ArcTable::from_network(&Network::new(y_network())).unwrap();
        let adj = AdjacencyIndex::build(&table);
        index_nodes(&mut table, &adj, 0, false).unwrap();
        link_arcs(&mut table).unwrap();
        let pos = table.position(1).unwrap();
        table.record_mut(pos).length = None;
        propagate_lengths(&mut table).unwrap();

        assert_relative_eq!(up(&table, 1), 100.0);
        assert_relative_eq!(down(&table, 2), 100.0);
    }
}
