//! Pipeline orchestrator: runs the stages in order on one network.
//!
//! Every stage works on an in-memory [`ArcTable`]; the network itself is only
//! touched by [`GeomorfResult::commit`] / [`run_stage`] after all stages
//! succeeded, so a failing run never leaves partial attributes behind.
use serde::{Deserialize, Serialize};

use crate::arcs::ArcTable;
use crate::error::{Error, Result};
use crate::metrics::{
    assign_strahler_orders, order_statistics, propagate_lengths, OrderStatistics,
    STRAHLER_ORDER_FIELD,
};
use crate::network::{ArcId, Network};
use crate::topology::{index_nodes, link_arcs, AdjacencyIndex, NodeIndexing};

// ── Parameters ────────────────────────────────────────────────────────────────

/// Run parameters. Defaults take the outlet from the network selection,
/// reject arcs that cannot be reached from it and compute the statistics
/// from the Strahler orders assigned by the run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeomorfParams {
    /// Outlet arc id; overrides the network's selection when set.
    pub outlet: Option<ArcId>,
    /// Leave arcs not connected to the outlet unindexed instead of failing.
    pub allow_unreachable: bool,
    /// Integer attribute the order statistics read; `StrahOrder` when unset.
    pub order_field: Option<String>,
}

impl GeomorfParams {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn order_field(&self) -> &str {
        self.order_field.as_deref().unwrap_or(STRAHLER_ORDER_FIELD)
    }

    /// The outlet to start from: the explicit id, else the single selection.
    pub fn resolve_outlet(&self, network: &Network) -> Result<ArcId> {
        match self.outlet {
            Some(id) => {
                network.arc(id).ok_or(Error::UnknownArc(id))?;
                Ok(id)
            }
            None => network.selected_outlet(),
        }
    }
}

// ── Results ───────────────────────────────────────────────────────────────────

/// Output of a full pipeline run.
#[derive(Debug, Clone)]
pub struct GeomorfResult {
    pub outlet: ArcId,
    /// Arc records with every attribute filled in.
    pub arcs: ArcTable,
    pub node_count: usize,
    /// Arcs left unindexed (only with `allow_unreachable`).
    pub unreachable: Vec<ArcId>,
    pub statistics: OrderStatistics,
}

impl GeomorfResult {
    /// Write the per-arc attributes back onto the network.
    pub fn commit(&self, network: &mut Network) {
        self.arcs.commit(network);
    }
}

/// Run all stages on `network`:
///   1. Arc adjacency index
///   2. Node indexing from the outlet
///   3. Upstream / downstream arc linking
///   4. Upstream and downstream lengths
///   5. Strahler orders
///   6. Order frequency and bifurcation ratios
pub fn run_geomorf(network: &Network, params: &GeomorfParams) -> Result<GeomorfResult> {
    let outlet = params.resolve_outlet(network)?;
    let mut arcs = ArcTable::from_network(network)?;

    // ── 1–2. Topology ───────────────────────────────────────────────────────
    let NodeIndexing {
        node_count,
        unreachable,
    } = index_table(&mut arcs, outlet, params.allow_unreachable)?;

    // ── 3–4. Links and lengths ──────────────────────────────────────────────
    link_arcs(&mut arcs)?;
    propagate_lengths(&mut arcs)?;

    // ── 5–6. Orders and statistics ──────────────────────────────────────────
    assign_strahler_orders(&mut arcs)?;
    let statistics = order_statistics(&arcs, params.order_field())?;

    Ok(GeomorfResult {
        outlet,
        arcs,
        node_count,
        unreachable,
        statistics,
    })
}

fn index_table(table: &mut ArcTable, outlet: ArcId, allow_unreachable: bool) -> Result<NodeIndexing> {
    let adjacency = AdjacencyIndex::build(table);
    index_nodes(table, &adjacency, outlet, allow_unreachable)
}

// ── Single stages ─────────────────────────────────────────────────────────────

/// A pipeline stage that can be run on its own against a network that
/// carries the attributes of the preceding stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Writes `DownNodeId`, `UpNodeId`; clears everything later stages wrote.
    IndexNodes,
    /// Needs node ids; writes `DownArcId`, `UpArcId`, `Length`,
    /// `LengthDown`, `LengthUp`; clears `StrahOrder`.
    LinkArcs,
    /// Needs node ids and `UpArcId`; writes `StrahOrder`.
    StrahlerOrder,
    /// Needs `DownArcId` and the order attribute; writes nothing per arc.
    OrderStatistics,
}

/// Run one stage and commit its attributes to `network`.
///
/// Returns the aggregate tables for [`Stage::OrderStatistics`].
pub fn run_stage(
    network: &mut Network,
    stage: Stage,
    params: &GeomorfParams,
) -> Result<Option<OrderStatistics>> {
    let mut arcs = ArcTable::from_network(network)?;
    tracing::debug!(?stage, arcs = arcs.len(), "running single stage");

    let statistics = match stage {
        Stage::IndexNodes => {
            let outlet = params.resolve_outlet(network)?;
            index_table(&mut arcs, outlet, params.allow_unreachable)?;
            None
        }
        Stage::LinkArcs => {
            link_arcs(&mut arcs)?;
            propagate_lengths(&mut arcs)?;
            None
        }
        Stage::StrahlerOrder => {
            assign_strahler_orders(&mut arcs)?;
            None
        }
        Stage::OrderStatistics => Some(order_statistics(&arcs, params.order_field())?),
    };

    arcs.commit(network);
    Ok(statistics)
}
