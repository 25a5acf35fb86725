//! Strongly typed arc records shared by the pipeline stages.
//!
//! An [`ArcTable`] is built once from a [`Network`], filled in place by the
//! stages (each stage owns a fixed set of fields) and written back with
//! [`ArcTable::commit`] once everything succeeded.
use std::collections::{BTreeMap, HashMap};

use geo::Coord;

use crate::error::{Error, Result};
use crate::network::{ArcAttributes, ArcId, Network};

/// One arc with its endpoints and every computed attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct ArcRecord {
    pub id: ArcId,
    /// First vertex of the polyline.
    pub from: Coord<f64>,
    /// Last vertex of the polyline.
    pub to: Coord<f64>,
    /// Polyline length as reported by the geometry.
    pub geometry_length: f64,

    // ── node indexing ──
    pub down_node_id: Option<i64>,
    pub up_node_id: Option<i64>,

    // ── arc linking ──
    pub down_arc_id: Option<ArcId>,
    pub up_arc_ids: Option<Vec<ArcId>>,
    pub length: Option<f64>,

    // ── length propagation ──
    pub length_down: Option<f64>,
    pub length_up: Option<f64>,

    // ── Strahler ordering ──
    pub strahler_order: Option<u32>,

    /// Attributes no stage owns, carried through to the commit untouched.
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl ArcRecord {
    /// Both node ids are assigned.
    pub fn is_indexed(&self) -> bool {
        self.down_node_id.is_some() && self.up_node_id.is_some()
    }

    /// Drop everything derived from the node ids: links, lengths and order.
    pub(crate) fn clear_links(&mut self) {
        self.down_arc_id = None;
        self.up_arc_ids = None;
        self.length = None;
        self.length_down = None;
        self.length_up = None;
        self.strahler_order = None;
    }

    /// True when linked and no arc flows into this one.
    pub fn is_headwater(&self) -> bool {
        self.up_arc_ids.as_ref().is_some_and(|ids| ids.is_empty())
    }

    pub fn to_attributes(&self) -> ArcAttributes {
        ArcAttributes {
            down_node_id: self.down_node_id,
            up_node_id: self.up_node_id,
            down_arc_id: self.down_arc_id,
            up_arc_id: self.up_arc_ids.as_ref().map(|ids| join_ids(ids)),
            length: self.length,
            length_down: self.length_down,
            length_up: self.length_up,
            strahler_order: self.strahler_order,
            extra: self.extra.clone(),
        }
    }
}

/// Comma-join arc ids the way the `UpArcId` attribute stores them.
pub fn join_ids(ids: &[ArcId]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

fn parse_ids(arc: ArcId, text: &str) -> Result<Vec<ArcId>> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    text.split(',')
        .map(|part| {
            part.trim().parse::<ArcId>().map_err(|_| Error::InvalidAttribute {
                arc,
                field: "UpArcId",
                value: text.to_string(),
            })
        })
        .collect()
}

/// Arc records in network enumeration order, addressable by position or id.
#[derive(Debug, Clone, Default)]
pub struct ArcTable {
    records: Vec<ArcRecord>,
    positions: HashMap<ArcId, usize>,
}

impl ArcTable {
    /// Build records from the network, importing any attributes it already
    /// carries from earlier runs.
    pub fn from_network(network: &Network) -> Result<Self> {
        let mut records = Vec::with_capacity(network.arcs.len());
        let mut positions = HashMap::with_capacity(network.arcs.len());

        for feature in &network.arcs {
            let (Some(from), Some(to)) = (feature.first_vertex(), feature.last_vertex()) else {
                return Err(Error::EmptyGeometry { arc: feature.id });
            };
            if positions.insert(feature.id, records.len()).is_some() {
                return Err(Error::DuplicateArcId(feature.id));
            }

            let attrs = &feature.attributes;
            let up_arc_ids = match attrs.up_arc_id.as_deref() {
                Some(text) => Some(parse_ids(feature.id, text)?),
                None => None,
            };

            records.push(ArcRecord {
                id: feature.id,
                from,
                to,
                geometry_length: feature.length(),
                down_node_id: attrs.down_node_id,
                up_node_id: attrs.up_node_id,
                down_arc_id: attrs.down_arc_id,
                up_arc_ids,
                length: attrs.length,
                length_down: attrs.length_down,
                length_up: attrs.length_up,
                strahler_order: attrs.strahler_order,
                extra: attrs.extra.clone(),
            });
        }

        Ok(Self { records, positions })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ArcRecord> {
        self.records.iter()
    }

    pub fn records(&self) -> &[ArcRecord] {
        &self.records
    }

    pub(crate) fn records_mut(&mut self) -> &mut [ArcRecord] {
        &mut self.records
    }

    #[inline]
    pub fn record(&self, pos: usize) -> &ArcRecord {
        &self.records[pos]
    }

    #[inline]
    pub(crate) fn record_mut(&mut self, pos: usize) -> &mut ArcRecord {
        &mut self.records[pos]
    }

    pub fn position(&self, id: ArcId) -> Result<usize> {
        self.positions.get(&id).copied().ok_or(Error::UnknownArc(id))
    }

    pub fn get(&self, id: ArcId) -> Option<&ArcRecord> {
        self.positions.get(&id).map(|&pos| &self.records[pos])
    }

    /// Positions of indexed arcs sorted by upstream node id, outlet first.
    pub fn by_upstream_node(&self) -> Vec<usize> {
        let mut order: Vec<(i64, usize)> = self
            .records
            .iter()
            .enumerate()
            .filter_map(|(pos, r)| r.up_node_id.map(|up| (up, pos)))
            .collect();
        order.sort_unstable();
        order.into_iter().map(|(_, pos)| pos).collect()
    }

    /// Write every record's attributes back onto the matching network arc.
    pub fn commit(&self, network: &mut Network) {
        for feature in &mut network.arcs {
            if let Some(record) = self.get(feature.id) {
                feature.attributes = record.to_attributes();
            }
        }
    }
}
