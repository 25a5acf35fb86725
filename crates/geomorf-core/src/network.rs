//! Stream network as supplied by the geometry side: arcs with polyline
//! geometry, an optional outlet selection and the attribute set written back
//! after a run.
//!
//! Networks are exchanged as JSON:
//!
//! ```json
//! { "selected": [0],
//!   "arcs": [ { "id": 0, "coordinates": [[0.0, 0.0], [0.0, 100.0]],
//!               "attributes": { "StrahOrder": 2 } } ] }
//! ```
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use geo::{Coord, Euclidean, Length, LineString};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Identifier of an arc, stable for the duration of one run.
pub type ArcId = i64;

/// Per-arc attributes produced by the pipeline stages.
///
/// Every field is optional so that a network can be written back after any
/// single stage and picked up again by the next one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArcAttributes {
    #[serde(rename = "DownNodeId", default, skip_serializing_if = "Option::is_none")]
    pub down_node_id: Option<i64>,
    #[serde(rename = "UpNodeId", default, skip_serializing_if = "Option::is_none")]
    pub up_node_id: Option<i64>,
    #[serde(rename = "DownArcId", default, skip_serializing_if = "Option::is_none")]
    pub down_arc_id: Option<ArcId>,
    /// Comma-separated upstream arc ids; empty for a headwater arc.
    #[serde(rename = "UpArcId", default, skip_serializing_if = "Option::is_none")]
    pub up_arc_id: Option<String>,
    #[serde(rename = "Length", default, skip_serializing_if = "Option::is_none")]
    pub length: Option<f64>,
    #[serde(rename = "LengthDown", default, skip_serializing_if = "Option::is_none")]
    pub length_down: Option<f64>,
    #[serde(rename = "LengthUp", default, skip_serializing_if = "Option::is_none")]
    pub length_up: Option<f64>,
    #[serde(rename = "StrahOrder", default, skip_serializing_if = "Option::is_none")]
    pub strahler_order: Option<u32>,
    /// Any other attribute, e.g. an order field computed by another tool.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// One arc of the network: id, polyline vertices and attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArcFeature {
    pub id: ArcId,
    /// Polyline vertices as `[x, y]` pairs, in digitising order.
    pub coordinates: Vec<[f64; 2]>,
    #[serde(default)]
    pub attributes: ArcAttributes,
}

impl ArcFeature {
    pub fn new(id: ArcId, coordinates: Vec<[f64; 2]>) -> Self {
        Self {
            id,
            coordinates,
            attributes: ArcAttributes::default(),
        }
    }

    pub fn line(&self) -> LineString<f64> {
        LineString::from(self.coordinates.clone())
    }

    pub fn first_vertex(&self) -> Option<Coord<f64>> {
        self.coordinates.first().map(|&c| Coord::from(c))
    }

    pub fn last_vertex(&self) -> Option<Coord<f64>> {
        self.coordinates.last().map(|&c| Coord::from(c))
    }

    /// Planar length of the polyline in coordinate units.
    pub fn length(&self) -> f64 {
        self.line().length::<Euclidean>()
    }
}

/// A stream network: arcs in enumeration order plus the selected arc ids.
///
/// Enumeration order matters: it decides the order in which the node walk
/// visits tributaries, and with it the node ids that get assigned.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Network {
    #[serde(default)]
    pub selected: Vec<ArcId>,
    pub arcs: Vec<ArcFeature>,
}

impl Network {
    pub fn new(arcs: Vec<ArcFeature>) -> Self {
        Self {
            selected: Vec::new(),
            arcs,
        }
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Replace the selection with a single arc.
    pub fn select(&mut self, id: ArcId) -> Result<()> {
        if !self.arcs.iter().any(|a| a.id == id) {
            return Err(Error::UnknownArc(id));
        }
        self.selected = vec![id];
        Ok(())
    }

    /// The selected outlet arc. Exactly one arc must be selected.
    pub fn selected_outlet(&self) -> Result<ArcId> {
        match self.selected.as_slice() {
            [id] => Ok(*id),
            other => Err(Error::OutletSelection { count: other.len() }),
        }
    }

    pub fn arc(&self, id: ArcId) -> Option<&ArcFeature> {
        self.arcs.iter().find(|a| a.id == id)
    }
}
