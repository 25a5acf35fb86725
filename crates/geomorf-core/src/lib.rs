//! Geomorphological descriptors of vector stream networks.
//!
//! A network is a set of polyline arcs meeting at shared endpoints. Starting
//! from a selected outlet arc the pipeline numbers the nodes, links every arc
//! to its downstream and upstream neighbours, accumulates path lengths,
//! assigns Strahler orders and aggregates per-order bifurcation statistics.
pub mod arcs;
pub mod error;
pub mod metrics;
pub mod network;
pub mod pipeline;
pub mod topology;

pub use arcs::{ArcRecord, ArcTable};
pub use error::{Error, Result};
pub use network::{ArcAttributes, ArcFeature, ArcId, Network};
pub use pipeline::{run_geomorf, run_stage, GeomorfParams, GeomorfResult, Stage};
