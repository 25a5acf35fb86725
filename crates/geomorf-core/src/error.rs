//! Error types for geomorf.

use thiserror::Error;

use crate::network::ArcId;

/// Main error type for stream-network operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("exactly one outlet arc must be selected, found {count}")]
    OutletSelection { count: usize },

    #[error("arc {0} does not exist in the network")]
    UnknownArc(ArcId),

    #[error("arc id {0} is used by more than one arc")]
    DuplicateArcId(ArcId),

    #[error("arc {arc} has no vertices")]
    EmptyGeometry { arc: ArcId },

    #[error("{stage}: attribute {field} is not set; run the preceding stage first")]
    MissingAttribute {
        stage: &'static str,
        field: &'static str,
    },

    #[error("arc {arc}: invalid {field} value {value:?}")]
    InvalidAttribute {
        arc: ArcId,
        field: &'static str,
        value: String,
    },

    #[error("no arc carries the order attribute {field:?}")]
    MissingOrderField { field: String },

    #[error("arc {arc}: order attribute {field:?} is not a non-negative integer: {value}")]
    InvalidOrder {
        arc: ArcId,
        field: String,
        value: String,
    },

    #[error("network is not a tree: arc {arc} was reached twice while indexing nodes")]
    Cycle { arc: ArcId },

    #[error("{count} arc(s) are not connected to the outlet (first: {first})")]
    Unreachable { count: usize, first: ArcId },
}

/// Result type alias for geomorf operations.
pub type Result<T> = std::result::Result<T, Error>;
