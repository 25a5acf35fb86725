//! Per-arc metrics and per-order aggregates computed on a linked network.
pub mod bifurcation;
pub mod lengths;
pub mod strahler;

pub use bifurcation::{
    bifurcation_ratios, order_frequency, order_statistics, BifurcationParameters, CsvLayout,
    OrderFrequency, OrderStatistics, Ratio, STRAHLER_ORDER_FIELD,
};
pub use lengths::propagate_lengths;
pub use strahler::{assign_strahler_orders, merge_orders};
