//! Order frequency and bifurcation ratios from an ordered network.
//!
//! For every order `k`:
//!   N: arcs of order k
//!   Ndu: order-k arcs whose downstream arc is of order k + 1
//!   Na: order-k arcs whose downstream arc skips at least one order
//!   Rbu  = N[k] / N[k+1]
//!   Rbdu = Ndu[k] / N[k+1]
//!   Ru   = Rbu − Rbdu
//! Ratios for the highest order are 0.
//!
//! Orders are normally the `StrahOrder` values assigned by this crate, but
//! any integer attribute carried on the arcs can be used instead.
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::arcs::{ArcRecord, ArcTable};
use crate::error::{Error, Result};

const STAGE: &str = "order statistics";

/// Attribute name of the orders assigned by the Strahler stage.
pub const STRAHLER_ORDER_FIELD: &str = "StrahOrder";

/// One row of the order frequency table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OrderFrequency {
    pub order: u32,
    #[serde(rename = "N")]
    pub n: u32,
    #[serde(rename = "Ndu")]
    pub ndu: u32,
    #[serde(rename = "Na")]
    pub na: u32,
}

/// One row of the bifurcation parameter table.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BifurcationParameters {
    pub order: u32,
    #[serde(rename = "Rbu")]
    pub rbu: f64,
    #[serde(rename = "Rbdu")]
    pub rbdu: f64,
    #[serde(rename = "Ru")]
    pub ru: f64,
}

/// A ratio column of the bifurcation table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ratio {
    Rbu,
    Rbdu,
    Ru,
}

impl BifurcationParameters {
    pub fn ratio(&self, ratio: Ratio) -> f64 {
        match ratio {
            Ratio::Rbu => self.rbu,
            Ratio::Rbdu => self.rbdu,
            Ratio::Ru => self.ru,
        }
    }
}

// ── CSV layouts ───────────────────────────────────────────────────────────────

/// Header names and ratio column order of the two CSV tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvLayout {
    pub frequency_header: [&'static str; 4],
    pub bifurcation_header: [&'static str; 4],
    pub ratio_columns: [Ratio; 3],
}

impl CsvLayout {
    /// `order,N,Ndu,Na` and `order,Rbu,Rbdu,Ru`.
    pub const STANDARD: Self = Self {
        frequency_header: ["order", "N", "Ndu", "Na"],
        bifurcation_header: ["order", "Rbu", "Rbdu", "Ru"],
        ratio_columns: [Ratio::Rbu, Ratio::Rbdu, Ratio::Ru],
    };

    /// `order,N,NDU,NA` and `order,RBD,RB,RU`, direct ratio first.
    pub const BATCH: Self = Self {
        frequency_header: ["order", "N", "NDU", "NA"],
        bifurcation_header: ["order", "RBD", "RB", "RU"],
        ratio_columns: [Ratio::Rbdu, Ratio::Rbu, Ratio::Ru],
    };
}

impl Default for CsvLayout {
    fn default() -> Self {
        Self::STANDARD
    }
}

/// Both aggregate tables, one row per order from 1 to the maximum.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OrderStatistics {
    pub frequency: Vec<OrderFrequency>,
    pub bifurcation: Vec<BifurcationParameters>,
}

impl OrderStatistics {
    pub fn max_order(&self) -> u32 {
        self.frequency.last().map_or(0, |row| row.order)
    }

    /// Total arc count over all orders.
    pub fn total_arcs(&self) -> u32 {
        self.frequency.iter().map(|row| row.n).sum()
    }

    pub fn frequency_csv(&self, layout: &CsvLayout) -> String {
        let mut out = layout.frequency_header.join(",");
        out.push('\n');
        for row in &self.frequency {
            let _ = writeln!(out, "{},{},{},{}", row.order, row.n, row.ndu, row.na);
        }
        out
    }

    /// Ratios are written with six decimals.
    pub fn bifurcation_csv(&self, layout: &CsvLayout) -> String {
        let mut out = layout.bifurcation_header.join(",");
        out.push('\n');
        for row in &self.bifurcation {
            let [a, b, c] = layout.ratio_columns.map(|ratio| row.ratio(ratio));
            let _ = writeln!(out, "{},{a:.6},{b:.6},{c:.6}", row.order);
        }
        out
    }
}

// ── Orders ────────────────────────────────────────────────────────────────────

/// Order of `record` read from `field`; `None` when the arc carries no value.
fn order_of(record: &ArcRecord, field: &str) -> Result<Option<u32>> {
    if field == STRAHLER_ORDER_FIELD {
        return Ok(record.strahler_order);
    }
    let value = match record.extra.get(field) {
        None | Some(Value::Null) => return Ok(None),
        Some(value) => value,
    };
    let order = match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| *f >= 0.0 && f.fract() == 0.0)
                .map(|f| f as u64)
        }),
        Value::String(text) => text.trim().parse::<u64>().ok(),
        _ => None,
    };
    order
        .and_then(|o| u32::try_from(o).ok())
        .map(Some)
        .ok_or_else(|| Error::InvalidOrder {
            arc: record.id,
            field: field.to_string(),
            value: value.to_string(),
        })
}

fn missing_orders(field: &str) -> Error {
    if field == STRAHLER_ORDER_FIELD {
        Error::MissingAttribute {
            stage: STAGE,
            field: STRAHLER_ORDER_FIELD,
        }
    } else {
        Error::MissingOrderField {
            field: field.to_string(),
        }
    }
}

/// Count arcs per order and classify each arc's junction with its
/// downstream arc. The outlet has no downstream arc and only counts in `N`.
pub fn order_frequency(table: &ArcTable, field: &str) -> Result<Vec<OrderFrequency>> {
    let orders = table
        .iter()
        .map(|record| order_of(record, field))
        .collect::<Result<Vec<_>>>()?;
    let max_order = orders
        .iter()
        .flatten()
        .copied()
        .max()
        .ok_or_else(|| missing_orders(field))?;

    let mut rows: Vec<OrderFrequency> = (1..=max_order)
        .map(|order| OrderFrequency {
            order,
            ..Default::default()
        })
        .collect();

    for (record, order) in table.iter().zip(orders.iter().copied()) {
        let Some(order) = order.filter(|&o| o >= 1) else {
            continue;
        };
        let row = &mut rows[(order - 1) as usize];
        row.n += 1;

        let Some(down) = record.down_arc_id else {
            continue;
        };
        if let Some(down_order) = orders[table.position(down)?] {
            match i64::from(down_order) - i64::from(order) {
                1 => row.ndu += 1,
                d if d > 1 => row.na += 1,
                _ => {}
            }
        }
    }

    Ok(rows)
}

/// Derive bifurcation ratios from the frequency table.
///
/// A zero arc count for the next order (impossible on a well-formed tree)
/// yields a 0 ratio instead of a division by zero.
pub fn bifurcation_ratios(frequency: &[OrderFrequency]) -> Vec<BifurcationParameters> {
    frequency
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let (rbu, rbdu) = match frequency.get(i + 1) {
                Some(next) if next.n > 0 => (
                    f64::from(row.n) / f64::from(next.n),
                    f64::from(row.ndu) / f64::from(next.n),
                ),
                Some(next) => {
                    tracing::warn!(order = next.order, "no arcs of order; ratios set to 0");
                    (0.0, 0.0)
                }
                None => (0.0, 0.0),
            };
            BifurcationParameters {
                order: row.order,
                rbu,
                rbdu,
                ru: rbu - rbdu,
            }
        })
        .collect()
}

/// Order frequency plus bifurcation ratios, with orders read from `field`.
pub fn order_statistics(table: &ArcTable, field: &str) -> Result<OrderStatistics> {
    let frequency = order_frequency(table, field)?;
    let bifurcation = bifurcation_ratios(&frequency);
    tracing::info!(field, max_order = frequency.len(), "computed order statistics");
    Ok(OrderStatistics {
        frequency,
        bifurcation,
    })
}
