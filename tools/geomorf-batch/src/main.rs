/// Batch runner: `geomorf-batch <network-path> <outlet-arc-id>`.
///
/// Runs the whole pipeline with the given outlet, writes the attributes back
/// into the network file and drops `segfr.csv` / `bifrat.csv` into the current
/// directory. Bad arguments and unreadable networks are reported but exit 0,
/// so a driving shell loop keeps going.
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use geomorf_core::metrics::{CsvLayout, OrderStatistics};
use geomorf_core::{run_geomorf, ArcId, GeomorfParams, Network};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

// ── Constants ────────────────────────────────────────────────────────────────

const SEGMENT_FREQUENCY_FILE: &str = "segfr.csv";
const BIFURCATION_RATIO_FILE: &str = "bifrat.csv";

// ── Arguments ────────────────────────────────────────────────────────────────

#[derive(Debug, PartialEq)]
struct BatchArgs {
    network: PathBuf,
    outlet: ArcId,
}

/// `args` excludes the program name.
fn parse_args(args: &[String]) -> std::result::Result<BatchArgs, String> {
    let [network, outlet] = args else {
        return Err("Incorrect number of arguments.".to_string());
    };
    let outlet = outlet
        .trim()
        .parse()
        .map_err(|_| format!("Outlet arc id must be an integer, got {outlet:?}."))?;
    Ok(BatchArgs {
        network: PathBuf::from(network),
        outlet,
    })
}

// ── Steps ────────────────────────────────────────────────────────────────────

/// Load the network, printing a diagnostic when it cannot be read.
fn load_network(path: &Path) -> Option<Network> {
    match Network::load(path) {
        Ok(network) => Some(network),
        Err(err) => {
            eprintln!("Could not load network {}: {err}", path.display());
            None
        }
    }
}

/// Select `outlet`, run every stage and commit the attributes in memory.
fn process(network: &mut Network, outlet: ArcId) -> Result<OrderStatistics> {
    network
        .select(outlet)
        .with_context(|| format!("selecting outlet arc {outlet}"))?;
    let result = run_geomorf(network, &GeomorfParams::default())?;
    result.commit(network);
    Ok(result.statistics)
}

// ── Main ─────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")?;

    let raw: Vec<String> = std::env::args().skip(1).collect();
    let args = match parse_args(&raw) {
        Ok(args) => args,
        Err(msg) => {
            eprintln!("{msg}");
            eprintln!("Usage: geomorf-batch <network-path> <outlet-arc-id>");
            return Ok(());
        }
    };

    let Some(mut network) = load_network(&args.network) else {
        return Ok(());
    };

    let stats = process(&mut network, args.outlet)
        .with_context(|| format!("pipeline failed on {}", args.network.display()))?;
    network
        .save(&args.network)
        .with_context(|| format!("writing network {}", args.network.display()))?;

    fs::write(SEGMENT_FREQUENCY_FILE, stats.frequency_csv(&CsvLayout::BATCH))
        .with_context(|| format!("writing {SEGMENT_FREQUENCY_FILE}"))?;
    fs::write(BIFURCATION_RATIO_FILE, stats.bifurcation_csv(&CsvLayout::BATCH))
        .with_context(|| format!("writing {BIFURCATION_RATIO_FILE}"))?;

    info!(
        outlet = args.outlet,
        max_order = stats.max_order(),
        "batch run complete"
    );
    Ok(())
}
