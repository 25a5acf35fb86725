/// Command-line front end for the geomorf pipeline.
///
/// Every subcommand reads a network JSON file, runs one stage (or all of
/// them) and writes the updated network back. `order-stats` and `run` also
/// write the per-order tables.
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use geomorf_core::metrics::{CsvLayout, OrderStatistics};
use geomorf_core::{run_geomorf, run_stage, GeomorfParams, Network, Stage};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

// ── CLI ──────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "geomorf",
    version,
    about = "Topology, lengths, Strahler orders and bifurcation ratios of stream networks"
)]
struct Cli {
    /// Log per-stage debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Number the nodes from the outlet (DownNodeId, UpNodeId)
    IndexNodes(NetworkArgs),
    /// Link arcs to their neighbours and accumulate lengths
    LinkArcs(NetworkArgs),
    /// Assign Strahler orders (StrahOrder)
    Strahler(NetworkArgs),
    /// Compute order frequency and bifurcation ratios
    OrderStats {
        #[command(flatten)]
        network: NetworkArgs,
        #[command(flatten)]
        tables: TableArgs,
    },
    /// Run every stage in order
    Run {
        #[command(flatten)]
        network: NetworkArgs,
        #[command(flatten)]
        tables: TableArgs,
    },
}

#[derive(Args, Debug)]
struct NetworkArgs {
    /// Network JSON file
    input: PathBuf,

    /// Where to write the updated network (defaults to overwriting the input)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Parameter JSON file; flags below override its fields
    #[arg(long)]
    params: Option<PathBuf>,

    /// Outlet arc id (defaults to the network's single selected arc)
    #[arg(long, allow_negative_numbers = true)]
    outlet: Option<i64>,

    /// Leave arcs unreachable from the outlet unindexed instead of failing
    #[arg(long)]
    allow_unreachable: bool,
}

#[derive(Args, Debug)]
struct TableArgs {
    /// Directory for the order tables (created if absent)
    #[arg(long, default_value = ".")]
    tables: PathBuf,

    /// Table output format
    #[arg(long, value_enum, default_value_t = TableFormat::Csv)]
    format: TableFormat,

    /// Integer attribute holding the orders (defaults to StrahOrder)
    #[arg(long)]
    order_field: Option<String>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum TableFormat {
    Csv,
    Json,
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")
}

impl NetworkArgs {
    /// Parameters from `--params`, then flag overrides.
    fn params(&self) -> Result<GeomorfParams> {
        let mut params = match &self.params {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .with_context(|| format!("reading params {}", path.display()))?;
                GeomorfParams::from_json(&text)
                    .with_context(|| format!("parsing params {}", path.display()))?
            }
            None => GeomorfParams::default(),
        };
        if self.outlet.is_some() {
            params.outlet = self.outlet;
        }
        params.allow_unreachable |= self.allow_unreachable;
        Ok(params)
    }

    fn load(&self) -> Result<Network> {
        Network::load(&self.input)
            .with_context(|| format!("loading network {}", self.input.display()))
    }

    fn save(&self, network: &Network) -> Result<()> {
        let path = self.output.as_deref().unwrap_or(&self.input);
        network
            .save(path)
            .with_context(|| format!("writing network {}", path.display()))?;
        info!(path = %path.display(), "network written");
        Ok(())
    }
}

impl TableArgs {
    fn apply(&self, params: &mut GeomorfParams) {
        if let Some(field) = &self.order_field {
            params.order_field = Some(field.clone());
        }
    }
}

/// Keep the selection in step with an outlet given on the command line, so
/// later stage runs on the written network start from the same arc.
fn record_outlet(network: &mut Network, params: &GeomorfParams) -> Result<()> {
    if let Some(outlet) = params.outlet {
        network
            .select(outlet)
            .with_context(|| format!("selecting outlet arc {outlet}"))?;
    }
    Ok(())
}

/// Write both order tables into `args.tables`; returns the files written.
fn write_tables(stats: &OrderStatistics, args: &TableArgs) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(&args.tables)
        .with_context(|| format!("creating {}", args.tables.display()))?;

    let files = match args.format {
        TableFormat::Csv => vec![
            (
                args.tables.join("order_frequency.csv"),
                stats.frequency_csv(&CsvLayout::STANDARD),
            ),
            (
                args.tables.join("bifurcation.csv"),
                stats.bifurcation_csv(&CsvLayout::STANDARD),
            ),
        ],
        TableFormat::Json => vec![(
            args.tables.join("order_statistics.json"),
            serde_json::to_string_pretty(stats).context("serialising order statistics")?,
        )],
    };

    let mut written = Vec::with_capacity(files.len());
    for (path, text) in files {
        write_file(&path, &text)?;
        written.push(path);
    }
    Ok(written)
}

fn write_file(path: &Path, text: &str) -> Result<()> {
    fs::write(path, text).with_context(|| format!("writing {}", path.display()))
}

fn run_single(
    args: &NetworkArgs,
    stage: Stage,
    params: &GeomorfParams,
) -> Result<Option<OrderStatistics>> {
    let mut network = args.load()?;
    let stats = run_stage(&mut network, stage, params)
        .with_context(|| format!("{stage:?} failed on {}", args.input.display()))?;
    if stage == Stage::IndexNodes {
        record_outlet(&mut network, params)?;
    }
    if stats.is_none() {
        args.save(&network)?;
    }
    Ok(stats)
}

fn report(stats: &OrderStatistics, tables: &TableArgs) -> Result<()> {
    for path in write_tables(stats, tables)? {
        info!(path = %path.display(), "table written");
    }
    info!(
        max_order = stats.max_order(),
        arcs = stats.total_arcs(),
        "order statistics"
    );
    Ok(())
}

// ── Main ─────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        Command::IndexNodes(args) => {
            run_single(&args, Stage::IndexNodes, &args.params()?)?;
        }
        Command::LinkArcs(args) => {
            run_single(&args, Stage::LinkArcs, &args.params()?)?;
        }
        Command::Strahler(args) => {
            run_single(&args, Stage::StrahlerOrder, &args.params()?)?;
        }
        Command::OrderStats { network, tables } => {
            let mut params = network.params()?;
            tables.apply(&mut params);
            if let Some(stats) = run_single(&network, Stage::OrderStatistics, &params)? {
                report(&stats, &tables)?;
            }
        }
        Command::Run { network: args, tables } => {
            let mut params = args.params()?;
            tables.apply(&mut params);
            let mut network = args.load()?;
            let result = run_geomorf(&network, &params)
                .with_context(|| format!("pipeline failed on {}", args.input.display()))?;
            info!(
                outlet = result.outlet,
                nodes = result.node_count,
                unindexed = result.unreachable.len(),
                "pipeline complete"
            );
            result.commit(&mut network);
            record_outlet(&mut network, &params)?;
            args.save(&network)?;
            report(&result.statistics, &tables)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use geomorf_core::metrics::{BifurcationParameters, OrderFrequency};
    use geomorf_core::ArcFeature;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("geomorf-cli-{name}-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn network_args(cli: Cli) -> NetworkArgs {
        match cli.command {
            Command::IndexNodes(args) | Command::LinkArcs(args) | Command::Strahler(args) => args,
            Command::OrderStats { network, .. } | Command::Run { network, .. } => network,
        }
    }

    #[test]
    fn parses_run_with_tables() {
        let cli = Cli::try_parse_from([
            "geomorf", "-v", "run", "net.json", "--outlet", "7", "--format", "json",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Command::Run { network, tables } => {
                assert_eq!(network.input, PathBuf::from("net.json"));
                assert_eq!(network.outlet, Some(7));
                assert_eq!(tables.format, TableFormat::Json);
                assert_eq!(tables.tables, PathBuf::from("."));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn stage_subcommands_need_an_input() {
        assert!(Cli::try_parse_from(["geomorf", "strahler"]).is_err());
        assert!(Cli::try_parse_from(["geomorf", "index-nodes", "a.json"]).is_ok());
        assert!(Cli::try_parse_from(["geomorf", "link-arcs", "a.json", "-o", "b.json"]).is_ok());
    }

    #[test]
    fn flags_override_params_file() {
        let dir = temp_dir("params");
        let path = dir.join("params.json");
        fs::write(&path, r#"{ "outlet": 3, "allow_unreachable": false }"#).unwrap();

        let path_str = path.to_str().unwrap();
        let cli = Cli::try_parse_from([
            "geomorf", "index-nodes", "n.json", "--params", path_str, "--allow-unreachable",
        ])
        .unwrap();
        let params = network_args(cli).params().unwrap();
        assert_eq!(params.outlet, Some(3));
        assert!(params.allow_unreachable);

        let cli = Cli::try_parse_from([
            "geomorf", "index-nodes", "n.json", "--params", path_str, "--outlet", "9",
        ])
        .unwrap();
        assert_eq!(network_args(cli).params().unwrap().outlet, Some(9));

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn order_field_flag_reaches_params() {
        let cli = Cli::try_parse_from([
            "geomorf", "order-stats", "n.json", "--order-field", "Horton",
        ])
        .unwrap();
        let Command::OrderStats { network, tables } = cli.command else {
            panic!("expected order-stats");
        };
        let mut params = network.params().unwrap();
        assert_eq!(params.order_field(), "StrahOrder");
        tables.apply(&mut params);
        assert_eq!(params.order_field(), "Horton");
    }

    #[test]
    fn explicit_outlet_becomes_the_selection() {
        let mut network = Network::new(vec![
            ArcFeature::new(1, vec![[0.0, 0.0], [0.0, 1.0]]),
            ArcFeature::new(2, vec![[0.0, 1.0], [0.0, 2.0]]),
        ]);
        network.selected = vec![1];

        record_outlet(&mut network, &GeomorfParams::default()).unwrap();
        assert_eq!(network.selected, vec![1]);

        let params = GeomorfParams {
            outlet: Some(2),
            ..Default::default()
        };
        record_outlet(&mut network, &params).unwrap();
        assert_eq!(network.selected, vec![2]);

        let params = GeomorfParams {
            outlet: Some(7),
            ..Default::default()
        };
        assert!(record_outlet(&mut network, &params).is_err());
    }

    #[test]
    fn csv_tables_are_written_side_by_side() {
        let dir = temp_dir("tables");
        let stats = OrderStatistics {
            frequency: vec![
                OrderFrequency { order: 1, n: 2, ndu: 2, na: 0 },
                OrderFrequency { order: 2, n: 1, ndu: 0, na: 0 },
            ],
            bifurcation: vec![
                BifurcationParameters { order: 1, rbu: 2.0, rbdu: 2.0, ru: 0.0 },
                BifurcationParameters { order: 2, rbu: 0.0, rbdu: 0.0, ru: 0.0 },
            ],
        };
        let args = TableArgs {
            tables: dir.clone(),
            format: TableFormat::Csv,
            order_field: None,
        };
        let written = write_tables(&stats, &args).unwrap();
        assert_eq!(written.len(), 2);

        let frequency = fs::read_to_string(dir.join("order_frequency.csv")).unwrap();
        assert_eq!(frequency, "order,N,Ndu,Na\n1,2,2,0\n2,1,0,0\n");
        let ratios = fs::read_to_string(dir.join("bifurcation.csv")).unwrap();
        assert!(ratios.starts_with("order,Rbu,Rbdu,Ru\n1,2.000000,"));

        fs::remove_dir_all(&dir).ok();
    }
}
