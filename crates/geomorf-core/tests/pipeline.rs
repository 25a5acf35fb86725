//! End-to-end checks of the full pipeline on generated networks.

use std::collections::HashSet;

use approx::assert_relative_eq;
use geomorf_core::{run_geomorf, ArcFeature, ArcTable, GeomorfParams, Network};

fn node(n: usize) -> [f64; 2] {
    [n as f64, (n % 7) as f64]
}

/// Outlet arc plus `depth` levels of binary branching above it.
fn binary_tree(depth: u32) -> Network {
    let mut arcs = vec![ArcFeature::new(0, vec![node(0), node(1)])];
    let mut frontier = vec![1usize];
    let mut next_node = 2usize;
    for _ in 0..depth {
        let mut level = Vec::with_capacity(frontier.len() * 2);
        for &parent in &frontier {
            for _ in 0..2 {
                let child = next_node;
                next_node += 1;
                let id = arcs.len() as i64;
                arcs.push(ArcFeature::new(id, vec![node(parent), node(child)]));
                level.push(child);
            }
        }
        frontier = level;
    }
    let mut net = Network::new(arcs);
    net.selected = vec![0];
    net
}

fn run(net: &Network) -> (ArcTable, geomorf_core::metrics::OrderStatistics) {
    let result = run_geomorf(net, &GeomorfParams::default()).expect("pipeline run");
    (result.arcs, result.statistics)
}

#[test]
fn upstream_node_ids_are_a_permutation() {
    let net = binary_tree(5);
    let (arcs, _) = run(&net);
    let ids: HashSet<i64> = arcs.iter().map(|r| r.up_node_id.unwrap()).collect();
    assert_eq!(ids.len(), arcs.len());
    assert_eq!(ids, (0..arcs.len() as i64).collect());
}

#[test]
fn links_are_mutual_inverses() {
    let (arcs, _) = run(&binary_tree(4));
    for record in arcs.iter() {
        for &up in record.up_arc_ids.as_deref().unwrap() {
            assert_eq!(arcs.get(up).unwrap().down_arc_id, Some(record.id));
        }
        if let Some(down) = record.down_arc_id {
            let parent = arcs.get(down).unwrap();
            assert!(parent.up_arc_ids.as_ref().unwrap().contains(&record.id));
        }
    }
}

#[test]
fn length_invariants_hold() {
    let (arcs, _) = run(&binary_tree(4));
    for record in arcs.iter() {
        let length = record.length.unwrap();
        let up = record.length_up.unwrap();
        assert!(up >= length, "arc {}: {up} < {length}", record.id);
        if record.is_headwater() {
            assert_relative_eq!(up, length);
        }
    }
    assert_eq!(arcs.get(0).unwrap().length_down, Some(0.0));
}

#[test]
fn strahler_order_never_decreases_downstream() {
    let (arcs, _) = run(&binary_tree(4));
    for record in arcs.iter() {
        if let Some(down) = record.down_arc_id {
            assert!(arcs.get(down).unwrap().strahler_order >= record.strahler_order);
        }
    }
}

#[test]
fn perfect_binary_tree_statistics() {
    let depth = 4;
    let net = binary_tree(depth);
    let (arcs, stats) = run(&net);

    assert_eq!(stats.max_order(), depth + 1);
    assert_eq!(stats.total_arcs() as usize, arcs.len());
    for row in &stats.frequency {
        if row.order <= depth {
            assert_eq!(row.n, 1 << (depth + 1 - row.order));
            assert_eq!(row.ndu, row.n);
        } else {
            assert_eq!(row.n, 1);
            assert_eq!(row.ndu, 0);
        }
        assert_eq!(row.na, 0);
    }
    for row in &stats.bifurcation[..depth as usize] {
        assert_relative_eq!(row.rbu, 2.0);
        assert_relative_eq!(row.ru, 0.0);
    }
    assert_eq!(stats.bifurcation[depth as usize].rbu, 0.0);
}

#[test]
fn confluence_lengths_match_worked_example() {
    // O ← C ← {S1, S2}, every arc 100 long.
    let mut net = Network::new(vec![
        ArcFeature::new(10, vec![[0.0, 0.0], [0.0, 100.0]]),
        ArcFeature::new(11, vec![[0.0, 100.0], [0.0, 200.0]]),
        ArcFeature::new(12, vec![[0.0, 200.0], [-80.0, 260.0]]),
        ArcFeature::new(13, vec![[0.0, 200.0], [80.0, 260.0]]),
    ]);
    net.select(10).unwrap();
    let (arcs, _) = run(&net);
    let get = |id| arcs.get(id).unwrap();

    assert_relative_eq!(get(11).length_up.unwrap(), 200.0);
    assert_relative_eq!(
        get(10).length_up.unwrap(),
        get(10).length.unwrap() + get(11).length_up.unwrap()
    );
    let to_outlet = get(11).length.unwrap() + get(10).length.unwrap();
    assert_relative_eq!(get(12).length_down.unwrap(), to_outlet);
    assert_relative_eq!(get(13).length_down.unwrap(), to_outlet);
    assert_eq!(get(11).strahler_order, Some(2));
}

#[test]
fn network_file_round_trip_keeps_attributes() {
    let dir = std::env::temp_dir().join(format!("geomorf-core-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("network.json");

    let mut net = binary_tree(2);
    let result = run_geomorf(&net, &GeomorfParams::default()).unwrap();
    result.commit(&mut net);
    net.save(&path).unwrap();

    let loaded = Network::load(&path).unwrap();
    assert_eq!(loaded.selected, net.selected);
    let reloaded = ArcTable::from_network(&loaded).unwrap();
    assert_eq!(reloaded.len(), result.arcs.len());
    for (a, b) in reloaded.iter().zip(result.arcs.iter()) {
        assert_eq!(a.id, b.id);
        assert_eq!(a.up_node_id, b.up_node_id);
        assert_eq!(a.down_arc_id, b.down_arc_id);
        assert_eq!(a.up_arc_ids, b.up_arc_ids);
        assert_eq!(a.strahler_order, b.strahler_order);
        assert_relative_eq!(a.length_up.unwrap(), b.length_up.unwrap());
    }

    std::fs::remove_dir_all(&dir).ok();
}
